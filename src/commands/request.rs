use anyhow::{Context, Result};
use copa_client::{DynamicRequest, Exchange, SessionChannel};

use crate::render::Render;

pub fn run(
    channel: &SessionChannel,
    request_type: &str,
    expect: Option<&str>,
    content: &str,
) -> Result<()> {
    let content: serde_json::Value =
        serde_json::from_str(content).context("Request content is not valid JSON")?;

    let response_type = match expect {
        Some(expect) => expect.to_string(),
        None => default_response_type(request_type)?,
    };

    let request = DynamicRequest::new(request_type, response_type, content);

    match Exchange::over(channel).send(&request) {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Err(e) => anyhow::bail!("{}", e.render()),
    }
}

fn default_response_type(request_type: &str) -> Result<String> {
    match request_type.strip_suffix("Request") {
        Some(base) => Ok(format!("{base}Response")),
        None => anyhow::bail!(
            "Can not guess the response type of '{request_type}'. Pass it with --expect."
        ),
    }
}
