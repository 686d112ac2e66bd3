use anyhow::Result;
use copa_client::{Exchange, SessionChannel};

pub fn run(channel: &SessionChannel, text: &str) -> Result<()> {
    match Exchange::over(channel).send_text(text) {
        Some(response) => {
            println!("{response}");
            Ok(())
        }
        None => anyhow::bail!("No response from server (run with --verbose for details)"),
    }
}
