pub mod login;
pub mod request;
pub mod send_text;

use anyhow::{Context, Result};
use copa_client::{ClientSettings, SessionChannel};

/// Log in with the credentials from `settings`.
pub fn authenticate(settings: &ClientSettings, channel: &SessionChannel) -> Result<()> {
    let Some((user, pwd)) = settings.credentials() else {
        anyhow::bail!(
            "No credentials configured.\n\n\
            Add `user` and `pwd` to your settings file, or pass --no-auth."
        );
    };

    let login_url = &channel.endpoints().login_url;
    channel
        .authenticate(user, pwd)
        .with_context(|| format!("Failed to reach login endpoint {login_url}"))
}
