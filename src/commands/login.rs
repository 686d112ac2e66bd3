use anyhow::Result;
use copa_client::{ClientSettings, SessionChannel};
use owo_colors::OwoColorize;

pub fn run(settings: &ClientSettings, channel: &SessionChannel) -> Result<()> {
    super::authenticate(settings, channel)?;

    // The server's reply to a login is not checked; a bad password only shows
    // up as a permission error on the next protected request.
    println!(
        "{} {}",
        "Login request sent to".green(),
        channel.endpoints().login_url
    );

    Ok(())
}
