//! Colored terminal rendering for exchange outcomes.

use copa_client::{ExchangeError, RemoteErrorKind};
use owo_colors::OwoColorize;

pub trait Render {
    fn render(&self) -> String;
}

impl Render for RemoteErrorKind {
    fn render(&self) -> String {
        match self {
            RemoteErrorKind::Api => "API error".yellow().to_string(),
            RemoteErrorKind::Permission => "Permission denied".red().to_string(),
            RemoteErrorKind::NotPracticable => "Not practicable".yellow().to_string(),
            RemoteErrorKind::Internal => "Server error".red().to_string(),
        }
    }
}

impl Render for ExchangeError {
    fn render(&self) -> String {
        match (self.remote_kind(), self.remote_message()) {
            (Some(kind), Some(message)) => {
                format!("{} {}", kind.render(), message.dimmed())
            }
            _ => self.to_string().red().to_string(),
        }
    }
}
