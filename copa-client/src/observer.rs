//! Observability hooks for channel and exchange activity.
//!
//! An observer is handed to the channel and the exchange at construction,
//! so nothing in this crate writes to process-wide logging state on its own.
//! [`TracingObserver`] forwards everything to `tracing` and is the default.

use crate::error::{ExchangeError, TransportError};

/// Receives notifications about every round trip.
///
/// All methods default to doing nothing.
pub trait ExchangeObserver: Send + Sync {
    /// A POST is about to be sent to `url`. `body` is the unencoded field value.
    fn request_sent(&self, _url: &str, _body: &str) {}

    fn response_received(&self, _url: &str, _status: u16, _body: &str) {}

    fn transport_failed(&self, _url: &str, _error: &TransportError) {}

    /// A typed exchange failed. Transport causes were already passed to
    /// [`ExchangeObserver::transport_failed`] when the transport is a channel.
    fn exchange_failed(&self, _error: &ExchangeError) {}

    /// A started channel released its client.
    fn channel_stopped(&self, _url: &str) {}
}

/// Emits one `tracing` event per notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ExchangeObserver for TracingObserver {
    fn request_sent(&self, url: &str, body: &str) {
        tracing::debug!(%url, %body, "Sending request");
    }

    fn response_received(&self, url: &str, status: u16, body: &str) {
        tracing::debug!(%url, status, %body, "Received response");
    }

    fn transport_failed(&self, url: &str, error: &TransportError) {
        tracing::error!(%url, "Transport failure: {error}");
    }

    fn exchange_failed(&self, error: &ExchangeError) {
        match error.remote_kind() {
            Some(kind) => tracing::warn!(?kind, "Exception from server: {error}"),
            // Already logged by transport_failed
            None if error.is_transport() => {}
            None => tracing::warn!("Exchange failed: {error}"),
        }
    }

    fn channel_stopped(&self, url: &str) {
        tracing::debug!(%url, "Stopping channel");
    }
}

/// Discards all notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ExchangeObserver for NoopObserver {}
