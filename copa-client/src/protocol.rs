//! Request/response framing on top of a [`Transport`].
//!
//! Requests go out as `{"type": <request type>, "content": <body>}` in the
//! `req` form field. The server answers with the same envelope shape, where
//! `type` is either the expected result type or one of the error tags in
//! [`RemoteErrorKind`]. Anything else is a protocol failure.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::channel::{SessionChannel, Transport};
use crate::error::{ExchangeError, ExchangeResult, RemoteErrorKind};
use crate::observer::{ExchangeObserver, TracingObserver};

/// A typed request and the result type the server answers it with.
pub trait RemoteRequest: Serialize {
    type Response: DeserializeOwned;

    /// Discriminator of this request on the wire.
    fn request_type(&self) -> &str;

    /// Discriminator the server uses for a successful answer.
    fn response_type(&self) -> &str;

    /// Serialize into the text sent as the `req` field.
    fn encode(&self) -> ExchangeResult<String>
    where
        Self: Sized,
    {
        encode_request(self)
    }
}

/// A request described at runtime. Its result stays untyped JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicRequest {
    pub request_type: String,
    pub response_type: String,
    pub content: serde_json::Value,
}

impl DynamicRequest {
    pub fn new(
        request_type: impl Into<String>,
        response_type: impl Into<String>,
        content: serde_json::Value,
    ) -> Self {
        DynamicRequest {
            request_type: request_type.into(),
            response_type: response_type.into(),
            content,
        }
    }
}

impl Serialize for DynamicRequest {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.content.serialize(serializer)
    }
}

impl RemoteRequest for DynamicRequest {
    type Response = serde_json::Value;

    fn request_type(&self) -> &str {
        &self.request_type
    }

    fn response_type(&self) -> &str {
        &self.response_type
    }
}

#[derive(Serialize)]
struct OutgoingEnvelope<'a, T> {
    #[serde(rename = "type")]
    kind: &'a str,
    content: &'a T,
}

#[derive(Deserialize)]
struct IncomingEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: serde_json::Value,
}

#[derive(Deserialize)]
struct ErrorContent {
    #[serde(default)]
    message: Option<String>,
}

pub fn encode_request<R: RemoteRequest>(request: &R) -> ExchangeResult<String> {
    let envelope = OutgoingEnvelope {
        kind: request.request_type(),
        content: request,
    };
    serde_json::to_string(&envelope).map_err(|e| ExchangeError::Encode(e.to_string()))
}

/// Classify a raw response body.
///
/// Returns the deserialized result if the envelope carries `expected_type`,
/// the matching remote error if it carries an error tag, and
/// [`ExchangeError::Protocol`] otherwise. Depends on nothing but its inputs.
pub fn classify<T: DeserializeOwned>(text: &str, expected_type: &str) -> ExchangeResult<T> {
    let envelope: IncomingEnvelope = serde_json::from_str(text)
        .map_err(|e| ExchangeError::Protocol(format!("Failed to parse response: {e}")))?;

    if let Some(kind) = RemoteErrorKind::from_tag(&envelope.kind) {
        // Absent and null content both mean "no message"
        let content: Option<ErrorContent> =
            serde_json::from_value(envelope.content).map_err(|e| {
                ExchangeError::Protocol(format!("Malformed {} envelope: {e}", kind.tag()))
            })?;
        let message = content.and_then(|c| c.message).unwrap_or_default();
        return Err(kind.into_error(message));
    }

    if envelope.kind != expected_type {
        return Err(ExchangeError::Protocol(format!(
            "Expected {expected_type}, got {}",
            envelope.kind
        )));
    }

    serde_json::from_value(envelope.content).map_err(|e| {
        ExchangeError::Protocol(format!("Malformed {expected_type} content: {e}"))
    })
}

/// Typed exchanges over a transport.
pub struct Exchange<T> {
    transport: T,
    observer: Arc<dyn ExchangeObserver>,
}

impl<T: Transport> Exchange<T> {
    pub fn new(transport: T) -> Self {
        Exchange {
            transport,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ExchangeObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send one request and wait for its classified result.
    ///
    /// Exactly one round trip; nothing is retried. Every failure, including
    /// one while encoding, is passed to the observer before it is returned.
    pub fn send<R: RemoteRequest>(&self, request: &R) -> ExchangeResult<R::Response> {
        let result = request.encode().and_then(|body| {
            let text = self.transport.send_raw(&body)?;
            classify(&text, request.response_type())
        });

        result.inspect_err(|e| self.observer.exchange_failed(e))
    }

    /// Send literal text as the `req` field, bypassing classification.
    ///
    /// Transport failures are only reported to the observer and come back as
    /// `None`. Meant for diagnostics; use [`Exchange::send`] for real calls.
    pub fn send_text(&self, body: &str) -> Option<String> {
        self.transport.send_raw(body).ok()
    }
}

impl<'a> Exchange<&'a SessionChannel> {
    /// Exchange over `channel`, sharing its observer.
    pub fn over(channel: &'a SessionChannel) -> Self {
        Exchange::new(channel).with_observer(channel.observer())
    }
}
