//! Client-side transport for the CoPA calendar service.
//!
//! - [`channel`]: the HTTPS session channel (login, raw `req` POSTs)
//! - [`protocol`]: typed request/response framing and error classification
//!
//! ```no_run
//! use copa_client::{DynamicRequest, Exchange, SessionChannel};
//!
//! # fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let channel = SessionChannel::new(
//!     "https://copa.example.org/login",
//!     "https://copa.example.org/request",
//!     true,
//! );
//! channel.start()?;
//! channel.authenticate("alice", "secret")?;
//!
//! let exchange = Exchange::over(&channel);
//! let request = DynamicRequest::new(
//!     "GetCategoriesRequest",
//!     "GetCategoriesResponse",
//!     serde_json::json!({}),
//! );
//! let categories = exchange.send(&request)?;
//! println!("{categories}");
//!
//! channel.stop()?;
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod error;
pub mod observer;
pub mod protocol;
pub mod settings;

pub use channel::{ChannelState, Endpoints, SessionChannel, TlsPolicy, Transport};
pub use error::{ExchangeError, RemoteErrorKind, SettingsError, TransportError};
pub use observer::{ExchangeObserver, NoopObserver, TracingObserver};
pub use protocol::{DynamicRequest, Exchange, RemoteRequest, classify};
pub use settings::ClientSettings;
