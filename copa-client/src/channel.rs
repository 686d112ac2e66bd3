//! Session channel: one HTTP(S) client plus the login and request endpoints.
//!
//! Lifecycle is `Created -> Started -> Stopped`. Construction does no I/O;
//! [`SessionChannel::start`] builds the underlying client (connection pool,
//! TLS context, cookie store). The server session lives in the cookie store,
//! so a successful [`SessionChannel::authenticate`] applies to every later
//! send on the same channel.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::redirect::Policy;

use crate::error::{TransportError, TransportResult};
use crate::observer::{ExchangeObserver, TracingObserver};

/// Form field holding the serialized request.
pub const REQUEST_FIELD: &str = "req";

/// Form fields expected by the server's session-authentication filter.
pub const USERNAME_FIELD: &str = "j_username";
pub const PASSWORD_FIELD: &str = "j_password";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How server certificates are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsPolicy {
    /// Accept any certificate and host name.
    TrustAll,
    /// Validate against the built-in root store.
    Verified,
}

/// Login and request URLs. Fixed for the lifetime of a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub login_url: String,
    pub request_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Created,
    Started,
    /// `start()` failed; the channel can not be used anymore.
    Failed,
    Stopped,
}

enum State {
    Created,
    Started(Client),
    Failed,
    Stopped,
}

/// Anything that can carry one `req` POST and hand back the response body.
pub trait Transport {
    fn send_raw(&self, body: &str) -> TransportResult<String>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send_raw(&self, body: &str) -> TransportResult<String> {
        (**self).send_raw(body)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send_raw(&self, body: &str) -> TransportResult<String> {
        (**self).send_raw(body)
    }
}

pub struct SessionChannel {
    endpoints: Endpoints,
    tls: TlsPolicy,
    timeout: Duration,
    observer: Arc<dyn ExchangeObserver>,
    state: Mutex<State>,
}

impl SessionChannel {
    /// Create a channel. `use_tls` selects [`TlsPolicy::TrustAll`], otherwise
    /// certificates are verified. Redirects are never followed.
    pub fn new(
        login_url: impl Into<String>,
        request_url: impl Into<String>,
        use_tls: bool,
    ) -> Self {
        let tls = if use_tls {
            TlsPolicy::TrustAll
        } else {
            TlsPolicy::Verified
        };

        SessionChannel {
            endpoints: Endpoints {
                login_url: login_url.into(),
                request_url: request_url.into(),
            },
            tls,
            timeout: DEFAULT_TIMEOUT,
            observer: Arc::new(TracingObserver),
            state: Mutex::new(State::Created),
        }
    }

    pub fn with_tls_policy(mut self, tls: TlsPolicy) -> Self {
        self.tls = tls;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ExchangeObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn tls_policy(&self) -> TlsPolicy {
        self.tls
    }

    pub fn observer(&self) -> Arc<dyn ExchangeObserver> {
        Arc::clone(&self.observer)
    }

    pub fn state(&self) -> ChannelState {
        match *self.lock_state() {
            State::Created => ChannelState::Created,
            State::Started(_) => ChannelState::Started,
            State::Failed => ChannelState::Failed,
            State::Stopped => ChannelState::Stopped,
        }
    }

    /// Build the underlying client. Starting twice is a no-op.
    ///
    /// On failure the channel becomes [`ChannelState::Failed`] for good.
    pub fn start(&self) -> TransportResult<()> {
        let mut state = self.lock_state();

        match *state {
            State::Created => {}
            State::Started(_) => return Ok(()),
            State::Failed => return Err(TransportError::Unusable),
            State::Stopped => return Err(TransportError::Stopped),
        }

        match self.build_client() {
            Ok(client) => {
                *state = State::Started(client);
                Ok(())
            }
            Err(e) => {
                *state = State::Failed;
                let err = TransportError::Init(e);
                self.observer
                    .transport_failed(&self.endpoints.request_url, &err);
                Err(err)
            }
        }
    }

    /// POST the credentials to the login endpoint.
    ///
    /// Only transport failures are reported. The HTTP status and body are not
    /// inspected, so wrong credentials succeed here and show up later as
    /// [`crate::ExchangeError::Permission`] on protected requests.
    pub fn authenticate(&self, username: &str, password: &str) -> TransportResult<()> {
        let url = &self.endpoints.login_url;
        let summary = format!("{USERNAME_FIELD}={username}");

        self.post_form(
            url,
            &[(USERNAME_FIELD, username), (PASSWORD_FIELD, password)],
            &summary,
        )?;

        Ok(())
    }

    /// POST `body` as the `req` field and return the response body.
    pub fn send_raw(&self, body: &str) -> TransportResult<String> {
        let url = &self.endpoints.request_url;
        let (_, text) = self.post_form(url, &[(REQUEST_FIELD, body)], body)?;
        Ok(text)
    }

    /// Release the client. Valid in any state; stopping twice is a no-op.
    pub fn stop(&self) -> TransportResult<()> {
        let mut state = self.lock_state();
        if matches!(*state, State::Started(_)) {
            self.observer.channel_stopped(&self.endpoints.request_url);
        }
        *state = State::Stopped;
        Ok(())
    }

    fn build_client(&self) -> reqwest::Result<Client> {
        let builder = Client::builder()
            .cookie_store(true)
            .redirect(Policy::none())
            .timeout(self.timeout);

        let builder = match self.tls {
            TlsPolicy::TrustAll => builder.danger_accept_invalid_certs(true),
            TlsPolicy::Verified => builder,
        };

        builder.build()
    }

    /// Clone the started client out of the lock so sends do not serialize.
    fn client(&self) -> TransportResult<Client> {
        match &*self.lock_state() {
            State::Started(client) => Ok(client.clone()),
            State::Created => Err(TransportError::NotStarted),
            State::Failed => Err(TransportError::Unusable),
            State::Stopped => Err(TransportError::Stopped),
        }
    }

    fn post_form(
        &self,
        url: &str,
        fields: &[(&str, &str)],
        summary: &str,
    ) -> TransportResult<(u16, String)> {
        let client = self.client()?;

        self.observer.request_sent(url, summary);

        let result = client.post(url).form(&fields).send().and_then(|response| {
            let status = response.status().as_u16();
            response.text().map(|text| (status, text))
        });

        match result {
            Ok((status, text)) => {
                self.observer.response_received(url, status, &text);
                Ok((status, text))
            }
            Err(e) => {
                let err = TransportError::from_reqwest(url, e);
                self.observer.transport_failed(url, &err);
                Err(err)
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for SessionChannel {
    fn send_raw(&self, body: &str) -> TransportResult<String> {
        SessionChannel::send_raw(self, body)
    }
}

impl Drop for SessionChannel {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        *state = State::Stopped;
    }
}

impl std::fmt::Debug for SessionChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionChannel")
            .field("endpoints", &self.endpoints)
            .field("tls", &self.tls)
            .field("timeout", &self.timeout)
            .field("state", &self.state())
            .finish()
    }
}
