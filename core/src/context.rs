//! The application context: one owner for the session, the item list, the
//! transport and the persistent store.
//!
//! # Design
//! Operations are methods on `AppContext` taking `&mut self`, so the session
//! and the item list have exactly one writer at a time. Every request goes
//! through `dispatch`, the single place that decides what a 401 does to the
//! session.

use tracing::{debug, warn};

use crate::client::LostFoundClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, Transport};
use crate::item::Item;
use crate::response::{classify, Envelope};
use crate::session::Session;
use crate::storage::{FileStorage, Storage, TOKEN_KEY};
use crate::transport::UreqTransport;
use crate::types::User;

/// What a 401 response does to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OnUnauthorized {
    /// Tear the session down.
    Logout,
    /// Leave it alone; used by the login and register calls.
    Ignore,
}

pub struct AppContext<T, S> {
    pub(crate) client: LostFoundClient,
    pub(crate) transport: T,
    pub(crate) storage: S,
    pub(crate) session: Session,
    pub(crate) items: Vec<Item>,
}

impl AppContext<UreqTransport, FileStorage> {
    /// Wire the default transport and file-backed store, then restore any
    /// persisted session.
    pub fn from_config(config: &ClientConfig) -> Self {
        let mut context = AppContext::new(
            LostFoundClient::new(&config.api_url),
            UreqTransport::new(),
            FileStorage::open(&config.state_file),
        );
        context.initialize_auth();
        context
    }
}

impl<T: Transport, S: Storage> AppContext<T, S> {
    /// A context with an empty session. Call `initialize_auth` to restore a
    /// persisted one.
    pub fn new(client: LostFoundClient, transport: T, storage: S) -> Self {
        Self {
            client,
            transport,
            storage,
            session: Session::default(),
            items: Vec::new(),
        }
    }

    pub fn client(&self) -> &LostFoundClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn current_user(&self) -> Option<&User> {
        self.session.user.as_ref()
    }

    /// True iff a user is loaded and a non-empty token is stored.
    pub fn is_logged_in(&self) -> bool {
        self.session.user.is_some() && self.token().is_some()
    }

    /// The stored bearer token, if any.
    pub fn token(&self) -> Option<String> {
        self.storage.get(TOKEN_KEY).filter(|t| !t.is_empty())
    }

    /// The shared item list, most recent first after a create.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub(crate) fn require_token(&self) -> Result<String, ApiError> {
        self.token().ok_or(ApiError::NotLoggedIn)
    }

    /// Execute `request`, classify the response, and apply the 401 policy.
    pub(crate) fn dispatch(
        &mut self,
        request: HttpRequest,
        on_unauthorized: OnUnauthorized,
    ) -> Result<Envelope, ApiError> {
        debug!(method = request.method.as_str(), url = %request.url, "sending request");

        let response = self.transport.execute(&request).map_err(|e| {
            warn!(url = %request.url, error = ?e, "backend unreachable");
            e
        })?;

        match classify(&response) {
            Ok(envelope) => Ok(envelope),
            Err(ApiError::Unauthorized) if on_unauthorized == OnUnauthorized::Logout => {
                warn!(url = %request.url, "token rejected, clearing session");
                self.logout();
                Err(ApiError::Unauthorized)
            }
            Err(e) => {
                warn!(url = %request.url, status = response.status, error = %e, "request failed");
                Err(e)
            }
        }
    }
}
