//! Client-side mailbox synchronisation for the tinymail web API.
//!
//! The crate keeps a per-mailbox cache of fetched message summaries plus the
//! cursor of identifiers still to fetch, and guards every network operation
//! with a non-queueing gate so overlapping requests cannot corrupt it.

use std::fmt;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use serde::{Deserialize, Deserializer, Serialize};

mod app;
mod cache;
mod compose;
mod config;
mod error;
mod gate;
mod reader;
mod sync;
#[cfg(test)]
mod testing;

pub use app::{AppView, MailClient, OpenMessage};
pub use cache::{Mailbox, MailboxCache, MailboxView};
pub use compose::{ComposeSession, Draft, DraftState};
pub use config::{ClientConfig, DEFAULT_PAGE_SIZE};
pub use error::{MailError, Result};
pub use gate::{GateGuard, GateRegistry, LockState, Outcome, ResourceId};
pub use reader::read_message;
pub use sync::Synchronizer;

/// Server-assigned identifier of a message within one mailbox.
pub type Uid = u32;

/// Authenticated identity plus the header value attached to every request.
///
/// Built once at login and never modified afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    identity: String,
    auth_header: String,
}

impl Session {
    pub fn new(identity: impl Into<String>, auth_header: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            auth_header: auth_header.into(),
        }
    }

    /// HTTP Basic credentials, `Basic base64(identity:password)`.
    pub fn basic(identity: &str, password: &str) -> Self {
        let credentials = BASE64_STANDARD.encode(format!("{}:{}", identity, password));
        Self::new(identity, format!("Basic {}", credentials))
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn auth_header(&self) -> &str {
        &self.auth_header
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity)
            .field("auth_header", &"<redacted>")
            .finish()
    }
}

/// `GET /api/account` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub mailboxes: Vec<AccountMailbox>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMailbox {
    pub name: String,
}

/// `GET /api/mailbox/{name}` payload: every UID in server order plus the
/// summaries the server chose to include up front.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxListing {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub uids: Vec<Uid>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub messages: Vec<MessageSummary>,
}

/// Summary row for the message list. Only `seen` changes after fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSummary {
    pub uid: Uid,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub seen: bool,
}

/// Full message for the reading pane. Never merged back into the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    #[serde(default)]
    pub uid: Uid,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub seen: bool,
}

/// `POST /api/send` request body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Transport for the tinymail REST endpoints.
#[async_trait]
pub trait MailApi: Send + Sync {
    async fn account(&self, session: &Session) -> Result<Account>;
    async fn mailbox(&self, session: &Session, name: &str) -> Result<MailboxListing>;
    async fn messages(
        &self,
        session: &Session,
        mailbox: &str,
        uids: &[Uid],
    ) -> Result<Vec<MessageSummary>>;
    async fn message(&self, session: &Session, mailbox: &str, uid: Uid) -> Result<MessageBody>;
    async fn send(&self, session: &Session, message: &OutgoingMessage) -> Result<()>;
}

// The server encodes empty Go slices as `null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
