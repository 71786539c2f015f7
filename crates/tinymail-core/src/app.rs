use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::reader::read_message;
use crate::{
    ClientConfig, ComposeSession, Draft, GateRegistry, MailApi, MailError, Mailbox, MailboxView,
    MessageBody, Outcome, ResourceId, Result, Session, Synchronizer, Uid,
};

/// The message currently shown in the reading pane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenMessage {
    pub mailbox: String,
    pub uid: Uid,
    pub body: MessageBody,
}

/// Everything a renderer needs, detached from the live state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppView {
    pub identity: String,
    pub mailboxes: Vec<String>,
    pub selected: Option<MailboxView>,
    pub pane: Option<OpenMessage>,
}

/// Application state for one logged-in session.
///
/// All entry points take `&self` and can be polled concurrently. Each one
/// first acquires the gate of the resource it touches; if that gate is
/// already held the request is dropped and [`Outcome::Busy`] returned.
pub struct MailClient<A> {
    api: A,
    session: Session,
    config: ClientConfig,
    gates: GateRegistry,
    mailboxes: Vec<Mailbox>,
    selected: Mutex<Option<String>>,
    pane: Mutex<Option<OpenMessage>>,
    next_draft: AtomicU64,
}

impl<A: MailApi> MailClient<A> {
    /// Fetches the account listing and seeds the mailbox set from it.
    pub async fn login(api: A, session: Session, config: ClientConfig) -> Result<Self> {
        let account = match api.account(&session).await {
            Ok(account) => account,
            Err(err) => {
                log::warn!("login for {} failed: {}", session.identity(), err);
                return Err(err);
            }
        };
        let mailboxes: Vec<Mailbox> = account
            .mailboxes
            .into_iter()
            .map(|mailbox| Mailbox::new(mailbox.name))
            .collect();
        log::debug!(
            "logged in as {} with {} mailboxes",
            session.identity(),
            mailboxes.len()
        );
        Ok(Self {
            api,
            session,
            config,
            gates: GateRegistry::new(),
            mailboxes,
            selected: Mutex::new(None),
            pane: Mutex::new(None),
            next_draft: AtomicU64::new(1),
        })
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn gates(&self) -> &GateRegistry {
        &self.gates
    }

    pub fn mailboxes(&self) -> &[Mailbox] {
        &self.mailboxes
    }

    pub fn mailbox(&self, name: &str) -> Result<&Mailbox> {
        self.mailboxes
            .iter()
            .find(|mailbox| mailbox.name() == name)
            .ok_or_else(|| MailError::UnknownMailbox(name.to_string()))
    }

    pub fn selected(&self) -> Option<String> {
        lock(&self.selected).clone()
    }

    pub fn reading_pane(&self) -> Option<OpenMessage> {
        lock(&self.pane).clone()
    }

    /// Switches the message list to `name`, fetching its listing on first use.
    pub async fn select_mailbox(&self, name: &str) -> Result<Outcome<MailboxView>> {
        let mailbox = self.mailbox(name)?;
        let Some(gate) = self.gates.try_lock(mailbox.resource()) else {
            return Ok(Outcome::Busy);
        };

        *lock(&self.selected) = Some(name.to_string());
        // An in-flight read owns the pane and will replace it when it lands.
        if let Some(_pane) = self.gates.try_lock(ResourceId::MessagePane) {
            *lock(&self.pane) = None;
        }

        let view = self.synchronizer().open(mailbox, &gate).await?;
        Ok(Outcome::Done(view))
    }

    /// Selects the first mailbox the server listed. `None` for an account
    /// without mailboxes.
    pub async fn open_first_mailbox(&self) -> Result<Option<Outcome<MailboxView>>> {
        let Some(first) = self.mailboxes.first() else {
            return Ok(None);
        };
        Ok(Some(self.select_mailbox(first.name()).await?))
    }

    pub async fn load_more(&self, name: &str) -> Result<Outcome<MailboxView>> {
        let mailbox = self.mailbox(name)?;
        let Some(gate) = self.gates.try_lock(mailbox.resource()) else {
            return Ok(Outcome::Busy);
        };
        let view = self.synchronizer().load_more(mailbox, &gate).await?;
        Ok(Outcome::Done(view))
    }

    /// Fetches a message into the reading pane, replacing whatever was there.
    pub async fn open_message(&self, name: &str, uid: Uid) -> Result<Outcome<MessageBody>> {
        let mailbox = self.mailbox(name)?;
        let Some(gate) = self.gates.try_lock(ResourceId::MessagePane) else {
            return Ok(Outcome::Busy);
        };

        *lock(&self.pane) = None;
        let body = read_message(&self.api, &self.session, mailbox, uid, &gate).await?;
        *lock(&self.pane) = Some(OpenMessage {
            mailbox: name.to_string(),
            uid,
            body: body.clone(),
        });
        Ok(Outcome::Done(body))
    }

    pub fn compose(&self) -> ComposeSession {
        self.new_compose(Draft::new(self.session.identity()))
    }

    pub fn reply(&self, original: &MessageBody) -> ComposeSession {
        self.new_compose(Draft::reply(self.session.identity(), original))
    }

    /// Submits `compose`. `Done(())` means the session is now closed.
    pub async fn send(&self, compose: &ComposeSession) -> Result<Outcome<()>> {
        let Some(gate) = self.gates.try_lock(compose.resource()) else {
            return Ok(Outcome::Busy);
        };
        compose.send(&self.api, &self.session, &gate).await?;
        Ok(Outcome::Done(()))
    }

    pub fn view(&self) -> AppView {
        let selected = self
            .selected()
            .and_then(|name| self.mailbox(&name).ok().map(Mailbox::view));
        AppView {
            identity: self.session.identity().to_string(),
            mailboxes: self
                .mailboxes
                .iter()
                .map(|mailbox| mailbox.name().to_string())
                .collect(),
            selected,
            pane: self.reading_pane(),
        }
    }

    fn synchronizer(&self) -> Synchronizer<'_, A> {
        Synchronizer::new(&self.api, &self.session, &self.config)
    }

    fn new_compose(&self, draft: Draft) -> ComposeSession {
        let id = self.next_draft.fetch_add(1, Ordering::Relaxed);
        ComposeSession::new(id, draft)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
