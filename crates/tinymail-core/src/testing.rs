//! Scripted in-memory [`MailApi`] for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::{
    Account, AccountMailbox, MailApi, MailError, MailboxListing, MessageBody, MessageSummary,
    OutgoingMessage, Result, Session, Uid,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Account,
    Mailbox(String),
    Messages(String, Vec<Uid>),
    Message(String, Uid),
    Send(OutgoingMessage),
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Failure {
    Transport,
    Status(u16),
}

/// Parks every call between "request issued" and "response arrived".
#[derive(Debug, Default)]
pub(crate) struct Hold {
    pub(crate) entered: Notify,
    pub(crate) release: Notify,
}

#[derive(Debug)]
pub(crate) struct FakeApi {
    mailboxes: Mutex<Vec<String>>,
    listings: Mutex<HashMap<String, MailboxListing>>,
    missing: Mutex<HashSet<Uid>>,
    calls: Mutex<Vec<Call>>,
    failure: Mutex<Option<Failure>>,
    hold: Mutex<Option<Arc<Hold>>>,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            mailboxes: Mutex::new(vec!["INBOX".to_string()]),
            listings: Mutex::default(),
            missing: Mutex::default(),
            calls: Mutex::default(),
            failure: Mutex::default(),
            hold: Mutex::default(),
        }
    }
}

impl FakeApi {
    pub(crate) fn set_mailboxes(&self, names: &[&str]) {
        *self.mailboxes.lock().unwrap() = names.iter().map(|n| n.to_string()).collect();
    }

    pub(crate) fn set_listing(&self, name: &str, mut listing: MailboxListing) {
        listing.name = name.to_string();
        self.listings
            .lock()
            .unwrap()
            .insert(name.to_string(), listing);
    }

    /// UIDs the batch endpoint silently omits, as if expunged server-side.
    pub(crate) fn set_missing(&self, uids: impl IntoIterator<Item = Uid>) {
        *self.missing.lock().unwrap() = uids.into_iter().collect();
    }

    pub(crate) fn fail_with(&self, failure: Option<Failure>) {
        *self.failure.lock().unwrap() = failure;
    }

    pub(crate) fn hold(&self) -> Arc<Hold> {
        let hold = Arc::new(Hold::default());
        *self.hold.lock().unwrap() = Some(hold.clone());
        hold
    }

    pub(crate) fn unhold(&self) {
        *self.hold.lock().unwrap() = None;
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    async fn enter(&self, call: Call) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        let hold = self.hold.lock().unwrap().clone();
        if let Some(hold) = hold {
            hold.entered.notify_one();
            hold.release.notified().await;
        }
        let failure = *self.failure.lock().unwrap();
        match failure {
            Some(Failure::Transport) => Err(MailError::Transport("connection reset".to_string())),
            Some(Failure::Status(status)) => Err(MailError::Status {
                endpoint: "fake".to_string(),
                status,
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MailApi for FakeApi {
    async fn account(&self, _session: &Session) -> Result<Account> {
        self.enter(Call::Account).await?;
        let mailboxes = self
            .mailboxes
            .lock()
            .unwrap()
            .iter()
            .map(|name| AccountMailbox { name: name.clone() })
            .collect();
        Ok(Account { mailboxes })
    }

    async fn mailbox(&self, _session: &Session, name: &str) -> Result<MailboxListing> {
        self.enter(Call::Mailbox(name.to_string())).await?;
        let listing = self.listings.lock().unwrap().get(name).cloned();
        listing.ok_or(MailError::Status {
            endpoint: format!("/api/mailbox/{}", name),
            status: 500,
        })
    }

    async fn messages(
        &self,
        _session: &Session,
        mailbox: &str,
        uids: &[Uid],
    ) -> Result<Vec<MessageSummary>> {
        self.enter(Call::Messages(mailbox.to_string(), uids.to_vec()))
            .await?;
        let missing = self.missing.lock().unwrap().clone();
        Ok(uids
            .iter()
            .copied()
            .filter(|uid| !missing.contains(uid))
            .map(summary)
            .collect())
    }

    async fn message(&self, _session: &Session, mailbox: &str, uid: Uid) -> Result<MessageBody> {
        self.enter(Call::Message(mailbox.to_string(), uid)).await?;
        Ok(MessageBody {
            uid,
            from: sender(uid),
            subject: format!("Message {}", uid),
            body: format!("Body of message {}", uid),
            seen: false,
        })
    }

    async fn send(&self, _session: &Session, message: &OutgoingMessage) -> Result<()> {
        self.enter(Call::Send(message.clone())).await
    }
}

pub(crate) fn sender(uid: Uid) -> String {
    format!("sender{}@example.com", uid)
}

pub(crate) fn summary(uid: Uid) -> MessageSummary {
    MessageSummary {
        uid,
        from: sender(uid),
        subject: format!("Message {}", uid),
        seen: false,
    }
}

pub(crate) fn summaries(uids: impl IntoIterator<Item = Uid>) -> Vec<MessageSummary> {
    uids.into_iter().map(summary).collect()
}

/// Listing with every UID of `uids` and summaries for `loaded`.
pub(crate) fn listing(
    uids: impl IntoIterator<Item = Uid>,
    loaded: impl IntoIterator<Item = Uid>,
) -> MailboxListing {
    MailboxListing {
        name: String::new(),
        uids: uids.into_iter().collect(),
        messages: summaries(loaded),
    }
}
