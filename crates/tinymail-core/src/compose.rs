use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{GateGuard, MailApi, MessageBody, OutgoingMessage, ResourceId, Result, Session};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Draft {
    pub fn new(from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            ..Self::default()
        }
    }

    /// Draft addressed back to the sender of `original`.
    pub fn reply(from: impl Into<String>, original: &MessageBody) -> Self {
        let subject = if original.subject.trim_start().to_ascii_lowercase().starts_with("re:") {
            original.subject.clone()
        } else {
            format!("Re: {}", original.subject)
        };
        Self {
            from: from.into(),
            to: original.from.clone(),
            subject,
            body: String::new(),
        }
    }

    fn outgoing(&self) -> OutgoingMessage {
        OutgoingMessage {
            from: self.from.clone(),
            to: self.to.clone(),
            subject: self.subject.clone(),
            body: self.body.clone(),
        }
    }
}

/// `Open -> Sending -> { Closed | Open }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftState {
    Open,
    Sending,
    Closed,
}

/// One compose window: a draft plus its single-shot send action.
#[derive(Debug)]
pub struct ComposeSession {
    id: u64,
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    draft: Draft,
    state: DraftState,
}

impl ComposeSession {
    pub(crate) fn new(id: u64, draft: Draft) -> Self {
        Self {
            id,
            inner: Mutex::new(Inner {
                draft,
                state: DraftState::Open,
            }),
        }
    }

    pub fn resource(&self) -> ResourceId {
        ResourceId::Draft(self.id)
    }

    pub fn state(&self) -> DraftState {
        self.inner().state
    }

    pub fn is_closed(&self) -> bool {
        self.state() == DraftState::Closed
    }

    pub fn draft(&self) -> Draft {
        self.inner().draft.clone()
    }

    /// Applies `f` to the draft. Refused unless the session is open.
    pub fn edit(&self, f: impl FnOnce(&mut Draft)) -> bool {
        let mut inner = self.inner();
        if inner.state != DraftState::Open {
            return false;
        }
        f(&mut inner.draft);
        true
    }

    /// Discards the draft. Refused while a send is in flight.
    pub fn close(&self) -> bool {
        let mut inner = self.inner();
        match inner.state {
            DraftState::Sending => false,
            DraftState::Open | DraftState::Closed => {
                inner.state = DraftState::Closed;
                inner.draft = Draft::default();
                true
            }
        }
    }

    /// Submits the draft. On success the session closes and the draft is
    /// discarded; on any failure it reopens with its fields intact.
    pub async fn send<A: MailApi + ?Sized>(
        &self,
        api: &A,
        session: &Session,
        gate: &GateGuard,
    ) -> Result<()> {
        debug_assert_eq!(gate.resource(), &self.resource());

        let outgoing = {
            let mut inner = self.inner();
            if inner.state != DraftState::Open {
                return Ok(());
            }
            inner.state = DraftState::Sending;
            inner.draft.outgoing()
        };
        let sending = SendingState { compose: self };

        match api.send(session, &outgoing).await {
            Ok(()) => {
                sending.finish(DraftState::Closed);
                log::debug!("draft {} sent", self.id);
                Ok(())
            }
            Err(err) => {
                sending.finish(DraftState::Open);
                log::warn!("sending draft {} failed: {}", self.id, err);
                Err(err)
            }
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// Returns the session to `Open` if the send future is dropped mid-flight.
struct SendingState<'a> {
    compose: &'a ComposeSession,
}

impl SendingState<'_> {
    fn finish(self, state: DraftState) {
        let mut inner = self.compose.inner();
        inner.state = state;
        if state == DraftState::Closed {
            inner.draft = Draft::default();
        }
    }
}

impl Drop for SendingState<'_> {
    fn drop(&mut self) {
        let mut inner = self.compose.inner();
        if inner.state == DraftState::Sending {
            inner.state = DraftState::Open;
        }
    }
}
