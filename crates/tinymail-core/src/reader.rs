use crate::{GateGuard, MailApi, MailError, Mailbox, MessageBody, ResourceId, Result, Session, Uid};

/// Fetches one message body and flips its cached summary to seen.
///
/// The seen flag is set locally once the body arrives and is never
/// re-confirmed with the server. On failure the summary is left untouched.
pub async fn read_message<A: MailApi + ?Sized>(
    api: &A,
    session: &Session,
    mailbox: &Mailbox,
    uid: Uid,
    gate: &GateGuard,
) -> Result<MessageBody> {
    debug_assert_eq!(gate.resource(), &ResourceId::MessagePane);

    if !mailbox.cache().contains(uid) {
        return Err(MailError::UnknownMessage {
            mailbox: mailbox.name().to_string(),
            uid,
        });
    }

    let body = match api.message(session, mailbox.name(), uid).await {
        Ok(body) => body,
        Err(err) => {
            log::warn!("fetching {}/{} failed: {}", mailbox.name(), uid, err);
            return Err(err);
        }
    };

    mailbox.cache().mark_seen(uid);
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::read_message;
    use crate::testing::{FakeApi, Failure, listing};
    use crate::{GateRegistry, MailError, Mailbox, ResourceId, Session};

    fn loaded_mailbox() -> Mailbox {
        let mailbox = Mailbox::new("INBOX");
        mailbox.cache().populate(listing(1..=3, 1..=3));
        mailbox
    }

    #[tokio::test]
    async fn read_returns_body_and_marks_seen() -> anyhow::Result<()> {
        let api = FakeApi::default();
        let session = Session::basic("me@example.com", "pw");
        let gates = GateRegistry::new();
        let mailbox = loaded_mailbox();
        let gate = gates
            .try_lock(ResourceId::MessagePane)
            .ok_or_else(|| anyhow::anyhow!("pane busy"))?;

        let body = read_message(&api, &session, &mailbox, 2, &gate).await?;
        assert_eq!(body.subject, "Message 2");
        assert_eq!(body.from, "sender2@example.com");
        assert!(mailbox.cache().summary(2).is_some_and(|m| m.seen));
        assert!(mailbox.cache().summary(1).is_some_and(|m| !m.seen));
        Ok(())
    }

    #[tokio::test]
    async fn failed_read_leaves_seen_unchanged() -> anyhow::Result<()> {
        let api = FakeApi::default();
        let session = Session::basic("me@example.com", "pw");
        let gates = GateRegistry::new();
        let mailbox = loaded_mailbox();
        let gate = gates
            .try_lock(ResourceId::MessagePane)
            .ok_or_else(|| anyhow::anyhow!("pane busy"))?;

        api.fail_with(Some(Failure::Status(502)));
        let err = read_message(&api, &session, &mailbox, 2, &gate)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(502));
        assert!(mailbox.cache().summary(2).is_some_and(|m| !m.seen));
        Ok(())
    }

    #[tokio::test]
    async fn unloaded_uid_is_rejected_without_fetch() -> anyhow::Result<()> {
        let api = FakeApi::default();
        let session = Session::basic("me@example.com", "pw");
        let gates = GateRegistry::new();
        let mailbox = loaded_mailbox();
        let gate = gates
            .try_lock(ResourceId::MessagePane)
            .ok_or_else(|| anyhow::anyhow!("pane busy"))?;

        let err = read_message(&api, &session, &mailbox, 42, &gate)
            .await
            .unwrap_err();
        assert!(matches!(err, MailError::UnknownMessage { uid: 42, .. }));
        assert!(api.calls().is_empty());
        Ok(())
    }
}
