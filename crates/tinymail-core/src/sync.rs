use crate::{ClientConfig, GateGuard, MailApi, Mailbox, MailboxView, Result, Session};

/// Drives the initial listing fetch and incremental paging of one mailbox.
///
/// Every operation takes the mailbox's [`GateGuard`] as proof that the caller
/// holds the gate. The cache lock is only taken between awaits, so each
/// mutation is atomic with respect to the rest of the program.
pub struct Synchronizer<'a, A: ?Sized> {
    api: &'a A,
    session: &'a Session,
    page_size: usize,
}

impl<'a, A: MailApi + ?Sized> Synchronizer<'a, A> {
    pub fn new(api: &'a A, session: &'a Session, config: &ClientConfig) -> Self {
        Self {
            api,
            session,
            page_size: config.page_size(),
        }
    }

    /// Fetches the listing on first open, then reconciles the cursor.
    ///
    /// A failed listing leaves the mailbox unloaded so the next open retries.
    pub async fn open(&self, mailbox: &Mailbox, gate: &GateGuard) -> Result<MailboxView> {
        debug_assert_eq!(gate.resource(), &mailbox.resource());

        let is_loaded = mailbox.cache().is_loaded();
        if !is_loaded {
            let listing = match self.api.mailbox(self.session, mailbox.name()).await {
                Ok(listing) => listing,
                Err(err) => {
                    log::warn!("listing {} failed: {}", mailbox.name(), err);
                    return Err(err);
                }
            };
            log::debug!(
                "listing {}: {} uids, {} summaries",
                mailbox.name(),
                listing.uids.len(),
                listing.messages.len()
            );
            mailbox.cache().populate(listing);
        }

        mailbox.cache().reconcile();
        Ok(mailbox.view())
    }

    /// Fetches the next page of summaries from the front of the cursor.
    ///
    /// No-op when the cursor is empty. Nothing is mutated when the fetch fails.
    pub async fn load_more(&self, mailbox: &Mailbox, gate: &GateGuard) -> Result<MailboxView> {
        debug_assert_eq!(gate.resource(), &mailbox.resource());

        let batch = mailbox.cache().next_batch(self.page_size);
        if batch.is_empty() {
            return Ok(mailbox.view());
        }

        let summaries = match self.api.messages(self.session, mailbox.name(), &batch).await {
            Ok(summaries) => summaries,
            Err(err) => {
                log::warn!(
                    "fetching {} summaries from {} failed: {}",
                    batch.len(),
                    mailbox.name(),
                    err
                );
                return Err(err);
            }
        };

        let added = mailbox.cache().append_batch(summaries);
        log::debug!(
            "{}: loaded {} of {} requested",
            mailbox.name(),
            added,
            batch.len()
        );
        Ok(mailbox.view())
    }
}
