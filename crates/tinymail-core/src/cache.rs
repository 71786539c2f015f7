use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::{MailboxListing, MessageSummary, ResourceId, Uid};

/// Per-mailbox cache: summaries already fetched plus the ordered remainder
/// of UIDs still to fetch (the pagination cursor).
///
/// `pending` and the UIDs of `loaded` are kept disjoint. A UID only ever
/// moves from `pending` to `loaded`.
#[derive(Debug, Clone, Default)]
pub struct MailboxCache {
    pending: Vec<Uid>,
    loaded: Vec<MessageSummary>,
    loaded_uids: HashSet<Uid>,
    is_loaded: bool,
}

impl MailboxCache {
    pub fn is_loaded(&self) -> bool {
        self.is_loaded
    }

    pub fn pending(&self) -> &[Uid] {
        &self.pending
    }

    pub fn loaded(&self) -> &[MessageSummary] {
        &self.loaded
    }

    pub fn has_more(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn summary(&self, uid: Uid) -> Option<&MessageSummary> {
        self.loaded.iter().find(|msg| msg.uid == uid)
    }

    pub fn contains(&self, uid: Uid) -> bool {
        self.loaded_uids.contains(&uid)
    }

    /// Seeds the cache from the initial listing and reconciles it.
    pub(crate) fn populate(&mut self, listing: MailboxListing) {
        self.pending = listing.uids;
        self.loaded.clear();
        self.loaded_uids.clear();
        self.push_loaded(listing.messages);
        self.is_loaded = true;
        self.reconcile();
    }

    /// Drops from the cursor every UID that is already loaded. Idempotent.
    pub fn reconcile(&mut self) {
        let loaded = &self.loaded_uids;
        self.pending.retain(|uid| !loaded.contains(uid));
    }

    /// The next `page_size` UIDs of the cursor, front first.
    pub(crate) fn next_batch(&self, page_size: usize) -> Vec<Uid> {
        self.pending.iter().take(page_size).copied().collect()
    }

    /// Appends a fetched batch in response order and advances the cursor.
    /// Returns how many summaries were new.
    pub(crate) fn append_batch(&mut self, summaries: Vec<MessageSummary>) -> usize {
        let added = self.push_loaded(summaries);
        self.reconcile();
        added
    }

    /// Optimistically marks a loaded message as seen.
    pub(crate) fn mark_seen(&mut self, uid: Uid) -> bool {
        match self.loaded.iter_mut().find(|msg| msg.uid == uid) {
            Some(msg) => {
                msg.seen = true;
                true
            }
            None => false,
        }
    }

    fn push_loaded(&mut self, summaries: Vec<MessageSummary>) -> usize {
        let mut added = 0;
        for summary in summaries {
            if !self.loaded_uids.insert(summary.uid) {
                log::debug!("skipping duplicate summary for uid {}", summary.uid);
                continue;
            }
            self.loaded.push(summary);
            added += 1;
        }
        added
    }
}

/// What the message list renders for one mailbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailboxView {
    pub name: String,
    pub messages: Vec<MessageSummary>,
    pub has_more: bool,
}

#[derive(Debug)]
pub struct Mailbox {
    name: String,
    cache: Mutex<MailboxCache>,
}

impl Mailbox {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cache: Mutex::new(MailboxCache::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resource(&self) -> ResourceId {
        ResourceId::Mailbox(self.name.clone())
    }

    /// Short critical section over the cache. Never hold it across an await.
    pub fn cache(&self) -> MutexGuard<'_, MailboxCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn view(&self) -> MailboxView {
        let cache = self.cache();
        MailboxView {
            name: self.name.clone(),
            messages: cache.loaded().to_vec(),
            has_more: cache.has_more(),
        }
    }
}
