//! Non-queueing mutual exclusion for named resources.
//!
//! A gate admits at most one in-flight operation per resource. A second
//! request while the gate is held is refused immediately; nothing waits.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceId {
    Mailbox(String),
    MessagePane,
    Draft(u64),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockState {
    pub locked: bool,
}

/// Mapping from resource identity to its lock flag.
///
/// Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct GateRegistry {
    states: Arc<Mutex<HashMap<ResourceId, LockState>>>,
}

impl GateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` without side effects when `resource` is already locked.
    pub fn try_acquire(&self, resource: &ResourceId) -> bool {
        let mut states = self.states();
        let state = states.entry(resource.clone()).or_default();
        if state.locked {
            return false;
        }
        state.locked = true;
        true
    }

    pub fn release(&self, resource: &ResourceId) {
        if let Some(state) = self.states().get_mut(resource) {
            state.locked = false;
        }
    }

    pub fn state(&self, resource: &ResourceId) -> LockState {
        self.states().get(resource).copied().unwrap_or_default()
    }

    pub fn is_locked(&self, resource: &ResourceId) -> bool {
        self.state(resource).locked
    }

    /// Scoped acquisition: the returned guard releases the gate when dropped,
    /// including on early return, panic, or when the owning future is dropped.
    pub fn try_lock(&self, resource: ResourceId) -> Option<GateGuard> {
        if !self.try_acquire(&resource) {
            log::debug!("gate busy: {:?}", resource);
            return None;
        }
        Some(GateGuard {
            registry: self.clone(),
            resource,
        })
    }

    fn states(&self) -> MutexGuard<'_, HashMap<ResourceId, LockState>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[must_use = "dropping the guard releases the gate immediately"]
#[derive(Debug)]
pub struct GateGuard {
    registry: GateRegistry,
    resource: ResourceId,
}

impl GateGuard {
    pub fn resource(&self) -> &ResourceId {
        &self.resource
    }
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.registry.release(&self.resource);
    }
}

/// Result of a gated operation. `Busy` means the request was dropped because
/// the resource already had an operation in flight; it is not an error.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Done(T),
    Busy,
}

impl<T> Outcome<T> {
    pub fn is_busy(&self) -> bool {
        matches!(self, Outcome::Busy)
    }

    pub fn done(self) -> Option<T> {
        match self {
            Outcome::Done(value) => Some(value),
            Outcome::Busy => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Done(value) => Outcome::Done(f(value)),
            Outcome::Busy => Outcome::Busy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{GateRegistry, Outcome, ResourceId};

    fn inbox() -> ResourceId {
        ResourceId::Mailbox("INBOX".to_string())
    }

    #[test]
    fn acquire_refuses_while_locked() {
        let gates = GateRegistry::new();
        assert!(gates.try_acquire(&inbox()));
        assert!(!gates.try_acquire(&inbox()));
        gates.release(&inbox());
        assert!(gates.try_acquire(&inbox()));
    }

    #[test]
    fn release_is_unconditional() {
        let gates = GateRegistry::new();
        gates.release(&inbox());
        gates.release(&inbox());
        assert!(!gates.is_locked(&inbox()));
    }

    #[test]
    fn resources_are_independent() {
        let gates = GateRegistry::new();
        assert!(gates.try_acquire(&inbox()));
        assert!(gates.try_acquire(&ResourceId::Mailbox("Sent".to_string())));
        assert!(gates.try_acquire(&ResourceId::MessagePane));
        assert!(gates.try_acquire(&ResourceId::Draft(1)));
        assert!(!gates.try_acquire(&ResourceId::Draft(1)));
        assert!(gates.try_acquire(&ResourceId::Draft(2)));
    }

    #[test]
    fn guard_releases_on_drop() {
        let gates = GateRegistry::new();
        let guard = gates.try_lock(inbox());
        assert!(guard.is_some());
        assert!(gates.try_lock(inbox()).is_none());
        drop(guard);
        assert!(!gates.is_locked(&inbox()));
    }

    #[test]
    fn guard_releases_on_panic() {
        let gates = GateRegistry::new();
        let shared = gates.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = shared.try_lock(inbox());
            panic!("boom");
        }));
        assert!(result.is_err());
        assert!(!gates.is_locked(&inbox()));
    }

    #[test]
    fn outcome_helpers() {
        let done: Outcome<u32> = Outcome::Done(2);
        assert_eq!(done.clone().map(|v| v * 2), Outcome::Done(4));
        assert_eq!(done.done(), Some(2));
        assert!(Outcome::<u32>::Busy.is_busy());
    }
}
