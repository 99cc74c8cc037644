//! # Ceremony Session Store
//!
//! Holds the server-side state of every begun-but-not-finished ceremony,
//! keyed by the user's WebAuthn handle.
//!
//! ## Lifecycle
//! 1. A begin call `put`s the engine state (overwriting any older entry for
//!    the same handle: last begin wins)
//! 2. The matching finish call `take`s it, which removes it atomically
//! 3. Entries nobody finishes expire after the TTL and are dropped by `sweep`
//!
//! Only one finish can consume a given entry; a concurrent second attempt
//! sees [`AppError::NoPendingCeremony`].

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::error::{AppError, AppResult};
use crate::webauthn::types::CeremonyKind;

/// One in-flight ceremony
#[derive(Debug, Clone)]
pub struct PendingCeremony {
    pub kind: CeremonyKind,
    /// Opaque engine state from the begin call
    pub state: Vec<u8>,
    pub expires_at: DateTime<Utc>,
}

impl PendingCeremony {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Concurrent map of pending ceremonies
#[derive(Debug)]
pub struct CeremonyStore {
    pending: DashMap<String, PendingCeremony>,
    ttl: Duration,
}

impl CeremonyStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            pending: DashMap::new(),
            ttl,
        }
    }

    /// Store the state of a freshly begun ceremony for `handle`
    ///
    /// Any ceremony still pending for the same handle, of either kind, is
    /// replaced.
    pub fn put(&self, handle: &str, kind: CeremonyKind, state: Vec<u8>) {
        let pending = PendingCeremony {
            kind,
            state,
            expires_at: Utc::now() + self.ttl,
        };

        if self.pending.insert(handle.to_string(), pending).is_some() {
            tracing::debug!(?kind, "Replaced stale pending ceremony");
        }
    }

    /// Remove and return the pending state for `handle`
    ///
    /// Only an entry of the requested `kind` is consumed; a pending
    /// ceremony of the other kind is left in place. An expired entry is
    /// consumed and reported as missing.
    pub fn take(&self, handle: &str, kind: CeremonyKind) -> AppResult<Vec<u8>> {
        let (_, pending) = self
            .pending
            .remove_if(handle, |_, pending| pending.kind == kind)
            .ok_or(AppError::NoPendingCeremony)?;

        if pending.is_expired(Utc::now()) {
            tracing::debug!(?kind, "Pending ceremony expired before finish");
            return Err(AppError::NoPendingCeremony);
        }

        Ok(pending.state)
    }

    /// Drop every expired entry, returning how many were removed
    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.pending.len();
        self.pending.retain(|_, pending| !pending.is_expired(now));
        before.saturating_sub(self.pending.len())
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn store() -> CeremonyStore {
        CeremonyStore::new(Duration::minutes(5))
    }

    #[test]
    fn take_returns_what_was_put() {
        let store = store();
        store.put("h1", CeremonyKind::Registration, vec![1, 2, 3]);

        assert_eq!(store.take("h1", CeremonyKind::Registration).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn second_take_fails() {
        let store = store();
        store.put("h1", CeremonyKind::Login, vec![1]);
        store.take("h1", CeremonyKind::Login).unwrap();

        assert!(matches!(
            store.take("h1", CeremonyKind::Login),
            Err(AppError::NoPendingCeremony)
        ));
    }

    #[test]
    fn take_without_put_fails() {
        assert!(matches!(
            store().take("nobody", CeremonyKind::Registration),
            Err(AppError::NoPendingCeremony)
        ));
    }

    #[test]
    fn last_put_wins() {
        let store = store();
        store.put("h1", CeremonyKind::Registration, vec![1]);
        store.put("h1", CeremonyKind::Registration, vec![2]);

        assert_eq!(store.len(), 1);
        assert_eq!(store.take("h1", CeremonyKind::Registration).unwrap(), vec![2]);
    }

    #[test]
    fn begin_of_other_kind_replaces_pending_one() {
        let store = store();
        store.put("h1", CeremonyKind::Registration, vec![1]);
        store.put("h1", CeremonyKind::Login, vec![2]);

        assert!(store.take("h1", CeremonyKind::Registration).is_err());
        assert_eq!(store.take("h1", CeremonyKind::Login).unwrap(), vec![2]);
    }

    #[test]
    fn take_of_wrong_kind_leaves_entry_alone() {
        let store = store();
        store.put("h1", CeremonyKind::Registration, vec![1]);

        assert!(store.take("h1", CeremonyKind::Login).is_err());
        assert_eq!(store.take("h1", CeremonyKind::Registration).unwrap(), vec![1]);
    }

    #[test]
    fn handles_are_independent() {
        let store = store();
        store.put("h1", CeremonyKind::Login, vec![1]);
        store.put("h2", CeremonyKind::Login, vec![2]);

        assert_eq!(store.take("h2", CeremonyKind::Login).unwrap(), vec![2]);
        assert_eq!(store.take("h1", CeremonyKind::Login).unwrap(), vec![1]);
    }

    #[test]
    fn expired_entry_is_consumed_and_rejected() {
        let store = CeremonyStore::new(Duration::seconds(-1));
        store.put("h1", CeremonyKind::Login, vec![1]);

        assert!(matches!(
            store.take("h1", CeremonyKind::Login),
            Err(AppError::NoPendingCeremony)
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn sweep_drops_only_expired_entries() {
        let store = store();
        store.put("h1", CeremonyKind::Login, vec![1]);
        store.put("h2", CeremonyKind::Registration, vec![2]);

        assert_eq!(store.sweep(), 0);
        assert_eq!(store.len(), 2);

        let later = Utc::now() + Duration::minutes(6);
        assert_eq!(store.sweep_at(later), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn concurrent_takes_have_one_winner() {
        let store = store();
        store.put("h1", CeremonyKind::Login, vec![9]);
        let winners = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..16 {
                scope.spawn(|| {
                    if store.take("h1", CeremonyKind::Login).is_ok() {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }
}
