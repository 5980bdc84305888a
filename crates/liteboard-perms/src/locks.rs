//! Per-key async locks for grant mutation.
//!
//! One slot per `(user, content_type, action)` key. Multi-key acquisitions
//! always take keys in ascending order, so two callers can never wait on each
//! other in a cycle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use liteboard_core::GrantKey;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Slot count above which idle slots are dropped on the next acquisition.
const PRUNE_THRESHOLD: usize = 1024;

type Slot = Arc<AsyncMutex<()>>;

#[derive(Default)]
pub struct KeyedLocks {
    slots: Mutex<HashMap<GrantKey, Slot>>,
}

/// Holds every lock of one acquisition until dropped.
pub struct KeyGuard {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock every key in `keys`. Duplicates are folded.
    pub async fn lock(&self, keys: &[GrantKey]) -> KeyGuard {
        let mut keys = keys.to_vec();
        keys.sort();
        keys.dedup();

        let slots: Vec<Slot> = {
            // The map only holds Arcs, so a poisoned lock leaves it consistent
            let mut map = self.slots.lock().unwrap_or_else(|p| p.into_inner());
            if map.len() > PRUNE_THRESHOLD {
                map.retain(|_, slot| Arc::strong_count(slot) > 1);
            }
            keys.iter()
                .map(|key| Arc::clone(map.entry(*key).or_default()))
                .collect()
        };

        let mut guards = Vec::with_capacity(slots.len());
        for slot in slots {
            guards.push(slot.lock_owned().await);
        }
        KeyGuard { _guards: guards }
    }

    /// Number of allocated slots.
    pub fn len(&self) -> usize {
        self.slots.lock().map(|m| m.len()).unwrap_or_else(|p| p.into_inner().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use liteboard_core::{Action, ContentType, UserId};
    use std::time::Duration;

    fn key(user: i64, action: Action) -> GrantKey {
        GrantKey::new(UserId(user), ContentType::Project, action)
    }

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = Arc::new(KeyedLocks::new());
        let guard = locks.lock(&[key(1, Action::Read)]).await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _g = locks.lock(&[key(1, Action::Read)]).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _read = locks.lock(&[key(1, Action::Read)]).await;
        let _other_user = locks.lock(&[key(2, Action::Read)]).await;
        let _write = locks.lock(&[key(1, Action::Write)]).await;
        assert_eq!(locks.len(), 3);
    }

    #[tokio::test]
    async fn test_overlapping_sets_in_any_order() {
        let locks = Arc::new(KeyedLocks::new());
        let forward = [key(1, Action::Read), key(1, Action::Write), key(1, Action::Admin)];
        let backward = [key(1, Action::Admin), key(1, Action::Write), key(1, Action::Read)];

        let mut tasks = Vec::new();
        for i in 0..16 {
            let locks = Arc::clone(&locks);
            let keys = if i % 2 == 0 { forward } else { backward };
            tasks.push(tokio::spawn(async move {
                let _g = locks.lock(&keys).await;
                tokio::task::yield_now().await;
            }));
        }
        for task in tasks {
            tokio::time::timeout(Duration::from_secs(5), task)
                .await
                .expect("lock acquisition deadlocked")
                .unwrap();
        }
    }
}
