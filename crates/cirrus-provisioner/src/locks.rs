use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slots = HashMap<String, Arc<AsyncMutex<()>>>;

/// Per-name lock arena
///
/// Each name maps to its own async mutex, created on first use. Entries are
/// reference-counted by the guards and waiters that hold them and removed
/// once the last one is gone, so the map only holds names with a create in
/// flight.
#[derive(Default)]
pub struct NameLocks {
    slots: Mutex<Slots>,
}

impl NameLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `name`.
    ///
    /// Dropping the returned future while it waits releases its claim on the
    /// entry as well.
    pub async fn lock(&self, name: &str) -> NameGuard<'_> {
        let (slot, mutex) = {
            let mut slots = self.slots();
            let mutex = slots.entry(name.to_string()).or_default().clone();
            let slot = SlotRef {
                locks: self,
                name: name.to_string(),
                mutex: Some(mutex.clone()),
            };
            (slot, mutex)
        };

        let guard = mutex.lock_owned().await;

        NameGuard {
            _guard: guard,
            _slot: slot,
        }
    }

    /// Number of names currently held or waited on
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slots(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A claim on an arena entry. Removes the entry when it is the last claim.
struct SlotRef<'a> {
    locks: &'a NameLocks,
    name: String,
    mutex: Option<Arc<AsyncMutex<()>>>,
}

impl Drop for SlotRef<'_> {
    fn drop(&mut self) {
        let mut slots = self.locks.slots();
        drop(self.mutex.take());

        // Claims are only taken under the map lock and every other reference
        // belongs to a live claim, so a count of one means nobody holds or
        // waits on this name
        if slots
            .get(&self.name)
            .is_some_and(|m| Arc::strong_count(m) == 1)
        {
            slots.remove(&self.name);
        }
    }
}

/// Exclusive access to one name. Released on drop.
pub struct NameGuard<'a> {
    // Field order matters: the mutex is unlocked before the claim is released
    _guard: OwnedMutexGuard<()>,
    _slot: SlotRef<'a>,
}
