use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, OnceLock};

use serde::Serialize;
use thiserror::Error;

/// Runtime entity id. Authored map-object ids and global ids are positive;
/// local (scratch-only) ids are negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EntityId(pub i64);

impl EntityId {
    pub fn from_map_object(id: u32) -> Self {
        Self(i64::from(id))
    }

    pub fn is_local(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IdSequenceError {
    #[error("global id sequence exhausted at {last}")]
    GlobalExhausted { last: i64 },
    #[error("local id sequence exhausted at {last}")]
    LocalExhausted { last: i64 },
}

/// Global (increasing) and local (decreasing) id sequences.
///
/// One instance is meant to outlive every environment that shares it so ids
/// stay unique across map loads. Tests inject a fresh instance.
#[derive(Debug, Default)]
pub struct IdSequences {
    global: AtomicI64,
    local: AtomicI64,
}

impl IdSequences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process() -> Arc<IdSequences> {
        static PROCESS_IDS: OnceLock<Arc<IdSequences>> = OnceLock::new();
        Arc::clone(PROCESS_IDS.get_or_init(|| Arc::new(IdSequences::new())))
    }

    /// Moves the global sequence to at least `max_authored_id`; never backwards.
    pub fn seed_global(&self, max_authored_id: i64) -> i64 {
        let previous = self.global.fetch_max(max_authored_id, Ordering::SeqCst);
        previous.max(max_authored_id)
    }

    pub fn allocate_global(&self) -> Result<EntityId, IdSequenceError> {
        self.global
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                current.checked_add(1)
            })
            .map(|previous| EntityId(previous + 1))
            .map_err(|last| IdSequenceError::GlobalExhausted { last })
    }

    pub fn allocate_local(&self) -> Result<EntityId, IdSequenceError> {
        self.local
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                current.checked_sub(1)
            })
            .map(|previous| EntityId(previous - 1))
            .map_err(|last| IdSequenceError::LocalExhausted { last })
    }

    pub fn last_global(&self) -> i64 {
        self.global.load(Ordering::SeqCst)
    }
}
