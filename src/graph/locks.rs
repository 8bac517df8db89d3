//! Per-element commit serialization.
//!
//! Commits to one element must not interleave their read-fold-write cycles.
//! Each `(element type, id)` hashes onto one of a fixed set of async mutex
//! stripes; two elements may share a stripe, which only costs parallelism.
//! A commit holds at most one stripe at a time.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tokio::sync::{Mutex, MutexGuard};

use crate::model::ElementType;

const STRIPES: usize = 64;

pub(crate) struct ElementLocks {
    stripes: Vec<Mutex<()>>,
}

impl ElementLocks {
    pub(crate) fn new() -> Self {
        Self { stripes: (0..STRIPES).map(|_| Mutex::new(())).collect() }
    }

    fn stripe(&self, element_type: ElementType, id: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        element_type.hash(&mut hasher);
        id.hash(&mut hasher);
        (hasher.finish() % self.stripes.len() as u64) as usize
    }

    pub(crate) async fn lock(&self, element_type: ElementType, id: &str) -> MutexGuard<'_, ()> {
        self.stripes[self.stripe(element_type, id)].lock().await
    }
}
