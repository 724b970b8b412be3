// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory memoization of aggregation results.

use crate::store::FileId;
use ifc_takeoff_processing::MaterialGroup;
use rustc_hash::FxHashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Cache key: a summary depends on the file and on the density it was
/// computed with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SummaryKey {
    file_id: FileId,
    density_bits: u64,
}

impl SummaryKey {
    pub fn new(file_id: FileId, density: f64) -> Self {
        Self {
            file_id,
            density_bits: density.to_bits(),
        }
    }

    pub fn file_id(&self) -> &FileId {
        &self.file_id
    }

    pub fn density(&self) -> f64 {
        f64::from_bits(self.density_bits)
    }
}

/// Snapshot of a file's invalidation count, taken before computing a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheGeneration {
    epoch: u64,
    file: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: FxHashMap<SummaryKey, Arc<[MaterialGroup]>>,
    /// Bumped per file by `invalidate`
    generations: FxHashMap<FileId, u64>,
    /// Bumped by `clear`
    epoch: u64,
}

impl CacheState {
    fn generation(&self, file_id: &FileId) -> CacheGeneration {
        CacheGeneration {
            epoch: self.epoch,
            file: self.generations.get(file_id).copied().unwrap_or(0),
        }
    }
}

/// Summary cache without expiry; entries go away only through
/// [`invalidate`](SummaryCache::invalidate) or [`clear`](SummaryCache::clear).
///
/// A result computed before an invalidation is never stored after it: take a
/// [`generation`](SummaryCache::generation) before reading the inputs and hand
/// it to [`put`](SummaryCache::put).
#[derive(Debug, Default)]
pub struct SummaryCache {
    state: RwLock<CacheState>,
}

impl SummaryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &SummaryKey) -> Option<Arc<[MaterialGroup]>> {
        self.read().entries.get(key).cloned()
    }

    pub fn generation(&self, file_id: &FileId) -> CacheGeneration {
        self.read().generation(file_id)
    }

    /// Store a result computed at `generation`.
    ///
    /// Returns false (and stores nothing) when the file was invalidated in
    /// the meantime. A concurrent computation of the same key simply
    /// overwrites it.
    pub fn put(
        &self,
        key: SummaryKey,
        groups: Arc<[MaterialGroup]>,
        generation: CacheGeneration,
    ) -> bool {
        let mut state = self.write();
        if state.generation(&key.file_id) != generation {
            return false;
        }
        state.entries.insert(key, groups);
        true
    }

    /// Drop every density variant of a file; returns how many were dropped
    pub fn invalidate(&self, file_id: &FileId) -> usize {
        let mut state = self.write();
        *state.generations.entry(file_id.clone()).or_insert(0) += 1;
        let before = state.entries.len();
        state.entries.retain(|key, _| key.file_id != *file_id);
        before - state.entries.len()
    }

    pub fn clear(&self) {
        let mut state = self.write();
        state.epoch += 1;
        state.generations.clear();
        state.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
