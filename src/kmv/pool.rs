// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Pooled backing storage for sketch instances.
//!
//! A [`SketchPool`] pre-allocates a small, fixed number of hash arrays sized
//! for capacities up to [`POOLED_MAX_K`]. Acquiring a sketch claims one of
//! them with a single non-blocking pass over the slots; when every slot is
//! taken, or the requested capacity exceeds the pooled size, storage comes
//! from the heap instead. The pool-vs-heap origin travels inside the sketch
//! as an explicit tag, so release never has to guess where storage came from.

use std::sync::Mutex;
use std::sync::PoisonError;

use crate::error::Error;
use crate::kmv::KmvSketch;

/// Largest sketch capacity served from pooled storage.
///
/// Sketches with `k` above this are always heap-allocated.
pub const POOLED_MAX_K: u32 = 1024;

/// Number of slots in a pool constructed with [`SketchPool::new`].
pub(crate) const DEFAULT_POOL_SLOTS: usize = 4;

/// Hash-array storage with its ownership tag.
///
/// `Pooled` storage remembers the slot it was claimed from so
/// [`SketchPool::release`] can return it there.
#[derive(Debug)]
pub(crate) enum HashStorage {
    Pooled { slot: usize, hashes: Vec<u32> },
    Heap { hashes: Vec<u32> },
}

impl HashStorage {
    pub(crate) fn hashes(&self) -> &[u32] {
        match self {
            HashStorage::Pooled { hashes, .. } | HashStorage::Heap { hashes } => hashes,
        }
    }

    pub(crate) fn hashes_mut(&mut self) -> &mut Vec<u32> {
        match self {
            HashStorage::Pooled { hashes, .. } | HashStorage::Heap { hashes } => hashes,
        }
    }
}

/// Fixed-size pool of pre-allocated sketch storage.
///
/// Construct one pool per embedding context and share it by reference; all
/// methods take `&self` and are safe to call from multiple threads. A claim
/// is one `try_lock` per slot and never blocks: contended or empty slots are
/// skipped and the acquire falls through to the heap.
///
/// # Examples
///
/// ```
/// # use kminhash::kmv::SketchPool;
/// let pool = SketchPool::new();
/// let mut sketch = pool.acquire(128, 1000, 42)?;
/// sketch.add(7);
/// pool.release(sketch);
/// # Ok::<(), kminhash::error::Error>(())
/// ```
#[derive(Debug)]
pub struct SketchPool {
    slots: Vec<Mutex<Option<Vec<u32>>>>,
}

impl SketchPool {
    /// Create a pool with the default number of slots.
    pub fn new() -> Self {
        Self::with_slots(DEFAULT_POOL_SLOTS)
    }

    /// Create a pool with `slots` pre-allocated hash arrays.
    pub fn with_slots(slots: usize) -> Self {
        let slots = (0..slots)
            .map(|_| Mutex::new(Some(Vec::with_capacity(POOLED_MAX_K as usize))))
            .collect();
        Self { slots }
    }

    /// Acquire an empty sketch with the given parameters.
    ///
    /// Pooled storage is used when `k <= POOLED_MAX_K` and a slot is free;
    /// otherwise storage is heap-allocated, sized exactly for `k`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::AllocationFailed`](crate::error::ErrorKind) when
    /// the heap fallback cannot reserve storage.
    ///
    /// # Panics
    ///
    /// Panics if `k` or `space_size` is zero. Argument validation is the
    /// embedding layer's responsibility; zero values here are programming
    /// errors, not recoverable conditions.
    pub fn acquire(&self, k: u32, space_size: u32, seed: u32) -> Result<KmvSketch, Error> {
        assert!(k >= 1, "k must be at least 1, got {k}");
        assert!(space_size >= 1, "space_size must be at least 1, got {space_size}");

        let storage = if k <= POOLED_MAX_K {
            match self.claim() {
                Some(storage) => storage,
                None => Self::heap_storage(k)?,
            }
        } else {
            Self::heap_storage(k)?
        };

        Ok(KmvSketch::from_raw_parts(k, space_size, seed, storage))
    }

    /// Return a sketch's storage to the pool.
    ///
    /// Pooled storage is cleared and made claimable again; heap storage is
    /// freed. Release consumes the sketch, so a released sketch cannot be
    /// used or released twice.
    pub fn release(&self, sketch: KmvSketch) {
        if let HashStorage::Pooled { slot, mut hashes } = sketch.into_storage() {
            hashes.clear();
            if let Some(cell) = self.slots.get(slot) {
                let mut guard = cell.lock().unwrap_or_else(PoisonError::into_inner);
                *guard = Some(hashes);
            }
        }
    }

    /// One non-blocking pass over the slots, claiming the first free one.
    fn claim(&self) -> Option<HashStorage> {
        for (index, slot) in self.slots.iter().enumerate() {
            let Ok(mut guard) = slot.try_lock() else {
                continue;
            };
            if let Some(hashes) = guard.take() {
                return Some(HashStorage::Pooled {
                    slot: index,
                    hashes,
                });
            }
        }
        None
    }

    fn heap_storage(k: u32) -> Result<HashStorage, Error> {
        let mut hashes = Vec::new();
        hashes.try_reserve_exact(k as usize).map_err(|err| {
            Error::allocation_failed("sketch storage unavailable")
                .with_context("k", k)
                .set_source(err)
        })?;
        Ok(HashStorage::Heap { hashes })
    }
}

impl Default for SketchPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pooled_then_heap_fallback() {
        let pool = SketchPool::with_slots(2);

        let a = pool.acquire(16, 1000, 42).unwrap();
        let b = pool.acquire(16, 1000, 42).unwrap();
        let c = pool.acquire(16, 1000, 42).unwrap();

        assert!(matches!(a.storage(), HashStorage::Pooled { .. }));
        assert!(matches!(b.storage(), HashStorage::Pooled { .. }));
        assert!(matches!(c.storage(), HashStorage::Heap { .. }));

        pool.release(a);
        pool.release(b);
        pool.release(c);
    }

    #[test]
    fn test_release_makes_slot_claimable_again() {
        let pool = SketchPool::with_slots(1);

        let first = pool.acquire(8, 1000, 42).unwrap();
        pool.release(first);

        let second = pool.acquire(8, 1000, 42).unwrap();
        assert!(matches!(second.storage(), HashStorage::Pooled { slot: 0, .. }));
        pool.release(second);
    }

    #[test]
    fn test_oversize_k_goes_to_heap() {
        let pool = SketchPool::with_slots(4);
        let sketch = pool.acquire(POOLED_MAX_K + 1, u32::MAX, 42).unwrap();
        assert!(matches!(sketch.storage(), HashStorage::Heap { .. }));
        pool.release(sketch);
    }

    #[test]
    fn test_released_storage_is_empty() {
        let pool = SketchPool::with_slots(1);

        let mut sketch = pool.acquire(8, 1000, 42).unwrap();
        for value in 0..20 {
            sketch.add(value);
        }
        pool.release(sketch);

        let reused = pool.acquire(8, 1000, 42).unwrap();
        assert_eq!(reused.count(), 0);
        pool.release(reused);
    }
}
