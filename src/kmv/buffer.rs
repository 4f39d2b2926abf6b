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

//! Pooled byte buffers for sketch serialization.
//!
//! Same claim discipline as the sketch pool: a fixed number of pre-sized
//! buffers, one non-blocking pass to claim one, heap fallback otherwise.
//! Every encoded blob carries its origin tag so [`BufferPool::release`]
//! routes it correctly without comparing addresses.

use std::sync::Mutex;
use std::sync::PoisonError;

use crate::error::Error;
use crate::kmv::pool::POOLED_MAX_K;
use crate::kmv::serialization::HASH_SIZE_BYTES;
use crate::kmv::serialization::HEADER_SIZE_BYTES;

/// Capacity of each pooled buffer: the largest encoding a pooled sketch can
/// produce.
pub(crate) const POOLED_BUFFER_BYTES: usize =
    HEADER_SIZE_BYTES + HASH_SIZE_BYTES * POOLED_MAX_K as usize;

/// Number of buffers in a pool constructed with [`BufferPool::new`].
pub(crate) const DEFAULT_BUFFER_SLOTS: usize = 4;

/// Where a serialization buffer's storage came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BufferOrigin {
    Pooled(usize),
    Heap,
}

/// An encoded sketch blob, owned by the caller until released.
///
/// Produced by [`KmvSketch::serialize`](crate::kmv::KmvSketch::serialize).
/// Hand it back through [`BufferPool::release`] when done; dropping it
/// instead forfeits a pooled buffer for the pool's lifetime.
#[derive(Debug)]
pub struct SerializedSketch {
    bytes: Vec<u8>,
    origin: BufferOrigin,
}

impl SerializedSketch {
    pub(crate) fn from_raw_parts(bytes: Vec<u8>, origin: BufferOrigin) -> Self {
        Self { bytes, origin }
    }

    pub(crate) fn into_raw_parts(self) -> (Vec<u8>, BufferOrigin) {
        (self.bytes, self.origin)
    }

    /// The encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length of the encoding in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the encoding is empty (never true for a valid blob).
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl AsRef<[u8]> for SerializedSketch {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Fixed-size pool of serialization buffers.
///
/// Shared by reference across threads like
/// [`SketchPool`](crate::kmv::SketchPool).
#[derive(Debug)]
pub struct BufferPool {
    slots: Vec<Mutex<Option<Vec<u8>>>>,
}

impl BufferPool {
    /// Create a pool with the default number of buffers.
    pub fn new() -> Self {
        Self::with_slots(DEFAULT_BUFFER_SLOTS)
    }

    /// Create a pool with `slots` pre-allocated buffers.
    pub fn with_slots(slots: usize) -> Self {
        let slots = (0..slots)
            .map(|_| Mutex::new(Some(Vec::with_capacity(POOLED_BUFFER_BYTES))))
            .collect();
        Self { slots }
    }

    /// Acquire a cleared buffer able to hold `size` bytes.
    ///
    /// Pooled when `size` fits a pool buffer and a slot is free; otherwise a
    /// heap vector tagged as such.
    pub(crate) fn acquire(&self, size: usize) -> Result<(Vec<u8>, BufferOrigin), Error> {
        if size <= POOLED_BUFFER_BYTES {
            if let Some(claimed) = self.claim() {
                return Ok(claimed);
            }
        }

        let mut bytes = Vec::new();
        bytes.try_reserve_exact(size).map_err(|err| {
            Error::allocation_failed("serialization buffer unavailable")
                .with_context("size", size)
                .set_source(err)
        })?;
        Ok((bytes, BufferOrigin::Heap))
    }

    /// Return a blob's buffer to the pool.
    ///
    /// Pooled buffers are cleared and made claimable again; heap buffers are
    /// freed. Consumes the blob, so it cannot be released twice.
    pub fn release(&self, blob: SerializedSketch) {
        let (mut bytes, origin) = blob.into_raw_parts();
        if let BufferOrigin::Pooled(slot) = origin {
            bytes.clear();
            if let Some(cell) = self.slots.get(slot) {
                let mut guard = cell.lock().unwrap_or_else(PoisonError::into_inner);
                *guard = Some(bytes);
            }
        }
    }

    fn claim(&self) -> Option<(Vec<u8>, BufferOrigin)> {
        for (index, slot) in self.slots.iter().enumerate() {
            let Ok(mut guard) = slot.try_lock() else {
                continue;
            };
            if let Some(bytes) = guard.take() {
                return Some((bytes, BufferOrigin::Pooled(index)));
            }
        }
        None
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pooled_then_heap_fallback() {
        let pool = BufferPool::with_slots(1);

        let (first, first_origin) = pool.acquire(64).unwrap();
        let (second, second_origin) = pool.acquire(64).unwrap();

        assert_eq!(first_origin, BufferOrigin::Pooled(0));
        assert_eq!(second_origin, BufferOrigin::Heap);

        pool.release(SerializedSketch::from_raw_parts(first, first_origin));
        pool.release(SerializedSketch::from_raw_parts(second, second_origin));

        let (_, reclaimed_origin) = pool.acquire(64).unwrap();
        assert_eq!(reclaimed_origin, BufferOrigin::Pooled(0));
    }

    #[test]
    fn test_oversize_request_goes_to_heap() {
        let pool = BufferPool::with_slots(4);
        let (bytes, origin) = pool.acquire(POOLED_BUFFER_BYTES + 1).unwrap();
        assert_eq!(origin, BufferOrigin::Heap);
        assert!(bytes.capacity() > POOLED_BUFFER_BYTES);
    }
}
