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

//! Binary serialization format for KMV sketches.
//!
//! A sketch encodes to a single flat blob; this is the crate's only wire
//! and persistence format.
//!
//! ## Blob Layout (Little Endian)
//!
//! | Offset | Field | Width |
//! |--------|-------|-------|
//! | 0 | k | 4 bytes |
//! | 4 | count | 4 bytes |
//! | 8 | space_size | 4 bytes |
//! | 12 | seed | 4 bytes |
//! | 16 | hashes\[0..count\) | 4 bytes each, in stored (descending) order |
//!
//! Total length is exactly `16 + 4 * count`. Because the stored order is
//! descending, the hash at offset 16 of a saturated blob is the k-th order
//! statistic, which lets [`KmvSketch::cardinality_from_slice`] estimate
//! cardinality from the header and a single hash read.

use byteorder::ByteOrder;
use byteorder::LittleEndian;

use crate::error::Error;
use crate::kmv::BufferPool;
use crate::kmv::KmvSketch;
use crate::kmv::SerializedSketch;
use crate::kmv::SketchPool;
use crate::kmv::pool::POOLED_MAX_K;

pub(crate) const HEADER_SIZE_BYTES: usize = 16;
pub(crate) const HASH_SIZE_BYTES: usize = 4;

const K_OFFSET: usize = 0;
const COUNT_OFFSET: usize = 4;
const SPACE_SIZE_OFFSET: usize = 8;
const SEED_OFFSET: usize = 12;

/// Upper bound on `k` accepted from a blob, an order of magnitude above the
/// pooled maximum. Larger values are treated as corruption rather than
/// honored with an enormous allocation.
pub(crate) const MAX_DESERIALIZE_K: u32 = POOLED_MAX_K * 10;

impl KmvSketch {
    /// Encode this sketch into a buffer acquired from `buffers`.
    ///
    /// The blob owns its buffer; return it with
    /// [`BufferPool::release`] when done.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::AllocationFailed`](crate::error::ErrorKind) when
    /// no pooled buffer is free and the heap fallback cannot allocate.
    ///
    /// # Examples
    ///
    /// ```
    /// # use kminhash::kmv::BufferPool;
    /// # use kminhash::kmv::SketchPool;
    /// let pool = SketchPool::new();
    /// let buffers = BufferPool::new();
    /// let mut sketch = pool.acquire(10, 1000, 42)?;
    /// sketch.add(7);
    /// let blob = sketch.serialize(&buffers)?;
    /// assert_eq!(blob.len(), 16 + 4);
    /// # buffers.release(blob);
    /// # pool.release(sketch);
    /// # Ok::<(), kminhash::error::Error>(())
    /// ```
    pub fn serialize(&self, buffers: &BufferPool) -> Result<SerializedSketch, Error> {
        let count = self.count() as usize;
        let total = HEADER_SIZE_BYTES + HASH_SIZE_BYTES * count;

        let (mut bytes, origin) = buffers.acquire(total)?;
        bytes.resize(total, 0);

        LittleEndian::write_u32(&mut bytes[K_OFFSET..K_OFFSET + 4], self.k());
        LittleEndian::write_u32(&mut bytes[COUNT_OFFSET..COUNT_OFFSET + 4], self.count());
        LittleEndian::write_u32(
            &mut bytes[SPACE_SIZE_OFFSET..SPACE_SIZE_OFFSET + 4],
            self.space_size(),
        );
        LittleEndian::write_u32(&mut bytes[SEED_OFFSET..SEED_OFFSET + 4], self.seed());
        LittleEndian::write_u32_into(self.hashes(), &mut bytes[HEADER_SIZE_BYTES..]);

        Ok(SerializedSketch::from_raw_parts(bytes, origin))
    }

    /// Decode a sketch from a blob, drawing storage from `pool`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::MalformedData`](crate::error::ErrorKind) when
    /// the blob is shorter than the header, its length disagrees with its
    /// `count`, `count` exceeds `k`, `k` is implausibly large, or `k` or
    /// `space_size` is zero. Returns
    /// [`ErrorKind::AllocationFailed`](crate::error::ErrorKind) when sketch
    /// storage cannot be allocated.
    ///
    /// # Examples
    ///
    /// ```
    /// # use kminhash::kmv::BufferPool;
    /// # use kminhash::kmv::KmvSketch;
    /// # use kminhash::kmv::SketchPool;
    /// let pool = SketchPool::new();
    /// let buffers = BufferPool::new();
    /// let mut sketch = pool.acquire(10, 1000, 42)?;
    /// sketch.add(7);
    /// let blob = sketch.serialize(&buffers)?;
    /// let restored = KmvSketch::deserialize(blob.as_bytes(), &pool)?;
    /// assert_eq!(restored.hashes(), sketch.hashes());
    /// # buffers.release(blob);
    /// # pool.release(sketch);
    /// # pool.release(restored);
    /// # Ok::<(), kminhash::error::Error>(())
    /// ```
    pub fn deserialize(bytes: &[u8], pool: &SketchPool) -> Result<KmvSketch, Error> {
        if bytes.len() < HEADER_SIZE_BYTES {
            return Err(Error::insufficient_data("blob shorter than header")
                .with_context("len", bytes.len())
                .with_context("header_len", HEADER_SIZE_BYTES));
        }

        let k = LittleEndian::read_u32(&bytes[K_OFFSET..]);
        let count = LittleEndian::read_u32(&bytes[COUNT_OFFSET..]);
        let space_size = LittleEndian::read_u32(&bytes[SPACE_SIZE_OFFSET..]);
        let seed = LittleEndian::read_u32(&bytes[SEED_OFFSET..]);

        if k == 0 || space_size == 0 {
            return Err(Error::malformed("zero k or space_size")
                .with_context("k", k)
                .with_context("space_size", space_size));
        }
        if k > MAX_DESERIALIZE_K {
            return Err(Error::malformed("implausible k")
                .with_context("k", k)
                .with_context("max_k", MAX_DESERIALIZE_K));
        }
        if count > k {
            return Err(Error::malformed("count exceeds k")
                .with_context("count", count)
                .with_context("k", k));
        }
        let expected = HEADER_SIZE_BYTES + HASH_SIZE_BYTES * count as usize;
        if bytes.len() != expected {
            return Err(Error::malformed("blob length disagrees with count")
                .with_context("len", bytes.len())
                .with_context("expected_len", expected)
                .with_context("count", count));
        }

        let mut sketch = pool.acquire(k, space_size, seed)?;
        let hashes = sketch.storage_mut().hashes_mut();
        hashes.resize(count as usize, 0);
        LittleEndian::read_u32_into(&bytes[HEADER_SIZE_BYTES..], hashes);

        Ok(sketch)
    }

    /// Estimate cardinality straight from a blob, without decoding it.
    ///
    /// Reads `k`, `count`, and `space_size` from the header; a saturated
    /// blob additionally needs only its first stored hash (the k-th order
    /// statistic, at offset 16). The result equals
    /// [`cardinality`](Self::cardinality) of the decoded sketch.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::MalformedData`](crate::error::ErrorKind) when
    /// the blob is shorter than the header, or claims saturation but is too
    /// short to hold its first hash, or claims a non-zero count with a zero
    /// `k`.
    pub fn cardinality_from_slice(bytes: &[u8]) -> Result<f64, Error> {
        if bytes.len() < HEADER_SIZE_BYTES {
            return Err(Error::insufficient_data("blob shorter than header")
                .with_context("len", bytes.len())
                .with_context("header_len", HEADER_SIZE_BYTES));
        }

        let k = LittleEndian::read_u32(&bytes[K_OFFSET..]);
        let count = LittleEndian::read_u32(&bytes[COUNT_OFFSET..]);
        let space_size = LittleEndian::read_u32(&bytes[SPACE_SIZE_OFFSET..]);

        if count == 0 {
            return Ok(0.0);
        }
        if count < k {
            return Ok(f64::from(count));
        }
        if k == 0 {
            return Err(Error::malformed("count exceeds zero capacity").with_context("count", count));
        }
        if bytes.len() < HEADER_SIZE_BYTES + HASH_SIZE_BYTES {
            return Err(Error::insufficient_data(
                "saturated blob is missing its first stored hash",
            )
            .with_context("len", bytes.len()));
        }

        let kth_smallest = LittleEndian::read_u32(&bytes[HEADER_SIZE_BYTES..]);
        Ok(f64::from(space_size) * f64::from(k - 1) / (f64::from(kth_smallest) + 1.0))
    }
}
