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

//! A k-minimum-values (KMV) sketch for cardinality and Jaccard distance
//! estimation over integer streams.
//!
//! A [`kmv::KmvSketch`] retains the `k` smallest distinct hash values
//! observed in a stream. The k-th order statistic of those hashes yields a
//! distinct-count estimate; a synchronized walk of two sketches yields an
//! approximate Jaccard distance. Sketches built independently over the same
//! parameters can be merged, and every sketch has a compact flat binary
//! encoding whose cardinality can be computed without a full decode.
//!
//! Sketch storage and serialization buffers are drawn from fixed-size pools
//! ([`kmv::SketchPool`], [`kmv::BufferPool`]) with non-blocking claims and a
//! heap fallback, so the crate can back per-group aggregate accumulators
//! inside a database without blocking concurrent callers.
//!
//! # Usage
//!
//! ```rust
//! use kminhash::hash::DEFAULT_SEED;
//! use kminhash::kmv::BufferPool;
//! use kminhash::kmv::KmvSketch;
//! use kminhash::kmv::SketchPool;
//!
//! let pool = SketchPool::new();
//! let buffers = BufferPool::new();
//!
//! let mut sketch = pool.acquire(128, u32::MAX, DEFAULT_SEED)?;
//! for value in 0u32..10_000 {
//!     sketch.add(value);
//! }
//! assert!(sketch.cardinality() > 0.0);
//!
//! let blob = sketch.serialize(&buffers)?;
//! let restored = KmvSketch::deserialize(blob.as_bytes(), &pool)?;
//! assert_eq!(restored.count(), sketch.count());
//!
//! buffers.release(blob);
//! pool.release(restored);
//! pool.release(sketch);
//! # Ok::<(), kminhash::error::Error>(())
//! ```

pub mod error;
pub mod hash;
pub mod kmv;
