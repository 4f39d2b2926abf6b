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

//! K-minimum-values sketch for distinct counting and set similarity.
//!
//! A [`KmvSketch`] keeps the `k` smallest distinct hash values of a stream.
//! From the k-th order statistic it estimates the stream's distinct count;
//! from a synchronized walk of two sketches it estimates their Jaccard
//! distance. Sketches built over the same `(k, space_size, seed)` merge
//! losslessly, and every sketch round-trips through the flat binary format
//! described in the serialization module.
//!
//! # Usage
//!
//! ```rust
//! use kminhash::kmv::SketchPool;
//!
//! let pool = SketchPool::new();
//!
//! let mut left = pool.acquire(128, 1_000_000, 42)?;
//! let mut right = pool.acquire(128, 1_000_000, 42)?;
//! for value in 0u32..2000 {
//!     left.add(value);
//!     right.add(value + 1000);
//! }
//!
//! let combined = left.merge(&right, &pool)?;
//! assert!(combined.cardinality() > left.cardinality());
//!
//! let distance = left.distance(&right)?;
//! assert!(distance > 0.0 && distance <= 1.0);
//!
//! pool.release(left);
//! pool.release(right);
//! pool.release(combined);
//! # Ok::<(), kminhash::error::Error>(())
//! ```

mod buffer;
pub(crate) mod pool;
pub(crate) mod serialization;
mod sketch;

pub use self::buffer::BufferPool;
pub use self::buffer::SerializedSketch;
pub use self::pool::POOLED_MAX_K;
pub use self::pool::SketchPool;
pub use self::sketch::KmvSketch;

/// Default sketch capacity for embedders that do not choose their own.
pub const DEFAULT_K: u32 = 400;

/// Default hash-space modulus: the full 32-bit co-domain.
pub const DEFAULT_SPACE_SIZE: u32 = 0xFFFF_FFFF;
