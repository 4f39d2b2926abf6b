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

//! K-minimum-values sketch implementation.

use std::cmp::Ordering;

use crate::error::Error;
use crate::hash::hash32;
use crate::kmv::pool::HashStorage;
use crate::kmv::pool::SketchPool;

/// A bounded k-minimum-values sketch.
///
/// The sketch retains the `k` smallest distinct hash values observed so
/// far, stored in strictly descending order so that `hashes[0]` is the k-th
/// order statistic once the sketch is saturated. Acquire instances from a
/// [`SketchPool`] and return them with [`SketchPool::release`].
///
/// Two sketches are compatible for [`merge`](Self::merge) and
/// [`distance`](Self::distance) only when they agree on `k`, `space_size`,
/// and `seed`.
#[derive(Debug)]
pub struct KmvSketch {
    k: u32,
    space_size: u32,
    seed: u32,
    storage: HashStorage,
}

impl KmvSketch {
    pub(crate) fn from_raw_parts(
        k: u32,
        space_size: u32,
        seed: u32,
        storage: HashStorage,
    ) -> Self {
        Self {
            k,
            space_size,
            seed,
            storage,
        }
    }

    pub(crate) fn storage(&self) -> &HashStorage {
        &self.storage
    }

    pub(crate) fn storage_mut(&mut self) -> &mut HashStorage {
        &mut self.storage
    }

    pub(crate) fn into_storage(self) -> HashStorage {
        self.storage
    }

    /// Capacity `k`, fixed at acquisition.
    pub fn k(&self) -> u32 {
        self.k
    }

    /// Hash co-domain modulus; stored hashes are in `[0, space_size)`.
    pub fn space_size(&self) -> u32 {
        self.space_size
    }

    /// Hash seed, fixed at acquisition.
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Number of hashes currently stored.
    pub fn count(&self) -> u32 {
        self.storage.hashes().len() as u32
    }

    /// Whether no value has been observed yet.
    pub fn is_empty(&self) -> bool {
        self.storage.hashes().is_empty()
    }

    /// Whether the sketch holds `k` hashes; further additions may replace
    /// members but cannot grow the count.
    pub fn is_saturated(&self) -> bool {
        self.count() == self.k
    }

    /// The stored hashes, strictly descending.
    pub fn hashes(&self) -> &[u32] {
        self.storage.hashes()
    }

    /// Iterator over the stored hashes in descending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.storage.hashes().iter().copied()
    }

    /// Observe a value.
    ///
    /// The value is hashed into `[0, space_size)`; a hash already present is
    /// ignored, so duplicate observations never change the sketch. Otherwise
    /// the hash is kept if it is among the `k` smallest seen so far,
    /// evicting the current largest retained hash when the sketch is
    /// saturated.
    ///
    /// # Examples
    ///
    /// ```
    /// # use kminhash::kmv::SketchPool;
    /// let pool = SketchPool::new();
    /// let mut sketch = pool.acquire(10, 1000, 42)?;
    /// sketch.add(100);
    /// sketch.add(200);
    /// sketch.add(100);
    /// assert_eq!(sketch.count(), 2);
    /// # pool.release(sketch);
    /// # Ok::<(), kminhash::error::Error>(())
    /// ```
    pub fn add(&mut self, value: u32) {
        let hash = hash32(value, self.seed) % self.space_size;
        let k = self.k as usize;
        let hashes = self.storage.hashes_mut();

        // Position of `hash` in the descending sequence.
        let position = match hashes.binary_search_by(|probe| hash.cmp(probe)) {
            Ok(_) => return,
            Err(position) => position,
        };

        if hashes.len() < k {
            hashes.insert(position, hash);
            return;
        }

        // Saturated. hashes[0] is the largest retained value; anything at or
        // above it is not among the k smallest.
        if position == 0 {
            return;
        }
        hashes.remove(0);
        hashes.insert(position - 1, hash);
    }

    /// Estimate the number of distinct values observed.
    ///
    /// An unsaturated sketch has seen fewer distinct hashes than `k` and
    /// reports its exact count. A saturated sketch extrapolates from the
    /// k-th order statistic: `space_size * (k - 1) / (hashes[0] + 1)`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use kminhash::kmv::SketchPool;
    /// let pool = SketchPool::new();
    /// let sketch = pool.acquire(10, 1000, 42)?;
    /// assert_eq!(sketch.cardinality(), 0.0);
    /// # pool.release(sketch);
    /// # Ok::<(), kminhash::error::Error>(())
    /// ```
    pub fn cardinality(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            return 0.0;
        }
        if count < self.k {
            return f64::from(count);
        }
        let kth_smallest = self.hashes()[0];
        f64::from(self.space_size) * f64::from(self.k - 1) / (f64::from(kth_smallest) + 1.0)
    }

    /// Merge two sketches into a fresh one acquired from `pool`.
    ///
    /// Both inputs are read-only; the result holds the `k` smallest distinct
    /// hashes across both.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::IncompatibleSketch`](crate::error::ErrorKind)
    /// when the sketches differ in `k`, `space_size`, or `seed`, and
    /// [`ErrorKind::AllocationFailed`](crate::error::ErrorKind) when the
    /// pool's heap fallback cannot allocate the result.
    ///
    /// # Examples
    ///
    /// ```
    /// # use kminhash::kmv::SketchPool;
    /// let pool = SketchPool::new();
    /// let mut a = pool.acquire(10, 1000, 42)?;
    /// let mut b = pool.acquire(10, 1000, 42)?;
    /// a.add(1);
    /// b.add(2);
    /// let merged = a.merge(&b, &pool)?;
    /// assert_eq!(merged.count(), 2);
    /// # pool.release(a);
    /// # pool.release(b);
    /// # pool.release(merged);
    /// # Ok::<(), kminhash::error::Error>(())
    /// ```
    pub fn merge(&self, other: &KmvSketch, pool: &SketchPool) -> Result<KmvSketch, Error> {
        self.check_compatible(other, "merge")?;

        let mut result = pool.acquire(self.k, self.space_size, self.seed)?;
        let k = self.k as usize;
        let merged = result.storage_mut().hashes_mut();

        // Walk both descending sequences tail-first (smallest values first),
        // taking the smaller head and collapsing ties, until the result is
        // full or both inputs are exhausted.
        let mut low_a = self.hashes().iter().rev().peekable();
        let mut low_b = other.hashes().iter().rev().peekable();
        while merged.len() < k {
            let hash = match (low_a.peek(), low_b.peek()) {
                (None, None) => break,
                (Some(&&a), None) => {
                    low_a.next();
                    a
                }
                (None, Some(&&b)) => {
                    low_b.next();
                    b
                }
                (Some(&&a), Some(&&b)) => match a.cmp(&b) {
                    Ordering::Less => {
                        low_a.next();
                        a
                    }
                    Ordering::Greater => {
                        low_b.next();
                        b
                    }
                    Ordering::Equal => {
                        low_a.next();
                        low_b.next();
                        a
                    }
                },
            };
            merged.push(hash);
        }
        merged.reverse();

        Ok(result)
    }

    /// Approximate Jaccard distance between the sets behind two sketches.
    ///
    /// Walks both descending sequences in lockstep for at most `k`
    /// comparisons and reports `1 - matches / compared`. Two empty sketches
    /// are maximally dissimilar by convention and have distance `1.0`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::IncompatibleSketch`](crate::error::ErrorKind)
    /// when the sketches differ in `k`, `space_size`, or `seed`.
    pub fn distance(&self, other: &KmvSketch) -> Result<f64, Error> {
        self.check_compatible(other, "distance")?;

        let a = self.hashes();
        let b = other.hashes();
        let mut i = 0;
        let mut j = 0;
        let mut matches = 0u32;
        let mut compared = 0u32;

        while i < a.len() && j < b.len() && compared < self.k {
            match a[i].cmp(&b[j]) {
                Ordering::Equal => {
                    matches += 1;
                    i += 1;
                    j += 1;
                }
                Ordering::Greater => i += 1,
                Ordering::Less => j += 1,
            }
            compared += 1;
        }

        if compared == 0 {
            return Ok(1.0);
        }
        Ok(1.0 - f64::from(matches) / f64::from(compared))
    }

    fn check_compatible(&self, other: &KmvSketch, operation: &'static str) -> Result<(), Error> {
        if self.k != other.k || self.space_size != other.space_size || self.seed != other.seed {
            return Err(Error::incompatible(format!(
                "{operation} requires matching k, space_size, and seed"
            ))
            .with_context("left_k", self.k)
            .with_context("right_k", other.k)
            .with_context("left_space_size", self.space_size)
            .with_context("right_space_size", other.space_size)
            .with_context("left_seed", self.seed)
            .with_context("right_seed", other.seed));
        }
        Ok(())
    }
}
