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

use kminhash::error::ErrorKind;
use kminhash::kmv::BufferPool;
use kminhash::kmv::KmvSketch;
use kminhash::kmv::SketchPool;

fn read_u32_le(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

#[test]
fn test_blob_layout() {
    let pool = SketchPool::new();
    let buffers = BufferPool::new();

    let mut sketch = pool.acquire(10, 1000, 42).unwrap();
    for i in 0..15 {
        sketch.add(i * 37);
    }

    let blob = sketch.serialize(&buffers).unwrap();
    let bytes = blob.as_bytes();

    assert_eq!(bytes.len(), 16 + 4 * sketch.count() as usize);
    assert_eq!(read_u32_le(bytes, 0), 10);
    assert_eq!(read_u32_le(bytes, 4), sketch.count());
    assert_eq!(read_u32_le(bytes, 8), 1000);
    assert_eq!(read_u32_le(bytes, 12), 42);
    for (i, &hash) in sketch.hashes().iter().enumerate() {
        assert_eq!(read_u32_le(bytes, 16 + 4 * i), hash);
    }

    buffers.release(blob);
    pool.release(sketch);
}

#[test]
fn test_round_trip() {
    let pool = SketchPool::new();
    let buffers = BufferPool::new();

    let mut sketch = pool.acquire(10, 1000, 42).unwrap();
    for i in 0..15 {
        sketch.add(i * 37);
    }

    let blob = sketch.serialize(&buffers).unwrap();
    let restored = KmvSketch::deserialize(blob.as_bytes(), &pool).unwrap();

    assert_eq!(restored.k(), sketch.k());
    assert_eq!(restored.count(), sketch.count());
    assert_eq!(restored.space_size(), sketch.space_size());
    assert_eq!(restored.seed(), sketch.seed());
    assert_eq!(restored.hashes(), sketch.hashes());

    buffers.release(blob);
    pool.release(sketch);
    pool.release(restored);
}

#[test]
fn test_empty_round_trip() {
    let pool = SketchPool::new();
    let buffers = BufferPool::new();

    let sketch = pool.acquire(5, 1000, 42).unwrap();
    let blob = sketch.serialize(&buffers).unwrap();
    assert_eq!(blob.len(), 16);

    let restored = KmvSketch::deserialize(blob.as_bytes(), &pool).unwrap();
    assert_eq!(restored.count(), 0);
    assert_eq!(restored.cardinality(), 0.0);

    buffers.release(blob);
    pool.release(sketch);
    pool.release(restored);
}

#[test]
fn test_single_hash_round_trip() {
    let pool = SketchPool::new();
    let buffers = BufferPool::new();

    let mut sketch = pool.acquire(1, 100, 42).unwrap();
    sketch.add(50);

    let blob = sketch.serialize(&buffers).unwrap();
    let restored = KmvSketch::deserialize(blob.as_bytes(), &pool).unwrap();
    assert_eq!(restored.count(), 1);
    assert_eq!(restored.hashes()[0], sketch.hashes()[0]);

    buffers.release(blob);
    pool.release(sketch);
    pool.release(restored);
}

#[test]
fn test_cardinality_from_slice_matches_saturated() {
    let pool = SketchPool::new();
    let buffers = BufferPool::new();

    let mut sketch = pool.acquire(128, 100_000, 42).unwrap();
    for value in 0..10_000 {
        sketch.add(value);
    }
    assert!(sketch.is_saturated());

    let blob = sketch.serialize(&buffers).unwrap();
    let fast = KmvSketch::cardinality_from_slice(blob.as_bytes()).unwrap();
    assert!((fast - sketch.cardinality()).abs() < 1e-6);

    buffers.release(blob);
    pool.release(sketch);
}

#[test]
fn test_cardinality_from_slice_matches_unsaturated() {
    let pool = SketchPool::new();
    let buffers = BufferPool::new();

    let mut sketch = pool.acquire(128, 100_000, 42).unwrap();
    for value in 0..50 {
        sketch.add(value);
    }
    assert!(!sketch.is_saturated());

    let blob = sketch.serialize(&buffers).unwrap();
    let fast = KmvSketch::cardinality_from_slice(blob.as_bytes()).unwrap();
    assert!((fast - sketch.cardinality()).abs() < 1e-6);

    buffers.release(blob);
    pool.release(sketch);
}

#[test]
fn test_cardinality_from_slice_empty() {
    let pool = SketchPool::new();
    let buffers = BufferPool::new();

    let sketch = pool.acquire(5, 1000, 42).unwrap();
    let blob = sketch.serialize(&buffers).unwrap();

    assert_eq!(KmvSketch::cardinality_from_slice(blob.as_bytes()).unwrap(), 0.0);

    buffers.release(blob);
    pool.release(sketch);
}

#[test]
fn test_short_blob_is_rejected() {
    let pool = SketchPool::new();

    let err = KmvSketch::deserialize(&[0u8; 4], &pool).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedData);

    let err = KmvSketch::cardinality_from_slice(&[0u8; 4]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedData);
}

#[test]
fn test_count_exceeding_k_is_rejected() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&5u32.to_le_bytes()); // k
    bytes.extend_from_slice(&6u32.to_le_bytes()); // count > k
    bytes.extend_from_slice(&1000u32.to_le_bytes()); // space_size
    bytes.extend_from_slice(&42u32.to_le_bytes()); // seed
    bytes.extend_from_slice(&[0u8; 24]); // 6 hashes

    let pool = SketchPool::new();
    let err = KmvSketch::deserialize(&bytes, &pool).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedData);
}

#[test]
fn test_implausible_k_is_rejected() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&1_000_000u32.to_le_bytes()); // k far above any pool size
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&1000u32.to_le_bytes());
    bytes.extend_from_slice(&42u32.to_le_bytes());

    let pool = SketchPool::new();
    let err = KmvSketch::deserialize(&bytes, &pool).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedData);
}

#[test]
fn test_length_mismatch_is_rejected() {
    let pool = SketchPool::new();
    let buffers = BufferPool::new();

    let mut sketch = pool.acquire(10, 1000, 42).unwrap();
    for i in 0..15 {
        sketch.add(i * 37);
    }
    let blob = sketch.serialize(&buffers).unwrap();

    // Truncating the hash section must be detected.
    let truncated = &blob.as_bytes()[..blob.len() - 4];
    let err = KmvSketch::deserialize(truncated, &pool).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedData);

    // So must trailing garbage.
    let mut extended = blob.as_bytes().to_vec();
    extended.extend_from_slice(&[0u8; 4]);
    let err = KmvSketch::deserialize(&extended, &pool).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedData);

    buffers.release(blob);
    pool.release(sketch);
}

#[test]
fn test_oversize_sketch_round_trip() {
    let pool = SketchPool::new();
    let buffers = BufferPool::new();

    // k beyond both pool slot sizes: sketch and blob take the heap path.
    let mut sketch = pool.acquire(2048, u32::MAX, 42).unwrap();
    for value in 0..5000 {
        sketch.add(value);
    }
    assert!(sketch.is_saturated());

    let blob = sketch.serialize(&buffers).unwrap();
    assert_eq!(blob.len(), 16 + 4 * 2048);

    let restored = KmvSketch::deserialize(blob.as_bytes(), &pool).unwrap();
    assert_eq!(restored.hashes(), sketch.hashes());

    let fast = KmvSketch::cardinality_from_slice(blob.as_bytes()).unwrap();
    assert!((fast - sketch.cardinality()).abs() < 1e-6);

    buffers.release(blob);
    pool.release(sketch);
    pool.release(restored);
}
