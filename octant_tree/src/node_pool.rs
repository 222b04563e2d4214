// Copyright 2025 the Octant Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A flat, bump-only pool of fixed-stride octree node records.

use core::fmt;

use octant_index::{PoolError, SharedBuffer};

/// Default number of inline object slots per node (`K`).
pub const DEFAULT_MAX_OBJECTS_PER_NODE: u32 = 8;

/// Number of fixed fields preceding a node's inline object slots:
/// 6 AABB floats, `firstChild`, `parent`, `objectCount`.
const FIXED_FIELDS: u32 = 9;

const AABB_MIN_X: usize = 0;
const FIRST_CHILD: usize = 6;
const PARENT: usize = 7;
const OBJECT_COUNT: usize = 8;

/// A fixed-capacity bump allocator over fixed-stride octree node records.
///
/// Each record is `9 + k` floats: a 6-float AABB, a `firstChild` index (`-1`
/// if the node is a leaf), a `parent` index (`-1` for the root), an
/// `objectCount`, and `k` inline object-index slots. There is no free-list:
/// nodes are never individually released, only reclaimed in bulk by
/// [`reset`][Self::reset], matching the index's no-rebalancing,
/// no-node-recycling design.
pub struct NodePool {
    capacity: u32,
    max_objects_per_node: u32,
    stride: u32,
    bump: u32,
    buffer: SharedBuffer,
}

impl NodePool {
    /// Create a pool with the default `k = 8` inline object slots per node.
    pub fn new(capacity: u32) -> Self {
        Self::with_max_objects(capacity, DEFAULT_MAX_OBJECTS_PER_NODE)
    }

    /// Create a pool with a caller-chosen `k` inline object slots per node.
    ///
    /// # Panics
    ///
    /// Panics (via `debug_assert!`) if `max_objects_per_node` is zero.
    pub fn with_max_objects(capacity: u32, max_objects_per_node: u32) -> Self {
        debug_assert!(
            max_objects_per_node >= 1,
            "a node must hold at least one inline object"
        );
        let stride = FIXED_FIELDS + max_objects_per_node;
        let buffer = SharedBuffer::new(capacity as usize * stride as usize);
        Self {
            capacity,
            max_objects_per_node,
            stride,
            bump: 0,
            buffer,
        }
    }

    /// Create a pool over an existing buffer, e.g. one shared with a
    /// producer thread that writes or inspects node records directly.
    ///
    /// # Panics
    ///
    /// Panics if `buffer.len()` is too small for `capacity * (9 + max_objects_per_node)`,
    /// or (via `debug_assert!`) if `max_objects_per_node` is zero.
    pub fn from_shared(capacity: u32, max_objects_per_node: u32, buffer: SharedBuffer) -> Self {
        debug_assert!(
            max_objects_per_node >= 1,
            "a node must hold at least one inline object"
        );
        let stride = FIXED_FIELDS + max_objects_per_node;
        assert!(
            buffer.len() >= capacity as usize * stride as usize,
            "buffer too small for capacity"
        );
        Self {
            capacity,
            max_objects_per_node,
            stride,
            bump: 0,
            buffer,
        }
    }

    /// Maximum number of nodes this pool can hold.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// `K`: inline object slots per node.
    #[inline]
    pub fn max_objects_per_node(&self) -> u32 {
        self.max_objects_per_node
    }

    /// Number of nodes allocated since construction or the last [`reset`][Self::reset].
    #[inline]
    pub fn size(&self) -> u32 {
        self.bump
    }

    #[inline]
    fn base(&self, i: u32) -> usize {
        i as usize * self.stride as usize
    }

    /// Allocate one node, returning its index and leaving it initialized to
    /// an empty leaf: `firstChild = -1`, `parent = -1`, `objectCount = 0`.
    /// The AABB and object slots are left undefined; callers set them.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::CapacityExceeded`] if the pool is full.
    pub fn allocate(&mut self) -> Result<u32, PoolError> {
        self.allocate_contiguous(1)
    }

    /// Allocate `count` consecutive node indices, initializing each to an
    /// empty leaf. Returns the first index of the run.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::CapacityExceeded`] if fewer than `count` slots remain.
    pub fn allocate_contiguous(&mut self, count: u32) -> Result<u32, PoolError> {
        if self.bump + count > self.capacity {
            return Err(PoolError::CapacityExceeded);
        }
        let first = self.bump;
        self.bump += count;
        for offset in 0..count {
            let i = first + offset;
            self.set_first_child(i, -1);
            self.set_parent(i, -1);
            self.clear_objects(i);
        }
        Ok(first)
    }

    /// Overwrite node `i`'s AABB.
    pub fn set_aabb(&self, i: u32, min: [f32; 3], max: [f32; 3]) {
        let base = self.base(i) + AABB_MIN_X;
        self.buffer.set(base, min[0]);
        self.buffer.set(base + 1, min[1]);
        self.buffer.set(base + 2, min[2]);
        self.buffer.set(base + 3, max[0]);
        self.buffer.set(base + 4, max[1]);
        self.buffer.set(base + 5, max[2]);
    }

    /// Read node `i`'s AABB as `(min, max)`.
    pub fn get_aabb(&self, i: u32) -> ([f32; 3], [f32; 3]) {
        let base = self.base(i) + AABB_MIN_X;
        (
            [
                self.buffer.get(base),
                self.buffer.get(base + 1),
                self.buffer.get(base + 2),
            ],
            [
                self.buffer.get(base + 3),
                self.buffer.get(base + 4),
                self.buffer.get(base + 5),
            ],
        )
    }

    /// Copy node `i`'s AABB into `out` at `out_offset`, for kernels (e.g.
    /// [`octant_index::kernel::ray_intersects_aabb`]) that take a flat slice
    /// and an offset rather than a `(min, max)` pair.
    pub fn copy_aabb_into(&self, i: u32, out: &mut [f32], out_offset: usize) {
        let base = self.base(i) + AABB_MIN_X;
        for k in 0..6 {
            out[out_offset + k] = self.buffer.get(base + k);
        }
    }

    /// Set node `i`'s first-child index, or `-1` if it is a leaf.
    #[inline]
    pub fn set_first_child(&self, i: u32, value: i32) {
        self.buffer.set(self.base(i) + FIRST_CHILD, value as f32);
    }

    /// Node `i`'s first-child index, or `-1` if it is a leaf.
    #[inline]
    pub fn get_first_child(&self, i: u32) -> i32 {
        self.buffer.get(self.base(i) + FIRST_CHILD) as i32
    }

    /// Set node `i`'s parent index, or `-1` for the root.
    #[inline]
    pub fn set_parent(&self, i: u32, value: i32) {
        self.buffer.set(self.base(i) + PARENT, value as f32);
    }

    /// Node `i`'s parent index, or `-1` for the root.
    #[inline]
    pub fn get_parent(&self, i: u32) -> i32 {
        self.buffer.get(self.base(i) + PARENT) as i32
    }

    /// Number of object indices currently stored inline at node `i`.
    #[inline]
    pub fn get_object_count(&self, i: u32) -> u32 {
        self.buffer.get(self.base(i) + OBJECT_COUNT) as u32
    }

    #[inline]
    fn set_object_count(&self, i: u32, count: u32) {
        self.buffer.set(self.base(i) + OBJECT_COUNT, count as f32);
    }

    /// Append `obj` to node `i`'s inline object list.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::CapacityExceeded`] if the node already holds `K` objects.
    pub fn add_object(&self, i: u32, obj: u32) -> Result<(), PoolError> {
        let count = self.get_object_count(i);
        if count >= self.max_objects_per_node {
            return Err(PoolError::CapacityExceeded);
        }
        let slot = self.base(i) + FIXED_FIELDS as usize + count as usize;
        self.buffer.set(slot, obj as f32);
        self.set_object_count(i, count + 1);
        Ok(())
    }

    /// Read the object index stored at `slot` (`< K`) within node `i`.
    #[inline]
    pub fn get_object(&self, i: u32, slot: u32) -> u32 {
        self.buffer
            .get(self.base(i) + FIXED_FIELDS as usize + slot as usize) as u32
    }

    /// Zero node `i`'s object count. The underlying slots are left as-is
    /// until overwritten by a subsequent [`add_object`][Self::add_object].
    #[inline]
    pub fn clear_objects(&self, i: u32) {
        self.set_object_count(i, 0);
    }

    /// Remove `obj` from node `i`'s inline object list via swap-with-last.
    ///
    /// Returns whether `obj` was present.
    pub fn remove_object(&self, i: u32, obj: u32) -> bool {
        let count = self.get_object_count(i);
        let base = self.base(i) + FIXED_FIELDS as usize;
        for slot in 0..count {
            if self.buffer.get(base + slot as usize) as u32 == obj {
                let last = self.buffer.get(base + (count - 1) as usize);
                self.buffer.set(base + slot as usize, last);
                self.set_object_count(i, count - 1);
                return true;
            }
        }
        false
    }

    /// Reclaim every node allocated so far. Does not zero the backing
    /// buffer; stale records are simply unreachable until reallocated.
    pub fn reset(&mut self) {
        self.bump = 0;
    }
}

impl fmt::Debug for NodePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodePool")
            .field("capacity", &self.capacity)
            .field("max_objects_per_node", &self.max_objects_per_node)
            .field("size", &self.bump)
            .finish()
    }
}
