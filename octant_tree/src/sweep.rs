// Copyright 2025 the Octant Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An off-thread façade that keeps an octree in sync with a producer's
//! shared AABB buffer and casts a batch of rays each sweep.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use octant_index::kernel::RAY_STRIDE;
use octant_index::{AabbPool, SharedBuffer};

use crate::error::SweepError;
use crate::node_pool::NodePool;
use crate::octree::Octree;

const RESULT_STRIDE: usize = 2;
const MISS_SENTINEL: f32 = -1.0;

/// Parameters for [`SweepProcessor::init`].
///
/// The four buffers are expected to be the shared-memory regions a producer
/// thread writes AABB and ray data into and reads node/result data back
/// from, per the crate's single-writer-at-a-time cooperative protocol.
#[derive(Clone, Debug)]
pub struct SweepParams {
    /// Capacity of the AABB pool (maximum live objects).
    pub object_capacity: u32,
    /// Capacity of the node pool.
    pub node_capacity: u32,
    /// Inline object slots per node; `0` selects the default (`K = 8`).
    pub max_objects_per_node: u32,
    /// Number of rays cast per [`SweepProcessor::sweep`] call.
    pub ray_count: u32,
    /// World-space bounds of the octree's root node.
    pub world_min: [f32; 3],
    /// World-space bounds of the octree's root node.
    pub world_max: [f32; 3],
    /// Shared backing storage for AABB records.
    pub aabb_buffer: SharedBuffer,
    /// Shared backing storage for octree node records.
    pub node_buffer: SharedBuffer,
    /// Shared backing storage for ray records, `RAY_STRIDE` floats per ray.
    pub ray_buffer: SharedBuffer,
    /// Shared backing storage for hit results, two floats per ray.
    pub result_buffer: SharedBuffer,
}

/// Outcome of a completed [`SweepProcessor::sweep`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SweepDone {
    /// Number of rays cast and written to the result buffer.
    pub ray_count: u32,
}

struct SweepState {
    nodes: NodePool,
    aabbs: AabbPool,
    tree: Octree,
    ray_buffer: SharedBuffer,
    result_buffer: SharedBuffer,
    ray_count: u32,
    inserted: Vec<bool>,
}

/// A stateful sweep processor composing a [`NodePool`], an [`AabbPool`], and
/// an [`Octree`] across a shared-memory boundary.
///
/// Constructed uninitialized; [`init`][Self::init] wires it up to a
/// producer's shared buffers, and every [`sweep`][Self::sweep] afterward
/// incrementally inserts-or-updates the objects the producer has written and
/// casts the configured batch of rays.
pub struct SweepProcessor {
    state: Option<SweepState>,
}

impl SweepProcessor {
    /// Construct an uninitialized processor. [`sweep`][Self::sweep] fails
    /// with [`SweepError::NotInitialized`] until [`init`][Self::init] runs.
    pub fn new() -> Self {
        Self { state: None }
    }

    /// Build the internal node pool, AABB pool, and octree over `params`'s
    /// shared buffers.
    ///
    /// # Errors
    ///
    /// Returns a [`SweepError::Octree`] if the node pool cannot even hold a
    /// root node.
    pub fn init(&mut self, params: SweepParams) -> Result<(), SweepError> {
        let max_objects_per_node = if params.max_objects_per_node == 0 {
            crate::node_pool::DEFAULT_MAX_OBJECTS_PER_NODE
        } else {
            params.max_objects_per_node
        };

        let mut nodes =
            NodePool::from_shared(params.node_capacity, max_objects_per_node, params.node_buffer);
        let aabbs = AabbPool::from_buffer(params.object_capacity, params.aabb_buffer);
        let tree = Octree::new(
            &mut nodes,
            params.object_capacity,
            params.world_min,
            params.world_max,
        )?;

        self.state = Some(SweepState {
            nodes,
            aabbs,
            tree,
            ray_buffer: params.ray_buffer,
            result_buffer: params.result_buffer,
            ray_count: params.ray_count,
            inserted: vec![false; params.object_capacity as usize],
        });
        Ok(())
    }

    /// Whether [`init`][Self::init] has run.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.state.is_some()
    }

    /// Assume the producer has written `object_count` AABB records into the
    /// shared AABB buffer; bring the octree in sync with them (inserting
    /// objects seen for the first time, updating the rest), then cast every
    /// configured ray and write `{objectIndex, t}` (or `{-1, -1}` on a miss)
    /// into the result buffer.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::NotInitialized`] if [`init`][Self::init] has
    /// not run, or a wrapped [`crate::OctreeError`] if an insert or update fails.
    pub fn sweep(&mut self, object_count: u32) -> Result<SweepDone, SweepError> {
        let state = self.state.as_mut().ok_or(SweepError::NotInitialized)?;

        while state.aabbs.size() < object_count {
            state.aabbs.allocate()?;
        }

        for obj in 0..object_count {
            let (min, max) = state.aabbs.get_corners(obj);
            if state.inserted[obj as usize] {
                state.tree.update(&mut state.nodes, &state.aabbs, obj, min, max)?;
            } else {
                state.tree.insert(&mut state.nodes, &state.aabbs, obj)?;
                state.inserted[obj as usize] = true;
            }
        }

        let mut ray = [0.0f32; RAY_STRIDE];
        for ray_idx in 0..state.ray_count {
            let ray_offset = ray_idx as usize * RAY_STRIDE;
            for k in 0..RAY_STRIDE {
                ray[k] = state.ray_buffer.get(ray_offset + k);
            }

            let result_offset = ray_idx as usize * RESULT_STRIDE;
            match state.tree.raycast(&state.nodes, &state.aabbs, &ray, 0) {
                Some(hit) => {
                    state.result_buffer.set(result_offset, hit.object_index as f32);
                    state.result_buffer.set(result_offset + 1, hit.t);
                }
                None => {
                    state.result_buffer.set(result_offset, MISS_SENTINEL);
                    state.result_buffer.set(result_offset + 1, MISS_SENTINEL);
                }
            }
        }

        Ok(SweepDone {
            ray_count: state.ray_count,
        })
    }
}

impl Default for SweepProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SweepProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SweepProcessor")
            .field("ready", &self.is_ready())
            .finish()
    }
}
