// Copyright 2025 the Octant Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error taxonomy for the octree and the sweep processor.

use core::fmt;

use octant_index::PoolError;

/// Errors produced by [`crate::Octree`] operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OctreeError {
    /// The node pool ran out of slots, either for a single node or for the
    /// eight consecutive slots a subdivision needs.
    CapacityExceeded,
    /// A leaf could not be subdivided into a placement for an inserted
    /// object: every child rejected it and the leaf was already at its
    /// per-node object capacity. This happens when several objects share
    /// (or nearly share) the same AABB and keep straddling every subdivision
    /// the leaf is given.
    DegenerateInsert,
}

impl fmt::Display for OctreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded => f.write_str("node pool capacity exceeded"),
            Self::DegenerateInsert => {
                f.write_str("insert could not be placed even after subdividing")
            }
        }
    }
}

impl core::error::Error for OctreeError {}

impl From<PoolError> for OctreeError {
    fn from(_: PoolError) -> Self {
        Self::CapacityExceeded
    }
}

/// Errors produced by [`crate::SweepProcessor`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SweepError {
    /// `sweep` was called before `init`.
    NotInitialized,
    /// The underlying octree or pool reported an error while the sweep
    /// processed its object batch.
    Octree(OctreeError),
}

impl fmt::Display for SweepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => f.write_str("sweep called before init"),
            Self::Octree(e) => write!(f, "octree error during sweep: {e}"),
        }
    }
}

impl core::error::Error for SweepError {}

impl From<OctreeError> for SweepError {
    fn from(e: OctreeError) -> Self {
        Self::Octree(e)
    }
}

impl From<PoolError> for SweepError {
    fn from(e: PoolError) -> Self {
        Self::Octree(OctreeError::from(e))
    }
}
