// Copyright 2025 the Octant Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A flat-buffer dynamic-AABB octree, built on the pools and kernels in
//! [`octant_index`].
//!
//! - [`NodePool`]: a fixed-capacity, bump-only pool of fixed-stride octree
//!   node records (AABB, parent link, first-child index, inline object
//!   slots). Nodes are never individually recycled — only a full
//!   [`NodePool::reset`] reclaims them, matching the index's
//!   no-rebalancing design.
//! - [`Octree`]: insert/update/remove, `raycast`, and `query_box`, all
//!   taking the [`octant_index::AabbPool`] and [`NodePool`] they operate on
//!   as per-call borrows rather than owned fields (see the crate's design
//!   notes on why: an `Octree` that borrowed its pools for its lifetime
//!   couldn't sit next to them inside the same owning struct without
//!   unsafe self-reference).
//! - [`SweepProcessor`]: a façade that owns a [`NodePool`], an
//!   [`octant_index::AabbPool`], and an [`Octree`] side by side, and drives
//!   them across shared AABB/ray/result buffers for an off-thread
//!   init/sweep protocol.

#![no_std]

extern crate alloc;

mod error;
mod node_pool;
mod octree;
mod sweep;

pub use error::{OctreeError, SweepError};
pub use node_pool::{NodePool, DEFAULT_MAX_OBJECTS_PER_NODE};
pub use octree::{Hit, Octree};
pub use sweep::{SweepDone, SweepParams, SweepProcessor};
