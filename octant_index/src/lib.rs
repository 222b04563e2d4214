// Copyright 2025 the Octant Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flat-buffer numeric kernels and pool allocators for a dynamic AABB
//! spatial index.
//!
//! This crate carries no tree structure of its own — that lives in
//! `octant_tree`, built on top of it. What's here is the reusable bottom
//! layer:
//!
//! - [`kernel`]: branchless ray–AABB intersection, AABB–AABB overlap,
//!   AABB union/expand, and 3-vector helpers, all operating on raw `f32`
//!   slices at caller-supplied offsets rather than on dedicated geometry
//!   types, so a hot loop never has to round-trip through a struct.
//! - [`IndexPool`]: a fixed-capacity LIFO free-list over plain integer
//!   indices.
//! - [`AabbPool`]: a fixed-capacity pool of 6-float AABB records with bump
//!   allocation and slot reuse, backed by a [`SharedBuffer`].
//! - [`SharedBuffer`]: a reference-counted flat `f32` buffer, modeling the
//!   shared-memory region two cooperating pool handles (e.g. a sweep
//!   processor and the thread that queues work for it) write into under a
//!   single-writer-at-a-time discipline enforced by the host, not by this
//!   type.
//!
//! # Features
//!
//! By default this crate links `std` and uses `f32::sqrt` for the one
//! kernel that needs a square root ([`kernel::vec3_distance`]). Building
//! with `default-features = false, features = ["libm"]` keeps the crate
//! `no_std` and routes that same kernel through the `libm` crate instead.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod aabb_pool;
mod error;
mod index_pool;
pub mod kernel;
mod shared;

pub use aabb_pool::AabbPool;
pub use error::PoolError;
pub use index_pool::IndexPool;
pub use shared::SharedBuffer;
