// Copyright 2025 the Octant Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error taxonomy for pool allocators.

use core::fmt;

/// Errors produced by [`crate::IndexPool`] and [`crate::AabbPool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoolError {
    /// The pool has no free slots: the free-list is empty and the bump
    /// counter has reached capacity.
    CapacityExceeded,
    /// An index passed to `release` was out of `[0, capacity)`, or a slot
    /// that is already free was released a second time.
    InvalidIndex,
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded => f.write_str("pool capacity exceeded"),
            Self::InvalidIndex => f.write_str("invalid or already-released index"),
        }
    }
}

impl core::error::Error for PoolError {}
