// Copyright 2025 the Octant Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A fixed-capacity LIFO free-list over plain integer indices.

use alloc::vec::Vec;
use core::fmt;

use crate::error::PoolError;

/// A fixed-capacity free-list of indices in `[0, capacity)`.
///
/// Constructed full: every index is available to [`acquire`][Self::acquire]
/// immediately. There is no backing storage here beyond the free-list
/// itself — this is the primitive other pools (e.g. [`crate::AabbPool`])
/// build slot recycling on top of.
pub struct IndexPool {
    capacity: u32,
    free_list: Vec<u32>,
}

impl IndexPool {
    /// Create a pool of `capacity` indices, all initially available.
    pub fn new(capacity: u32) -> Self {
        let free_list: Vec<u32> = (0..capacity).rev().collect();
        Self {
            capacity,
            free_list,
        }
    }

    /// Total number of indices this pool was constructed with.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of indices currently available to [`acquire`][Self::acquire].
    #[inline]
    pub fn available(&self) -> u32 {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "free_list.len() is bounded by capacity, which is itself a u32."
        )]
        {
            self.free_list.len() as u32
        }
    }

    /// Pop an available index, or `None` if the pool is exhausted.
    #[inline]
    pub fn acquire(&mut self) -> Option<u32> {
        self.free_list.pop()
    }

    /// Return `i` to the pool.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidIndex`] if `i` is outside `[0, capacity)`,
    /// and [`PoolError::CapacityExceeded`] if the free-list is already full
    /// (which guards against double-releasing an index: since the pool
    /// starts full, any release that would push the free-list past capacity
    /// means more indices have been released than were ever acquired).
    pub fn release(&mut self, i: u32) -> Result<(), PoolError> {
        if i >= self.capacity {
            return Err(PoolError::InvalidIndex);
        }
        if self.available() >= self.capacity {
            return Err(PoolError::CapacityExceeded);
        }
        self.free_list.push(i);
        Ok(())
    }
}

impl fmt::Debug for IndexPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexPool")
            .field("capacity", &self.capacity)
            .field("available", &self.available())
            .finish()
    }
}
