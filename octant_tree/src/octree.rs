// Copyright 2025 the Octant Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The spatial index itself: insertion, subdivision, update, removal, and
//! the ray/box query traversals.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use octant_index::kernel::{aabb_overlaps_aabb, ray_intersects_aabb, NO_HIT};
use octant_index::AabbPool;

use crate::error::OctreeError;
use crate::node_pool::NodePool;

/// Result of a successful [`Octree::raycast`]: the closest object pierced
/// and the parametric distance along the ray at which it was hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    /// Index, into the AABB pool, of the object that was hit.
    pub object_index: u32,
    /// Parametric distance along the ray to the hit surface.
    pub t: f32,
}

/// Whether `obj`'s AABB is entirely contained by `node`'s AABB, inclusive on
/// both ends per axis.
#[inline]
fn fits(node_min: [f32; 3], node_max: [f32; 3], obj_min: [f32; 3], obj_max: [f32; 3]) -> bool {
    (0..3).all(|a| obj_min[a] >= node_min[a] && obj_max[a] <= node_max[a])
}

/// A dynamic-AABB octree.
///
/// `Octree` does not own a [`NodePool`] or an [`AabbPool`]: per the crate's
/// no-self-referential-structs design, every operation borrows the pools it
/// needs for the duration of that one call. This lets a single caller (the
/// sweep processor, or any other host) own the pools and the octree side by
/// side without either owning the other.
pub struct Octree {
    root: u32,
    world_min: [f32; 3],
    world_max: [f32; 3],
    object_to_node: Vec<i32>,
    stack: Vec<u32>,
}

impl Octree {
    /// Allocate a root node in `nodes` spanning `[world_min, world_max]`, and
    /// size the object-to-node map to `object_capacity` (normally the
    /// backing [`AabbPool`]'s capacity).
    ///
    /// # Errors
    ///
    /// Returns [`OctreeError::CapacityExceeded`] if `nodes` has no room for
    /// even a single node.
    pub fn new(
        nodes: &mut NodePool,
        object_capacity: u32,
        world_min: [f32; 3],
        world_max: [f32; 3],
    ) -> Result<Self, OctreeError> {
        let root = nodes.allocate()?;
        nodes.set_aabb(root, world_min, world_max);
        Ok(Self {
            root,
            world_min,
            world_max,
            object_to_node: vec![-1; object_capacity as usize],
            stack: Vec::new(),
        })
    }

    /// Index of the root node in the backing [`NodePool`].
    #[inline]
    pub fn root(&self) -> u32 {
        self.root
    }

    /// Overwrite the root node's world bounds.
    pub fn set_bounds(&mut self, nodes: &NodePool, min: [f32; 3], max: [f32; 3]) {
        nodes.set_aabb(self.root, min, max);
        self.world_min = min;
        self.world_max = max;
    }

    /// The node currently holding `obj`, if it has been inserted.
    #[inline]
    pub fn node_of(&self, obj: u32) -> Option<u32> {
        self.object_to_node
            .get(obj as usize)
            .copied()
            .filter(|&n| n >= 0)
            .map(|n| n as u32)
    }

    /// Insert `obj` (already written into `aabbs`) into the tree.
    ///
    /// # Errors
    ///
    /// Returns [`OctreeError::CapacityExceeded`] if the node pool runs out of
    /// room, or [`OctreeError::DegenerateInsert`] if a leaf subdivision still
    /// cannot place the object (see the crate's degenerate-insert policy).
    pub fn insert(
        &mut self,
        nodes: &mut NodePool,
        aabbs: &AabbPool,
        obj: u32,
    ) -> Result<(), OctreeError> {
        self.insert_into(nodes, aabbs, self.root, obj)
    }

    fn insert_into(
        &mut self,
        nodes: &mut NodePool,
        aabbs: &AabbPool,
        node: u32,
        obj: u32,
    ) -> Result<(), OctreeError> {
        let (obj_min, obj_max) = aabbs.get_corners(obj);
        let first_child = nodes.get_first_child(node);

        if first_child >= 0 {
            let first_child = first_child as u32;
            for i in 0..8u32 {
                let child = first_child + i;
                let (child_min, child_max) = nodes.get_aabb(child);
                if fits(child_min, child_max, obj_min, obj_max) {
                    return self.insert_into(nodes, aabbs, child, obj);
                }
            }
            // Straddles a midpoint: stays at this internal node.
            nodes.add_object(node, obj)?;
            self.object_to_node[obj as usize] = node as i32;
            return Ok(());
        }

        if nodes.get_object_count(node) < nodes.max_objects_per_node() {
            nodes
                .add_object(node, obj)
                .expect("object count was just checked against the node's capacity");
            self.object_to_node[obj as usize] = node as i32;
            return Ok(());
        }

        self.subdivide(nodes, aabbs, node)?;
        self.insert_into(nodes, aabbs, node, obj)
            .map_err(|_| OctreeError::DegenerateInsert)
    }

    fn subdivide(
        &mut self,
        nodes: &mut NodePool,
        aabbs: &AabbPool,
        node: u32,
    ) -> Result<(), OctreeError> {
        let (min, max) = nodes.get_aabb(node);
        let mid = [
            (min[0] + max[0]) * 0.5,
            (min[1] + max[1]) * 0.5,
            (min[2] + max[2]) * 0.5,
        ];

        let first_child = nodes.allocate_contiguous(8)?;
        nodes.set_first_child(node, first_child as i32);

        for i in 0..8u32 {
            let child = first_child + i;
            let lo_x = i & 1 == 0;
            let lo_y = (i >> 1) & 1 == 0;
            let lo_z = (i >> 2) & 1 == 0;
            let child_min = [
                if lo_x { min[0] } else { mid[0] },
                if lo_y { min[1] } else { mid[1] },
                if lo_z { min[2] } else { mid[2] },
            ];
            let child_max = [
                if lo_x { mid[0] } else { max[0] },
                if lo_y { mid[1] } else { max[1] },
                if lo_z { mid[2] } else { max[2] },
            ];
            nodes.set_aabb(child, child_min, child_max);
            nodes.set_parent(child, node as i32);
        }

        let count = nodes.get_object_count(node);
        let mut straddlers = Vec::with_capacity(count as usize);
        for slot in 0..count {
            straddlers.push(nodes.get_object(node, slot));
        }
        nodes.clear_objects(node);

        for obj in straddlers {
            self.insert_into(nodes, aabbs, node, obj)?;
        }
        Ok(())
    }

    /// Overwrite `obj`'s AABB and relocate it in the tree if it no longer
    /// fits its current node.
    ///
    /// No-op if `obj` has never been inserted. Per the "stay if fits" rule,
    /// an object that still fits its current node is left there even if a
    /// child would now accept it.
    ///
    /// # Errors
    ///
    /// Propagates [`OctreeError`] from the re-insertion, same as [`insert`][Self::insert].
    pub fn update(
        &mut self,
        nodes: &mut NodePool,
        aabbs: &AabbPool,
        obj: u32,
        new_min: [f32; 3],
        new_max: [f32; 3],
    ) -> Result<(), OctreeError> {
        aabbs.set(obj, new_min, new_max);

        let Some(current) = self.node_of(obj) else {
            return Ok(());
        };

        let (node_min, node_max) = nodes.get_aabb(current);
        if fits(node_min, node_max, new_min, new_max) {
            return Ok(());
        }

        nodes.remove_object(current, obj);
        self.object_to_node[obj as usize] = -1;

        let mut ancestor = current;
        loop {
            let (a_min, a_max) = nodes.get_aabb(ancestor);
            if fits(a_min, a_max, new_min, new_max) {
                break;
            }
            let parent = nodes.get_parent(ancestor);
            if parent < 0 {
                ancestor = self.root;
                break;
            }
            ancestor = parent as u32;
        }

        self.insert_into(nodes, aabbs, ancestor, obj)
    }

    /// Remove `obj` from the tree. No-op if it was never inserted.
    pub fn remove(&mut self, nodes: &NodePool, obj: u32) {
        if let Some(node) = self.node_of(obj) {
            nodes.remove_object(node, obj);
            self.object_to_node[obj as usize] = -1;
        }
    }

    /// Find the closest object the ray at `ray[ray_offset..][..6]` pierces.
    ///
    /// Traverses depth-first with no front-to-back ordering or early-out;
    /// the reusable traversal stack avoids any per-call allocation.
    pub fn raycast(
        &mut self,
        nodes: &NodePool,
        aabbs: &AabbPool,
        ray: &[f32],
        ray_offset: usize,
    ) -> Option<Hit> {
        let mut scratch = [0.0f32; 6];
        nodes.copy_aabb_into(self.root, &mut scratch, 0);
        if ray_intersects_aabb(ray, ray_offset, &scratch, 0) == NO_HIT {
            return None;
        }

        self.stack.clear();
        self.stack.push(self.root);

        let mut best_t = f32::INFINITY;
        let mut best_idx: i32 = -1;

        while let Some(node) = self.stack.pop() {
            let count = nodes.get_object_count(node);
            for slot in 0..count {
                let obj = nodes.get_object(node, slot);
                aabbs.copy_into(obj, &mut scratch, 0);
                let t = ray_intersects_aabb(ray, ray_offset, &scratch, 0);
                if t >= 0.0 && t < best_t {
                    best_t = t;
                    best_idx = obj as i32;
                }
            }

            let first_child = nodes.get_first_child(node);
            if first_child >= 0 {
                let first_child = first_child as u32;
                for i in 0..8u32 {
                    let child = first_child + i;
                    nodes.copy_aabb_into(child, &mut scratch, 0);
                    if ray_intersects_aabb(ray, ray_offset, &scratch, 0) != NO_HIT {
                        self.stack.push(child);
                    }
                }
            }
        }

        if best_idx < 0 {
            None
        } else {
            Some(Hit {
                object_index: best_idx as u32,
                t: best_t,
            })
        }
    }

    /// Append every live object overlapping `[min, max]` to `out`, in DFS
    /// encounter order. Clears `out` first.
    pub fn query_box(
        &mut self,
        nodes: &NodePool,
        aabbs: &AabbPool,
        min: [f32; 3],
        max: [f32; 3],
        out: &mut Vec<u32>,
    ) {
        out.clear();
        let query = [min[0], min[1], min[2], max[0], max[1], max[2]];

        let mut scratch = [0.0f32; 6];
        nodes.copy_aabb_into(self.root, &mut scratch, 0);
        if !aabb_overlaps_aabb(&scratch, 0, &query, 0) {
            return;
        }

        self.stack.clear();
        self.stack.push(self.root);

        while let Some(node) = self.stack.pop() {
            let count = nodes.get_object_count(node);
            for slot in 0..count {
                let obj = nodes.get_object(node, slot);
                aabbs.copy_into(obj, &mut scratch, 0);
                if aabb_overlaps_aabb(&scratch, 0, &query, 0) {
                    out.push(obj);
                }
            }

            let first_child = nodes.get_first_child(node);
            if first_child >= 0 {
                let first_child = first_child as u32;
                for i in 0..8u32 {
                    let child = first_child + i;
                    nodes.copy_aabb_into(child, &mut scratch, 0);
                    if aabb_overlaps_aabb(&scratch, 0, &query, 0) {
                        self.stack.push(child);
                    }
                }
            }
        }
    }

    /// Reset the node pool and re-allocate a fresh root with the same world
    /// bounds, forgetting every object placement.
    ///
    /// # Errors
    ///
    /// Returns [`OctreeError::CapacityExceeded`] if `nodes` cannot even hold
    /// a single node after reset (never the case unless `nodes` has zero capacity).
    pub fn clear(&mut self, nodes: &mut NodePool) -> Result<(), OctreeError> {
        nodes.reset();
        let root = nodes.allocate()?;
        nodes.set_aabb(root, self.world_min, self.world_max);
        self.root = root;
        for slot in &mut self.object_to_node {
            *slot = -1;
        }
        Ok(())
    }
}

impl fmt::Debug for Octree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Octree")
            .field("root", &self.root)
            .field("object_capacity", &self.object_to_node.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORLD_MIN: [f32; 3] = [-50.0, -50.0, -50.0];
    const WORLD_MAX: [f32; 3] = [50.0, 50.0, 50.0];

    fn fresh(node_capacity: u32, object_capacity: u32) -> (NodePool, AabbPool, Octree) {
        let mut nodes = NodePool::new(node_capacity);
        let aabbs = AabbPool::new(object_capacity);
        let tree = Octree::new(&mut nodes, object_capacity, WORLD_MIN, WORLD_MAX).unwrap();
        (nodes, aabbs, tree)
    }

    fn put(aabbs: &mut AabbPool, min: [f32; 3], max: [f32; 3]) -> u32 {
        let i = aabbs.allocate().unwrap();
        aabbs.set(i, min, max);
        i
    }

    #[test]
    fn insert_then_raycast_hits_the_right_object() {
        let (mut nodes, mut aabbs, mut tree) = fresh(128, 16);
        let obj = put(&mut aabbs, [10.0, 10.0, 10.0], [11.0, 11.0, 11.0]);
        tree.insert(&mut nodes, &aabbs, obj).unwrap();

        let ray = [0.0, 10.5, 10.5, 1.0, 0.0, 0.0];
        let hit = tree.raycast(&nodes, &aabbs, &ray, 0).unwrap();
        assert_eq!(hit.object_index, obj);
        assert!((hit.t - 10.0).abs() < 1e-4);
    }

    #[test]
    fn raycast_misses_an_empty_tree_region() {
        let (nodes, aabbs, mut tree) = fresh(128, 16);
        let ray = [0.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        assert!(tree.raycast(&nodes, &aabbs, &ray, 0).is_none());
    }

    // Eight corner objects plus one interior object, subdivision forced
    // by a small K so the corners end up in distinct leaves.
    fn corners_and_center(node_capacity: u32, k: u32) -> (NodePool, AabbPool, Octree, Vec<u32>) {
        let mut nodes = NodePool::with_max_objects(node_capacity, k);
        let mut aabbs = AabbPool::new(16);
        let mut tree = Octree::new(&mut nodes, 16, WORLD_MIN, WORLD_MAX).unwrap();

        // Each corner box sits at (±40, ±40, ±40) and extends one unit
        // inward so it stays within the world bounds.
        let corner_box = |s: f32| -> (f32, f32) { if s < 0.0 { (40.0 * s, 40.0 * s + 1.0) } else { (40.0 * s - 1.0, 40.0 * s) } };

        let mut objs = Vec::new();
        for &sx in &[-1.0f32, 1.0] {
            for &sy in &[-1.0f32, 1.0] {
                for &sz in &[-1.0f32, 1.0] {
                    let (min_x, max_x) = corner_box(sx);
                    let (min_y, max_y) = corner_box(sy);
                    let (min_z, max_z) = corner_box(sz);
                    let min = [min_x, min_y, min_z];
                    let max = [max_x, max_y, max_z];
                    let i = put(&mut aabbs, min, max);
                    tree.insert(&mut nodes, &aabbs, i).unwrap();
                    objs.push(i);
                }
            }
        }
        let center = put(&mut aabbs, [10.0, 10.0, 10.0], [11.0, 11.0, 11.0]);
        tree.insert(&mut nodes, &aabbs, center).unwrap();
        objs.push(center);

        (nodes, aabbs, tree, objs)
    }

    #[test]
    fn raycast_reaches_interior_and_corner_objects() {
        let (nodes, aabbs, mut tree, objs) = corners_and_center(128, 1);
        let center = *objs.last().unwrap();

        let ray_to_center = [0.0, 10.5, 10.5, 1.0, 0.0, 0.0];
        let hit = tree.raycast(&nodes, &aabbs, &ray_to_center, 0).unwrap();
        assert_eq!(hit.object_index, center);
        assert!((hit.t - 10.0).abs() < 1e-3);

        let ray_to_corner = [-60.0, -39.5, -39.5, 1.0, 0.0, 0.0];
        let hit = tree.raycast(&nodes, &aabbs, &ray_to_corner, 0).unwrap();
        assert_eq!(hit.object_index, objs[0]);
        assert!((hit.t - 20.0).abs() < 1e-3);
    }

    #[test]
    fn query_box_returns_exactly_the_objects_in_range() {
        let (mut nodes, aabbs, mut tree, objs) = corners_and_center(128, 1);
        let center = *objs.last().unwrap();
        let positive_corner = objs[7]; // sx=1, sy=1, sz=1 iteration order

        let mut hits = Vec::new();
        tree.query_box(
            &mut nodes,
            &aabbs,
            [5.0, 5.0, 5.0],
            [50.0, 50.0, 50.0],
            &mut hits,
        );
        hits.sort_unstable();
        let mut expected = [center, positive_corner];
        expected.sort_unstable();
        assert_eq!(hits, expected);
    }

    #[test]
    fn update_relocates_object_to_matching_node() {
        let (mut nodes, mut aabbs, mut tree) = fresh(128, 4);
        let obj = put(&mut aabbs, [-40.0, -40.0, -40.0], [-39.0, -39.0, -39.0]);
        tree.insert(&mut nodes, &aabbs, obj).unwrap();
        let old_node = tree.node_of(obj).unwrap();

        tree.update(
            &mut nodes,
            &aabbs,
            obj,
            [10.0, 10.0, 10.0],
            [11.0, 11.0, 11.0],
        )
        .unwrap();

        let new_node = tree.node_of(obj).unwrap();
        assert_ne!(old_node, new_node);
        let (min, max) = nodes.get_aabb(new_node);
        assert!(fits(min, max, [10.0, 10.0, 10.0], [11.0, 11.0, 11.0]));
        assert_eq!(nodes.get_object_count(old_node), 0);
    }

    #[test]
    fn update_that_straddles_midpoints_moves_object_to_root() {
        let (mut nodes, mut aabbs, mut tree) = fresh(128, 4);
        let obj = put(&mut aabbs, [10.0, 10.0, 10.0], [11.0, 11.0, 11.0]);
        tree.insert(&mut nodes, &aabbs, obj).unwrap();
        assert_ne!(tree.node_of(obj).unwrap(), tree.root());

        tree.update(&mut nodes, &aabbs, obj, [-5.0, -5.0, -5.0], [5.0, 5.0, 5.0])
            .unwrap();
        assert_eq!(tree.node_of(obj).unwrap(), tree.root());
    }

    #[test]
    fn clear_empties_the_tree_and_accepts_new_inserts() {
        let (mut nodes, mut aabbs, mut tree) = fresh(128, 4);
        let obj = put(&mut aabbs, [10.0, 10.0, 10.0], [11.0, 11.0, 11.0]);
        tree.insert(&mut nodes, &aabbs, obj).unwrap();

        tree.clear(&mut nodes).unwrap();

        let mut hits = Vec::new();
        tree.query_box(&mut nodes, &aabbs, WORLD_MIN, WORLD_MAX, &mut hits);
        assert!(hits.is_empty());

        let second = put(&mut aabbs, [1.0, 1.0, 1.0], [2.0, 2.0, 2.0]);
        tree.insert(&mut nodes, &aabbs, second).unwrap();
        tree.query_box(&mut nodes, &aabbs, WORLD_MIN, WORLD_MAX, &mut hits);
        assert_eq!(hits, alloc::vec![second]);
    }

    #[test]
    fn remove_is_idempotent_and_drops_the_object() {
        let (mut nodes, mut aabbs, mut tree) = fresh(128, 4);
        let obj = put(&mut aabbs, [0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        tree.insert(&mut nodes, &aabbs, obj).unwrap();

        tree.remove(&nodes, obj);
        assert!(tree.node_of(obj).is_none());
        // Removing again, or updating an unknown object, is a silent no-op.
        tree.remove(&nodes, obj);
        tree.update(&mut nodes, &aabbs, obj, [5.0, 5.0, 5.0], [6.0, 6.0, 6.0])
            .unwrap();
    }

    #[test]
    fn subdivision_partitions_into_eight_children_by_midpoint() {
        let (mut nodes, mut aabbs, mut tree) = fresh(128, 16);
        // Force a subdivide: K defaults to 8, so insert 9 tiny, mutually
        // non-overlapping objects all inside the root's single octant-free leaf.
        for i in 0..9u32 {
            let base = -49.0 + i as f32 * 2.0;
            let obj = put(&mut aabbs, [base, base, base], [base + 0.5, base + 0.5, base + 0.5]);
            tree.insert(&mut nodes, &aabbs, obj).unwrap();
        }
        let first_child = nodes.get_first_child(tree.root());
        assert!(first_child >= 0);
        let first_child = first_child as u32;

        let (root_min, root_max) = nodes.get_aabb(tree.root());
        let mid = [
            (root_min[0] + root_max[0]) * 0.5,
            (root_min[1] + root_max[1]) * 0.5,
            (root_min[2] + root_max[2]) * 0.5,
        ];
        for i in 0..8u32 {
            let child = first_child + i;
            assert_eq!(nodes.get_parent(child), tree.root() as i32);
            let (cmin, cmax) = nodes.get_aabb(child);
            let lo_x = i & 1 == 0;
            let lo_y = (i >> 1) & 1 == 0;
            let lo_z = (i >> 2) & 1 == 0;
            assert_eq!(cmin[0], if lo_x { root_min[0] } else { mid[0] });
            assert_eq!(cmax[0], if lo_x { mid[0] } else { root_max[0] });
            assert_eq!(cmin[1], if lo_y { root_min[1] } else { mid[1] });
            assert_eq!(cmax[1], if lo_y { mid[1] } else { root_max[1] });
            assert_eq!(cmin[2], if lo_z { root_min[2] } else { mid[2] });
            assert_eq!(cmax[2], if lo_z { mid[2] } else { root_max[2] });
        }
    }

    #[test]
    fn degenerate_insert_is_reported_not_swallowed() {
        // Nine identical boxes straddling the root's midpoint on every axis:
        // no child octant can ever accept them, so each subdivide's
        // reinsertion loop puts all of them straight back on the root's own
        // (now internal) object list. The 9th insert fills that list to K=8
        // again immediately after the subdivide+retry, which is exactly the
        // case the degenerate-insert guard exists for.
        let mut nodes = NodePool::with_max_objects(128, 8);
        let mut aabbs = AabbPool::new(16);
        let mut tree = Octree::new(&mut nodes, 16, WORLD_MIN, WORLD_MAX).unwrap();

        let mut last = Ok(());
        for _ in 0..9 {
            let obj = put(&mut aabbs, [-1.0, -1.0, -1.0], [1.0, 1.0, 1.0]);
            last = tree.insert(&mut nodes, &aabbs, obj);
        }
        assert_eq!(last, Err(OctreeError::DegenerateInsert));
    }
}
