//! Dynamic bounding volume hierarchy
//!
//! A binary tree of axis-aligned boxes that supports incremental insert,
//! remove and update. Leaves store "fat" boxes enlarged by a margin so that
//! small movements do not restructure the tree. New leaves are placed with a
//! greedy surface area heuristic descent.
//!
//! Every internal node's box contains the boxes of both children, and every
//! leaf's box contains the last box its key was inserted or updated with.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::hash::Hash;
use std::ops::ControlFlow;

use crate::collision::{Aabb, Ray};
use crate::foundation::collections::{new_key_type, SlotMap};
use crate::spatial::spatial_index::{SpatialError, SpatialIndex, SpatialIndexStats};

new_key_type! {
    struct NodeKey;
}

/// Margin used by [`DynamicBvh::default`]
pub const DEFAULT_FAT_MARGIN: f32 = 0.1;

#[derive(Debug, Clone, Copy)]
enum NodeKind<K> {
    Leaf(K),
    Branch { left: NodeKey, right: NodeKey },
}

#[derive(Debug, Clone)]
struct BvhNode<K> {
    aabb: Aabb,
    parent: Option<NodeKey>,
    /// 0 for leaves
    height: u32,
    kind: NodeKind<K>,
}

/// Dynamic AABB tree keyed by `K`
#[derive(Debug, Clone)]
pub struct DynamicBvh<K> {
    nodes: SlotMap<NodeKey, BvhNode<K>>,
    leaves: HashMap<K, NodeKey>,
    root: Option<NodeKey>,
    fat_margin: f32,
}

impl<K: Copy + Eq + Hash> Default for DynamicBvh<K> {
    fn default() -> Self {
        Self::new(DEFAULT_FAT_MARGIN)
    }
}

impl<K: Copy + Eq + Hash> DynamicBvh<K> {
    /// Create an empty tree whose leaves are enlarged by `fat_margin`
    pub fn new(fat_margin: f32) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            leaves: HashMap::new(),
            root: None,
            fat_margin: fat_margin.max(0.0),
        }
    }

    /// Leaf enlargement margin
    pub fn fat_margin(&self) -> f32 {
        self.fat_margin
    }

    /// Number of keys in the tree
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// True if the tree holds no keys
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// True if `key` is in the tree
    pub fn contains(&self, key: K) -> bool {
        self.leaves.contains_key(&key)
    }

    /// The fat box stored for `key`
    pub fn fat_aabb(&self, key: K) -> Option<Aabb> {
        self.leaves.get(&key).map(|&leaf| self.nodes[leaf].aabb)
    }

    /// Box enclosing the whole tree
    pub fn root_aabb(&self) -> Option<Aabb> {
        self.root.map(|root| self.nodes[root].aabb)
    }

    /// Longest root-to-leaf path
    pub fn height(&self) -> u32 {
        self.root.map_or(0, |root| self.nodes[root].height)
    }

    /// Insert `key` with its tight bounding box
    pub fn insert(&mut self, key: K, aabb: &Aabb) -> Result<(), SpatialError> {
        if self.leaves.contains_key(&key) {
            return Err(SpatialError::DuplicateKey);
        }
        if !aabb.is_valid() {
            return Err(SpatialError::InvalidBounds);
        }

        let leaf = self.nodes.insert(BvhNode {
            aabb: aabb.expanded(self.fat_margin),
            parent: None,
            height: 0,
            kind: NodeKind::Leaf(key),
        });
        self.leaves.insert(key, leaf);
        self.insert_leaf(leaf);
        Ok(())
    }

    /// Remove `key`, returning the fat box it occupied
    pub fn remove(&mut self, key: K) -> Result<Aabb, SpatialError> {
        let leaf = self.leaves.remove(&key).ok_or(SpatialError::UnknownKey)?;
        self.detach_leaf(leaf);
        self.nodes
            .remove(leaf)
            .map(|node| node.aabb)
            .ok_or(SpatialError::Corrupt("leaf node missing from arena"))
    }

    /// Move `key` to a new tight bounding box
    ///
    /// Returns `false` without touching the tree if the new box still fits
    /// inside the stored fat box, `true` if the leaf was reinserted.
    pub fn update(&mut self, key: K, aabb: &Aabb) -> Result<bool, SpatialError> {
        let leaf = *self.leaves.get(&key).ok_or(SpatialError::UnknownKey)?;
        if !aabb.is_valid() {
            return Err(SpatialError::InvalidBounds);
        }
        if self.nodes[leaf].aabb.contains(aabb) {
            return Ok(false);
        }

        self.detach_leaf(leaf);
        self.nodes[leaf].aabb = aabb.expanded(self.fat_margin);
        self.insert_leaf(leaf);
        Ok(true)
    }

    /// Visit every key whose fat box overlaps `aabb`
    pub fn query_overlapping(&self, aabb: &Aabb, mut visitor: impl FnMut(K) -> ControlFlow<()>) {
        let Some(root) = self.root else {
            return;
        };
        let mut stack = vec![root];
        while let Some(node_key) = stack.pop() {
            let node = &self.nodes[node_key];
            if !node.aabb.intersects(aabb) {
                continue;
            }
            match node.kind {
                NodeKind::Leaf(key) => {
                    if visitor(key).is_break() {
                        return;
                    }
                }
                NodeKind::Branch { left, right } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
    }

    /// Visit keys whose fat box is hit by `ray`, in order of entry distance
    ///
    /// The visitor returns the new maximum distance. Returning a smaller value
    /// (such as the distance of an exact hit) prunes everything farther away;
    /// returning a negative value stops the query.
    pub fn query_ray(&self, ray: &Ray, max_alpha: f32, mut visitor: impl FnMut(K, f32) -> f32) {
        let Some(root) = self.root else {
            return;
        };
        let mut limit = max_alpha;
        let mut heap = BinaryHeap::new();
        if let Some(alpha) = self.nodes[root].aabb.intersect_ray(ray) {
            if alpha <= limit {
                heap.push(RayCandidate { alpha, node: root });
            }
        }

        while let Some(RayCandidate { alpha, node }) = heap.pop() {
            if alpha > limit {
                break;
            }
            match self.nodes[node].kind {
                NodeKind::Leaf(key) => limit = limit.min(visitor(key, alpha)),
                NodeKind::Branch { left, right } => {
                    for child in [left, right] {
                        if let Some(child_alpha) = self.nodes[child].aabb.intersect_ray(ray) {
                            if child_alpha <= limit {
                                heap.push(RayCandidate { alpha: child_alpha, node: child });
                            }
                        }
                    }
                }
            }
        }
    }

    /// Visit every node's box with its depth and whether it is a leaf
    pub fn for_each_node(&self, mut visitor: impl FnMut(&Aabb, u32, bool)) {
        let Some(root) = self.root else {
            return;
        };
        let mut stack = vec![(root, 0)];
        while let Some((node_key, depth)) = stack.pop() {
            let node = &self.nodes[node_key];
            match node.kind {
                NodeKind::Leaf(_) => visitor(&node.aabb, depth, true),
                NodeKind::Branch { left, right } => {
                    visitor(&node.aabb, depth, false);
                    stack.push((right, depth + 1));
                    stack.push((left, depth + 1));
                }
            }
        }
    }

    /// Structural statistics
    pub fn stats(&self) -> SpatialIndexStats {
        let internal_surface_area = self
            .nodes
            .values()
            .filter(|node| matches!(node.kind, NodeKind::Branch { .. }))
            .map(|node| node.aabb.surface_area())
            .sum();
        SpatialIndexStats {
            leaf_count: self.leaves.len(),
            node_count: self.nodes.len(),
            height: self.height(),
            internal_surface_area,
        }
    }

    /// Check parent links, heights, containment and leaf bookkeeping
    pub fn validate(&self) -> Result<(), SpatialError> {
        let Some(root) = self.root else {
            return if self.nodes.is_empty() && self.leaves.is_empty() {
                Ok(())
            } else {
                Err(SpatialError::Corrupt("nodes present without a root"))
            };
        };
        if self.nodes[root].parent.is_some() {
            return Err(SpatialError::Corrupt("root has a parent"));
        }
        if self.nodes.len() + 1 != 2 * self.leaves.len() {
            return Err(SpatialError::Corrupt("node count does not match leaf count"));
        }

        for (node_key, node) in &self.nodes {
            match node.kind {
                NodeKind::Leaf(key) => {
                    if node.height != 0 {
                        return Err(SpatialError::Corrupt("leaf height is not zero"));
                    }
                    if self.leaves.get(&key) != Some(&node_key) {
                        return Err(SpatialError::Corrupt("leaf not registered under its key"));
                    }
                }
                NodeKind::Branch { left, right } => {
                    let (left_node, right_node) = match (self.nodes.get(left), self.nodes.get(right)) {
                        (Some(l), Some(r)) => (l, r),
                        _ => return Err(SpatialError::Corrupt("branch child missing")),
                    };
                    if left_node.parent != Some(node_key) || right_node.parent != Some(node_key) {
                        return Err(SpatialError::Corrupt("child parent link broken"));
                    }
                    if !node.aabb.contains(&left_node.aabb) || !node.aabb.contains(&right_node.aabb) {
                        return Err(SpatialError::Corrupt("branch box does not contain a child"));
                    }
                    if node.height != 1 + left_node.height.max(right_node.height) {
                        return Err(SpatialError::Corrupt("branch height is stale"));
                    }
                }
            }
        }
        Ok(())
    }

    /// Remove every key
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.leaves.clear();
        self.root = None;
    }

    // =========== Internal methods ===========

    fn insert_leaf(&mut self, leaf: NodeKey) {
        let Some(root) = self.root else {
            self.nodes[leaf].parent = None;
            self.root = Some(leaf);
            return;
        };

        let leaf_aabb = self.nodes[leaf].aabb;
        let sibling = self.pick_sibling(root, &leaf_aabb);
        let old_parent = self.nodes[sibling].parent;
        let branch = self.nodes.insert(BvhNode {
            aabb: leaf_aabb.union(&self.nodes[sibling].aabb),
            parent: old_parent,
            height: self.nodes[sibling].height + 1,
            kind: NodeKind::Branch { left: sibling, right: leaf },
        });

        match old_parent {
            Some(parent) => self.replace_child(parent, sibling, branch),
            None => self.root = Some(branch),
        }
        self.nodes[sibling].parent = Some(branch);
        self.nodes[leaf].parent = Some(branch);

        self.refit_from(old_parent);
    }

    /// Greedy surface-area descent: at each branch follow the child whose box
    /// grows least to include the new leaf, until a leaf is reached. Ties go
    /// to the child with the smaller combined box.
    fn pick_sibling(&self, root: NodeKey, leaf_aabb: &Aabb) -> NodeKey {
        let mut current = root;
        while let NodeKind::Branch { left, right } = self.nodes[current].kind {
            let (left_growth, left_area) = self.growth(left, leaf_aabb);
            let (right_growth, right_area) = self.growth(right, leaf_aabb);
            current = if left_growth < right_growth || (left_growth <= right_growth && left_area <= right_area) {
                left
            } else {
                right
            };
        }
        current
    }

    /// Surface-area increase of `node` when it has to include `leaf_aabb`,
    /// paired with the area of the combined box
    fn growth(&self, node: NodeKey, leaf_aabb: &Aabb) -> (f32, f32) {
        let aabb = &self.nodes[node].aabb;
        let combined_area = aabb.union(leaf_aabb).surface_area();
        (combined_area - aabb.surface_area(), combined_area)
    }

    fn detach_leaf(&mut self, leaf: NodeKey) {
        if self.root == Some(leaf) {
            self.root = None;
            return;
        }
        let Some(parent) = self.nodes[leaf].parent else {
            return;
        };
        let NodeKind::Branch { left, right } = self.nodes[parent].kind else {
            return;
        };
        let sibling = if left == leaf { right } else { left };
        let grandparent = self.nodes[parent].parent;

        self.nodes.remove(parent);
        self.nodes[sibling].parent = grandparent;
        self.nodes[leaf].parent = None;
        match grandparent {
            Some(grandparent) => {
                self.replace_child(grandparent, parent, sibling);
                self.refit_from(Some(grandparent));
            }
            None => self.root = Some(sibling),
        }
    }

    fn replace_child(&mut self, parent: NodeKey, old: NodeKey, new: NodeKey) {
        if let NodeKind::Branch { left, right } = &mut self.nodes[parent].kind {
            if *left == old {
                *left = new;
            } else if *right == old {
                *right = new;
            }
        }
    }

    /// Recompute boxes and heights from `start` up to the root
    fn refit_from(&mut self, start: Option<NodeKey>) {
        let mut current = start;
        while let Some(node_key) = current {
            if let NodeKind::Branch { left, right } = self.nodes[node_key].kind {
                let (left_node, right_node) = (&self.nodes[left], &self.nodes[right]);
                let aabb = left_node.aabb.union(&right_node.aabb);
                let height = 1 + left_node.height.max(right_node.height);
                let node = &mut self.nodes[node_key];
                node.aabb = aabb;
                node.height = height;
            }
            current = self.nodes[node_key].parent;
        }
    }
}

impl<K: Copy + Eq + Hash + Send> SpatialIndex<K> for DynamicBvh<K> {
    fn insert(&mut self, key: K, aabb: &Aabb) -> Result<(), SpatialError> {
        DynamicBvh::insert(self, key, aabb)
    }

    fn remove(&mut self, key: K) -> Result<(), SpatialError> {
        DynamicBvh::remove(self, key).map(|_| ())
    }

    fn update(&mut self, key: K, aabb: &Aabb) -> Result<bool, SpatialError> {
        DynamicBvh::update(self, key, aabb)
    }

    fn contains(&self, key: K) -> bool {
        DynamicBvh::contains(self, key)
    }

    fn query_aabb(&self, aabb: &Aabb, visitor: &mut dyn FnMut(K) -> ControlFlow<()>) {
        self.query_overlapping(aabb, visitor);
    }

    fn query_ray(&self, ray: &Ray, max_alpha: f32, visitor: &mut dyn FnMut(K, f32) -> f32) {
        DynamicBvh::query_ray(self, ray, max_alpha, visitor);
    }

    fn for_each_bound(&self, visitor: &mut dyn FnMut(&Aabb, u32, bool)) {
        self.for_each_node(visitor);
    }

    fn clear(&mut self) {
        DynamicBvh::clear(self);
    }

    fn len(&self) -> usize {
        DynamicBvh::len(self)
    }

    fn stats(&self) -> SpatialIndexStats {
        DynamicBvh::stats(self)
    }
}

/// Heap entry for nearest-first ray traversal
#[derive(Debug, Clone, Copy)]
struct RayCandidate {
    alpha: f32,
    node: NodeKey,
}

impl PartialEq for RayCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RayCandidate {}

impl PartialOrd for RayCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RayCandidate {
    // Reversed so the max-heap pops the smallest distance first
    fn cmp(&self, other: &Self) -> Ordering {
        other.alpha.total_cmp(&self.alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;

    /// Small deterministic generator so tests do not need a rand dependency
    struct Lcg(u64);

    impl Lcg {
        fn next_f32(&mut self) -> f32 {
            self.0 = self.0.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
            (self.0 >> 40) as f32 / (1u64 << 24) as f32
        }

        fn range(&mut self, lo: f32, hi: f32) -> f32 {
            lo + (hi - lo) * self.next_f32()
        }

        fn aabb(&mut self) -> Aabb {
            let center = Vec3::new(self.range(-50.0, 50.0), self.range(-50.0, 50.0), self.range(-50.0, 50.0));
            let extents = Vec3::new(self.range(0.1, 3.0), self.range(0.1, 3.0), self.range(0.1, 3.0));
            Aabb::from_center_extents(center, extents)
        }
    }

    fn cube(center: Vec3, half: f32) -> Aabb {
        Aabb::from_center_extents(center, Vec3::repeat(half))
    }

    fn collect_overlaps(tree: &DynamicBvh<u32>, aabb: &Aabb) -> Vec<u32> {
        let mut found = Vec::new();
        tree.query_overlapping(aabb, |key| {
            found.push(key);
            ControlFlow::Continue(())
        });
        found.sort_unstable();
        found
    }

    #[test]
    fn test_insert_and_query() {
        let mut tree = DynamicBvh::new(0.1);
        tree.insert(1u32, &cube(Vec3::zeros(), 1.0)).expect("insert");
        tree.insert(2, &cube(Vec3::new(10.0, 0.0, 0.0), 1.0)).expect("insert");
        tree.insert(3, &cube(Vec3::new(0.5, 0.5, 0.0), 1.0)).expect("insert");

        assert_eq!(tree.len(), 3);
        assert_eq!(collect_overlaps(&tree, &cube(Vec3::zeros(), 0.5)), vec![1, 3]);
        assert_eq!(collect_overlaps(&tree, &cube(Vec3::new(10.0, 0.0, 0.0), 0.5)), vec![2]);
        assert!(collect_overlaps(&tree, &cube(Vec3::new(-30.0, 0.0, 0.0), 0.5)).is_empty());
        tree.validate().expect("valid tree");
    }

    #[test]
    fn test_insert_pairs_leaf_with_least_growing_subtree() {
        let mut tree = DynamicBvh::new(0.0);
        tree.insert(1u32, &cube(Vec3::zeros(), 1.0)).expect("insert");
        tree.insert(2, &cube(Vec3::new(100.0, 0.0, 0.0), 1.0)).expect("insert");
        tree.insert(3, &cube(Vec3::new(2.0, 0.0, 0.0), 1.0)).expect("insert");
        tree.insert(4, &cube(Vec3::new(98.0, 0.0, 0.0), 1.0)).expect("insert");

        let parent = |key: u32| tree.nodes[tree.leaves[&key]].parent;
        assert_eq!(parent(1), parent(3));
        assert_eq!(parent(2), parent(4));
        assert_ne!(parent(1), parent(2));
        tree.validate().expect("valid tree");
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut tree = DynamicBvh::new(0.1);
        tree.insert(7u32, &cube(Vec3::zeros(), 1.0)).expect("insert");
        assert_eq!(tree.insert(7, &cube(Vec3::zeros(), 2.0)), Err(SpatialError::DuplicateKey));
        assert_eq!(tree.len(), 1);
        tree.validate().expect("valid tree");
    }

    #[test]
    fn test_unknown_and_invalid_keys() {
        let mut tree: DynamicBvh<u32> = DynamicBvh::new(0.1);
        assert_eq!(tree.remove(4), Err(SpatialError::UnknownKey));
        assert_eq!(tree.update(4, &cube(Vec3::zeros(), 1.0)), Err(SpatialError::UnknownKey));

        let inverted = Aabb::new(Vec3::repeat(1.0), Vec3::repeat(-1.0));
        assert_eq!(tree.insert(4, &inverted), Err(SpatialError::InvalidBounds));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_remove_keeps_tree_valid() {
        let mut tree = DynamicBvh::new(0.0);
        for key in 0u32..8 {
            tree.insert(key, &cube(Vec3::new(key as f32 * 3.0, 0.0, 0.0), 1.0)).expect("insert");
        }
        let removed = tree.remove(3).expect("remove");
        assert_eq!(removed, cube(Vec3::new(9.0, 0.0, 0.0), 1.0));
        assert!(!tree.contains(3));
        assert_eq!(tree.len(), 7);
        tree.validate().expect("valid tree");

        for key in [0u32, 1, 2, 4, 5, 6, 7] {
            tree.remove(key).expect("remove");
            tree.validate().expect("valid tree");
        }
        assert!(tree.is_empty());
        assert_eq!(tree.root_aabb(), None);
    }

    #[test]
    fn test_update_within_fat_margin_is_free() {
        let mut tree = DynamicBvh::new(0.5);
        tree.insert(1u32, &cube(Vec3::zeros(), 1.0)).expect("insert");

        assert_eq!(tree.update(1, &cube(Vec3::new(0.2, 0.0, 0.0), 1.0)), Ok(false));
        assert_eq!(tree.fat_aabb(1), Some(cube(Vec3::zeros(), 1.5)));

        assert_eq!(tree.update(1, &cube(Vec3::new(5.0, 0.0, 0.0), 1.0)), Ok(true));
        assert_eq!(tree.fat_aabb(1), Some(cube(Vec3::new(5.0, 0.0, 0.0), 1.5)));
    }

    #[test]
    fn test_random_operations_preserve_containment() {
        let mut rng = Lcg(0x5eed);
        let mut tree = DynamicBvh::new(0.2);
        let mut tight: HashMap<u32, Aabb> = HashMap::new();

        for step in 0..600u32 {
            let roll = rng.next_f32();
            if roll < 0.5 || tight.len() < 4 {
                let aabb = rng.aabb();
                tree.insert(step, &aabb).expect("insert");
                tight.insert(step, aabb);
            } else if roll < 0.75 {
                let key = *tight.keys().min().expect("non-empty");
                tree.remove(key).expect("remove");
                tight.remove(&key);
            } else {
                let key = *tight.keys().max().expect("non-empty");
                let aabb = rng.aabb();
                tree.update(key, &aabb).expect("update");
                tight.insert(key, aabb);
            }

            if step % 25 == 0 {
                tree.validate().expect("valid tree");
            }
        }
        tree.validate().expect("valid tree");

        for (key, aabb) in &tight {
            let fat = tree.fat_aabb(*key).expect("indexed");
            assert!(fat.contains(aabb), "fat box for {key} lost its shape");
        }

        // Every query agrees with brute force over the stored fat boxes
        for _ in 0..40 {
            let region = rng.aabb();
            let mut expected: Vec<u32> = tight
                .keys()
                .copied()
                .filter(|&key| tree.fat_aabb(key).is_some_and(|fat| fat.intersects(&region)))
                .collect();
            expected.sort_unstable();
            assert_eq!(collect_overlaps(&tree, &region), expected);
        }
    }

    #[test]
    fn test_query_can_stop_early() {
        let mut tree = DynamicBvh::new(0.0);
        for key in 0u32..10 {
            tree.insert(key, &cube(Vec3::zeros(), 1.0 + key as f32)).expect("insert");
        }
        let mut visited = 0;
        tree.query_overlapping(&cube(Vec3::zeros(), 0.5), |_| {
            visited += 1;
            if visited == 3 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(visited, 3);
    }

    #[test]
    fn test_ray_query_visits_nearest_first() {
        let mut tree = DynamicBvh::new(0.0);
        for key in 0u32..6 {
            tree.insert(key, &cube(Vec3::new(0.0, 0.0, 10.0 * (6 - key) as f32), 1.0)).expect("insert");
        }
        tree.insert(99, &cube(Vec3::new(20.0, 0.0, 0.0), 1.0)).expect("insert");

        let ray = Ray::new(Vec3::zeros(), Vec3::z());
        let mut order = Vec::new();
        tree.query_ray(&ray, f32::INFINITY, |key, alpha| {
            order.push((key, alpha));
            f32::INFINITY
        });
        let keys: Vec<u32> = order.iter().map(|(key, _)| *key).collect();
        assert_eq!(keys, vec![5, 4, 3, 2, 1, 0]);
        assert!(order.windows(2).all(|pair| pair[0].1 <= pair[1].1));
    }

    #[test]
    fn test_ray_query_early_out() {
        let mut tree = DynamicBvh::new(0.0);
        for key in 0u32..6 {
            tree.insert(key, &cube(Vec3::new(0.0, 0.0, 10.0 * (key + 1) as f32), 1.0)).expect("insert");
        }
        let ray = Ray::new(Vec3::zeros(), Vec3::z());

        let mut visited = Vec::new();
        tree.query_ray(&ray, f32::INFINITY, |key, alpha| {
            visited.push(key);
            alpha + 2.0
        });
        assert_eq!(visited, vec![0]);

        let mut limited = Vec::new();
        tree.query_ray(&ray, 25.0, |key, _| {
            limited.push(key);
            f32::INFINITY
        });
        assert_eq!(limited, vec![0, 1]);
    }

    #[test]
    fn test_stats_and_clear() {
        let mut tree = DynamicBvh::new(0.1);
        assert_eq!(tree.stats(), SpatialIndexStats::default());

        for key in 0u32..16 {
            tree.insert(key, &cube(Vec3::new(key as f32 * 2.5, 0.0, 0.0), 1.0)).expect("insert");
        }
        let stats = tree.stats();
        assert_eq!(stats.leaf_count, 16);
        assert_eq!(stats.node_count, 31);
        assert!(stats.height >= 4);
        assert!(stats.internal_surface_area > 0.0);

        let mut leaves = 0;
        tree.for_each_node(|_, _, is_leaf| {
            if is_leaf {
                leaves += 1;
            }
        });
        assert_eq!(leaves, 16);

        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.height(), 0);
        tree.validate().expect("valid tree");
    }

    #[test]
    fn test_usable_through_trait_object() {
        let mut index: Box<dyn SpatialIndex<u32>> = Box::new(DynamicBvh::new(0.1));
        index.insert(1, &cube(Vec3::zeros(), 1.0)).expect("insert");
        assert!(index.contains(1));
        assert_eq!(index.len(), 1);
        index.remove(1).expect("remove");
        assert!(index.is_empty());
    }
}
