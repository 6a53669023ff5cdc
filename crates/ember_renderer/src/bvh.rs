//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! Nodes live in a flat arena. An interior node's first child is the node
//! right after it; the second child's index is stored. Leaves reference a
//! contiguous range of a reordered primitive index array, so every primitive
//! belongs to exactly one leaf.
//!
//! Traversal is iterative with an explicit stack, visits the nearer child
//! first, and skips any subtree whose box is entered beyond the closest hit
//! found so far.

use crate::error::SceneError;
use crate::interaction::SurfaceHit;
use ember_math::{Aabb, Bounded, Interval, Ray, Vec3};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Number of buckets per axis for the binned SAH.
const SAH_BUCKETS: usize = 16;

/// Relative cost of one box test against one primitive test.
const TRAVERSAL_COST: f32 = 0.125;

/// Hard cap on tree depth; also bounds the traversal stack.
const MAX_TREE_DEPTH: usize = 96;

/// How a node's primitives are divided between its two children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMethod {
    /// Split at the midpoint of the centroid bounds on the widest axis.
    Middle,
    /// Split at the centroid median on the widest axis.
    EqualCounts,
    /// Binned surface-area heuristic over all three axes.
    #[default]
    Sah,
}

/// Build parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BvhOptions {
    pub split: SplitMethod,
    /// Ranges this small always become leaves
    pub max_leaf_size: usize,
    /// Nodes at this depth become leaves regardless of size
    pub max_depth: usize,
}

impl Default for BvhOptions {
    fn default() -> Self {
        Self {
            split: SplitMethod::Sah,
            max_leaf_size: 4,
            max_depth: 64,
        }
    }
}

/// BVH node - either an interior node with two children or a leaf with primitives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BvhNode {
    Interior {
        bounds: Aabb,
        /// Arena index of the second child; the first is at `self + 1`
        second_child: u32,
        /// Axis the primitives were split on
        axis: u8,
    },
    Leaf {
        bounds: Aabb,
        /// Offset into the reordered primitive indices
        first: u32,
        count: u32,
    },
}

impl BvhNode {
    #[inline]
    pub fn bounds(&self) -> &Aabb {
        match self {
            BvhNode::Interior { bounds, .. } | BvhNode::Leaf { bounds, .. } => bounds,
        }
    }
}

/// Shape of a built tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BvhStats {
    pub primitives: usize,
    pub nodes: usize,
    pub leaves: usize,
    pub depth: usize,
}

/// Work done by one query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalStats {
    pub nodes_visited: usize,
    pub primitive_tests: usize,
}

/// Immutable hierarchy over a primitive slice.
#[derive(Debug, Clone)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    indices: Vec<u32>,
    stats: BvhStats,
}

/// Per-primitive data used only while building.
struct BuildItem {
    bounds: Aabb,
    centroid: Vec3,
}

struct Builder<'a> {
    items: &'a [BuildItem],
    options: BvhOptions,
    nodes: Vec<BvhNode>,
    leaves: usize,
    depth: usize,
}

impl Bvh {
    /// Build a hierarchy over `primitives`.
    ///
    /// Fails if the slice is empty or any primitive has non-finite bounds.
    pub fn build<P: Bounded>(primitives: &[P], options: BvhOptions) -> Result<Bvh, SceneError> {
        if primitives.is_empty() {
            return Err(SceneError::EmptyScene);
        }

        let start = Instant::now();
        let mut items = Vec::with_capacity(primitives.len());
        for (index, primitive) in primitives.iter().enumerate() {
            let bounds = primitive.bounding_box();
            if !bounds.is_finite() {
                return Err(SceneError::NonFiniteBounds { index });
            }
            items.push(BuildItem {
                bounds,
                centroid: bounds.centroid(),
            });
        }

        let options = BvhOptions {
            max_leaf_size: options.max_leaf_size.max(1),
            max_depth: options.max_depth.min(MAX_TREE_DEPTH),
            ..options
        };

        let mut indices: Vec<u32> = (0..primitives.len() as u32).collect();
        let mut builder = Builder {
            items: &items,
            options,
            nodes: Vec::with_capacity(2 * primitives.len()),
            leaves: 0,
            depth: 0,
        };
        builder.build_node(&mut indices, 0, 0);

        let stats = BvhStats {
            primitives: primitives.len(),
            nodes: builder.nodes.len(),
            leaves: builder.leaves,
            depth: builder.depth,
        };
        log::info!(
            "BVH built ({:?}): {} primitives, {} nodes, {} leaves, depth {} in {:.2?}",
            options.split,
            stats.primitives,
            stats.nodes,
            stats.leaves,
            stats.depth,
            start.elapsed()
        );

        Ok(Bvh {
            nodes: builder.nodes,
            indices,
            stats,
        })
    }

    pub fn stats(&self) -> BvhStats {
        self.stats
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Primitive indices in leaf order.
    pub fn primitive_indices(&self) -> &[u32] {
        &self.indices
    }

    /// Bounds of the whole hierarchy.
    pub fn bounds(&self) -> Aabb {
        self.nodes.first().map(|n| *n.bounds()).unwrap_or(Aabb::EMPTY)
    }

    /// Closest hit along `ray` within `ray_t`.
    ///
    /// `hit_primitive(index, interval)` intersects one primitive; the interval
    /// shrinks as closer hits are found. Returns the index of the primitive hit.
    pub fn intersect<F>(&self, ray: &Ray, ray_t: Interval, hit_primitive: F) -> Option<(usize, SurfaceHit)>
    where
        F: FnMut(usize, Interval) -> Option<SurfaceHit>,
    {
        let mut stats = TraversalStats::default();
        self.traverse(ray, ray_t, hit_primitive, &mut stats)
    }

    /// [`Bvh::intersect`] that also reports how much work the query did.
    pub fn intersect_with_stats<F>(
        &self,
        ray: &Ray,
        ray_t: Interval,
        hit_primitive: F,
    ) -> (Option<(usize, SurfaceHit)>, TraversalStats)
    where
        F: FnMut(usize, Interval) -> Option<SurfaceHit>,
    {
        let mut stats = TraversalStats::default();
        let hit = self.traverse(ray, ray_t, hit_primitive, &mut stats);
        (hit, stats)
    }

    /// True if any primitive is hit within `ray_t`. Stops at the first hit found.
    pub fn occluded<F>(&self, ray: &Ray, ray_t: Interval, mut hit_primitive: F) -> bool
    where
        F: FnMut(usize, Interval) -> Option<SurfaceHit>,
    {
        let mut stack = [0u32; MAX_TREE_DEPTH + 2];
        let mut len = 1;

        while len > 0 {
            len -= 1;
            let index = stack[len];
            let node = &self.nodes[index as usize];
            if !node.bounds().hit(ray, ray_t) {
                continue;
            }

            match *node {
                BvhNode::Leaf { first, count, .. } => {
                    let range = first as usize..(first + count) as usize;
                    if self.indices[range].iter().any(|&i| hit_primitive(i as usize, ray_t).is_some()) {
                        return true;
                    }
                }
                BvhNode::Interior { second_child, .. } => {
                    stack[len] = second_child;
                    stack[len + 1] = index + 1;
                    len += 2;
                }
            }
        }
        false
    }

    fn traverse<F>(
        &self,
        ray: &Ray,
        ray_t: Interval,
        mut hit_primitive: F,
        stats: &mut TraversalStats,
    ) -> Option<(usize, SurfaceHit)>
    where
        F: FnMut(usize, Interval) -> Option<SurfaceHit>,
    {
        let mut closest: Option<(usize, SurfaceHit)> = None;
        let mut t_best = ray_t.max;

        stats.nodes_visited += 1;
        let root_entry = self.nodes[0].bounds().hit_distance(ray, ray_t)?;

        // Pending nodes with the distance at which the ray enters their box
        let mut stack = [(0u32, 0.0f32); MAX_TREE_DEPTH + 2];
        stack[0] = (0, root_entry);
        let mut len = 1;

        while len > 0 {
            len -= 1;
            let (index, entry) = stack[len];
            if entry >= t_best {
                continue;
            }

            match self.nodes[index as usize] {
                BvhNode::Leaf { first, count, .. } => {
                    for &prim in &self.indices[first as usize..(first + count) as usize] {
                        stats.primitive_tests += 1;
                        if let Some(hit) = hit_primitive(prim as usize, ray_t.with_max(t_best)) {
                            t_best = hit.t;
                            closest = Some((prim as usize, hit));
                        }
                    }
                }
                BvhNode::Interior { second_child, .. } => {
                    let search = ray_t.with_max(t_best);
                    let first_child = index + 1;
                    stats.nodes_visited += 2;
                    let near = self.nodes[first_child as usize].bounds().hit_distance(ray, search);
                    let far = self.nodes[second_child as usize].bounds().hit_distance(ray, search);

                    // Push the farther child first so the nearer one is popped next
                    match (near, far) {
                        (Some(a), Some(b)) => {
                            let (first, second) = if a <= b {
                                ((first_child, a), (second_child, b))
                            } else {
                                ((second_child, b), (first_child, a))
                            };
                            stack[len] = second;
                            stack[len + 1] = first;
                            len += 2;
                        }
                        (Some(a), None) => {
                            stack[len] = (first_child, a);
                            len += 1;
                        }
                        (None, Some(b)) => {
                            stack[len] = (second_child, b);
                            len += 1;
                        }
                        (None, None) => {}
                    }
                }
            }
        }

        closest
    }
}

impl<'a> Builder<'a> {
    /// Build the subtree over `indices` and return its arena index.
    fn build_node(&mut self, indices: &mut [u32], offset: usize, depth: usize) -> u32 {
        self.depth = self.depth.max(depth);
        let node_index = self.nodes.len() as u32;

        let bounds = indices
            .iter()
            .fold(Aabb::EMPTY, |acc, &i| Aabb::surrounding(&acc, &self.items[i as usize].bounds));

        if indices.len() <= self.options.max_leaf_size || depth >= self.options.max_depth {
            return self.push_leaf(bounds, offset, indices.len());
        }

        let centroid_bounds = Aabb::enclosing(indices.iter().map(|&i| self.items[i as usize].centroid));
        let (axis, mid) = self.split(indices, &bounds, &centroid_bounds);

        self.nodes.push(BvhNode::Interior {
            bounds,
            second_child: 0,
            axis: axis as u8,
        });

        let (left, right) = indices.split_at_mut(mid);
        self.build_node(left, offset, depth + 1);
        let second = self.build_node(right, offset + mid, depth + 1);

        if let BvhNode::Interior { second_child, .. } = &mut self.nodes[node_index as usize] {
            *second_child = second;
        }
        node_index
    }

    fn push_leaf(&mut self, bounds: Aabb, offset: usize, count: usize) -> u32 {
        let index = self.nodes.len() as u32;
        self.nodes.push(BvhNode::Leaf {
            bounds,
            first: offset as u32,
            count: count as u32,
        });
        self.leaves += 1;
        index
    }

    /// Reorder `indices` and return the split axis and the size of the left part.
    /// Both parts are always non-empty.
    fn split(&self, indices: &mut [u32], bounds: &Aabb, centroid_bounds: &Aabb) -> (usize, usize) {
        let axis = centroid_bounds.longest_axis();

        // All centroids coincide: no spatial split can separate them
        if !(centroid_bounds.axis_interval(axis).size() > 0.0) {
            return (axis, indices.len() / 2);
        }

        let mid = match self.options.split {
            SplitMethod::Middle => {
                let pivot = centroid_bounds.centroid()[axis];
                partition(indices, |i| self.items[i as usize].centroid[axis] < pivot)
            }
            SplitMethod::EqualCounts => self.median_split(indices, axis),
            SplitMethod::Sah => match self.sah_split(indices, bounds, centroid_bounds) {
                Some((sah_axis, mid)) => return (sah_axis, mid),
                None => 0,
            },
        };

        if mid == 0 || mid == indices.len() {
            (axis, self.median_split(indices, axis))
        } else {
            (axis, mid)
        }
    }

    fn median_split(&self, indices: &mut [u32], axis: usize) -> usize {
        let mid = indices.len() / 2;
        indices.select_nth_unstable_by(mid, |&a, &b| {
            let ca = self.items[a as usize].centroid[axis];
            let cb = self.items[b as usize].centroid[axis];
            ca.total_cmp(&cb)
        });
        mid
    }

    /// Cheapest bucket boundary over all axes, or `None` if every candidate
    /// leaves one side empty.
    fn sah_split(&self, indices: &mut [u32], bounds: &Aabb, centroid_bounds: &Aabb) -> Option<(usize, usize)> {
        let parent_area = bounds.surface_area();
        let mut best: Option<(f32, usize, usize)> = None;

        for axis in 0..3 {
            let extent = centroid_bounds.axis_interval(axis);
            if !(extent.size() > 0.0) {
                continue;
            }

            let mut counts = [0usize; SAH_BUCKETS];
            let mut boxes = [Aabb::EMPTY; SAH_BUCKETS];
            for &i in indices.iter() {
                let item = &self.items[i as usize];
                let b = bucket_of(item.centroid[axis], extent);
                counts[b] += 1;
                boxes[b] = Aabb::surrounding(&boxes[b], &item.bounds);
            }

            // Sweep from the right to get suffix areas, then from the left
            let mut right_area = [0.0f32; SAH_BUCKETS];
            let mut right_count = [0usize; SAH_BUCKETS];
            let mut acc = Aabb::EMPTY;
            let mut n = 0;
            for b in (1..SAH_BUCKETS).rev() {
                acc = Aabb::surrounding(&acc, &boxes[b]);
                n += counts[b];
                right_area[b] = acc.surface_area();
                right_count[b] = n;
            }

            let mut left = Aabb::EMPTY;
            let mut left_count = 0;
            for b in 0..SAH_BUCKETS - 1 {
                left = Aabb::surrounding(&left, &boxes[b]);
                left_count += counts[b];
                let right = right_count[b + 1];
                if left_count == 0 || right == 0 {
                    continue;
                }
                let cost = TRAVERSAL_COST
                    + (left_count as f32 * left.surface_area() + right as f32 * right_area[b + 1]) / parent_area;
                if best.map_or(true, |(c, _, _)| cost < c) {
                    best = Some((cost, axis, b));
                }
            }
        }

        let (_, axis, boundary) = best?;
        let extent = centroid_bounds.axis_interval(axis);
        let mid = partition(indices, |i| bucket_of(self.items[i as usize].centroid[axis], extent) <= boundary);
        (mid > 0 && mid < indices.len()).then_some((axis, mid))
    }
}

#[inline]
fn bucket_of(value: f32, extent: Interval) -> usize {
    let b = ((value - extent.min) / extent.size() * SAH_BUCKETS as f32) as usize;
    b.min(SAH_BUCKETS - 1)
}

/// Move the elements matching `pred` to the front; returns how many matched.
fn partition<F: FnMut(u32) -> bool>(items: &mut [u32], mut pred: F) -> usize {
    let mut first = 0;
    for i in 0..items.len() {
        if pred(items[i]) {
            items.swap(first, i);
            first += 1;
        }
    }
    first
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;
    use crate::sampling::Random;
    use crate::Sphere;

    const ALL_SPLITS: [SplitMethod; 3] = [SplitMethod::Middle, SplitMethod::EqualCounts, SplitMethod::Sah];

    fn random_spheres(n: usize, seed: u64) -> Vec<Sphere> {
        let mut rng = Random::new(seed);
        (0..n)
            .map(|_| {
                let center = (Vec3::new(rng.uniform(), rng.uniform(), rng.uniform()) - 0.5) * 20.0;
                Sphere::new(center, 0.1 + 0.4 * rng.uniform()).unwrap()
            })
            .collect()
    }

    fn options(split: SplitMethod) -> BvhOptions {
        BvhOptions {
            split,
            ..BvhOptions::default()
        }
    }

    fn linear_closest(spheres: &[Sphere], ray: &Ray, ray_t: Interval) -> Option<(usize, SurfaceHit)> {
        let mut closest = None;
        let mut t_best = ray_t.max;
        for (i, s) in spheres.iter().enumerate() {
            if let Some(hit) = s.intersect(ray, ray_t.with_max(t_best)) {
                t_best = hit.t;
                closest = Some((i, hit));
            }
        }
        closest
    }

    #[test]
    fn test_bvh_empty_fails() {
        let spheres: Vec<Sphere> = Vec::new();
        assert_eq!(Bvh::build(&spheres, BvhOptions::default()).unwrap_err(), SceneError::EmptyScene);
    }

    #[test]
    fn test_bvh_non_finite_bounds_fails() {
        let boxes = vec![
            Aabb::from_points(Vec3::ZERO, Vec3::ONE),
            Aabb::from_points(Vec3::ZERO, Vec3::new(f32::INFINITY, 1.0, 1.0)),
        ];
        assert_eq!(
            Bvh::build(&boxes, BvhOptions::default()).unwrap_err(),
            SceneError::NonFiniteBounds { index: 1 }
        );
    }

    #[test]
    fn test_bvh_single_primitive_is_leaf() {
        let spheres = random_spheres(1, 1);
        let bvh = Bvh::build(&spheres, BvhOptions::default()).unwrap();
        assert_eq!(bvh.nodes().len(), 1);
        assert!(matches!(bvh.nodes()[0], BvhNode::Leaf { first: 0, count: 1, .. }));
    }

    #[test]
    fn test_bvh_every_primitive_in_one_leaf() {
        let spheres = random_spheres(500, 2);
        for split in ALL_SPLITS {
            let bvh = Bvh::build(&spheres, options(split)).unwrap();

            let mut seen = Vec::new();
            for node in bvh.nodes() {
                if let BvhNode::Leaf { first, count, .. } = *node {
                    assert!(count > 0);
                    assert!(count as usize <= 4);
                    seen.extend_from_slice(&bvh.primitive_indices()[first as usize..(first + count) as usize]);
                }
            }
            seen.sort_unstable();
            let expected: Vec<u32> = (0..500).collect();
            assert_eq!(seen, expected, "{split:?}");
            assert_eq!(bvh.stats().leaves + (bvh.stats().leaves - 1), bvh.stats().nodes);
        }
    }

    #[test]
    fn test_bvh_interior_bounds_contain_children() {
        let spheres = random_spheres(300, 3);
        for split in ALL_SPLITS {
            let bvh = Bvh::build(&spheres, options(split)).unwrap();
            for (i, node) in bvh.nodes().iter().enumerate() {
                if let BvhNode::Interior { bounds, second_child, .. } = node {
                    assert!(bounds.contains_box(bvh.nodes()[i + 1].bounds()));
                    assert!(bounds.contains_box(bvh.nodes()[*second_child as usize].bounds()));
                }
            }
            for (i, s) in spheres.iter().enumerate() {
                assert!(bvh.bounds().contains_box(&s.bounding_box()), "sphere {i}");
            }
        }
    }

    #[test]
    fn test_bvh_matches_linear_scan() {
        let spheres = random_spheres(200, 4);
        let mut rng = Random::new(5);
        let ray_t = Interval::new(0.001, f32::INFINITY);

        for split in ALL_SPLITS {
            let bvh = Bvh::build(&spheres, options(split)).unwrap();
            for _ in 0..2000 {
                let origin = (Vec3::new(rng.uniform(), rng.uniform(), rng.uniform()) - 0.5) * 30.0;
                let ray = Ray::new(origin, rng.unit_vector(), 0.0);

                let expected = linear_closest(&spheres, &ray, ray_t);
                let got = bvh.intersect(&ray, ray_t, |i, t| spheres[i].intersect(&ray, t));
                match (expected, got) {
                    (None, None) => {}
                    (Some((_, a)), Some((_, b))) => assert!((a.t - b.t).abs() < 1e-4, "{split:?}: {} vs {}", a.t, b.t),
                    (a, b) => panic!("{split:?}: linear {a:?} vs bvh {b:?}"),
                }
            }
        }
    }

    #[test]
    fn test_bvh_identical_centroids_terminate() {
        let spheres: Vec<Sphere> = (0..64).map(|_| Sphere::new(Vec3::ONE, 1.0).unwrap()).collect();
        for split in ALL_SPLITS {
            let bvh = Bvh::build(&spheres, options(split)).unwrap();
            assert!(bvh.stats().depth <= 64);
            let leaf_total: u32 = bvh
                .nodes()
                .iter()
                .filter_map(|n| match n {
                    BvhNode::Leaf { count, .. } => Some(*count),
                    _ => None,
                })
                .sum();
            assert_eq!(leaf_total, 64);
        }
    }

    #[test]
    fn test_bvh_max_depth_forces_leaves() {
        let spheres = random_spheres(256, 6);
        let opts = BvhOptions {
            max_depth: 2,
            ..BvhOptions::default()
        };
        let bvh = Bvh::build(&spheres, opts).unwrap();
        assert!(bvh.stats().depth <= 2);
        assert!(bvh.stats().leaves <= 4);
    }

    #[test]
    fn test_bvh_occluded() {
        let spheres: Vec<Sphere> = (0..10)
            .map(|i| Sphere::new(Vec3::new(i as f32 * 2.0, 0.0, -5.0), 0.5).unwrap())
            .collect();
        let bvh = Bvh::build(&spheres, BvhOptions::default()).unwrap();

        let blocked = Ray::new(Vec3::new(4.0, 0.0, 0.0), Vec3::NEG_Z, 0.0);
        assert!(bvh.occluded(&blocked, Interval::new(0.001, 10.0), |i, t| spheres[i].intersect(&blocked, t)));
        // Interval ends before the sphere
        assert!(!bvh.occluded(&blocked, Interval::new(0.001, 4.0), |i, t| spheres[i].intersect(&blocked, t)));

        let clear = Ray::new(Vec3::new(5.0, 0.0, 0.0), Vec3::NEG_Z, 0.0);
        assert!(!bvh.occluded(&clear, Interval::new(0.001, 100.0), |i, t| spheres[i].intersect(&clear, t)));
    }

    #[test]
    fn test_bvh_prunes_primitive_tests() {
        let spheres = random_spheres(1000, 7);
        let bvh = Bvh::build(&spheres, BvhOptions::default()).unwrap();
        let mut rng = Random::new(8);
        let ray_t = Interval::new(0.001, f32::INFINITY);

        let mut tests = 0;
        let rays = 500;
        for _ in 0..rays {
            let origin = (Vec3::new(rng.uniform(), rng.uniform(), rng.uniform()) - 0.5) * 30.0;
            let ray = Ray::new(origin, rng.unit_vector(), 0.0);
            let (_, stats) = bvh.intersect_with_stats(&ray, ray_t, |i, t| spheres[i].intersect(&ray, t));
            tests += stats.primitive_tests;
        }
        assert!(tests < rays * spheres.len() / 10, "{tests} primitive tests");
    }

    #[test]
    fn test_split_method_serde_names() {
        let json = serde_json::to_string(&SplitMethod::EqualCounts).unwrap();
        assert_eq!(json, "\"equal_counts\"");
        let opts: BvhOptions = serde_json::from_str(r#"{"split":"middle"}"#).unwrap();
        assert_eq!(opts.split, SplitMethod::Middle);
        assert_eq!(opts.max_leaf_size, 4);
    }
}
