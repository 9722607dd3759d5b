//! Merging of adjacent same-label objects.
//!
//! Two objects are adjacent when they share a label and some pair of their
//! outline edges is parallel and no further apart than `max_dist`. Adjacency
//! is closed transitively with a [`DisjointSet`], and every resulting group
//! is replaced by the union of its members.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::algebra::{label_of, outline, PolygonOps};
use super::kernel::{GeoKernel, GeometryKernel, Segment};
use crate::error::LabelGeomError;
use crate::ir::{AnnotationSet, Bounds, CoordSpace, LocatedObject, MetaValue, Polygon, SCORE_KEY};
use crate::transform;

/// Thresholds for adjacency detection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    /// Largest slope difference for two edges to count as parallel.
    pub max_slope_diff: f64,

    /// Largest distance between two parallel edges for adjacency.
    pub max_dist: f64,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            max_slope_diff: 1e-6,
            max_dist: 1.0,
        }
    }
}

/// Disjoint-set forest over object indices.
///
/// Union by rank with path compression. Roots are deterministic for a
/// given sequence of [`union`](DisjointSet::union) calls.
#[derive(Clone, Debug)]
pub struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    /// Creates `n` singleton sets.
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    /// Representative of the set containing `i`.
    pub fn find(&mut self, i: usize) -> usize {
        let mut root = i;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = i;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    /// Joins the sets containing `a` and `b`. Returns false if they were
    /// already joined.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
        true
    }

    /// Sets with more than one member, each sorted ascending, ordered by
    /// their smallest member.
    pub fn groups(&mut self) -> Vec<Vec<usize>> {
        let n = self.parent.len();
        let mut by_root: Vec<Vec<usize>> = vec![Vec::new(); n];
        for i in 0..n {
            let root = self.find(i);
            by_root[root].push(i);
        }
        let mut groups: Vec<Vec<usize>> = by_root.into_iter().filter(|g| g.len() > 1).collect();
        groups.sort_by_key(|g| g[0]);
        groups
    }
}

/// An outline edge with its precomputed slope.
#[derive(Clone, Copy, Debug)]
struct Edge {
    segment: Segment,
    slope: f64,
}

fn edges_of(polygon: &Polygon) -> Vec<Edge> {
    polygon
        .edges()
        .filter(|(a, b)| a != b)
        .map(|(a, b)| {
            let (dx, dy) = (b.x - a.x, b.y - a.y);
            let slope = if dx == 0.0 {
                if dy > 0.0 {
                    f64::INFINITY
                } else {
                    f64::NEG_INFINITY
                }
            } else {
                dy / dx
            };
            Edge {
                segment: (a, b),
                slope,
            }
        })
        .collect()
}

fn is_parallel(a: f64, b: f64, max_slope_diff: f64) -> bool {
    if a.is_infinite() || b.is_infinite() {
        return a.is_infinite() && b.is_infinite();
    }
    (a == 0.0 && b == 0.0) || (a - b).abs() <= max_slope_diff
}

/// Gap between two bounds; zero if they overlap.
fn bounds_gap(a: &Bounds, b: &Bounds) -> f64 {
    let dx = (b.xmin() - a.xmax()).max(a.xmin() - b.xmax()).max(0.0);
    let dy = (b.ymin() - a.ymax()).max(a.ymin() - b.ymax()).max(0.0);
    (dx * dx + dy * dy).sqrt()
}

/// Merges adjacent same-label objects of an annotation set.
#[derive(Clone, Debug, Default)]
pub struct PolygonMerger<K = GeoKernel> {
    ops: PolygonOps<K>,
    options: MergeOptions,
}

impl PolygonMerger<GeoKernel> {
    /// Merger backed by the default kernel.
    pub fn new(options: MergeOptions) -> Self {
        Self {
            ops: PolygonOps::new(),
            options,
        }
    }
}

impl<K: GeometryKernel> PolygonMerger<K> {
    /// Merger backed by a custom kernel.
    pub fn with_kernel(kernel: K, options: MergeOptions) -> Self {
        Self {
            ops: PolygonOps::with_kernel(kernel),
            options,
        }
    }

    /// The active thresholds.
    pub fn options(&self) -> &MergeOptions {
        &self.options
    }

    /// Index pairs `(i, j)` with `i < j` of adjacent objects, in index order.
    pub fn adjacent_pairs(&self, objects: &[LocatedObject]) -> Vec<(usize, usize)> {
        let outlines: Vec<Polygon> = objects.iter().map(outline).collect();
        let bounds: Vec<Bounds> = outlines.iter().map(Polygon::bounds).collect();
        let edges: Vec<Vec<Edge>> = outlines.iter().map(edges_of).collect();
        let kernel = self.ops.kernel();

        let mut pairs = Vec::new();
        for i in 0..objects.len() {
            for j in (i + 1)..objects.len() {
                if label_of(&objects[i]) != label_of(&objects[j]) {
                    continue;
                }
                if bounds_gap(&bounds[i], &bounds[j]) > self.options.max_dist {
                    continue;
                }
                let adjacent = edges[i].iter().any(|a| {
                    edges[j].iter().any(|b| {
                        is_parallel(a.slope, b.slope, self.options.max_slope_diff)
                            && kernel.segment_distance(a.segment, b.segment) <= self.options.max_dist
                    })
                });
                if adjacent {
                    pairs.push((i, j));
                }
            }
        }
        pairs
    }

    /// Merges the objects of `set`.
    ///
    /// Normalized sets are converted to pixels with `width`/`height` to find
    /// and union the groups; merged objects are converted back afterwards and
    /// every other object is returned exactly as given. Absolute sets ignore
    /// the dimensions.
    ///
    /// # Errors
    /// Returns [`LabelGeomError::MissingDimensions`] for a normalized set
    /// without image dimensions.
    pub fn merge(
        &self,
        set: &AnnotationSet,
        width: u32,
        height: u32,
    ) -> Result<AnnotationSet, LabelGeomError> {
        let merged = match set.space {
            CoordSpace::Absolute => self.merged_groups(&set.objects),
            CoordSpace::Normalized => {
                let absolute = transform::to_absolute(set, width, height)?;
                let mut merged = self.merged_groups(&absolute.objects);
                for (_, object) in merged.iter_mut() {
                    let single = AnnotationSet::absolute(vec![object.clone()]);
                    let normalized = transform::to_normalized(&single, width, height)?;
                    if let Some(back) = normalized.objects.into_iter().next() {
                        *object = back;
                    }
                }
                merged
            }
        };
        Ok(set.with_objects(assemble(&set.objects, merged)))
    }

    /// Groups that were successfully unioned, with their merged object.
    fn merged_groups(&self, objects: &[LocatedObject]) -> Vec<(Vec<usize>, LocatedObject)> {
        let mut forest = DisjointSet::new(objects.len());
        for (i, j) in self.adjacent_pairs(objects) {
            forest.union(i, j);
        }
        let groups = forest.groups();
        debug!("{} merge group(s) among {} object(s)", groups.len(), objects.len());

        groups
            .into_iter()
            .filter_map(|group| {
                let merged = self.merge_group(objects, &group)?;
                Some((group, merged))
            })
            .collect()
    }

    /// Unions one group. Returns `None` (members kept as they are) when the
    /// kernel fails.
    fn merge_group(&self, objects: &[LocatedObject], group: &[usize]) -> Option<LocatedObject> {
        let kernel = self.ops.kernel();
        let mut members: Vec<Polygon> = Vec::with_capacity(group.len());
        for &i in group {
            match kernel.repair(&outline(&objects[i])) {
                Ok(shape) => members.extend(shape.parts),
                Err(e) => {
                    warn!("repairing merge member {} failed, group left unmerged: {}", i, e);
                    return None;
                }
            }
        }

        let union = match kernel.union(&members) {
            Ok(shape) => shape,
            Err(e) => {
                warn!("union of merge group {:?} failed, group left unmerged: {}", group, e);
                return None;
            }
        };

        let first = &objects[group[0]];
        let mut merged = self.ops.polygon_to_located_object(&union, first.label())?;
        let mut metadata = first.metadata.clone();
        metadata.extend(merged.metadata);

        let scores: Vec<f64> = group.iter().filter_map(|&i| objects[i].score()).collect();
        if scores.is_empty() {
            metadata.remove(SCORE_KEY);
        } else {
            let mean = scores.iter().sum::<f64>() / scores.len() as f64;
            metadata.insert(SCORE_KEY.to_string(), MetaValue::Float(mean));
        }
        merged.metadata = metadata;
        Some(merged)
    }
}

/// Each merged object takes the slot of its group's first member and the
/// other members are dropped. Objects outside merged groups are cloned.
fn assemble(objects: &[LocatedObject], merged: Vec<(Vec<usize>, LocatedObject)>) -> Vec<LocatedObject> {
    let mut replacement: Vec<Option<LocatedObject>> = vec![None; objects.len()];
    let mut absorbed = vec![false; objects.len()];
    for (group, object) in merged {
        for &member in &group[1..] {
            absorbed[member] = true;
        }
        replacement[group[0]] = Some(object);
    }

    objects
        .iter()
        .enumerate()
        .filter(|(i, _)| !absorbed[*i])
        .map(|(i, object)| replacement[i].take().unwrap_or_else(|| object.clone()))
        .collect()
}

/// Merges adjacent same-label objects with the default kernel.
///
/// See [`PolygonMerger::merge`].
pub fn merge_polygons(
    set: &AnnotationSet,
    width: u32,
    height: u32,
    options: &MergeOptions,
) -> Result<AnnotationSet, LabelGeomError> {
    PolygonMerger::new(options.clone()).merge(set, width, height)
}
