//! Redundant utility-network planning over asset centroids.
//!
//! Candidate edges connect every asset pair within range; the plan is the
//! minimum spanning tree plus a budget of cheapest non-tree edges, forming a
//! reliability loop. The loop augmentation is a greedy heuristic: it keeps
//! every asset reachable under single-edge failures wherever a redundant edge
//! bridges the cut, but it is not a k-edge-connectivity guarantee.

use geo::Coord;
use rand::{rngs::StdRng, seq::IndexedRandom, SeedableRng};
use rstar::{primitives::GeomWithData, RTree};
use serde::Serialize;
use tracing::{debug, warn};

use crate::geom::dist;

/// One transformer serves roughly this many assets.
const ASSETS_PER_TRANSFORMER: f64 = 15.0;
/// Iteration cap for the clustering step.
const KMEANS_MAX_ITERS: usize = 32;
/// Display length of drainage direction vectors, metres.
const DRAINAGE_DISPLAY_LENGTH: f64 = 5.0;

/// Closed set of roles an asset can carry into the utility planner.
/// Road-tagged assets are excluded from the network entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetRole {
    Lot,
    Service,
    Treatment,
    Road,
}

/// An asset reduced to its centroid and role.
#[derive(Debug, Clone, Copy)]
pub struct Asset {
    pub centroid: Coord<f64>,
    pub role: AssetRole,
}

/// Undirected edge between two asset indices, weighted by distance in metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkEdge {
    pub a: usize,
    pub b: usize,
    pub weight: f64,
}

/// Gravity-drainage indicator: a start point and a fixed-length direction
/// vector toward the treatment outlet. Not a flow computation.
#[derive(Debug, Clone, Copy)]
pub struct Drainage {
    pub start: Coord<f64>,
    pub direction: Coord<f64>,
}

/// Full output of the infrastructure planner.
#[derive(Debug, Clone, Default)]
pub struct UtilityNetwork {
    pub edges: Vec<NetworkEdge>,
    pub transformers: Vec<Coord<f64>>,
    pub drainage: Vec<Drainage>,
    /// Assets dropped because they sat outside the largest connected
    /// component of the candidate graph.
    pub unreachable_assets: usize,
}

/// Union-find with union by rank and path halving.
struct DisjointSets {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSets {
    fn new(n: usize) -> Self {
        Self { parent: (0..n).collect(), rank: vec![0; n] }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Merge the sets of `a` and `b`; false if they were already joined.
    fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb { return false }
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
}

/// Build the looped utility graph, transformer sites, and drainage vectors.
///
/// Fewer than two eligible assets yields an entirely empty network.
pub fn build_network(
    assets: &[Asset],
    max_edge_distance: f64,
    redundancy_ratio: f64,
    seed: u64,
) -> UtilityNetwork {
    let eligible: Vec<usize> = assets.iter().enumerate()
        .filter(|(_, asset)| asset.role != AssetRole::Road)
        .map(|(i, _)| i)
        .collect();

    if eligible.len() < 2 {
        return UtilityNetwork::default();
    }

    // Candidate edges: every eligible pair within range, weighted by distance
    // (fixed-point centimetres so the ordering is total and stable).
    let tree = RTree::bulk_load(
        eligible.iter()
            .map(|&i| GeomWithData::new([assets[i].centroid.x, assets[i].centroid.y], i))
            .collect(),
    );

    let mut candidates: Vec<(i64, usize, usize)> = Vec::new();
    for &i in &eligible {
        let center = [assets[i].centroid.x, assets[i].centroid.y];
        for neighbor in tree.locate_within_distance(center, max_edge_distance * max_edge_distance) {
            let j = neighbor.data;
            if j <= i { continue }
            let weight_cm = (dist(assets[i].centroid, assets[j].centroid) * 100.0).round() as i64;
            candidates.push((weight_cm, i, j));
        }
    }
    candidates.sort_unstable();

    // Restrict to the largest connected component; smaller components are
    // dropped and reported, not repaired.
    let mut components = DisjointSets::new(assets.len());
    for &(_, a, b) in &candidates {
        components.union(a, b);
    }

    let mut sizes = vec![0usize; assets.len()];
    for &i in &eligible {
        sizes[components.find(i)] += 1;
    }
    let main_root = (0..assets.len()).max_by_key(|&r| sizes[r]).unwrap_or(0);

    let mut reachable = vec![false; assets.len()];
    for &i in &eligible {
        reachable[i] = components.find(i) == components.find(main_root);
    }
    let reachable_count = sizes[main_root];
    let unreachable_assets = eligible.len() - reachable_count;
    if unreachable_assets > 0 {
        warn!(
            dropped = unreachable_assets,
            kept = reachable_count,
            "candidate graph is disconnected; dropping smaller components"
        );
    }

    candidates.retain(|&(_, a, b)| reachable[a] && reachable[b]);

    // Kruskal over the sorted candidates.
    let mut mst = DisjointSets::new(assets.len());
    let mut in_tree = vec![false; candidates.len()];
    let mut edges = Vec::with_capacity(reachable_count);
    for (k, &(weight_cm, a, b)) in candidates.iter().enumerate() {
        if mst.union(a, b) {
            in_tree[k] = true;
            edges.push(NetworkEdge { a, b, weight: weight_cm as f64 / 100.0 });
        }
    }

    // Reliability loop: cheapest non-tree edges first, up to the budget.
    let mut budget = (reachable_count as f64 * redundancy_ratio).floor() as usize;
    for (k, &(weight_cm, a, b)) in candidates.iter().enumerate() {
        if budget == 0 { break }
        if in_tree[k] { continue }
        edges.push(NetworkEdge { a, b, weight: weight_cm as f64 / 100.0 });
        budget -= 1;
    }
    debug!(edges = edges.len(), assets = reachable_count, "utility loop assembled");

    // Transformer siting: k-means over reachable centroids.
    let reachable_indices: Vec<usize> = eligible.iter().copied().filter(|&i| reachable[i]).collect();
    let points: Vec<Coord<f64>> = reachable_indices.iter().map(|&i| assets[i].centroid).collect();
    let clusters = ((reachable_count as f64 / ASSETS_PER_TRANSFORMER).round() as usize)
        .clamp(1, reachable_count);
    let mut rng = StdRng::seed_from_u64(seed);
    let transformers = cluster_centers(&points, clusters, &mut rng);

    // Drainage: every reachable asset points at the treatment outlet.
    let outlet = reachable_indices.iter()
        .find(|&&i| assets[i].role == AssetRole::Treatment)
        .map(|&i| assets[i].centroid);
    let drainage = match outlet {
        Some(outlet) => reachable_indices.iter()
            .map(|&i| {
                let start = assets[i].centroid;
                let length = dist(start, outlet);
                let direction = if length < 1e-9 {
                    Coord { x: 0.0, y: 0.0 }
                } else {
                    Coord {
                        x: (outlet.x - start.x) / length * DRAINAGE_DISPLAY_LENGTH,
                        y: (outlet.y - start.y) / length * DRAINAGE_DISPLAY_LENGTH,
                    }
                };
                Drainage { start, direction }
            })
            .collect(),
        None => Vec::new(),
    };

    UtilityNetwork { edges, transformers, drainage, unreachable_assets }
}

/// Lloyd's algorithm with a fixed iteration cap. Empty clusters keep their
/// previous center.
fn cluster_centers(points: &[Coord<f64>], k: usize, rng: &mut StdRng) -> Vec<Coord<f64>> {
    debug_assert!(k >= 1 && k <= points.len());

    let mut centers: Vec<Coord<f64>> = points.choose_multiple(rng, k).copied().collect();
    let mut assignment = vec![usize::MAX; points.len()];

    for _ in 0..KMEANS_MAX_ITERS {
        let mut changed = false;
        for (p, point) in points.iter().enumerate() {
            let nearest = centers.iter().enumerate()
                .min_by(|(_, a), (_, b)| dist(*point, **a).total_cmp(&dist(*point, **b)))
                .map(|(c, _)| c)
                .unwrap_or(0);
            if assignment[p] != nearest {
                assignment[p] = nearest;
                changed = true;
            }
        }
        if !changed { break }

        let mut sums = vec![(0.0f64, 0.0f64, 0usize); k];
        for (p, point) in points.iter().enumerate() {
            let entry = &mut sums[assignment[p]];
            entry.0 += point.x;
            entry.1 += point.y;
            entry.2 += 1;
        }
        for (c, &(sx, sy, count)) in sums.iter().enumerate() {
            if count > 0 {
                centers[c] = Coord { x: sx / count as f64, y: sy / count as f64 };
            }
        }
    }
    centers
}
