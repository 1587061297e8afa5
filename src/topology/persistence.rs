//! Zero-dimensional persistent homology of a point cloud.
//!
//! Under the Vietoris-Rips filtration every point is born as its own
//! component at radius 0. Processing edges in order of length with a
//! union-find, each edge that joins two components kills one of them at
//! that length; this is exactly single-linkage clustering and yields the
//! minimum spanning tree edge lengths as the finite H0 deaths. One
//! component never dies and carries an infinite death.
//!
//! The hot path runs once per timestamp, so all scratch space lives in a
//! [`PersistenceWorkspace`] that is reused across calls.

/// A persistence pair `[birth, death)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersistencePair {
    pub birth: f64,
    pub death: f64,
}

impl PersistencePair {
    /// Lifetime of the feature.
    pub fn lifetime(&self) -> f64 {
        self.death - self.birth
    }

    /// Is this the essential (never dying) component?
    pub fn is_essential(&self) -> bool {
        self.death.is_infinite()
    }
}

/// Reusable buffers for H0 computation.
#[derive(Debug, Default)]
pub struct PersistenceWorkspace {
    edges: Vec<(f64, u32, u32)>,
    parent: Vec<u32>,
    rank: Vec<u8>,
    deaths: Vec<f64>,
    lifetimes: Vec<f64>,
}

impl PersistenceWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Workspace pre-sized for clouds of `n_points` points.
    pub fn with_capacity(n_points: usize) -> Self {
        Self {
            edges: Vec::with_capacity(n_points * n_points.saturating_sub(1) / 2),
            parent: Vec::with_capacity(n_points),
            rank: Vec::with_capacity(n_points),
            deaths: Vec::with_capacity(n_points),
            lifetimes: Vec::with_capacity(n_points),
        }
    }

    /// Finite H0 death radii of a row-major `n x dimension` point cloud, in
    /// merge order.
    ///
    /// Returns `n - 1` values for `n >= 1` points (duplicate points give
    /// zero-radius deaths) and nothing for an empty cloud.
    pub fn h0_deaths(&mut self, points: &[f64], dimension: usize) -> &[f64] {
        self.deaths.clear();
        if dimension == 0 || points.len() < 2 * dimension {
            return &self.deaths;
        }
        let n = points.len() / dimension;

        self.edges.clear();
        for i in 0..n {
            let pi = &points[i * dimension..(i + 1) * dimension];
            for j in (i + 1)..n {
                let pj = &points[j * dimension..(j + 1) * dimension];
                let d2: f64 = pi.iter().zip(pj).map(|(a, b)| (a - b) * (a - b)).sum();
                self.edges.push((d2.sqrt(), i as u32, j as u32));
            }
        }
        self.edges.sort_by(|a, b| {
            a.0.total_cmp(&b.0)
                .then(a.1.cmp(&b.1))
                .then(a.2.cmp(&b.2))
        });

        self.parent.clear();
        self.parent.extend(0..n as u32);
        self.rank.clear();
        self.rank.resize(n, 0);

        for k in 0..self.edges.len() {
            let (length, i, j) = self.edges[k];
            let ri = find(&mut self.parent, i);
            let rj = find(&mut self.parent, j);
            if ri == rj {
                continue;
            }
            // All births are 0; the component rooted at the larger index is
            // treated as the younger one and dies here.
            let (survivor, dying) = if ri < rj { (ri, rj) } else { (rj, ri) };
            union(&mut self.parent, &mut self.rank, survivor, dying);
            self.deaths.push(length);
            if self.deaths.len() + 1 == n {
                break;
            }
        }
        &self.deaths
    }

    /// Strictly positive finite H0 lifetimes, sorted descending.
    ///
    /// Zero-length bars (coincident points) are dropped; they carry no shape
    /// information and would otherwise dominate flat windows.
    pub fn lifetimes(&mut self, points: &[f64], dimension: usize) -> &[f64] {
        self.h0_deaths(points, dimension);
        self.lifetimes.clear();
        self.lifetimes
            .extend(self.deaths.iter().copied().filter(|&d| d > 0.0));
        self.lifetimes.sort_by(|a, b| b.total_cmp(a));
        &self.lifetimes
    }

    /// Full H0 diagram including the essential class.
    pub fn diagram(&mut self, points: &[f64], dimension: usize) -> Vec<PersistencePair> {
        if dimension == 0 || points.len() < dimension {
            return Vec::new();
        }
        let mut pairs: Vec<PersistencePair> = self
            .h0_deaths(points, dimension)
            .iter()
            .map(|&death| PersistencePair { birth: 0.0, death })
            .collect();
        pairs.push(PersistencePair {
            birth: 0.0,
            death: f64::INFINITY,
        });
        pairs
    }
}

fn find(parent: &mut [u32], mut i: u32) -> u32 {
    while parent[i as usize] != i {
        let grand = parent[parent[i as usize] as usize];
        parent[i as usize] = grand;
        i = grand;
    }
    i
}

/// Attach `dying`'s tree under `survivor` by rank, keeping `survivor`'s
/// root as the representative label where ranks allow.
fn union(parent: &mut [u32], rank: &mut [u8], survivor: u32, dying: u32) {
    let (s, d) = (survivor as usize, dying as usize);
    if rank[s] < rank[d] {
        parent[s] = dying;
    } else {
        parent[d] = survivor;
        if rank[s] == rank[d] {
            rank[s] = rank[s].saturating_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn two_points_die_at_their_distance() {
        let mut ws = PersistenceWorkspace::new();
        let deaths = ws.h0_deaths(&[0.0, 0.0, 3.0, 4.0], 2).to_vec();
        assert_eq!(deaths.len(), 1);
        assert_relative_eq!(deaths[0], 5.0);
    }

    #[test]
    fn deaths_are_minimum_spanning_tree_edges() {
        // Points on a line at 0, 1, 3, 7: MST edges 1, 2, 4.
        let mut ws = PersistenceWorkspace::new();
        let deaths = ws.h0_deaths(&[0.0, 1.0, 3.0, 7.0], 1).to_vec();
        assert_eq!(deaths, vec![1.0, 2.0, 4.0]);
    }

    #[test]
    fn two_clusters_have_one_long_bar() {
        let points = [0.0, 0.0, 0.1, 0.0, 0.0, 0.1, 10.0, 10.0, 10.1, 10.0];
        let mut ws = PersistenceWorkspace::new();
        let lifetimes = ws.lifetimes(&points, 2).to_vec();
        assert_eq!(lifetimes.len(), 4);
        assert!(lifetimes[0] > 13.0);
        assert!(lifetimes[1..].iter().all(|&l| l < 0.2));
    }

    #[test]
    fn coincident_points_yield_no_lifetimes() {
        let mut ws = PersistenceWorkspace::new();
        assert_eq!(ws.h0_deaths(&[2.0, 2.0, 2.0, 2.0], 1).len(), 3);
        assert!(ws.lifetimes(&[2.0, 2.0, 2.0, 2.0], 1).is_empty());
    }

    #[test]
    fn empty_and_single_point_clouds() {
        let mut ws = PersistenceWorkspace::new();
        assert!(ws.lifetimes(&[], 2).is_empty());
        assert!(ws.lifetimes(&[1.0, 2.0], 2).is_empty());
        let diagram = ws.diagram(&[1.0, 2.0], 2);
        assert_eq!(diagram.len(), 1);
        assert!(diagram[0].is_essential());
    }

    #[test]
    fn diagram_has_one_essential_class() {
        let mut ws = PersistenceWorkspace::new();
        let diagram = ws.diagram(&[0.0, 1.0, 3.0], 1);
        assert_eq!(diagram.iter().filter(|p| p.is_essential()).count(), 1);
        assert_eq!(diagram.len(), 3);
        assert!(diagram.iter().all(|p| p.birth == 0.0));
        assert_relative_eq!(diagram[1].lifetime(), 2.0);
    }

    #[test]
    fn workspace_reuse_gives_identical_results() {
        let cloud = [0.3, 1.7, 2.2, 0.4, 5.0, 5.5, 1.1, 0.9];
        let mut ws = PersistenceWorkspace::with_capacity(4);
        let first = ws.lifetimes(&cloud, 2).to_vec();
        ws.lifetimes(&[9.0, 9.0, 1.0, 1.0], 2);
        let second = ws.lifetimes(&cloud, 2).to_vec();
        assert_eq!(first, second);
    }
}
