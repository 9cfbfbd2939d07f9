use std::collections::BTreeMap;

use glam::DVec3;

use crate::tetra::Tetrahedron;

/// An undirected edge between two mesh nodes.
///
/// `capacity` is the share of the meshed volume attributed to this edge:
/// every tetrahedron spreads its volume evenly over its six edges, so the
/// capacities of all edges sum to the mesh volume. The container cache
/// rescales these shares to the configured tank volume before slicing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    /// Lower node index.
    pub a: usize,
    /// Higher node index.
    pub b: usize,
    /// Attributed volume share, m³.
    pub capacity: f64,
}

/// A tetrahedral mesh: nodes, unique undirected edges, and positively
/// oriented tetrahedra.
#[derive(Debug, Clone, Default)]
pub struct TetraMesh {
    nodes: Vec<DVec3>,
    edges: Vec<Edge>,
    tetrahedra: Vec<Tetrahedron>,
}

impl TetraMesh {
    /// A mesh carrying nodes but no connectivity (fewer than four distinct
    /// input points).
    pub(crate) fn nodes_only(nodes: Vec<DVec3>) -> Self {
        Self {
            nodes,
            edges: Vec::new(),
            tetrahedra: Vec::new(),
        }
    }

    /// Assembles a mesh from surviving tetrahedra, deriving the edge set.
    ///
    /// Edges are the unique unordered index pairs appearing across the
    /// tetrahedra (a `BTreeMap` keyed by the sorted pair, so edge order is
    /// deterministic); each tetrahedron contributes a sixth of its volume
    /// to each of its edges.
    pub(crate) fn from_parts(nodes: Vec<DVec3>, tetrahedra: Vec<Tetrahedron>) -> Self {
        let mut capacities: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        for tet in &tetrahedra {
            let share = tet.volume / 6.0;
            for (a, b) in tet.edge_pairs() {
                if a == b {
                    continue;
                }
                let key = if a < b { (a, b) } else { (b, a) };
                *capacities.entry(key).or_insert(0.0) += share;
            }
        }

        let edges = capacities
            .into_iter()
            .map(|((a, b), capacity)| Edge { a, b, capacity })
            .collect();

        Self {
            nodes,
            edges,
            tetrahedra,
        }
    }

    /// Node positions, container-local frame.
    #[must_use]
    pub fn nodes(&self) -> &[DVec3] {
        &self.nodes
    }

    /// Unique undirected edges with their volume capacities.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Surviving tetrahedra.
    #[must_use]
    pub fn tetrahedra(&self) -> &[Tetrahedron] {
        &self.tetrahedra
    }

    /// True when the mesh has no tetrahedra (under four distinct points, or
    /// fully degenerate input).
    #[must_use]
    pub fn is_hollow(&self) -> bool {
        self.tetrahedra.is_empty()
    }

    /// Total meshed volume, m³: the convex hull volume of the input points.
    #[must_use]
    pub fn total_volume(&self) -> f64 {
        self.tetrahedra.iter().map(|t| t.volume).sum()
    }

    /// Volume-weighted centroid of the meshed region.
    ///
    /// Falls back to the mean node position for hollow meshes and to the
    /// origin for empty ones.
    #[must_use]
    pub fn centroid(&self) -> DVec3 {
        let volume = self.total_volume();
        if volume > 0.0 {
            let weighted: DVec3 = self
                .tetrahedra
                .iter()
                .map(|t| t.centroid(&self.nodes) * t.volume)
                .sum();
            return weighted / volume;
        }
        if self.nodes.is_empty() {
            return DVec3::ZERO;
        }
        self.nodes.iter().copied().sum::<DVec3>() / self.nodes.len() as f64
    }
}
