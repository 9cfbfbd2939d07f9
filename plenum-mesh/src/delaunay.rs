use std::collections::HashMap;

use glam::DVec3;

use crate::{mesh::TetraMesh, tetra::Tetrahedron};

/// A triangular face keyed by its sorted vertex indices.
///
/// Two faces are the same face regardless of winding, so the key is the
/// sorted index triple with plain value equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Face([usize; 3]);

impl Face {
    fn new(a: usize, b: usize, c: usize) -> Self {
        let mut indices = [a, b, c];
        indices.sort_unstable();
        Self(indices)
    }
}

/// Tetrahedralizes a point cloud with incremental Bowyer–Watson insertion.
///
/// Input points closer than `merge_distance` collapse to a single node
/// (first occurrence wins). With at least four distinct nodes the result
/// spans the convex hull of the input and the tetrahedron volumes sum to
/// the hull volume; with fewer, the mesh carries the nodes but no edges or
/// tetrahedra.
///
/// Node, edge, and tetrahedron identity depend only on the deduplicated
/// input order, never on intermediate container ordering.
#[must_use]
pub fn tetrahedralize(points: &[DVec3], merge_distance: f64) -> TetraMesh {
    let nodes = merge_points(points, merge_distance);
    let real_count = nodes.len();
    if real_count < 4 {
        return TetraMesh::nodes_only(nodes);
    }

    // Working node list: real nodes first, then the four super vertices.
    let mut work = nodes.clone();
    append_super_vertices(&mut work);

    let super_tet = oriented(
        [real_count, real_count + 1, real_count + 2, real_count + 3],
        &work,
    );
    let mut tets = vec![super_tet];

    for point_index in 0..real_count {
        insert_point(point_index, &mut tets, &work);
    }

    // Drop everything still attached to the super-tetrahedron, then any
    // degenerate survivor, then forget the super vertices themselves.
    tets.retain(|t| !t.touches_from(real_count) && !t.is_degenerate());

    TetraMesh::from_parts(nodes, tets)
}

/// Collapses points closer than `merge_distance` into their first occurrence.
fn merge_points(points: &[DVec3], merge_distance: f64) -> Vec<DVec3> {
    let threshold_sq = merge_distance * merge_distance;
    let mut kept: Vec<DVec3> = Vec::with_capacity(points.len());
    for &p in points {
        if !p.is_finite() {
            continue;
        }
        let duplicate = kept.iter().any(|&q| (p - q).length_squared() <= threshold_sq);
        if !duplicate {
            kept.push(p);
        }
    }
    kept
}

/// Appends the four vertices of a tetrahedron that comfortably encloses the
/// bounding box of `work`: each vertex sits 10× the bounding span away from
/// the box center along an alternating-sign diagonal.
fn append_super_vertices(work: &mut Vec<DVec3>) {
    let (min, max) = work.iter().fold(
        (DVec3::splat(f64::INFINITY), DVec3::splat(f64::NEG_INFINITY)),
        |(lo, hi), &p| (lo.min(p), hi.max(p)),
    );
    let center = 0.5 * (min + max);
    let reach = 10.0 * (max - min).length().max(1.0);

    work.push(center + reach * DVec3::new(1.0, 1.0, 1.0));
    work.push(center + reach * DVec3::new(1.0, -1.0, -1.0));
    work.push(center + reach * DVec3::new(-1.0, 1.0, -1.0));
    work.push(center + reach * DVec3::new(-1.0, -1.0, 1.0));
}

/// One Bowyer–Watson insertion: carve the cavity of tetrahedra whose
/// circumsphere contains the point and re-fan its boundary to the point.
fn insert_point(point_index: usize, tets: &mut Vec<Tetrahedron>, work: &[DVec3]) {
    let point = work[point_index];

    let mut cavity: Vec<Tetrahedron> = Vec::new();
    tets.retain(|t| {
        if t.circumsphere_contains(point) {
            cavity.push(*t);
            false
        } else {
            true
        }
    });

    // Boundary faces belong to exactly one cavity tetrahedron.
    let mut face_counts: HashMap<Face, u32> = HashMap::new();
    for tet in &cavity {
        let [a, b, c, d] = tet.vertices;
        for face in [
            Face::new(a, b, c),
            Face::new(a, b, d),
            Face::new(a, c, d),
            Face::new(b, c, d),
        ] {
            *face_counts.entry(face).or_insert(0) += 1;
        }
    }

    for (face, count) in face_counts {
        if count != 1 {
            continue;
        }
        if let Some(tet) = fan_tetrahedron(face, point_index, work) {
            tets.push(tet);
        }
    }
}

/// Connects a cavity-boundary face to the inserted point.
///
/// Negative signed volume is repaired by swapping two vertices; a
/// degenerate result is retried once with a different vertex swapped and
/// discarded if still degenerate.
fn fan_tetrahedron(face: Face, apex: usize, work: &[DVec3]) -> Option<Tetrahedron> {
    let [a, b, c] = face.0;

    let mut tet = oriented([a, b, c, apex], work);
    if tet.is_degenerate() {
        tet = oriented([a, c, b, apex], work);
    }
    (!tet.is_degenerate()).then_some(tet)
}

/// Builds the tetrahedron, swapping the first two vertices if needed to
/// keep the signed volume positive.
fn oriented(vertices: [usize; 4], work: &[DVec3]) -> Tetrahedron {
    let tet = Tetrahedron::new(vertices, work);
    if tet.volume < 0.0 {
        let [a, b, c, d] = vertices;
        Tetrahedron::new([b, a, c, d], work)
    } else {
        tet
    }
}
