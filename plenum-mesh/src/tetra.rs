use glam::{DMat3, DVec3};

/// Relative slack applied to the squared circumsphere radius when testing
/// point containment. Keeps boundary points from slipping between adjacent
/// cavities due to rounding.
const CIRCUMSPHERE_EPSILON: f64 = 1e-9;

/// A tetrahedron is degenerate when its volume falls below this fraction of
/// the cube of its longest edge.
const DEGENERACY_RATIO: f64 = 1e-9;

/// Signed volume of the tetrahedron `(a, b, c, d)` via the scalar triple
/// product. Positive when `d` lies on the side of plane `(a, b, c)` that
/// makes the vertex order right-handed.
#[must_use]
pub fn signed_volume(a: DVec3, b: DVec3, c: DVec3, d: DVec3) -> f64 {
    (b - a).cross(c - a).dot(d - a) / 6.0
}

/// Four node indices, the signed volume they span, and the circumsphere
/// used during incremental insertion.
#[derive(Debug, Clone, Copy)]
pub struct Tetrahedron {
    /// Node indices into the owning mesh.
    pub vertices: [usize; 4],
    /// Signed volume, m³. Positive for every tetrahedron a finished mesh
    /// retains.
    pub volume: f64,
    circumcenter: DVec3,
    radius_squared: f64,
    degenerate: bool,
}

impl Tetrahedron {
    /// Builds a tetrahedron over `vertices`, computing its volume and
    /// circumsphere from `points`.
    ///
    /// A near-zero volume (relative to the cube of the longest edge) or a
    /// singular circumsphere system marks the tetrahedron degenerate; its
    /// circumsphere test then always reports "outside" so it never swallows
    /// an insertion point.
    #[must_use]
    pub fn new(vertices: [usize; 4], points: &[DVec3]) -> Self {
        let [a, b, c, d] = vertices.map(|i| points[i]);
        let volume = signed_volume(a, b, c, d);

        let longest_sq = [b - a, c - a, d - a, c - b, d - b, d - c]
            .iter()
            .map(|e| e.length_squared())
            .fold(0.0_f64, f64::max);
        let volume_floor = DEGENERACY_RATIO * longest_sq.powf(1.5);

        let (circumcenter, radius_squared, singular) = circumsphere(a, b, c, d);
        let degenerate = singular || !volume.is_finite() || volume.abs() <= volume_floor;

        Self {
            vertices,
            volume,
            circumcenter,
            radius_squared,
            degenerate,
        }
    }

    /// True when the tetrahedron was excluded from circumsphere testing.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }

    /// Circumsphere containment test used by the insertion loop.
    ///
    /// Degenerate tetrahedra always answer `false`.
    #[must_use]
    pub fn circumsphere_contains(&self, point: DVec3) -> bool {
        if self.degenerate {
            return false;
        }
        let d_sq = (point - self.circumcenter).length_squared();
        d_sq <= self.radius_squared * (1.0 + CIRCUMSPHERE_EPSILON)
    }

    /// The centroid of the four vertices.
    #[must_use]
    pub fn centroid(&self, points: &[DVec3]) -> DVec3 {
        let [a, b, c, d] = self.vertices.map(|i| points[i]);
        (a + b + c + d) / 4.0
    }

    /// The six undirected vertex-index pairs of this tetrahedron.
    #[must_use]
    pub fn edge_pairs(&self) -> [(usize, usize); 6] {
        let [a, b, c, d] = self.vertices;
        [(a, b), (a, c), (a, d), (b, c), (b, d), (c, d)]
    }

    /// True when any vertex index is `limit` or above.
    ///
    /// Used to discard tetrahedra still attached to the enclosing
    /// super-tetrahedron, whose vertices are appended after the real nodes.
    #[must_use]
    pub(crate) fn touches_from(&self, limit: usize) -> bool {
        self.vertices.iter().any(|&v| v >= limit)
    }
}

/// Solves `2·(pᵢ − p₀)·c = |pᵢ|² − |p₀|²` (i = 1..3) for the circumcenter.
///
/// Returns `(center, radius², singular)`. A vanishing determinant or a
/// non-finite solution reports `singular = true`.
fn circumsphere(p0: DVec3, p1: DVec3, p2: DVec3, p3: DVec3) -> (DVec3, f64, bool) {
    let rows = [2.0 * (p1 - p0), 2.0 * (p2 - p0), 2.0 * (p3 - p0)];
    let m = DMat3::from_cols(rows[0], rows[1], rows[2]).transpose();
    let rhs = DVec3::new(
        p1.length_squared() - p0.length_squared(),
        p2.length_squared() - p0.length_squared(),
        p3.length_squared() - p0.length_squared(),
    );

    let det = m.determinant();
    if !det.is_finite() || det.abs() < f64::MIN_POSITIVE {
        return (DVec3::ZERO, 0.0, true);
    }

    let center = m.inverse() * rhs;
    let radius_squared = (p0 - center).length_squared();
    if !center.is_finite() || !radius_squared.is_finite() {
        return (DVec3::ZERO, 0.0, true);
    }

    (center, radius_squared, false)
}
