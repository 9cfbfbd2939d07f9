//! Incremental Delaunay tetrahedralization of container point clouds.
//!
//! Given the interior sample points of a tank (plus its inlet anchors), this
//! crate produces the tetrahedral mesh whose union is the convex hull of the
//! input: nodes, unique undirected edges, and positively oriented
//! tetrahedra. The containing volume cache distributes each tetrahedron's
//! volume over its six edges, which is why [`Edge`] carries a capacity.
//!
//! All positions are `glam::DVec3` in meters; volumes are cubic meters.
//! Geometric degeneracies (coplanar or duplicate points, singular
//! circumspheres) are recovered locally — the offending tetrahedron is
//! excluded from the result — and never surface as errors.

mod delaunay;
mod mesh;
mod tetra;

pub use delaunay::tetrahedralize;
pub use mesh::{Edge, TetraMesh};
pub use tetra::{Tetrahedron, signed_volume};
