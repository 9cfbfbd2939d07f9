use glam::DVec3;
use plenum_core::BodyForceField;
use plenum_mesh::TetraMesh;

/// Relative tolerance for deduplicating potential breakpoints.
const BREAKPOINT_EPSILON: f64 = 1e-9;

/// One potential-interval bucket of a container's volume.
///
/// Potentials are in J/kg, capacities in m³. A slice with
/// `potential_bottom == potential_top` is the degenerate single slice of a
/// field-free container, holding the entire volume at one potential.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slice {
    pub potential_bottom: f64,
    pub potential_top: f64,
    /// Volume capacity aggregated into this interval, m³.
    pub capacity: f64,
    /// Volume-weighted centroid of the capacity, container-local frame.
    pub centroid: DVec3,
}

impl Slice {
    /// Potential span of the interval, J/kg.
    #[must_use]
    pub fn span(&self) -> f64 {
        self.potential_top - self.potential_bottom
    }
}

/// The potential-ordered volume decomposition of a container.
///
/// Built by binning each mesh edge's capacity into the potential intervals
/// its endpoints span. Slices partition the potential range covered by the
/// container's nodes, bottom (lowest potential) first, and their capacities
/// sum to the container's configured volume.
#[derive(Debug, Clone, Default)]
pub struct SliceStack {
    slices: Vec<Slice>,
    total_capacity: f64,
}

impl SliceStack {
    /// A stack with no geometry. Sampling against it reports vacuum.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Bins the mesh's edge capacities into potential slices under `field`,
    /// scaled so the capacities total `target_volume` (m³).
    ///
    /// Hollow meshes (fewer than four distinct nodes, or fully degenerate
    /// input) produce an empty stack.
    #[must_use]
    pub fn bake(mesh: &TetraMesh, field: &BodyForceField, target_volume: f64) -> Self {
        let mesh_volume = mesh.total_volume();
        if mesh.is_hollow() || mesh_volume <= 0.0 || target_volume <= 0.0 {
            return Self::empty();
        }
        let scale = target_volume / mesh_volume;

        let nodes = mesh.nodes();
        let potentials: Vec<f64> = nodes.iter().map(|&p| field.raw_potential_at(p)).collect();

        let breakpoints = dedup_breakpoints(&potentials);
        let mut slices: Vec<Slice> = if breakpoints.len() == 1 {
            // All node potentials coincide: one unbounded slice.
            vec![Slice {
                potential_bottom: breakpoints[0],
                potential_top: breakpoints[0],
                capacity: 0.0,
                centroid: DVec3::ZERO,
            }]
        } else {
            breakpoints
                .windows(2)
                .map(|pair| Slice {
                    potential_bottom: pair[0],
                    potential_top: pair[1],
                    capacity: 0.0,
                    centroid: DVec3::ZERO,
                })
                .collect()
        };
        let epsilon = breakpoint_epsilon(&potentials);

        // Centroid accumulators, volume-weighted.
        let mut weighted: Vec<DVec3> = vec![DVec3::ZERO; slices.len()];

        for edge in mesh.edges() {
            let capacity = edge.capacity * scale;
            let (pa, pb) = (potentials[edge.a], potentials[edge.b]);
            let (low_node, high_node, low, high) = if pa <= pb {
                (edge.a, edge.b, pa, pb)
            } else {
                (edge.b, edge.a, pb, pa)
            };

            if high - low <= epsilon {
                // Perpendicular edge sitting exactly at a breakpoint: split
                // its volume 50/50 between the slices below and above.
                let midpoint = 0.5 * (nodes[edge.a] + nodes[edge.b]);
                split_at_breakpoint(&mut slices, &mut weighted, low, capacity, midpoint, epsilon);
                continue;
            }

            for (slice, acc) in slices.iter_mut().zip(weighted.iter_mut()) {
                let overlap_low = slice.potential_bottom.max(low);
                let overlap_high = slice.potential_top.min(high);
                if overlap_high <= overlap_low {
                    continue;
                }
                let fraction = (overlap_high - overlap_low) / (high - low);
                let portion = capacity * fraction;

                // Parametric midpoint of the edge's sub-span inside this slice.
                let t = (0.5 * (overlap_low + overlap_high) - low) / (high - low);
                let position = nodes[low_node].lerp(nodes[high_node], t);

                slice.capacity += portion;
                *acc += position * portion;
            }
        }

        let mut total_capacity = 0.0;
        for (slice, acc) in slices.iter_mut().zip(weighted.iter()) {
            if slice.capacity > 0.0 {
                slice.centroid = *acc / slice.capacity;
            }
            total_capacity += slice.capacity;
        }

        Self {
            slices,
            total_capacity,
        }
    }

    #[must_use]
    pub fn slices(&self) -> &[Slice] {
        &self.slices
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Total volume capacity across all slices, m³.
    #[must_use]
    pub fn total_capacity(&self) -> f64 {
        self.total_capacity
    }

    /// Lowest potential covered by the container, J/kg.
    #[must_use]
    pub fn bottom_potential(&self) -> f64 {
        self.slices.first().map_or(0.0, |s| s.potential_bottom)
    }

    /// Highest potential covered by the container, J/kg.
    #[must_use]
    pub fn top_potential(&self) -> f64 {
        self.slices.last().map_or(0.0, |s| s.potential_top)
    }

    /// The potential reached after pouring `volume` m³ in from the bottom,
    /// interpolating linearly inside the boundary slice. Clamps to the
    /// potential range of the container.
    #[must_use]
    pub fn potential_at_volume(&self, volume: f64) -> f64 {
        if self.slices.is_empty() || volume <= 0.0 {
            return self.bottom_potential();
        }
        let mut remaining = volume;
        for slice in &self.slices {
            if remaining < slice.capacity && slice.capacity > 0.0 {
                let fraction = remaining / slice.capacity;
                return slice.potential_bottom + fraction * slice.span();
            }
            remaining -= slice.capacity;
        }
        self.top_potential()
    }

    /// Volume capacity per unit potential at `potential` (m³ per J/kg), the
    /// reciprocal of the surface-stiffness term.
    ///
    /// A degenerate zero-span slice reports infinity: with no potential
    /// gradient, added volume does not raise the surface at all.
    #[must_use]
    pub fn volume_per_potential_at(&self, potential: f64) -> f64 {
        let Some(slice) = self.slice_at(potential) else {
            return f64::INFINITY;
        };
        let span = slice.span();
        if span <= 0.0 {
            return f64::INFINITY;
        }
        slice.capacity / span
    }

    /// The volume and volume-weighted centroid of the capacity between two
    /// potentials.
    #[must_use]
    pub fn centroid_between(&self, low: f64, high: f64) -> (f64, DVec3) {
        let mut volume = 0.0;
        let mut weighted = DVec3::ZERO;
        for slice in &self.slices {
            let portion = if slice.span() > 0.0 {
                let overlap_low = slice.potential_bottom.max(low);
                let overlap_high = slice.potential_top.min(high);
                if overlap_high <= overlap_low {
                    continue;
                }
                slice.capacity * (overlap_high - overlap_low) / slice.span()
            } else if slice.potential_bottom >= low && slice.potential_bottom <= high {
                slice.capacity
            } else {
                continue;
            };
            volume += portion;
            weighted += slice.centroid * portion;
        }
        if volume > 0.0 {
            weighted /= volume;
        }
        (volume, weighted)
    }

    /// The slice containing `potential`, clamped to the extremes.
    fn slice_at(&self, potential: f64) -> Option<&Slice> {
        if self.slices.is_empty() {
            return None;
        }
        self.slices
            .iter()
            .find(|s| potential < s.potential_top || s.span() <= 0.0)
            .or(self.slices.last())
    }
}

/// Sorts and deduplicates node potentials into breakpoints.
fn dedup_breakpoints(potentials: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = potentials.to_vec();
    sorted.sort_by(f64::total_cmp);
    let epsilon = breakpoint_epsilon(potentials);

    let mut breakpoints: Vec<f64> = Vec::with_capacity(sorted.len());
    for value in sorted {
        match breakpoints.last() {
            Some(&last) if value - last <= epsilon => {}
            _ => breakpoints.push(value),
        }
    }
    breakpoints
}

/// Dedup tolerance scaled to the potential range.
fn breakpoint_epsilon(potentials: &[f64]) -> f64 {
    let (min, max) = potentials
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &p| {
            (lo.min(p), hi.max(p))
        });
    let span = (max - min).abs();
    BREAKPOINT_EPSILON * span.max(1.0)
}

/// Splits a zero-span edge's capacity 50/50 between the slice below and the
/// slice above its breakpoint. At the extremes the missing side's half goes
/// to the existing one.
fn split_at_breakpoint(
    slices: &mut [Slice],
    weighted: &mut [DVec3],
    potential: f64,
    capacity: f64,
    position: DVec3,
    epsilon: f64,
) {
    // Index of the slice starting at this breakpoint, if any.
    let above = slices
        .iter()
        .position(|s| (s.potential_bottom - potential).abs() <= epsilon);
    let below = match above {
        Some(0) => None,
        Some(i) => Some(i - 1),
        // Breakpoint matches no slice bottom: it is the top of the stack.
        None => Some(slices.len() - 1),
    };

    match (below, above) {
        (Some(b), Some(a)) => {
            slices[b].capacity += 0.5 * capacity;
            weighted[b] += position * (0.5 * capacity);
            slices[a].capacity += 0.5 * capacity;
            weighted[a] += position * (0.5 * capacity);
        }
        (Some(only), None) | (None, Some(only)) => {
            slices[only].capacity += capacity;
            weighted[only] += position * capacity;
        }
        (None, None) => {}
    }
}
