use glam::DVec3;
use uom::si::{available_energy::joule_per_kilogram, f64::AvailableEnergy};

/// The combined linear and rotational fictitious-force field a fluid
/// experiences inside an accelerating, rotating container.
///
/// Positions are expressed in the container's local frame, in meters.
/// `acceleration` is the linear fictitious acceleration (m/s²) the fluid
/// experiences — it points toward where the fluid settles, so standing
/// gravity is `(0, 0, −g)`. `angular_velocity` is the container's spin
/// (rad/s).
///
/// The scalar potential is
///
/// ```text
/// φ(r) = −a·r − ½·|ω × r|²
/// ```
///
/// and fluid moves from high to low potential: the field's "downhill"
/// direction is the direction of decreasing `φ`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BodyForceField {
    /// Linear fictitious acceleration, m/s², container-local frame.
    pub acceleration: DVec3,
    /// Angular velocity, rad/s, container-local frame.
    pub angular_velocity: DVec3,
}

impl BodyForceField {
    /// Creates a field with both linear and rotational parts.
    #[must_use]
    pub fn new(acceleration: DVec3, angular_velocity: DVec3) -> Self {
        Self {
            acceleration,
            angular_velocity,
        }
    }

    /// Creates a purely linear field (no rotation).
    #[must_use]
    pub fn uniform(acceleration: DVec3) -> Self {
        Self {
            acceleration,
            angular_velocity: DVec3::ZERO,
        }
    }

    /// Evaluates the potential at a position in the container's local frame.
    #[must_use]
    pub fn potential_at(&self, position: DVec3) -> AvailableEnergy {
        AvailableEnergy::new::<joule_per_kilogram>(self.raw_potential_at(position))
    }

    /// Evaluates the potential as a bare `f64` in J/kg.
    ///
    /// Geometry-heavy callers (the slice cache) evaluate this per mesh node
    /// and keep working in f64; the quantity-typed [`Self::potential_at`] is
    /// the public sampling surface.
    #[must_use]
    pub fn raw_potential_at(&self, position: DVec3) -> f64 {
        let linear = -self.acceleration.dot(position);
        let rotational = -0.5 * self.angular_velocity.cross(position).length_squared();
        linear + rotational
    }

    /// Returns true when the field exerts no ordering force at all.
    ///
    /// With no field every point of a container sits at the same potential
    /// and stratification degenerates to a single slice.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.acceleration == DVec3::ZERO && self.angular_velocity == DVec3::ZERO
    }
}
