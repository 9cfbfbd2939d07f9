use uom::{
    ConstZero,
    si::{f64::Mass, mass::kilogram},
};

use crate::SubstanceId;

/// Entries below this mass (kg) are dropped; keeps float dust from
/// accumulating phantom substances.
const MASS_FLOOR: f64 = 1e-12;

/// A sparse ledger of substance masses.
///
/// Each container, producer, and consumer owns its mixtures exclusively and
/// mutates them only through the explicit operations here; mixtures are
/// never shared by reference across components. Entries stay sorted by id
/// so iteration order is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mixture {
    entries: Vec<(SubstanceId, Mass)>,
}

impl Mixture {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A mixture holding a single substance.
    #[must_use]
    pub fn of(id: SubstanceId, mass: Mass) -> Self {
        let mut mixture = Self::new();
        mixture.add(id, mass);
        mixture
    }

    /// Adds mass of a substance. Non-positive amounts are ignored.
    pub fn add(&mut self, id: SubstanceId, mass: Mass) {
        if mass.get::<kilogram>() <= MASS_FLOOR {
            return;
        }
        match self.entries.binary_search_by_key(&id, |&(i, _)| i) {
            Ok(slot) => self.entries[slot].1 += mass,
            Err(slot) => self.entries.insert(slot, (id, mass)),
        }
    }

    /// Removes up to `mass` of a substance and returns the amount actually
    /// removed. Entries drained below the mass floor disappear.
    pub fn remove(&mut self, id: SubstanceId, mass: Mass) -> Mass {
        if mass.value <= 0.0 {
            return Mass::ZERO;
        }
        let Ok(slot) = self.entries.binary_search_by_key(&id, |&(i, _)| i) else {
            return Mass::ZERO;
        };

        let available = self.entries[slot].1;
        let removed = mass.min(available);
        let remaining = available - removed;
        if remaining.get::<kilogram>() <= MASS_FLOOR {
            self.entries.remove(slot);
        } else {
            self.entries[slot].1 = remaining;
        }
        removed
    }

    /// Adds every entry of another mixture.
    pub fn add_all(&mut self, other: &Mixture) {
        for &(id, mass) in &other.entries {
            self.add(id, mass);
        }
    }

    /// Removes every entry of another mixture, clamped to what is present.
    pub fn remove_all(&mut self, other: &Mixture) {
        for &(id, mass) in &other.entries {
            self.remove(id, mass);
        }
    }

    /// Scales every entry by a non-negative factor.
    pub fn scale(&mut self, factor: f64) {
        let factor = factor.max(0.0);
        for entry in &mut self.entries {
            entry.1 = entry.1 * factor;
        }
        self.entries
            .retain(|&(_, mass)| mass.get::<kilogram>() > MASS_FLOOR);
    }

    /// Returns a copy scaled by a non-negative factor.
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Mixture {
        let mut copy = self.clone();
        copy.scale(factor);
        copy
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// The mass of one substance (zero when absent).
    #[must_use]
    pub fn mass_of(&self, id: SubstanceId) -> Mass {
        self.entries
            .binary_search_by_key(&id, |&(i, _)| i)
            .map_or(Mass::ZERO, |slot| self.entries[slot].1)
    }

    /// Total mass across all substances.
    #[must_use]
    pub fn total_mass(&self) -> Mass {
        self.entries
            .iter()
            .fold(Mass::ZERO, |acc, &(_, mass)| acc + mass)
    }

    /// Iterates `(id, mass)` pairs in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (SubstanceId, Mass)> + '_ {
        self.entries.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    fn kg(mass: f64) -> Mass {
        Mass::new::<kilogram>(mass)
    }

    #[test]
    fn add_accumulates_per_substance() {
        let mut mix = Mixture::new();
        mix.add(SubstanceId(0), kg(2.0));
        mix.add(SubstanceId(1), kg(1.0));
        mix.add(SubstanceId(0), kg(0.5));

        assert_eq!(mix.len(), 2);
        assert_relative_eq!(mix.mass_of(SubstanceId(0)).get::<kilogram>(), 2.5);
        assert_relative_eq!(mix.total_mass().get::<kilogram>(), 3.5);
    }

    #[test]
    fn add_ignores_non_positive_mass() {
        let mut mix = Mixture::new();
        mix.add(SubstanceId(0), kg(0.0));
        mix.add(SubstanceId(0), kg(-1.0));

        assert!(mix.is_empty());
    }

    #[test]
    fn remove_is_clamped_to_available() {
        let mut mix = Mixture::of(SubstanceId(3), kg(1.0));

        let removed = mix.remove(SubstanceId(3), kg(2.5));
        assert_relative_eq!(removed.get::<kilogram>(), 1.0);
        assert!(mix.is_empty());

        let removed = mix.remove(SubstanceId(3), kg(1.0));
        assert_relative_eq!(removed.get::<kilogram>(), 0.0);
    }

    #[test]
    fn drained_entries_disappear() {
        let mut mix = Mixture::of(SubstanceId(0), kg(1.0));
        mix.remove(SubstanceId(0), kg(1.0 - 1e-13));

        assert!(mix.is_empty(), "dust below the floor should vanish");
    }

    #[test]
    fn scale_and_scaled() {
        let mut mix = Mixture::new();
        mix.add(SubstanceId(0), kg(4.0));
        mix.add(SubstanceId(1), kg(2.0));

        let half = mix.scaled(0.5);
        assert_relative_eq!(half.total_mass().get::<kilogram>(), 3.0);

        mix.scale(0.0);
        assert!(mix.is_empty());
    }

    #[test]
    fn bulk_transfer_between_mixtures() {
        let mut source = Mixture::new();
        source.add(SubstanceId(0), kg(5.0));
        source.add(SubstanceId(1), kg(3.0));

        let mut sink = Mixture::new();
        sink.add_all(&source);
        source.remove_all(&sink);

        assert!(source.is_empty());
        assert_relative_eq!(sink.total_mass().get::<kilogram>(), 8.0);
    }

    #[test]
    fn iteration_is_in_id_order() {
        let mut mix = Mixture::new();
        mix.add(SubstanceId(5), kg(1.0));
        mix.add(SubstanceId(1), kg(1.0));
        mix.add(SubstanceId(3), kg(1.0));

        let ids: Vec<usize> = mix.iter().map(|(id, _)| id.index()).collect();
        assert_eq!(ids, vec![1, 3, 5]);
    }
}
