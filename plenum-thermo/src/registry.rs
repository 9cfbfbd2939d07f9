use std::collections::HashMap;

use crate::{Phase, RegistryError, Substance, SubstanceId};

/// Interned substance definitions plus the condensed → gas phase-partner
/// table.
///
/// Built once by the host's content-loading layer and passed by reference
/// into the thermodynamics functions; there is no global substance state
/// anywhere in the simulation.
#[derive(Debug, Clone, Default)]
pub struct SubstanceRegistry {
    substances: Vec<Substance>,
    by_name: HashMap<String, SubstanceId>,
    partners: HashMap<SubstanceId, SubstanceId>,
}

impl SubstanceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a substance definition and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateName`] if a substance with the same
    /// name already exists.
    pub fn register(&mut self, substance: Substance) -> Result<SubstanceId, RegistryError> {
        if self.by_name.contains_key(&substance.name) {
            return Err(RegistryError::DuplicateName {
                name: substance.name.clone(),
            });
        }
        let id = SubstanceId(self.substances.len());
        self.by_name.insert(substance.name.clone(), id);
        self.substances.push(substance);
        Ok(id)
    }

    /// Declares `gas` to be the vapor-phase partner of `condensed`.
    ///
    /// The flash equations move mass between these two ids.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::PhaseMismatch`] unless `condensed` is a
    /// condensed-phase substance and `gas` is a gas.
    pub fn link_phases(
        &mut self,
        condensed: SubstanceId,
        gas: SubstanceId,
    ) -> Result<(), RegistryError> {
        let condensed_sub = self.get(condensed);
        let gas_sub = self.get(gas);
        if condensed_sub.phase != Phase::Condensed || gas_sub.phase != Phase::Gas {
            return Err(RegistryError::PhaseMismatch {
                condensed: condensed_sub.name.clone(),
                gas: gas_sub.name.clone(),
            });
        }
        self.partners.insert(condensed, gas);
        Ok(())
    }

    /// Looks up the property record behind an id.
    ///
    /// Ids are only minted by [`Self::register`]; passing an id from a
    /// different registry is a logic error and will panic or return the
    /// wrong substance.
    #[must_use]
    pub fn get(&self, id: SubstanceId) -> &Substance {
        &self.substances[id.0]
    }

    /// Finds a substance id by name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<SubstanceId> {
        self.by_name.get(name).copied()
    }

    /// The gas-phase partner of a condensed substance, if one was linked.
    #[must_use]
    pub fn gas_partner(&self, id: SubstanceId) -> Option<SubstanceId> {
        self.partners.get(&id).copied()
    }

    /// Iterates all registered ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = SubstanceId> + '_ {
        (0..self.substances.len()).map(SubstanceId)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.substances.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.substances.is_empty()
    }
}
