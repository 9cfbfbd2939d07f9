use thiserror::Error;

/// Errors that may occur while assembling a [`SubstanceRegistry`].
///
/// [`SubstanceRegistry`]: crate::SubstanceRegistry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A substance with the same name is already registered.
    #[error("substance `{name}` is already registered")]
    DuplicateName { name: String },

    /// A phase link must pair a condensed substance with a gas substance.
    #[error("phase link requires condensed + gas, got `{condensed}` and `{gas}`")]
    PhaseMismatch { condensed: String, gas: String },
}
