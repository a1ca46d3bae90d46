use crate::alphabet::Weights;

/// Enum representing preset base compositions.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresetComposition {
    /// every base equally likely
    Uniform,

    /// G and C three times as likely as A and T
    GcRich,

    /// A and T three times as likely as G and C
    AtRich,
}

/// Returns the base weights for a preset composition.
///
/// # Arguments
///
/// * `preset` - A reference to a `PresetComposition` enum variant.
pub fn get_weights(preset: &PresetComposition) -> Weights {
    match preset {
        PresetComposition::Uniform => Weights::new(1, 1, 1, 1),
        PresetComposition::GcRich => Weights::new(1, 3, 3, 1),
        PresetComposition::AtRich => Weights::new(3, 1, 1, 3),
    }
}
