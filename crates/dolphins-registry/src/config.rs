use serde::{Deserialize, Serialize};

/// What to do when a course or status update names a level other than the
/// most recent one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelMatch {
    /// Rewrite the record unchanged and report success.
    #[default]
    Lenient,
    /// Fail with [`RegistryError::LevelMismatch`] and write nothing.
    ///
    /// [`RegistryError::LevelMismatch`]: crate::RegistryError::LevelMismatch
    Strict,
}

/// Behavioural switches for the record manager.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub level_match: LevelMatch,
    /// When `false`, `addDiver` refuses to replace an existing record.
    pub allow_overwrite: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            level_match: LevelMatch::Lenient,
            allow_overwrite: true,
        }
    }
}

impl RegistryConfig {
    /// Mismatched level names and duplicate creation both fail.
    pub fn strict() -> Self {
        Self {
            level_match: LevelMatch::Strict,
            allow_overwrite: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_keeps_lenient_behaviour() {
        let config = RegistryConfig::default();
        assert_eq!(config.level_match, LevelMatch::Lenient);
        assert!(config.allow_overwrite);
    }

    #[test]
    fn parses_partial_toml() {
        let config: RegistryConfig = toml::from_str(r#"level_match = "strict""#).unwrap();
        assert_eq!(config.level_match, LevelMatch::Strict);
        assert!(config.allow_overwrite);

        let config: RegistryConfig = toml::from_str("").unwrap();
        assert_eq!(config, RegistryConfig::default());
    }

    #[test]
    fn strict_preset() {
        let config = RegistryConfig::strict();
        assert_eq!(config.level_match, LevelMatch::Strict);
        assert!(!config.allow_overwrite);
    }
}
