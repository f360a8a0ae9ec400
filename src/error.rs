//! Error types for biome planet generation

use thiserror::Error;

/// Errors that can occur while configuring, generating or presenting a planet
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanetError {
    /// Configuration validation failed
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Biome preset name is not in the preset table
    #[error("unknown biome preset: {0}")]
    UnknownBiome(String),

    /// Mesh, noise or scatter computation failed
    #[error("generation failed: {0}")]
    GenerationFailed(String),

    /// A vegetation model could not be loaded
    #[error("asset loading failed for {item}: {reason}")]
    AssetLoad { item: String, reason: String },

    /// The background worker is gone
    #[error("worker unavailable: {0}")]
    WorkerClosed(String),

    /// A message could not be encoded or decoded
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl PlanetError {
    /// Whether this error was caused by the caller's configuration
    pub fn is_config_error(&self) -> bool {
        matches!(self, PlanetError::InvalidConfig(_) | PlanetError::UnknownBiome(_))
    }
}

/// Result type alias for planet operations
pub type Result<T> = std::result::Result<T, PlanetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PlanetError::UnknownBiome("lava".into());
        assert_eq!(err.to_string(), "unknown biome preset: lava");

        let err = PlanetError::AssetLoad {
            item: "pine".into(),
            reason: "missing file".into(),
        };
        assert_eq!(err.to_string(), "asset loading failed for pine: missing file");
    }

    #[test]
    fn test_config_error_classification() {
        assert!(PlanetError::InvalidConfig("x".into()).is_config_error());
        assert!(PlanetError::UnknownBiome("x".into()).is_config_error());
        assert!(!PlanetError::GenerationFailed("x".into()).is_config_error());
    }
}
