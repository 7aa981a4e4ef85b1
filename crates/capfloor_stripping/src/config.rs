//! Calibration configuration.
//!
//! [`StrippingConfig`] gathers every solver setting a calibration uses. It
//! deserialises from TOML with any field optional:
//!
//! ```
//! use capfloor_core::math::linalg::DecompositionMethod;
//! use capfloor_stripping::StrippingConfig;
//!
//! let config = StrippingConfig::from_toml_str(
//!     r#"
//!     svd_fallback = true
//!
//!     [least_squares]
//!     max_iterations = 500
//!     decomposition = "lu"
//!
//!     [root_finder]
//!     abs_tolerance = 1e-13
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(config.least_squares.max_iterations, 500);
//! assert_eq!(config.least_squares.decomposition, DecompositionMethod::Lu);
//! assert_eq!(config.root_finder.abs_tolerance, 1e-13);
//! ```

use std::path::Path;

use capfloor_core::math::solvers::{LMConfig, SolverConfig, VectorRootConfig};
use serde::{Deserialize, Serialize};

use crate::error::StrippingError;

/// Solver settings for caplet stripping.
///
/// # Fields
///
/// - `root_finder`: Newton settings for the exactly-determined case
/// - `least_squares`: Levenberg-Marquardt settings (decomposition defaults to Cholesky)
/// - `svd_fallback`: Retry a failed least-squares solve once with SVD
/// - `implied_vol`: Scalar solver settings for cap implied volatilities
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrippingConfig {
    /// Newton root-finder settings.
    pub root_finder: VectorRootConfig,
    /// Levenberg-Marquardt settings.
    pub least_squares: LMConfig,
    /// Retry with SVD when least squares fails.
    pub svd_fallback: bool,
    /// Cap implied volatility solver settings.
    pub implied_vol: SolverConfig,
}

impl Default for StrippingConfig {
    fn default() -> Self {
        Self {
            root_finder: VectorRootConfig::default(),
            least_squares: LMConfig::default(),
            svd_fallback: true,
            implied_vol: SolverConfig::high_precision(),
        }
    }
}

impl StrippingConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration builder for fluent construction.
    pub fn builder() -> StrippingConfigBuilder {
        StrippingConfigBuilder::new()
    }

    /// Relaxed tolerances for interactive use.
    pub fn fast() -> Self {
        Self {
            least_squares: LMConfig::fast(),
            implied_vol: SolverConfig::default(),
            ..Self::default()
        }
    }

    /// Tight least-squares tolerances.
    pub fn high_precision() -> Self {
        Self {
            least_squares: LMConfig::high_precision(),
            ..Self::default()
        }
    }

    /// Parse a TOML document; missing fields take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, StrippingError> {
        let config: StrippingConfig = toml::from_str(content)
            .map_err(|e| StrippingError::configuration(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StrippingError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            StrippingError::configuration(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), StrippingError> {
        if !self.implied_vol.is_valid() {
            return Err(StrippingError::configuration(
                "implied_vol needs a positive tolerance and iteration cap",
            ));
        }
        let lm = &self.least_squares;
        if lm.max_iterations == 0 || !(lm.initial_lambda > 0.0) || !(lm.lambda_up > 1.0) {
            return Err(StrippingError::configuration(
                "least_squares needs max_iterations > 0, initial_lambda > 0 and lambda_up > 1",
            ));
        }
        if self.root_finder.max_iterations == 0 {
            return Err(StrippingError::configuration(
                "root_finder needs max_iterations > 0",
            ));
        }
        Ok(())
    }
}

/// Builder for [`StrippingConfig`].
#[derive(Debug, Clone, Default)]
pub struct StrippingConfigBuilder {
    config: StrippingConfig,
}

impl StrippingConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the root-finder settings.
    pub fn root_finder(mut self, root_finder: VectorRootConfig) -> Self {
        self.config.root_finder = root_finder;
        self
    }

    /// Set the least-squares settings.
    pub fn least_squares(mut self, least_squares: LMConfig) -> Self {
        self.config.least_squares = least_squares;
        self
    }

    /// Enable or disable the SVD retry.
    pub fn svd_fallback(mut self, enabled: bool) -> Self {
        self.config.svd_fallback = enabled;
        self
    }

    /// Set the implied volatility solver settings.
    pub fn implied_vol(mut self, implied_vol: SolverConfig) -> Self {
        self.config.implied_vol = implied_vol;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> StrippingConfig {
        self.config
    }
}
