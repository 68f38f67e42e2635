//! # Configuration
//!
//! [`EvmConfig`] selects the hardfork and, optionally, a hand-tuned gas
//! schedule. Everything is serde-decodable so harnesses can load a config
//! from JSON.

use crate::domain::hardfork::Hardfork;
use crate::domain::invariants::limits;
use crate::errors::ConfigError;
use crate::evm::gas::{GasSchedule, GasScheduleOverride};
use serde::{Deserialize, Serialize};

/// Interpreter configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvmConfig {
    /// Active protocol rules.
    pub hardfork: Hardfork,
    /// Replaces individual prices of the fork's schedule. Missing fields
    /// keep the value `hardfork` prescribes.
    pub gas_schedule: Option<GasScheduleOverride>,
    /// Deployed code limit (EIP-170, Spurious Dragon+).
    pub max_code_size: usize,
    /// Init code limit (EIP-3860, Shanghai+).
    pub max_init_code_size: usize,
}

impl Default for EvmConfig {
    fn default() -> Self {
        Self::for_hardfork(Hardfork::default())
    }
}

impl EvmConfig {
    /// Default limits at `hardfork`.
    #[must_use]
    pub fn for_hardfork(hardfork: Hardfork) -> Self {
        Self {
            hardfork,
            gas_schedule: None,
            max_code_size: limits::MAX_CODE_SIZE,
            max_init_code_size: limits::MAX_INIT_CODE_SIZE,
        }
    }

    /// Overrides the gas schedule, fully (`GasSchedule`) or partially
    /// (`GasScheduleOverride`).
    #[must_use]
    pub fn with_gas_schedule(mut self, schedule: impl Into<GasScheduleOverride>) -> Self {
        self.gas_schedule = Some(schedule.into());
        self
    }

    /// Decodes a JSON config; absent fields keep their defaults.
    ///
    /// ```
    /// use qc_evm::config::EvmConfig;
    /// use qc_evm::domain::hardfork::Hardfork;
    ///
    /// let config = EvmConfig::from_json(r#"{ "hardfork": "Berlin" }"#).unwrap();
    /// assert_eq!(config.hardfork, Hardfork::Berlin);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Decode` for malformed input.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Prices in force: the fork's own schedule with any override applied.
    #[must_use]
    pub fn schedule(&self) -> GasSchedule {
        let base = GasSchedule::for_hardfork(self.hardfork);
        match &self.gas_schedule {
            Some(partial) => partial.apply(base),
            None => base,
        }
    }
}
