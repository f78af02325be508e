use core::num::NonZeroU64;
use std::borrow::Cow;

use anyhow::Result;
use hex_literal::hex;
use nonzero_ext::nonzero;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    phase0::primitives::{Gwei, UnixSeconds, Version, H32},
    preset::PresetName,
};

/// Configuration variables customizable at runtime.
///
/// Every field has a default, so a configuration file only needs to list the values it overrides.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Config {
    // Meta
    pub config_name: Cow<'static, str>,
    pub preset_base: PresetName,

    // Genesis
    #[serde(with = "serde_utils::string_or_native")]
    pub genesis_delay: u64,
    pub genesis_fork_version: Version,
    #[serde(with = "serde_utils::string_or_native")]
    pub min_genesis_active_validator_count: NonZeroU64,
    #[serde(with = "serde_utils::string_or_native")]
    pub min_genesis_time: UnixSeconds,

    // Time parameters
    #[serde(with = "serde_utils::string_or_native")]
    pub min_validator_withdrawability_delay: u64,
    #[serde(with = "serde_utils::string_or_native")]
    pub seconds_per_slot: NonZeroU64,
    #[serde(with = "serde_utils::string_or_native")]
    pub shard_committee_period: u64,

    // Validator cycle
    #[serde(with = "serde_utils::string_or_native")]
    pub churn_limit_quotient: NonZeroU64,
    #[serde(with = "serde_utils::string_or_native")]
    pub ejection_balance: Gwei,
    #[serde(with = "serde_utils::string_or_native")]
    pub min_per_epoch_churn_limit: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Meta
            //
            // Custom configurations that do not set `CONFIG_NAME` end up named `default`,
            // which keeps them apart from mainnet.
            config_name: Cow::Borrowed("default"),
            preset_base: PresetName::Mainnet,

            // Genesis
            genesis_delay: 604_800,
            genesis_fork_version: H32(hex!("00000000")),
            min_genesis_active_validator_count: nonzero!(1_u64 << 14),
            min_genesis_time: 0,

            // Time parameters
            min_validator_withdrawability_delay: 256,
            seconds_per_slot: nonzero!(12_u64),
            shard_committee_period: 256,

            // Validator cycle
            churn_limit_quotient: nonzero!(1_u64 << 16),
            ejection_balance: 16_000_000_000,
            min_per_epoch_churn_limit: 4,
        }
    }
}

impl Config {
    #[must_use]
    pub fn mainnet() -> Self {
        Self {
            config_name: Cow::Borrowed("mainnet"),
            min_genesis_time: 1_606_824_000,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn minimal() -> Self {
        Self {
            // Meta
            config_name: Cow::Borrowed("minimal"),
            preset_base: PresetName::Minimal,

            // Genesis
            genesis_delay: 300,
            genesis_fork_version: H32(hex!("00000001")),
            min_genesis_active_validator_count: nonzero!(64_u64),
            min_genesis_time: 1_578_009_600,

            // Time parameters
            seconds_per_slot: nonzero!(6_u64),
            shard_committee_period: 64,

            // Validator cycle
            churn_limit_quotient: nonzero!(32_u64),
            min_per_epoch_churn_limit: 2,

            ..Self::default()
        }
    }

    /// Parses a configuration in the YAML format used by `consensus-specs` and validates it.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config = serde_yaml::from_str::<Self>(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.config_name.is_empty() {
            return Err(Error::NameEmpty);
        }

        for character in self.config_name.chars() {
            if !matches!(character, 'a'..='z' | '0'..='9' | '-') {
                return Err(Error::NameContainsIllegalCharacters);
            }
        }

        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration name is empty")]
    NameEmpty,
    #[error("configuration name contains illegal characters")]
    NameContainsIllegalCharacters,
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(&Config::mainnet())]
    #[test_case(&Config::minimal())]
    #[test_case(&Config::default())]
    fn config_is_valid(config: &Config) -> Result<(), Error> {
        config.validate()
    }

    #[test]
    fn from_yaml_overrides_only_listed_values() -> Result<()> {
        let config = Config::from_yaml(
            "
            CONFIG_NAME: 'devnet-7'
            PRESET_BASE: 'minimal'
            MIN_GENESIS_TIME: '1700000000'
            CHURN_LIMIT_QUOTIENT: 8
            GENESIS_FORK_VERSION: '0x10000007'
            ",
        )?;

        assert_eq!(config.config_name, "devnet-7");
        assert_eq!(config.preset_base, PresetName::Minimal);
        assert_eq!(config.min_genesis_time, 1_700_000_000);
        assert_eq!(config.churn_limit_quotient, nonzero!(8_u64));
        assert_eq!(config.genesis_fork_version, H32(hex!("10000007")));
        assert_eq!(config.ejection_balance, Config::default().ejection_balance);

        Ok(())
    }

    #[test]
    fn from_yaml_rejects_illegal_name() {
        let error = Config::from_yaml("CONFIG_NAME: 'Mainnet'").expect_err("name has uppercase");

        assert!(matches!(
            error.downcast_ref::<Error>(),
            Some(Error::NameContainsIllegalCharacters),
        ));
    }
}
