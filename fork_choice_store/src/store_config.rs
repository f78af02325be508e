use derivative::Derivative;
use serde::{Deserialize, Serialize};
use typenum::Unsigned as _;
use types::preset::Preset;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Derivative, Deserialize, Serialize)]
#[derivative(Default)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Maximum number of attestations returned by one call to
    /// [`Store::get_unprocessed_attestations_until_slot`].
    ///
    /// [`Store::get_unprocessed_attestations_until_slot`]: crate::Store::get_unprocessed_attestations_until_slot
    #[derivative(Default(value = "128"))]
    pub max_attestations_per_drain: usize,
    /// Maximum number of block headers kept per validator. The oldest are dropped first.
    #[derivative(Default(value = "1024"))]
    pub block_header_retention: usize,
}

impl StoreConfig {
    /// Limits drains to the number of attestations that fit in a block.
    #[must_use]
    pub fn for_preset<P: Preset>() -> Self {
        Self {
            max_attestations_per_drain: P::MaxAttestations::USIZE,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use types::preset::{Mainnet, Minimal};

    use super::*;

    #[test]
    fn drain_limit_follows_preset() {
        assert_eq!(StoreConfig::for_preset::<Mainnet>().max_attestations_per_drain, 128);
        assert_eq!(StoreConfig::for_preset::<Minimal>().max_attestations_per_drain, 128);
    }

    #[test]
    fn missing_fields_take_defaults() -> Result<()> {
        let config = serde_json::from_str::<StoreConfig>(r#"{"block_header_retention": 16}"#)?;

        assert_eq!(
            config,
            StoreConfig {
                block_header_retention: 16,
                ..StoreConfig::default()
            },
        );

        Ok(())
    }
}
