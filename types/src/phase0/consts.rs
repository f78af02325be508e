use hex_literal::hex;
use typenum::{U33, U4};

use crate::phase0::primitives::{DomainType, Epoch, Slot, H32};

pub const BLS_WITHDRAWAL_PREFIX: &[u8] = &hex!("00");
pub const DEPOSIT_CONTRACT_TREE_DEPTH: usize = 32;
pub const DOMAIN_BEACON_ATTESTER: DomainType = H32(hex!("01000000"));
pub const DOMAIN_BEACON_PROPOSER: DomainType = H32(hex!("00000000"));
pub const DOMAIN_DEPOSIT: DomainType = H32(hex!("03000000"));
pub const DOMAIN_RANDAO: DomainType = H32(hex!("02000000"));
pub const DOMAIN_VOLUNTARY_EXIT: DomainType = H32(hex!("04000000"));
pub const FAR_FUTURE_EPOCH: Epoch = Epoch::MAX;
pub const GENESIS_EPOCH: Epoch = 0;
pub const GENESIS_SLOT: Slot = 0;

/// Length of a deposit proof: the branch plus the mixed-in deposit count.
pub type DepositProofLength = U33;
pub type JustificationBitsLength = U4;
