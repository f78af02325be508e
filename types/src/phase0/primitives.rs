use derive_more::AsRef;
use fixed_hash::construct_fixed_hash;
use impl_serde::impl_fixed_hash_serde;

pub use ethereum_types::{H160, H256, H32};

pub type CommitteeIndex = u64;
pub type DepositIndex = u64;
pub type Epoch = u64;
pub type Gwei = u64;
pub type Slot = u64;
pub type UnixSeconds = u64;
pub type ValidatorIndex = u64;

pub type Domain = H256;
pub type DomainType = H32;
pub type Version = H32;

// Credentials are kept in compressed form and never interpreted here.
// Only a signature oracle gives them meaning.

pub const PUBLIC_KEY_SIZE: usize = 48;
pub const SIGNATURE_SIZE: usize = 96;

construct_fixed_hash! {
    #[derive(AsRef)]
    pub struct PublicKeyBytes(PUBLIC_KEY_SIZE);
}

construct_fixed_hash! {
    #[derive(AsRef)]
    pub struct SignatureBytes(SIGNATURE_SIZE);
}

impl_fixed_hash_serde!(PublicKeyBytes, PUBLIC_KEY_SIZE);
impl_fixed_hash_serde!(SignatureBytes, SIGNATURE_SIZE);

macro_rules! impl_ssz_for_credential {
    ($type: ty, $size: expr) => {
        impl ssz::SszSize for $type {
            const SIZE: ssz::Size = ssz::Size::Fixed { size: $size };
        }

        impl ssz::SszRead for $type {
            #[inline]
            fn from_ssz_unchecked(bytes: &[u8]) -> Result<Self, ssz::ReadError> {
                Ok(Self::from_slice(bytes))
            }
        }

        impl ssz::SszWrite for $type {
            #[inline]
            fn write_fixed(&self, bytes: &mut [u8]) {
                bytes.copy_from_slice(self.as_bytes());
            }
        }

        impl ssz::SszHash for $type {
            #[inline]
            fn hash_tree_root(&self) -> H256 {
                ssz::hash_fixed_bytes(self.as_bytes())
            }
        }
    };
}

impl_ssz_for_credential!(PublicKeyBytes, PUBLIC_KEY_SIZE);
impl_ssz_for_credential!(SignatureBytes, SIGNATURE_SIZE);
