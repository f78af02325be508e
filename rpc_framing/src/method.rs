use strum::{Display, FromRepr};

use crate::error::Error;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display, FromRepr)]
#[repr(u16)]
pub enum RpcMethod {
    Hello = 0,
    Goodbye = 1,
    GetStatus = 2,
    GetBlockHeaders = 10,
    BlockHeaders = 11,
    GetBlockBodies = 12,
    BlockBodies = 13,
    GetAttestation = 14,
    Attestation = 15,
}

impl RpcMethod {
    #[must_use]
    pub const fn code(self) -> u16 {
        self as u16
    }
}

impl TryFrom<u16> for RpcMethod {
    type Error = Error;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        Self::from_repr(code).ok_or(Error::UnknownMethod { code })
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(RpcMethod::Hello, 0)]
    #[test_case(RpcMethod::Goodbye, 1)]
    #[test_case(RpcMethod::GetStatus, 2)]
    #[test_case(RpcMethod::GetBlockHeaders, 10)]
    #[test_case(RpcMethod::BlockBodies, 13)]
    #[test_case(RpcMethod::Attestation, 15)]
    fn codes_match_wire_values(method: RpcMethod, code: u16) {
        assert_eq!(method.code(), code);
        assert_eq!(RpcMethod::try_from(code).ok(), Some(method));
    }

    #[test]
    fn unassigned_codes_are_rejected() {
        assert!(matches!(
            RpcMethod::try_from(3),
            Err(Error::UnknownMethod { code: 3 }),
        ));
    }
}
