//! MessagePack codec helpers.
//!
//! Thin wrappers around `rmp-serde` for encoding and decoding packets. Every
//! UDP datagram carries exactly one MessagePack-encoded [`Packet`].
//!
//! [`Packet`]: crate::packets::Packet

use serde::{Deserialize, Serialize};

use crate::error::NetError;

/// Largest payload that fits in one UDP datagram.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Encode a value to MessagePack bytes.
///
/// # Errors
///
/// Returns [`NetError::Encode`] if serialisation fails.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, NetError> {
    rmp_serde::to_vec_named(value).map_err(NetError::Encode)
}

/// Decode a value from MessagePack bytes.
///
/// # Errors
///
/// Returns [`NetError::Decode`] if deserialisation fails.
pub fn decode<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, NetError> {
    rmp_serde::from_slice(bytes).map_err(NetError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packets::Packet;

    #[test]
    fn test_packet_roundtrip() {
        let packet = Packet::HandshakeRequest { is_host: true };
        let bytes = encode(&packet).unwrap();
        let restored: Packet = decode(&bytes).unwrap();
        assert_eq!(packet, restored);
    }

    #[test]
    fn test_decode_invalid_bytes() {
        let result: Result<Packet, _> = decode(&[0xFF, 0xFF]);
        assert!(matches!(result, Err(NetError::Decode(_))));
    }
}
