//! Error types for the MSP430 analyzer.
//!
//! Decoding never panics on malformed input. Every failure is reported
//! through [`DecodeError`]; callers that want the "null instruction"
//! convention use [`crate::Decoder::decode_or_null`] instead.

use thiserror::Error;

/// Primary error type for decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The stream ended before a complete instruction could be read.
    #[error("Out of bounds: no word available at 0x{address:05X}")]
    OutOfBounds {
        /// Address of the missing word.
        address: u32,
    },

    /// The bit pattern has no defined mapping.
    #[error("Invalid encoding 0x{word:04X} at 0x{address:05X}")]
    InvalidEncoding {
        /// Start of the rejected instruction.
        address: u32,
        /// The word that failed to decode.
        word: u16,
    },

    /// Instructions always start on an even address.
    #[error("Misaligned instruction address 0x{address:05X}")]
    Misaligned {
        /// The odd address that was requested.
        address: u32,
    },
}

impl DecodeError {
    /// Address the error refers to.
    pub fn address(&self) -> u32 {
        match *self {
            DecodeError::OutOfBounds { address }
            | DecodeError::InvalidEncoding { address, .. }
            | DecodeError::Misaligned { address } => address,
        }
    }
}

/// Result type alias for decoder operations.
pub type Result<T> = std::result::Result<T, DecodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DecodeError::InvalidEncoding {
            address: 0xC000,
            word: 0x0BEE,
        };
        let msg = err.to_string();
        assert!(msg.contains("0BEE"));
        assert!(msg.contains("0C000"));
    }

    #[test]
    fn test_error_address() {
        let err = DecodeError::OutOfBounds { address: 0x1_0002 };
        assert_eq!(err.address(), 0x1_0002);
        assert!(err.to_string().contains("10002"));

        let err = DecodeError::InvalidEncoding {
            address: 0xC004,
            word: 0xFFFF,
        };
        assert_eq!(err.address(), 0xC004);
        assert_eq!(DecodeError::Misaligned { address: 0xC001 }.address(), 0xC001);
    }
}
