//! A minimal, total wire codec for the fixed-layout records used by an on-medium file
//! system image: every integer field is serialized to exactly its native byte width, with
//! byte order chosen explicitly at the call site rather than inferred from the host's own
//! endianness. Nothing here is reentrant or fallible beyond "the target buffer was too
//! small" / "the source buffer was too short" — there is no partial-write state to recover.

#![no_std]

mod numbers;

pub use eefs_serialize_macros::WireCodec;

/// The byte order to encode with, or `Native` to use the host's own order (only meaningful
/// for in-memory round-trips that never leave the process; on-medium images always pick
/// `Little` or `Big` explicitly).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
    Native,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SerError {
    #[error("target buffer too small")]
    BufferTooSmall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeError {
    #[error("source buffer too short")]
    BufferTooShort,
}

pub trait WireSerialize {
    /// Encodes `self` into the front of `target`, returning the number of bytes written.
    fn serialize(&self, endianness: Endianness, target: &mut [u8]) -> Result<usize, SerError>;
}

pub trait WireDeserialize {
    /// Decodes a value from the front of `input`, returning it along with the number of
    /// bytes consumed.
    fn deserialize(endianness: Endianness, input: &[u8]) -> Result<(Self, usize), DeError>
    where
        Self: Sized;
}
