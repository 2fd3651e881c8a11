use std::{error::Error, fmt::Display};

#[derive(Debug, PartialEq)]
pub enum EllipticPIRError {
    // Keys and ciphers
    InvalidScalarEncoding,
    InvalidPointEncoding,
    InvalidCipherLength(usize),
    EntropyFailure(String),

    // Selector
    SelectorIndexOutOfRange { index: u64, elements_count: u64 },
    SelectorShapeOverflow,
    SelectorCoordinatesOutOfRange,
    RandomnessCountMismatch { expected: u64, found: usize },

    // mG table
    InvalidMGTableSize(usize),
    MGTableSizeMismatch { expected: usize, found: usize },
    MGTableNotWholeRecords(u64),
    MGTableNotSorted,
    MGTableDigestMismatch,
    MGTableGenerationCancelled,
    FailedToReadMGTable(String),
    FailedToWriteMGTable(String),
    HomeDirectoryUnavailable,

    // Reply
    InvalidReplyDimension,
    UnsupportedPacking(u8),
    InvalidReplyLength(usize),
    ReplyDecodeFailure { phase: u8, cipher_index: usize },
}

impl Display for EllipticPIRError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidScalarEncoding => write!(f, "Bytes are not a canonical encoding of a scalar less than the group order."),
            Self::InvalidPointEncoding => write!(f, "Bytes do not decompress to a point on the curve."),
            Self::InvalidCipherLength(len) => write!(f, "A cipher must be exactly 64 bytes, found {} bytes.", len),
            Self::EntropyFailure(e) => write!(f, "Failed to seed CSPRNG from OS entropy source: {}", e),

            Self::SelectorIndexOutOfRange { index, elements_count } => {
                write!(f, "Selector index '{}' is out of range, selector addresses only '{}' elements.", index, elements_count)
            }
            Self::SelectorShapeOverflow => write!(f, "Number of ciphers or elements of the selector overflows u64."),
            Self::SelectorCoordinatesOutOfRange => write!(f, "Selector coordinates don't match the number of dimensions or exceed their index counts."),
            Self::RandomnessCountMismatch { expected, found } => {
                write!(f, "Selector needs '{}' randomness scalars, but '{}' were supplied.", expected, found)
            }

            Self::InvalidMGTableSize(mmax) => write!(f, "mG table size must be in (0, 2^32], found '{}'.", mmax),
            Self::MGTableSizeMismatch { expected, found } => write!(f, "Expected '{}' entries in mG table, but found '{}'.", expected, found),
            Self::MGTableNotWholeRecords(len) => {
                write!(f, "mG table file of '{}' bytes doesn't hold a whole number of 36 byte records.", len)
            }
            Self::MGTableNotSorted => write!(f, "mG table entries are not sorted by point bytes."),
            Self::MGTableDigestMismatch => write!(f, "Digest of mG table doesn't match the expected one."),
            Self::MGTableGenerationCancelled => write!(f, "mG table generation was cancelled."),
            Self::FailedToReadMGTable(e) => write!(f, "Reading mG table failed with: {}", e),
            Self::FailedToWriteMGTable(e) => write!(f, "Writing mG table failed with: {}", e),
            Self::HomeDirectoryUnavailable => write!(f, "Can't resolve default mG table path, HOME is not set."),

            Self::InvalidReplyDimension => write!(f, "Reply dimension must be at least 1."),
            Self::UnsupportedPacking(packing) => write!(f, "Packing must be in [1, 4], found '{}'.", packing),
            Self::InvalidReplyLength(len) => write!(f, "Reply of '{}' bytes doesn't hold a non-zero whole number of ciphers.", len),
            Self::ReplyDecodeFailure { phase, cipher_index } => {
                write!(f, "Failed to decrypt cipher '{}' of reply in phase '{}'.", cipher_index, phase)
            }
        }
    }
}

impl Error for EllipticPIRError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}
