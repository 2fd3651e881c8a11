use crate::{
    branch_opt_util,
    error::EllipticPIRError,
    params::{MAX_PACKING, MG_RECORD_SIZE, POINT_SIZE},
};
use std::cmp::min;

/// Encodes one mG table entry as a fixed size record: 32 point bytes followed by the message, as little-endian u32.
#[inline(always)]
pub fn encode_mg_record(point: &[u8; POINT_SIZE], message: u32, record: &mut [u8]) {
    debug_assert_eq!(record.len(), MG_RECORD_SIZE);

    record[..POINT_SIZE].copy_from_slice(point);
    u64_to_le_bytes(message as u64, &mut record[POINT_SIZE..]);
}

/// Decodes one mG table record, laid out as written by `encode_mg_record`.
#[inline(always)]
pub fn decode_mg_record(record: &[u8]) -> ([u8; POINT_SIZE], u32) {
    debug_assert_eq!(record.len(), MG_RECORD_SIZE);

    let mut point = [0u8; POINT_SIZE];
    point.copy_from_slice(&record[..POINT_SIZE]);

    let message = u64_from_le_bytes(&record[POINT_SIZE..]) as u32;
    (point, message)
}

/// Converts a slice of bytes into a u64 in little-endian byte order.
///
/// Reads at most 8 bytes from the input slice. If the slice is shorter than 8 bytes, it reads only the available bytes,
/// while setting other bytes to 0. The function handles cases where the input slice is empty.
///
/// # Arguments
///
/// * `bytes` - The slice of bytes to convert.
///
/// # Returns
///
/// A u64 representing the bytes in little-endian byte order.
#[inline(always)]
pub fn u64_from_le_bytes(bytes: &[u8]) -> u64 {
    let readable_num_bytes = min(bytes.len(), std::mem::size_of::<u64>());

    bytes
        .iter()
        .take(readable_num_bytes)
        .enumerate()
        .fold(0u64, |word, (idx, &byte)| word | ((byte as u64) << (idx * 8)))
}

/// Converts a u64 into a slice of bytes in little-endian byte order.
///
/// Writes at most 8 bytes to the output slice. If the slice is shorter than 8 bytes, only the low order bytes are written,
/// so the caller must check beforehand that the word fits, if truncation matters.
///
/// # Arguments
///
/// * `word` - The u64 to convert.
/// * `bytes` - The mutable slice of bytes to write to.
#[inline(always)]
pub fn u64_to_le_bytes(word: u64, bytes: &mut [u8]) {
    let writable_num_bytes = min(bytes.len(), std::mem::size_of::<u64>());

    for (idx, byte) in bytes.iter_mut().enumerate().take(writable_num_bytes) {
        *byte = (word >> (idx * 8)) as u8;
    }
}

/// Splits a byte string into little-endian words of `packing` bytes each, zero padding the last one.
/// This is how a PIR server turns one layer's bytes into messages for the next layer, so that a reply can be decoded by
/// writing each decrypted message back as `packing` bytes. Returns `EllipticPIRError::UnsupportedPacking` unless packing is in [1, 4].
pub fn pack_bytes_as_words(bytes: &[u8], packing: u8) -> Result<Vec<u64>, EllipticPIRError> {
    if branch_opt_util::unlikely(packing == 0 || packing > MAX_PACKING) {
        return Err(EllipticPIRError::UnsupportedPacking(packing));
    }

    Ok(bytes.chunks(packing as usize).map(u64_from_le_bytes).collect())
}
