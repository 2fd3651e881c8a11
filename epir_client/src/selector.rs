//! Shape of a PIR query selector.
//!
//! An index space of `product(index_counts)` elements is addressed with `sum(index_counts)` encrypted bits, one one-hot vector per
//! dimension. Flat indices map to per-dimension coordinates by mixed-radix decomposition with the first dimension being the most
//! significant digit, i.e. `idx = ((c[0] * n[1] + c[1]) * n[2] + c[2]) ...`. PIR servers must walk dimensions in the same order.

use epir_common::{branch_opt_util, error::EllipticPIRError};

/// Number of ciphers in a selector for given shape, `None` if it overflows u64.
pub fn ciphers_count(index_counts: &[u64]) -> Option<u64> {
    index_counts.iter().try_fold(0u64, |acc, &count| acc.checked_add(count))
}

/// Number of elements addressable by a selector of given shape, `None` if it overflows u64.
pub fn elements_count(index_counts: &[u64]) -> Option<u64> {
    index_counts.iter().try_fold(1u64, |acc, &count| acc.checked_mul(count))
}

/// Decomposes flat index `idx` into one coordinate per dimension, most significant dimension first.
pub fn decompose_index(index_counts: &[u64], idx: u64) -> Result<Vec<u64>, EllipticPIRError> {
    let elements_count = elements_count(index_counts).ok_or(EllipticPIRError::SelectorShapeOverflow)?;
    if branch_opt_util::unlikely(idx >= elements_count) {
        return Err(EllipticPIRError::SelectorIndexOutOfRange { index: idx, elements_count });
    }

    // Every count is non-zero here, otherwise `elements_count` would've been zero.
    let mut coords = vec![0u64; index_counts.len()];
    let mut rest = idx;

    for (coord, &count) in coords.iter_mut().zip(index_counts).rev() {
        *coord = rest % count;
        rest /= count;
    }

    Ok(coords)
}

/// Inverse of `decompose_index`.
pub fn compose_index(index_counts: &[u64], coords: &[u64]) -> Result<u64, EllipticPIRError> {
    elements_count(index_counts).ok_or(EllipticPIRError::SelectorShapeOverflow)?;

    if branch_opt_util::unlikely(coords.len() != index_counts.len() || coords.iter().zip(index_counts).any(|(&c, &n)| c >= n)) {
        return Err(EllipticPIRError::SelectorCoordinatesOutOfRange);
    }

    // Can't overflow, result is less than `elements_count`.
    Ok(coords.iter().zip(index_counts).fold(0u64, |acc, (&c, &n)| acc * n + c))
}

/// Plaintext bits of a selector, for already decomposed coordinates: dimension after dimension, a single 1 at `coords[d]`.
pub(crate) fn one_hot_bits(index_counts: &[u64], coords: &[u64]) -> Vec<u8> {
    index_counts
        .iter()
        .zip(coords)
        .flat_map(|(&count, &coord)| (0..count).map(move |i| (i == coord) as u8))
        .collect()
}
