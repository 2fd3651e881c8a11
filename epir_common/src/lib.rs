//! Common utilities for EllipticPIR: an EC-ElGamal based **P**rivate **I**nformation **R**etrieval scheme, over the ed25519 curve.
//!
//! This crate holds what both sides of the protocol agree on: byte sizes of scalars, points and ciphers, the persisted mG table
//! record layout, error type and thin wrappers around `curve25519-dalek` for sampling scalars and (de)serializing ciphers.
//! You'll typically not depend on it directly, see `epir_client`.

pub mod branch_opt_util;
pub mod ec;
pub mod error;
pub mod params;
pub mod serialization;

pub use curve25519_dalek::scalar::Scalar;
