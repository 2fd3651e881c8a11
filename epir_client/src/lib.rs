//! EllipticPIR: client side of an EC-ElGamal based **P**rivate **I**nformation **R**etrieval (PIR) scheme, over the ed25519 curve.
//!
//! This crate lets a PIR client retrieve one element of a multi-dimensional database, without the server learning which one.
//! Messages are encoded as multiples of the base point, `m·G`, which makes EC-ElGamal additively homomorphic, and are recovered
//! with a precomputed discrete logarithm ("mG") table, bounding decryptable messages to [0, mmax).
//!
//! ## Features
//!
//! * **Two encryption paths:** Anyone holding the `PublicKey` can encrypt, while the owner of the `PrivateKey` can do it faster.
//!   Both produce the very same ciphers.
//! * **Multi-dimensional selectors:** A query for one of `product(index_counts)` elements costs only `sum(index_counts)` ciphers.
//! * **Build-once mG table:** `DecryptionContext` is generated in parallel, with progress reporting and cancellation, or loaded from
//!   a persisted file. It is immutable afterwards, wrap it in an `Arc` to decrypt from many threads at once.
//! * **Error Handling:** Failures during setup and reply decoding are reported as `EllipticPIRError`, while a single cipher whose
//!   message is out of range just decrypts to `None`.
//!
//! ## Usage
//!
//! This crate is designed to be used in conjunction with other crates which provides communication mechanism between PIR clients and server.
//!
//! ```rust
//! use epir_client::{DecryptionContext, Encryptor, PrivateKey, PublicKey, selector};
//!
//! fn main() {
//!     let privkey = PrivateKey::generate().expect("OS entropy source unavailable");
//!     let pubkey = PublicKey::from_private_key(&privkey);
//!
//!     // Query element 7 of a 3 x 4 index space.
//!     let index_counts = [3, 4];
//!     assert_eq!(selector::ciphers_count(&index_counts), Some(7));
//!     assert_eq!(selector::elements_count(&index_counts), Some(12));
//!
//!     let query = privkey.create_selector(&index_counts, 7, None).expect("Index is in range");
//!     // Send `query` to PIR server, and receive its reply ...
//!
//!     // Tiny table, real clients load `DEFAULT_MMAX` entries, see `MGTableConfig`.
//!     let ctx = DecryptionContext::generate(1 << 10).expect("mG table generation failed");
//!
//!     let cipher = pubkey.encrypt(42, None).expect("OS entropy source unavailable");
//!     assert_eq!(ctx.decrypt_cipher(&privkey, &cipher), Some(42));
//! }
//! ```

pub mod config;
mod encryptor;
mod keys;
mod mg_table;
mod reply;
pub mod selector;

pub use config::{MGTableConfig, MGTableSource, mg_default_path};
pub use encryptor::Encryptor;
pub use epir_common::{
    Scalar,
    ec::{Cipher, random_scalar, random_scalars, scalar_from_bytes},
    error::EllipticPIRError,
    params::{CIPHER_SIZE, DEFAULT_MMAX, POINT_SIZE, SCALAR_SIZE},
};
pub use keys::{PrivateKey, PublicKey};
pub use mg_table::DecryptionContext;
