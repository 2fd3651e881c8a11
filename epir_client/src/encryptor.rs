use crate::{
    keys::{PrivateKey, PublicKey},
    selector,
};
use curve25519_dalek::{edwards::EdwardsPoint, scalar::Scalar};
use epir_common::{
    branch_opt_util,
    ec::{Cipher, random_scalar, random_scalars},
    error::EllipticPIRError,
    params::CIPHER_SIZE,
};
use rayon::prelude::*;

/// Capability of producing EC-ElGamal ciphers for the owner of a private key.
///
/// Implemented by both `PublicKey`, which anyone can use, and `PrivateKey`, which saves the variable-base scalar multiplication
/// by folding the blinding term into a single fixed-base one. For the same message and randomness both produce the very same cipher.
pub trait Encryptor: Sync {
    /// Computes `c2` of the cipher, given the blinding scalar `r` and the message, as a scalar.
    fn blinded_message(&self, r: &Scalar, message: &Scalar) -> EdwardsPoint;

    /// Encrypts `message` as `(r·G, message·G + r·PK)`.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to encrypt. Only messages less than `mmax` of the mG table used for decryption can be recovered.
    /// * `randomness` - The blinding scalar `r`. If `None`, a fresh random scalar is sampled. Supplying it makes encryption deterministic,
    ///   which is meant for testing.
    ///
    /// # Returns
    ///
    /// The cipher, or `EllipticPIRError::EntropyFailure` if randomness had to be sampled and the OS entropy source is unavailable.
    fn encrypt(&self, message: u64, randomness: Option<&Scalar>) -> Result<Cipher, EllipticPIRError> {
        let r = match randomness {
            Some(&r) => r,
            None => random_scalar()?,
        };

        let c1 = EdwardsPoint::mul_base(&r);
        let c2 = self.blinded_message(&r, &Scalar::from(message));

        Ok(Cipher::new(&c1, &c2))
    }

    /// Creates a PIR query selector, addressing element `idx` of a multi-dimensional index space, with `index_counts[d]` indices along dimension `d`.
    ///
    /// The selector is `sum(index_counts)` ciphers, laid out dimension after dimension. Within dimension `d`, the cipher at
    /// the coordinate of `idx` along `d` encrypts 1, the others encrypt 0. Coordinates are obtained by mixed-radix decomposition
    /// of `idx`, first dimension being the most significant one, see `selector::decompose_index`.
    ///
    /// # Arguments
    ///
    /// * `index_counts` - Number of indices along each dimension.
    /// * `idx` - Flat index of the element to query, must be less than `product(index_counts)`.
    /// * `randomness` - If given, one blinding scalar per cipher, in selector order.
    ///
    /// # Returns
    ///
    /// Serialized selector, `sum(index_counts) * 64` bytes. Errors if `idx` is out of range, the shape overflows, the number of
    /// supplied scalars doesn't match or randomness can't be sampled.
    fn create_selector(&self, index_counts: &[u64], idx: u64, randomness: Option<&[Scalar]>) -> Result<Vec<u8>, EllipticPIRError> {
        let coords = selector::decompose_index(index_counts, idx)?;
        let ciphers_count = selector::ciphers_count(index_counts).ok_or(EllipticPIRError::SelectorShapeOverflow)?;

        let sampled;
        let randomness = match randomness {
            Some(r) => {
                if branch_opt_util::unlikely(r.len() as u64 != ciphers_count) {
                    return Err(EllipticPIRError::RandomnessCountMismatch {
                        expected: ciphers_count,
                        found: r.len(),
                    });
                }
                r
            }
            None => {
                sampled = random_scalars(ciphers_count as usize)?;
                &sampled[..]
            }
        };

        let bits = selector::one_hot_bits(index_counts, &coords);

        let mut selector = vec![0u8; ciphers_count as usize * CIPHER_SIZE];
        selector
            .par_chunks_exact_mut(CIPHER_SIZE)
            .zip(bits.par_iter())
            .zip(randomness.par_iter())
            .try_for_each(|((buf, &bit), r)| {
                let cipher = self.encrypt(bit as u64, Some(r))?;
                cipher.write_to(buf);

                Ok(())
            })?;

        Ok(selector)
    }
}

impl Encryptor for PublicKey {
    #[inline(always)]
    fn blinded_message(&self, r: &Scalar, message: &Scalar) -> EdwardsPoint {
        EdwardsPoint::mul_base(message) + r * self.point()
    }
}

impl Encryptor for PrivateKey {
    #[inline(always)]
    fn blinded_message(&self, r: &Scalar, message: &Scalar) -> EdwardsPoint {
        EdwardsPoint::mul_base(&(r * self.scalar() + message))
    }
}

#[cfg(test)]
pub(crate) mod test {
    use crate::{
        encryptor::Encryptor,
        keys::{
            PrivateKey, PublicKey,
            test::{PRIVKEY, PUBKEY},
        },
    };
    use epir_common::{
        Scalar,
        ec::{Cipher, scalar_from_bytes},
        error::EllipticPIRError,
        params::{CIPHER_SIZE, DEFAULT_MMAX, SCALAR_SIZE},
    };
    use test_case::test_case;

    pub const MSG: u64 = (0x12345678 & (DEFAULT_MMAX - 1)) as u64;
    pub const R: [u8; SCALAR_SIZE] = [
        0x42, 0xff, 0x2d, 0x98, 0x4a, 0xe5, 0xa2, 0x8f, 0x7d, 0x02, 0x69, 0x87, 0xc7, 0x10, 0x9a, 0x7b, 0x3a, 0x1d, 0x36, 0x58, 0x82, 0x5a, 0x09,
        0x17, 0xe1, 0x69, 0x3e, 0x83, 0xa5, 0x71, 0x5d, 0x09,
    ];
    pub const CIPHER: [u8; CIPHER_SIZE] = [
        0x11, 0xa9, 0x4e, 0xb7, 0x18, 0x53, 0x7e, 0x94, 0x7d, 0x0f, 0xf3, 0x0c, 0xdd, 0xae, 0x16, 0xae, 0xab, 0x42, 0x9e, 0xac, 0x09, 0x2b, 0x22,
        0x00, 0x06, 0xb1, 0x9c, 0xcc, 0xb5, 0x26, 0xb4, 0x30, 0xeb, 0x76, 0x83, 0xc0, 0xdf, 0x90, 0x3a, 0x88, 0xf6, 0xf1, 0x09, 0x52, 0xbc, 0xa4,
        0xd6, 0x45, 0x28, 0x4f, 0xf7, 0xed, 0x95, 0xc6, 0xa4, 0xe9, 0x67, 0xf5, 0xe7, 0xae, 0x22, 0xc9, 0x33, 0xcb,
    ];

    #[test]
    fn encrypt_normal_matches_known_answer() {
        let pubkey = PublicKey::from_bytes(PUBKEY).expect("Test public key is on the curve");
        let r = scalar_from_bytes(R).expect("Test randomness is canonical");

        let cipher = pubkey.encrypt(MSG, Some(&r)).expect("Encryption with given randomness can't fail");
        assert_eq!(cipher, Cipher::from_bytes(&CIPHER));
    }

    #[test]
    fn encrypt_fast_matches_known_answer() {
        let privkey = PrivateKey::from_bytes(PRIVKEY).expect("Test private key is canonical");
        let r = scalar_from_bytes(R).expect("Test randomness is canonical");

        let cipher = privkey.encrypt(MSG, Some(&r)).expect("Encryption with given randomness can't fail");
        assert_eq!(cipher, Cipher::from_bytes(&CIPHER));
    }

    #[test]
    fn fresh_randomness_is_sampled_when_not_supplied() {
        let privkey = PrivateKey::generate().expect("OS entropy must be available");

        let cipher0 = privkey.encrypt(MSG, None).expect("OS entropy must be available");
        let cipher1 = privkey.encrypt(MSG, None).expect("OS entropy must be available");

        assert_ne!(cipher0, cipher1);
    }

    #[test]
    fn selector_has_one_cipher_per_index() {
        let privkey = PrivateKey::generate().expect("OS entropy must be available");

        let selector = privkey.create_selector(&[3, 4], 5, None).expect("Index is in range");
        assert_eq!(selector.len(), 7 * CIPHER_SIZE);
    }

    #[test]
    fn selector_is_deterministic_with_given_randomness() {
        let privkey = PrivateKey::from_bytes(PRIVKEY).expect("Test private key is canonical");
        let pubkey = PublicKey::from_private_key(&privkey);
        let randomness = (1..=7u64).map(Scalar::from).collect::<Vec<_>>();

        let fast = privkey.create_selector(&[3, 4], 11, Some(&randomness)).expect("Index is in range");
        let normal = pubkey.create_selector(&[3, 4], 11, Some(&randomness)).expect("Index is in range");

        assert_eq!(fast, normal);
    }

    #[test_case(&[3, 4], 12 => matches Err(EllipticPIRError::SelectorIndexOutOfRange { index: 12, elements_count: 12 }); "Index equal to number of elements is out of range")]
    #[test_case(&[3, 0], 0 => matches Err(EllipticPIRError::SelectorIndexOutOfRange { index: 0, elements_count: 0 }); "Empty dimension addresses nothing")]
    #[test_case(&[u64::MAX, 2], 0 => matches Err(EllipticPIRError::SelectorShapeOverflow); "Number of elements overflows")]
    #[test_case(&[3, 4], 11 => matches Ok(_); "Last index is in range")]
    fn selector_creation_failures(index_counts: &[u64], idx: u64) -> Result<Vec<u8>, EllipticPIRError> {
        let privkey = PrivateKey::from_bytes(PRIVKEY).expect("Test private key is canonical");
        privkey.create_selector(index_counts, idx, None)
    }

    #[test]
    fn selector_rejects_wrong_amount_of_randomness() {
        let privkey = PrivateKey::from_bytes(PRIVKEY).expect("Test private key is canonical");
        let randomness = vec![Scalar::ONE; 6];

        assert_eq!(
            privkey.create_selector(&[3, 4], 0, Some(&randomness)),
            Err(EllipticPIRError::RandomnessCountMismatch { expected: 7, found: 6 })
        );
    }
}
