use crate::{
    branch_opt_util,
    error::EllipticPIRError,
    params::{CIPHER_SIZE, POINT_SIZE, SCALAR_SIZE},
};
use curve25519_dalek::{
    edwards::{CompressedEdwardsY, EdwardsPoint},
    scalar::Scalar,
};
use rand::prelude::*;
use rand_chacha::ChaCha20Rng;

/// Builds a CSPRNG seeded from the OS entropy source.
fn os_seeded_rng() -> Result<ChaCha20Rng, EllipticPIRError> {
    ChaCha20Rng::try_from_os_rng().map_err(|e| EllipticPIRError::EntropyFailure(e.to_string()))
}

#[inline(always)]
fn sample_scalar(rng: &mut ChaCha20Rng) -> Scalar {
    let mut wide = [0u8; 2 * SCALAR_SIZE];
    rng.fill_bytes(&mut wide);

    Scalar::from_bytes_mod_order_wide(&wide)
}

/// Samples a uniformly random scalar, by reducing 512 random bits modulo the group order.
pub fn random_scalar() -> Result<Scalar, EllipticPIRError> {
    let mut rng = os_seeded_rng()?;
    Ok(sample_scalar(&mut rng))
}

/// Samples `count` independent, uniformly random scalars, from a single freshly seeded CSPRNG.
pub fn random_scalars(count: usize) -> Result<Vec<Scalar>, EllipticPIRError> {
    let mut rng = os_seeded_rng()?;
    Ok((0..count).map(|_| sample_scalar(&mut rng)).collect())
}

/// Interprets 32 little-endian bytes as a scalar. Only canonical encodings, i.e. values less than the group order, are accepted.
pub fn scalar_from_bytes(bytes: [u8; SCALAR_SIZE]) -> Result<Scalar, EllipticPIRError> {
    Option::<Scalar>::from(Scalar::from_canonical_bytes(bytes)).ok_or(EllipticPIRError::InvalidScalarEncoding)
}

/// Decompresses a point, failing if the bytes don't encode a point on the curve.
pub fn point_from_bytes(bytes: [u8; POINT_SIZE]) -> Result<EdwardsPoint, EllipticPIRError> {
    CompressedEdwardsY(bytes).decompress().ok_or(EllipticPIRError::InvalidPointEncoding)
}

/// EC-ElGamal ciphertext `(c1, c2)`, kept as a pair of compressed points, exactly as it travels over the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cipher {
    c1: CompressedEdwardsY,
    c2: CompressedEdwardsY,
}

impl Cipher {
    pub fn new(c1: &EdwardsPoint, c2: &EdwardsPoint) -> Cipher {
        Cipher {
            c1: c1.compress(),
            c2: c2.compress(),
        }
    }

    #[inline(always)]
    pub fn c1(&self) -> &CompressedEdwardsY {
        &self.c1
    }
    #[inline(always)]
    pub fn c2(&self) -> &CompressedEdwardsY {
        &self.c2
    }

    pub fn from_bytes(bytes: &[u8; CIPHER_SIZE]) -> Cipher {
        let mut c1 = [0u8; POINT_SIZE];
        let mut c2 = [0u8; POINT_SIZE];

        c1.copy_from_slice(&bytes[..POINT_SIZE]);
        c2.copy_from_slice(&bytes[POINT_SIZE..]);

        Cipher {
            c1: CompressedEdwardsY(c1),
            c2: CompressedEdwardsY(c2),
        }
    }

    pub fn to_bytes(&self) -> [u8; CIPHER_SIZE] {
        let mut bytes = [0u8; CIPHER_SIZE];
        self.write_to(&mut bytes);
        bytes
    }

    /// Writes `c1 || c2` into the first 64 bytes of `buf`, which must be at least that long.
    #[inline(always)]
    pub fn write_to(&self, buf: &mut [u8]) {
        buf[..POINT_SIZE].copy_from_slice(self.c1.as_bytes());
        buf[POINT_SIZE..CIPHER_SIZE].copy_from_slice(self.c2.as_bytes());
    }

    /// Decompresses both points. Returns `None` if either of them is not on the curve.
    pub fn decompress(&self) -> Option<(EdwardsPoint, EdwardsPoint)> {
        let c1 = self.c1.decompress()?;
        let c2 = self.c2.decompress()?;

        Some((c1, c2))
    }
}

impl TryFrom<&[u8]> for Cipher {
    type Error = EllipticPIRError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if branch_opt_util::unlikely(bytes.len() != CIPHER_SIZE) {
            return Err(EllipticPIRError::InvalidCipherLength(bytes.len()));
        }

        let mut buf = [0u8; CIPHER_SIZE];
        buf.copy_from_slice(bytes);

        Ok(Cipher::from_bytes(&buf))
    }
}

#[cfg(test)]
mod test {
    use crate::{
        ec::{Cipher, point_from_bytes, random_scalars, scalar_from_bytes},
        error::EllipticPIRError,
        params::{CIPHER_SIZE, SCALAR_SIZE},
    };
    use curve25519_dalek::{edwards::EdwardsPoint, scalar::Scalar};
    use test_case::test_case;

    #[test]
    fn random_scalars_are_distinct() {
        let scalars = random_scalars(64).expect("OS entropy must be available");

        for i in 0..scalars.len() {
            for j in (i + 1)..scalars.len() {
                assert_ne!(scalars[i], scalars[j]);
            }
        }
    }

    #[test_case([0u8; SCALAR_SIZE] => matches Ok(_); "Zero is a canonical scalar")]
    #[test_case([0xffu8; SCALAR_SIZE] => matches Err(EllipticPIRError::InvalidScalarEncoding); "All ones exceed the group order")]
    #[test_case({ let mut b = [0u8; SCALAR_SIZE]; b[31] = 0x20; b } => matches Err(EllipticPIRError::InvalidScalarEncoding); "2^253 exceeds the group order")]
    fn scalar_from_bytes_policy(bytes: [u8; SCALAR_SIZE]) -> Result<Scalar, EllipticPIRError> {
        scalar_from_bytes(bytes)
    }

    #[test]
    fn point_from_bytes_rejects_off_curve_encodings() {
        let basepoint = EdwardsPoint::mul_base(&Scalar::ONE).compress().to_bytes();
        assert!(point_from_bytes(basepoint).is_ok());

        // y = 2 has no matching x on ed25519.
        let mut off_curve = [0u8; 32];
        off_curve[0] = 2;
        assert_eq!(point_from_bytes(off_curve), Err(EllipticPIRError::InvalidPointEncoding));
    }

    #[test_case(0 => matches Err(EllipticPIRError::InvalidCipherLength(0)); "Empty slice is not a cipher")]
    #[test_case(CIPHER_SIZE - 1 => matches Err(EllipticPIRError::InvalidCipherLength(_)); "Short slice is not a cipher")]
    #[test_case(CIPHER_SIZE + 1 => matches Err(EllipticPIRError::InvalidCipherLength(_)); "Long slice is not a cipher")]
    #[test_case(CIPHER_SIZE => matches Ok(_); "Exactly two points make a cipher")]
    fn cipher_from_slice(len: usize) -> Result<Cipher, EllipticPIRError> {
        let bytes = vec![0u8; len];
        Cipher::try_from(bytes.as_slice())
    }

    #[test]
    fn cipher_bytes_hold_c1_then_c2() {
        let c1 = EdwardsPoint::mul_base(&Scalar::from(3u64));
        let c2 = EdwardsPoint::mul_base(&Scalar::from(5u64));

        let cipher = Cipher::new(&c1, &c2);
        let bytes = cipher.to_bytes();

        assert_eq!(&bytes[..32], c1.compress().as_bytes());
        assert_eq!(&bytes[32..], c2.compress().as_bytes());
        assert_eq!(cipher.decompress(), Some((c1, c2)));
    }
}
