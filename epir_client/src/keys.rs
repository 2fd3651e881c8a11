use curve25519_dalek::{edwards::EdwardsPoint, scalar::Scalar};
use epir_common::{
    ec::{point_from_bytes, random_scalar, scalar_from_bytes},
    error::EllipticPIRError,
    params::{POINT_SIZE, SCALAR_SIZE},
};
use std::fmt;
use zeroize::Zeroize;

/// EC-ElGamal private key, a scalar `sk`. It is used for decrypting replies and for the fast encryption path.
/// Never leaves the client. The scalar is wiped from memory when the key is dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    scalar: Scalar,
}

impl PrivateKey {
    /// Generates a fresh private key from the OS entropy source.
    ///
    /// # Returns
    ///
    /// The new key, or `EllipticPIRError::EntropyFailure` if the OS entropy source is unavailable.
    pub fn generate() -> Result<PrivateKey, EllipticPIRError> {
        Ok(PrivateKey { scalar: random_scalar()? })
    }

    /// Restores a private key from its 32 byte little-endian encoding.
    ///
    /// Only canonical scalar encodings are accepted, i.e. the value must be less than the group order, otherwise
    /// `EllipticPIRError::InvalidScalarEncoding` is returned.
    pub fn from_bytes(bytes: [u8; SCALAR_SIZE]) -> Result<PrivateKey, EllipticPIRError> {
        Ok(PrivateKey {
            scalar: scalar_from_bytes(bytes)?,
        })
    }

    pub fn to_bytes(&self) -> [u8; SCALAR_SIZE] {
        self.scalar.to_bytes()
    }

    #[inline(always)]
    pub(crate) fn scalar(&self) -> &Scalar {
        &self.scalar
    }
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.scalar.zeroize();
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey(***)")
    }
}

/// EC-ElGamal public key `sk·G`. Can be shared freely, anyone holding it can encrypt messages for the owner of `sk`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicKey {
    point: EdwardsPoint,
}

impl PublicKey {
    pub fn from_private_key(privkey: &PrivateKey) -> PublicKey {
        PublicKey {
            point: EdwardsPoint::mul_base(privkey.scalar()),
        }
    }

    /// Restores a public key from its compressed point encoding, failing with `EllipticPIRError::InvalidPointEncoding`
    /// if the bytes are not a point on the curve.
    pub fn from_bytes(bytes: [u8; POINT_SIZE]) -> Result<PublicKey, EllipticPIRError> {
        Ok(PublicKey {
            point: point_from_bytes(bytes)?,
        })
    }

    pub fn to_bytes(&self) -> [u8; POINT_SIZE] {
        self.point.compress().to_bytes()
    }

    #[inline(always)]
    pub(crate) fn point(&self) -> &EdwardsPoint {
        &self.point
    }
}

/// Lowercase hex of the compressed point, i.e. of `to_bytes()`.
impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_bytes().iter().try_for_each(|byte| write!(f, "{:02x}", byte))
    }
}

impl From<&PrivateKey> for PublicKey {
    fn from(privkey: &PrivateKey) -> Self {
        PublicKey::from_private_key(privkey)
    }
}
