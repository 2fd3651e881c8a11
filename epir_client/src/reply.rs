use crate::{keys::PrivateKey, mg_table::DecryptionContext};
use epir_common::{
    branch_opt_util,
    ec::Cipher,
    error::EllipticPIRError,
    params::{CIPHER_SIZE, MAX_PACKING},
    serialization::u64_to_le_bytes,
};
use rayon::prelude::*;
use tracing::{debug, warn};

impl DecryptionContext {
    /// Decrypts a PIR server reply back into plaintext bytes.
    ///
    /// A server answering a `dimension` dimensional selector wraps the queried element in `dimension` layers of encryption. In each
    /// layer, bytes are split into little-endian messages of `packing` bytes and every message becomes one cipher, whose bytes in turn
    /// are the input of the next layer. Decryption peels layers off in reverse, outermost one first, and each layer depends on the
    /// fully decrypted previous one. Ciphers within a layer are decrypted in parallel.
    ///
    /// # Arguments
    ///
    /// * `privkey` - The private key the selector was created for.
    /// * `reply` - Reply bytes as received from the server.
    /// * `dimension` - Number of encryption layers, i.e. number of dimensions of the selector. Must be non-zero.
    /// * `packing` - Number of bytes packed into each message, in [1, 4]. Every decrypted message must fit in that many bytes.
    ///
    /// # Returns
    ///
    /// Plaintext bytes, zero padding of the innermost layer's last message included. Any cipher that doesn't decrypt fails
    /// the whole reply with `EllipticPIRError::ReplyDecodeFailure`, since a missing value corrupts every layer beneath it.
    pub fn decrypt_reply(&self, privkey: &PrivateKey, reply: &[u8], dimension: u8, packing: u8) -> Result<Vec<u8>, EllipticPIRError> {
        if branch_opt_util::unlikely(dimension == 0) {
            return Err(EllipticPIRError::InvalidReplyDimension);
        }
        if branch_opt_util::unlikely(packing == 0 || packing > MAX_PACKING) {
            return Err(EllipticPIRError::UnsupportedPacking(packing));
        }

        let packing = packing as usize;
        let max_message = 1u64 << (8 * packing);

        let mut buf = reply.to_vec();

        for phase in 0..dimension {
            if branch_opt_util::unlikely(buf.is_empty() || buf.len() % CIPHER_SIZE != 0) {
                return Err(EllipticPIRError::InvalidReplyLength(buf.len()));
            }

            let num_ciphers = buf.len() / CIPHER_SIZE;
            let mut decrypted = vec![0u8; num_ciphers * packing];

            decrypted
                .par_chunks_exact_mut(packing)
                .zip(buf.par_chunks_exact(CIPHER_SIZE))
                .enumerate()
                .try_for_each(|(cipher_index, (slot, cipher_bytes))| {
                    let cipher = Cipher::try_from(cipher_bytes)?;

                    match self.decrypt_cipher(privkey, &cipher) {
                        Some(message) if branch_opt_util::likely((message as u64) < max_message) => {
                            u64_to_le_bytes(message as u64, slot);
                            Ok(())
                        }
                        _ => Err(EllipticPIRError::ReplyDecodeFailure { phase, cipher_index }),
                    }
                })
                .inspect_err(|e| warn!(phase, error = %e, "Failed to decrypt PIR reply"))?;

            let is_last_phase = phase + 1 == dimension;
            if !is_last_phase {
                // Drop zero padding, which completed the last message of the inner layer.
                let num_whole_ciphers = decrypted.len() / CIPHER_SIZE;
                decrypted.truncate(num_whole_ciphers * CIPHER_SIZE);
            }

            debug!(phase, num_ciphers, decrypted_len = decrypted.len(), "Decrypted PIR reply layer");
            buf = decrypted;
        }

        Ok(buf)
    }
}

#[cfg(test)]
mod test {
    use crate::{
        encryptor::Encryptor,
        keys::{PrivateKey, test::PRIVKEY},
        mg_table::{
            DecryptionContext,
            test::{SMALL_MMAX, small_table},
        },
    };
    use epir_common::{
        error::EllipticPIRError,
        params::{CIPHER_SIZE, DEFAULT_MMAX},
        serialization::pack_bytes_as_words,
    };
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;
    use test_case::test_case;

    /// Wraps `plaintext` in `dimension` layers of encryption, the way a PIR server's reply is shaped.
    fn encrypt_layers(privkey: &PrivateKey, plaintext: &[u8], dimension: u8, packing: u8) -> Vec<u8> {
        (0..dimension).fold(plaintext.to_vec(), |layer, _| {
            pack_bytes_as_words(&layer, packing)
                .expect("Packing is supported")
                .into_iter()
                .flat_map(|word| privkey.encrypt(word, None).expect("OS entropy must be available").to_bytes())
                .collect()
        })
    }

    #[test_case(1, 1; "Single layer, one byte per message")]
    #[test_case(1, 2; "Single layer, two bytes per message")]
    #[test_case(2, 1; "Two layers, one byte per message")]
    #[test_case(2, 2; "Two layers, two bytes per message")]
    fn reply_decrypts_to_plaintext(dimension: u8, packing: u8) {
        let table = small_table();
        let privkey = PrivateKey::from_bytes(PRIVKEY).expect("Test private key is canonical");

        let mut plaintext = vec![0u8; 6];
        ChaCha8Rng::from_os_rng().fill_bytes(&mut plaintext);

        let reply = encrypt_layers(&privkey, &plaintext, dimension, packing);
        let decrypted = table.decrypt_reply(&privkey, &reply, dimension, packing).expect("Reply must be decryptable");

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    #[ignore = "builds a full size mG table, run with `cargo test --profile test-release -- --ignored`"]
    fn three_byte_packing_drops_padding_of_inner_layer() {
        let table = DecryptionContext::generate(DEFAULT_MMAX).expect("Table generation must succeed");
        let privkey = PrivateKey::generate().expect("OS entropy must be available");

        // Two inner ciphers are 128 bytes, packed as 43 outer messages, the last one carrying a byte of padding.
        let plaintext = [11u8, 22, 33, 44, 55, 66];
        let reply = encrypt_layers(&privkey, &plaintext, 2, 3);
        assert_eq!(reply.len(), 43 * CIPHER_SIZE);

        assert_eq!(table.decrypt_reply(&privkey, &reply, 2, 3), Ok(plaintext.to_vec()));
    }

    #[test]
    fn reply_keeps_padding_of_innermost_layer() {
        let table = small_table();
        let privkey = PrivateKey::generate().expect("OS entropy must be available");

        let plaintext = [0xde, 0xad, 0xbe];
        let reply = encrypt_layers(&privkey, &plaintext, 1, 2);

        assert_eq!(table.decrypt_reply(&privkey, &reply, 1, 2), Ok(vec![0xde, 0xad, 0xbe, 0x00]));
    }

    #[test]
    fn tampered_reply_fails_as_a_whole() {
        let table = small_table();
        let privkey = PrivateKey::generate().expect("OS entropy must be available");

        let plaintext = [1u8, 2, 3, 4];
        let mut reply = encrypt_layers(&privkey, &plaintext, 1, 1);

        let tampered = privkey.encrypt(SMALL_MMAX as u64 + 7, None).expect("OS entropy must be available");
        reply[2 * CIPHER_SIZE..3 * CIPHER_SIZE].copy_from_slice(&tampered.to_bytes());

        assert_eq!(
            table.decrypt_reply(&privkey, &reply, 1, 1),
            Err(EllipticPIRError::ReplyDecodeFailure { phase: 0, cipher_index: 2 })
        );
    }

    #[test]
    fn message_wider_than_packing_fails() {
        let table = small_table();
        let privkey = PrivateKey::generate().expect("OS entropy must be available");

        let reply = privkey.encrypt(256, None).expect("OS entropy must be available").to_bytes();

        assert_eq!(
            table.decrypt_reply(&privkey, &reply, 1, 1),
            Err(EllipticPIRError::ReplyDecodeFailure { phase: 0, cipher_index: 0 })
        );
        assert_eq!(table.decrypt_reply(&privkey, &reply, 1, 2), Ok(vec![0x00, 0x01]));
    }

    #[test_case(0, 1, CIPHER_SIZE => Err(EllipticPIRError::InvalidReplyDimension); "Dimension must be non-zero")]
    #[test_case(1, 0, CIPHER_SIZE => Err(EllipticPIRError::UnsupportedPacking(0)); "Packing must be non-zero")]
    #[test_case(1, 5, CIPHER_SIZE => Err(EllipticPIRError::UnsupportedPacking(5)); "Packing can't exceed four bytes")]
    #[test_case(1, 1, 0 => Err(EllipticPIRError::InvalidReplyLength(0)); "Empty reply")]
    #[test_case(1, 1, CIPHER_SIZE + 1 => Err(EllipticPIRError::InvalidReplyLength(CIPHER_SIZE + 1)); "Partial cipher")]
    #[test_case(2, 1, CIPHER_SIZE => Err(EllipticPIRError::InvalidReplyLength(0)); "Inner layer holds no whole cipher")]
    fn malformed_reply_fails(dimension: u8, packing: u8, reply_len: usize) -> Result<Vec<u8>, EllipticPIRError> {
        let table = small_table();
        let privkey = PrivateKey::generate().expect("OS entropy must be available");

        let reply = privkey
            .encrypt(0, None)
            .expect("OS entropy must be available")
            .to_bytes()
            .into_iter()
            .cycle()
            .take(reply_len)
            .collect::<Vec<_>>();

        table.decrypt_reply(&privkey, &reply, dimension, packing)
    }
}
