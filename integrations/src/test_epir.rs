#![cfg(test)]

use std::{
    ops::ControlFlow,
    sync::{Arc, OnceLock},
};

use curve25519_dalek::{edwards::EdwardsPoint, traits::Identity};
use epir_client::{
    CIPHER_SIZE, Cipher, DecryptionContext, EllipticPIRError, Encryptor, MGTableConfig, MGTableSource, PrivateKey, PublicKey, Scalar,
    random_scalars, selector,
};
use epir_common::serialization::pack_bytes_as_words;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use test_case::test_case;

const MMAX: usize = 1usize << 16;

fn shared_table() -> Arc<DecryptionContext> {
    static TABLE: OnceLock<Arc<DecryptionContext>> = OnceLock::new();
    TABLE
        .get_or_init(|| Arc::new(DecryptionContext::generate(MMAX).expect("Table generation failed")))
        .clone()
}

fn generate_random_database(rng: &mut ChaCha8Rng, num_elements: usize, element_byte_len: usize) -> Vec<Vec<u8>> {
    (0..num_elements)
        .map(|_| {
            let mut element = vec![0u8; element_byte_len];
            rng.fill_bytes(&mut element);
            element
        })
        .collect()
}

/// Collapses one dimension: every output cipher is `sum(word_i · selector_i)`, i.e. encryption of the selected element's word.
fn respond_along_dimension(selector: &[Cipher], elements: &[Vec<u8>], packing: u8) -> Vec<u8> {
    let points = selector.iter().map(|c| c.decompress().expect("Selector holds valid ciphers")).collect::<Vec<_>>();
    let words = elements
        .iter()
        .map(|e| pack_bytes_as_words(e, packing).expect("Packing is supported"))
        .collect::<Vec<_>>();

    let num_words = words.iter().map(Vec::len).max().unwrap_or(0);

    (0..num_words)
        .flat_map(|word_idx| {
            let (c1, c2) = words.iter().zip(&points).fold(
                (EdwardsPoint::identity(), EdwardsPoint::identity()),
                |(acc1, acc2), (element_words, (c1, c2))| {
                    let w = Scalar::from(element_words.get(word_idx).copied().unwrap_or(0));
                    (acc1 + w * c1, acc2 + w * c2)
                },
            );

            Cipher::new(&c1, &c2).to_bytes()
        })
        .collect()
}

/// Minimal PIR server, answering a selector over `database`, last dimension first.
fn respond(index_counts: &[u64], query: &[u8], database: &[Vec<u8>], packing: u8) -> Vec<u8> {
    let ciphers = query
        .chunks_exact(CIPHER_SIZE)
        .map(|bytes| Cipher::try_from(bytes).expect("Query holds whole ciphers"))
        .collect::<Vec<_>>();

    let mut elements = database.to_vec();
    let mut selector_end = ciphers.len();

    for &index_count in index_counts.iter().rev() {
        let index_count = index_count as usize;
        let dimension_selector = &ciphers[selector_end - index_count..selector_end];
        selector_end -= index_count;

        elements = elements
            .chunks(index_count)
            .map(|group| respond_along_dimension(dimension_selector, group, packing))
            .collect();
    }

    assert_eq!(elements.len(), 1);
    elements.pop().unwrap_or_default()
}

#[test]
fn selector_is_one_hot_at_decomposed_position() {
    let table = shared_table();
    let privkey = PrivateKey::generate().expect("Key generation failed");

    let index_counts = [3u64, 4];
    assert_eq!(selector::ciphers_count(&index_counts), Some(7));
    assert_eq!(selector::elements_count(&index_counts), Some(12));

    for idx in 0..12 {
        let query = privkey.create_selector(&index_counts, idx, None).expect("Selector creation failed");
        assert_eq!(query.len(), 7 * CIPHER_SIZE);

        let bits = query
            .chunks_exact(CIPHER_SIZE)
            .map(|bytes| table.decrypt_cipher(&privkey, &Cipher::try_from(bytes).expect("Whole cipher")))
            .collect::<Vec<_>>();

        let coords = selector::decompose_index(&index_counts, idx).expect("Index is in range");
        assert_eq!(coords, vec![idx / 4, idx % 4]);
        assert_eq!(selector::compose_index(&index_counts, &coords), Ok(idx));

        let mut expected = vec![Some(0); 7];
        expected[coords[0] as usize] = Some(1);
        expected[3 + coords[1] as usize] = Some(1);

        assert_eq!(bits, expected);
    }
}

#[test_case(&[12], 1; "Single dimension, one byte per message")]
#[test_case(&[12], 2; "Single dimension, two bytes per message")]
#[test_case(&[3, 4], 1; "Two dimensions, one byte per message")]
#[test_case(&[3, 4], 2; "Two dimensions, two bytes per message")]
#[test_case(&[2, 3, 2], 2; "Three dimensions, two bytes per message")]
fn private_retrieval_returns_queried_element(index_counts: &[u64], packing: u8) {
    const ELEMENT_BYTE_LEN: usize = 8;

    let mut rng = ChaCha8Rng::from_os_rng();
    let table = shared_table();

    let privkey = PrivateKey::generate().expect("Key generation failed");
    let pubkey = PublicKey::from_bytes(PublicKey::from_private_key(&privkey).to_bytes()).expect("Public key must round trip");

    let num_elements = selector::elements_count(index_counts).expect("Shape doesn't overflow");
    let database = generate_random_database(&mut rng, num_elements as usize, ELEMENT_BYTE_LEN);

    let idx = rng.random_range(0..num_elements);
    let dimension = index_counts.len() as u8;

    // Both encryption paths must be interchangeable for the server.
    let query = if rng.random::<bool>() {
        privkey.create_selector(index_counts, idx, None)
    } else {
        pubkey.create_selector(index_counts, idx, None)
    }
    .expect("Selector creation failed");

    let reply = respond(index_counts, &query, &database, packing);
    let element = table.decrypt_reply(&privkey, &reply, dimension, packing).expect("Reply decoding failed");

    assert_eq!(&element[..ELEMENT_BYTE_LEN], database[idx as usize].as_slice());
}

#[test]
fn selector_randomness_makes_queries_reproducible() {
    let privkey = PrivateKey::generate().expect("Key generation failed");
    let pubkey = PublicKey::from(&privkey);

    let index_counts = [3u64, 4];
    let randomness = random_scalars(7).expect("Randomness sampling failed");

    let fast = privkey.create_selector(&index_counts, 5, Some(randomness.as_slice())).expect("Selector creation failed");
    let normal = pubkey.create_selector(&index_counts, 5, Some(randomness.as_slice())).expect("Selector creation failed");

    assert_eq!(fast, normal);
    assert_eq!(
        privkey.create_selector(&index_counts, 5, Some(&randomness[..6])),
        Err(EllipticPIRError::RandomnessCountMismatch { expected: 7, found: 6 })
    );
}

#[test]
fn tampered_reply_is_rejected() {
    let mut rng = ChaCha8Rng::from_os_rng();
    let table = shared_table();
    let privkey = PrivateKey::generate().expect("Key generation failed");

    let index_counts = [3u64, 4];
    let database = generate_random_database(&mut rng, 12, 4);

    let query = privkey.create_selector(&index_counts, 7, None).expect("Selector creation failed");
    let mut reply = respond(&index_counts, &query, &database, 1);

    // Replace an outer layer cipher with one whose message doesn't fit in a byte.
    let forged = privkey.encrypt(1000, None).expect("Encryption failed");
    reply[..CIPHER_SIZE].copy_from_slice(&forged.to_bytes());

    assert_eq!(
        table.decrypt_reply(&privkey, &reply, 2, 1),
        Err(EllipticPIRError::ReplyDecodeFailure { phase: 0, cipher_index: 0 })
    );
}

#[test]
fn loaded_table_decrypts_like_generated_one() {
    const SMALL_MMAX: usize = 1usize << 12;

    let mut nonce = [0u8; 8];
    ChaCha8Rng::from_os_rng().fill_bytes(&mut nonce);
    let dir = std::env::temp_dir().join(format!("epir-integrations-{:016x}", u64::from_le_bytes(nonce)));

    let mut num_progress_reports = 0;
    let generated = DecryptionContext::generate_with_progress(SMALL_MMAX, |_| {
        num_progress_reports += 1;
        ControlFlow::Continue(())
    })
    .expect("Table generation failed");
    assert_eq!(num_progress_reports, 1);

    let config = MGTableConfig {
        mmax: SMALL_MMAX,
        path: Some(dir.join("mG.bin")),
        source: MGTableSource::Load,
        expected_digest: Some(generated.digest()),
    };

    assert!(matches!(DecryptionContext::from_config(&config), Err(EllipticPIRError::FailedToReadMGTable(_))));

    generated.save(dir.join("mG.bin")).expect("Saving table failed");
    let loaded = DecryptionContext::from_config(&config).expect("Loading table failed");

    let privkey = PrivateKey::generate().expect("Key generation failed");
    for message in [0, 1, 2024, SMALL_MMAX as u64 - 1, SMALL_MMAX as u64] {
        let cipher = privkey.encrypt(message, None).expect("Encryption failed");
        assert_eq!(loaded.decrypt_cipher(&privkey, &cipher), generated.decrypt_cipher(&privkey, &cipher));
    }

    let _ = std::fs::remove_dir_all(&dir);
}
