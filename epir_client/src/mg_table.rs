use crate::{
    config::{MGTableConfig, MGTableSource},
    keys::PrivateKey,
};
use curve25519_dalek::{constants::ED25519_BASEPOINT_POINT, edwards::EdwardsPoint, scalar::Scalar};
use epir_common::{
    branch_opt_util,
    ec::Cipher,
    error::EllipticPIRError,
    params::{MAX_MMAX, MG_DIGEST_BYTE_LEN, MG_GENERATION_CHUNK_SIZE, MG_RECORD_SIZE, POINT_SIZE},
    serialization::{decode_mg_record, encode_mg_record},
};
use rayon::prelude::*;
use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    ops::ControlFlow,
    path::{Path, PathBuf},
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    time::Instant,
};
use tracing::{info, warn};
use turboshake::TurboShake128;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct MGEntry {
    point: [u8; POINT_SIZE],
    message: u32,
}

/// Discrete logarithm table, mapping `m·G` back to `m`, for every `m` in [0, mmax).
///
/// Entries are kept sorted by compressed point bytes, so that a decrypted point can be looked up with binary search. Once built,
/// either by generating or by loading a persisted table, it is never mutated, so it can be shared across threads behind an `Arc`
/// and serve any number of concurrent decryptions, without locking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecryptionContext {
    entries: Vec<MGEntry>,
}

impl DecryptionContext {
    /// Builds a decryption context as described by the configuration, see `MGTableSource`.
    pub fn from_config(config: &MGTableConfig) -> Result<DecryptionContext, EllipticPIRError> {
        Self::from_config_with_progress(config, |_| ControlFlow::Continue(()))
    }

    /// Same as `from_config`, but whenever the table has to be generated, `progress` gets to observe and cancel it, exactly as
    /// in `generate_with_progress`. It's never invoked when the table is loaded. A cancelled `LoadOrGenerate` persists nothing.
    pub fn from_config_with_progress<F>(config: &MGTableConfig, progress: F) -> Result<DecryptionContext, EllipticPIRError>
    where
        F: FnMut(usize) -> ControlFlow<()> + Send,
    {
        let ctx = match config.source {
            MGTableSource::Generate => Self::generate_with_progress(config.mmax, progress)?,
            MGTableSource::Load => Self::load(config.resolved_path()?, config.mmax)?,
            MGTableSource::LoadOrGenerate => {
                let path = config.resolved_path()?;
                if path.exists() {
                    Self::load(&path, config.mmax)?
                } else {
                    let ctx = Self::generate_with_progress(config.mmax, progress)?;
                    ctx.save(&path)?;
                    ctx
                }
            }
        };

        if let Some(expected_digest) = config.expected_digest {
            if branch_opt_util::unlikely(ctx.digest() != expected_digest) {
                warn!(mmax = config.mmax, "Digest of mG table doesn't match the expected one");
                return Err(EllipticPIRError::MGTableDigestMismatch);
            }
        }

        Ok(ctx)
    }

    /// Generates a table of `mmax` entries, see `generate_with_progress`.
    pub fn generate(mmax: usize) -> Result<DecryptionContext, EllipticPIRError> {
        Self::generate_with_progress(mmax, |_| ControlFlow::Continue(()))
    }

    /// Generates a table of `mmax` entries, reporting progress and allowing cancellation.
    ///
    /// The range [0, mmax) is split into chunks of `MG_GENERATION_CHUNK_SIZE` messages, which are computed in parallel. Each chunk starts
    /// from its own base point `start·G` and walks the chunk by repeatedly adding `G`. Finally entries are sorted by point bytes.
    ///
    /// # Arguments
    ///
    /// * `mmax` - Number of entries, must be in (0, 2^32].
    /// * `progress` - Invoked once after each chunk, with the total number of points computed so far. Invocations are serialized and
    ///   observed counts are strictly increasing, the last one being `mmax` if generation runs to completion. Returning
    ///   `ControlFlow::Break(())` cancels generation, chunks not yet started are skipped.
    ///
    /// # Returns
    ///
    /// The decryption context, `EllipticPIRError::InvalidMGTableSize` for bad `mmax` or `EllipticPIRError::MGTableGenerationCancelled`.
    pub fn generate_with_progress<F>(mmax: usize, progress: F) -> Result<DecryptionContext, EllipticPIRError>
    where
        F: FnMut(usize) -> ControlFlow<()> + Send,
    {
        Self::validate_mmax(mmax)?;

        let started_at = Instant::now();

        let progress = Mutex::new((0usize, progress));
        let is_cancelled = AtomicBool::new(false);

        let mut entries = vec![MGEntry::default(); mmax];
        entries.par_chunks_mut(MG_GENERATION_CHUNK_SIZE).enumerate().for_each(|(chunk_idx, chunk)| {
            if is_cancelled.load(Ordering::Relaxed) {
                return;
            }

            let start = chunk_idx * MG_GENERATION_CHUNK_SIZE;
            let mut point = EdwardsPoint::mul_base(&Scalar::from(start as u64));

            for (offset, entry) in chunk.iter_mut().enumerate() {
                *entry = MGEntry {
                    point: point.compress().to_bytes(),
                    message: (start + offset) as u32,
                };
                point += &ED25519_BASEPOINT_POINT;
            }

            let mut guard = progress.lock().unwrap_or_else(PoisonError::into_inner);
            let (num_points_computed, callback) = &mut *guard;

            *num_points_computed += chunk.len();
            if callback(*num_points_computed).is_break() {
                is_cancelled.store(true, Ordering::Relaxed);
            }
        });

        if is_cancelled.load(Ordering::Relaxed) {
            warn!(mmax, "mG table generation cancelled");
            return Err(EllipticPIRError::MGTableGenerationCancelled);
        }

        entries.par_sort_unstable_by(|a, b| a.point.cmp(&b.point));

        info!(mmax, elapsed_ms = started_at.elapsed().as_millis() as u64, "Generated mG table");
        Ok(DecryptionContext { entries })
    }

    /// Loads a table persisted by `save`.
    ///
    /// The file must hold exactly `mmax` records of `MG_RECORD_SIZE` bytes, sorted strictly ascending by point bytes.
    ///
    /// # Returns
    ///
    /// The decryption context, `EllipticPIRError::FailedToReadMGTable` if the file can't be read, `EllipticPIRError::MGTableNotWholeRecords`
    /// if its length isn't a multiple of `MG_RECORD_SIZE`, `EllipticPIRError::MGTableSizeMismatch` if it doesn't hold `mmax` records
    /// or `EllipticPIRError::MGTableNotSorted`.
    pub fn load<P: AsRef<Path>>(path: P, mmax: usize) -> Result<DecryptionContext, EllipticPIRError> {
        Self::validate_mmax(mmax)?;

        let path = path.as_ref();
        let started_at = Instant::now();

        let read_err = |e: std::io::Error| EllipticPIRError::FailedToReadMGTable(format!("{}: {}", path.display(), e));

        let file = File::open(path).map_err(read_err)?;
        let file_len = file.metadata().map_err(read_err)?.len();

        if branch_opt_util::unlikely(file_len % MG_RECORD_SIZE as u64 != 0) {
            return Err(EllipticPIRError::MGTableNotWholeRecords(file_len));
        }
        if branch_opt_util::unlikely(file_len != mmax as u64 * MG_RECORD_SIZE as u64) {
            return Err(EllipticPIRError::MGTableSizeMismatch {
                expected: mmax,
                found: (file_len / MG_RECORD_SIZE as u64) as usize,
            });
        }

        let mut reader = BufReader::new(file);
        let mut record = [0u8; MG_RECORD_SIZE];

        let mut entries = Vec::with_capacity(mmax);
        for _ in 0..mmax {
            reader.read_exact(&mut record).map_err(read_err)?;

            let (point, message) = decode_mg_record(&record);
            entries.push(MGEntry { point, message });
        }

        let is_sorted = entries.par_windows(2).all(|w| w[0].point < w[1].point);
        if branch_opt_util::unlikely(!is_sorted) {
            return Err(EllipticPIRError::MGTableNotSorted);
        }

        info!(mmax, path = %path.display(), elapsed_ms = started_at.elapsed().as_millis() as u64, "Loaded mG table");
        Ok(DecryptionContext { entries })
    }

    /// Persists the table as a flat sequence of `mmax` records, point bytes followed by little-endian u32 message, in sorted order.
    /// Missing parent directories are created.
    ///
    /// Records are first written to a sibling `.tmp` file, which is synced and then renamed over `path`. So `path` either keeps
    /// its previous content or holds the complete table, and a failed save leaves no partial file behind.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), EllipticPIRError> {
        let path = path.as_ref();
        let write_err = |e: std::io::Error| EllipticPIRError::FailedToWriteMGTable(format!("{}: {}", path.display(), e));

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let tmp_path = Self::temp_path_for(path);
        let res = File::create(&tmp_path)
            .and_then(|file| {
                let mut writer = BufWriter::new(file);
                self.write_records(&mut writer)?;
                writer.into_inner().map_err(|e| e.into_error())?.sync_all()
            })
            .and_then(|_| std::fs::rename(&tmp_path, path));

        if let Err(e) = res {
            let _ = std::fs::remove_file(&tmp_path);

            warn!(mmax = self.mmax(), path = %path.display(), error = %e, "Failed to save mG table");
            return Err(write_err(e));
        }

        info!(mmax = self.mmax(), path = %path.display(), "Saved mG table");
        Ok(())
    }

    fn write_records<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let mut record = [0u8; MG_RECORD_SIZE];

        for entry in &self.entries {
            encode_mg_record(&entry.point, entry.message, &mut record);
            writer.write_all(&record)?;
        }
        writer.flush()
    }

    fn temp_path_for(path: &Path) -> PathBuf {
        let mut tmp_path = path.as_os_str().to_owned();
        tmp_path.push(".tmp");
        PathBuf::from(tmp_path)
    }

    /// Number of entries, messages in [0, mmax) are decryptable.
    #[inline(always)]
    pub fn mmax(&self) -> usize {
        self.entries.len()
    }

    /// TurboSHAKE128 digest of the table, in its persisted form.
    pub fn digest(&self) -> [u8; MG_DIGEST_BYTE_LEN] {
        let mut hasher = TurboShake128::default();
        let mut record = [0u8; MG_RECORD_SIZE];

        for entry in &self.entries {
            encode_mg_record(&entry.point, entry.message, &mut record);
            hasher.absorb(&record);
        }
        hasher.finalize::<{ TurboShake128::DEFAULT_DOMAIN_SEPARATOR }>();

        let mut digest = [0u8; MG_DIGEST_BYTE_LEN];
        hasher.squeeze(&mut digest);

        digest
    }

    /// Decrypts a single cipher, by computing `m·G = c2 - sk·c1` and looking it up in the table.
    ///
    /// # Returns
    ///
    /// `Some(m)`, or `None` if `m` is not in [0, mmax), which also is the case when the cipher was encrypted for another key
    /// or its points don't decompress. Callers decide whether that's an error.
    pub fn decrypt_cipher(&self, privkey: &PrivateKey, cipher: &Cipher) -> Option<u32> {
        let (c1, c2) = cipher.decompress()?;
        let m_g = c2 - privkey.scalar() * &c1;

        self.lookup(&m_g.compress().to_bytes())
    }

    #[inline(always)]
    fn lookup(&self, point: &[u8; POINT_SIZE]) -> Option<u32> {
        self.entries
            .binary_search_by(|entry| entry.point.cmp(point))
            .ok()
            .map(|idx| self.entries[idx].message)
    }

    fn validate_mmax(mmax: usize) -> Result<(), EllipticPIRError> {
        if branch_opt_util::likely(mmax > 0 && (mmax as u64) <= MAX_MMAX) {
            Ok(())
        } else {
            Err(EllipticPIRError::InvalidMGTableSize(mmax))
        }
    }
}
