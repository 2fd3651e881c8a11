use epir_common::{
    error::EllipticPIRError,
    params::{DEFAULT_DATA_DIR, DEFAULT_MMAX, MG_DIGEST_BYTE_LEN, MG_FILE_NAME},
};
use std::path::PathBuf;

/// Where a `DecryptionContext` gets its mG table from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MGTableSource {
    /// Read a previously persisted table, failing if it's absent.
    #[default]
    Load,
    /// Compute the table from scratch, ignoring anything persisted.
    Generate,
    /// Read the persisted table if the file exists, otherwise compute it and persist it for next time.
    LoadOrGenerate,
}

/// Configuration for building a `DecryptionContext`.
///
/// Defaults to loading a table of `DEFAULT_MMAX` entries from `mg_default_path()`, without digest verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MGTableConfig {
    /// Number of table entries, messages in [0, mmax) are decryptable.
    pub mmax: usize,
    /// Location of the persisted table, `None` means `mg_default_path()`.
    pub path: Option<PathBuf>,
    pub source: MGTableSource,
    /// If set, a table whose TurboSHAKE128 digest differs is rejected.
    pub expected_digest: Option<[u8; MG_DIGEST_BYTE_LEN]>,
}

impl Default for MGTableConfig {
    fn default() -> Self {
        MGTableConfig {
            mmax: DEFAULT_MMAX,
            path: None,
            source: MGTableSource::default(),
            expected_digest: None,
        }
    }
}

impl MGTableConfig {
    /// Resolves the table location, falling back to `mg_default_path()`.
    pub fn resolved_path(&self) -> Result<PathBuf, EllipticPIRError> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => mg_default_path(),
        }
    }
}

/// Default location of the persisted mG table, `$HOME/.EllipticPIR/mG.bin`.
pub fn mg_default_path() -> Result<PathBuf, EllipticPIRError> {
    let home = std::env::var_os("HOME").ok_or(EllipticPIRError::HomeDirectoryUnavailable)?;
    Ok(PathBuf::from(home).join(DEFAULT_DATA_DIR).join(MG_FILE_NAME))
}
