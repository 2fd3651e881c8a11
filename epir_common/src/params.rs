pub const SCALAR_SIZE: usize = 32;
pub const POINT_SIZE: usize = 32;
pub const CIPHER_SIZE: usize = 2 * POINT_SIZE;

/// log2 of `DEFAULT_MMAX`.
pub const DEFAULT_MMAX_MOD: u32 = 24;
/// Default number of entries in the mG table, bounding decryptable messages to [0, 2^24).
pub const DEFAULT_MMAX: usize = 1usize << DEFAULT_MMAX_MOD;
/// Messages are stored as `u32`, so the table can't be larger than this.
pub const MAX_MMAX: u64 = 1u64 << 32;

/// Each persisted mG table record is a compressed point followed by its message, as little-endian u32.
pub const MG_RECORD_SIZE: usize = POINT_SIZE + std::mem::size_of::<u32>();
pub const MG_GENERATION_CHUNK_SIZE: usize = 1usize << 12;
pub const MG_DIGEST_BYTE_LEN: usize = 32;

pub const DEFAULT_DATA_DIR: &str = ".EllipticPIR";
pub const MG_FILE_NAME: &str = "mG.bin";

/// At most this many bytes are packed into a single reply message.
pub const MAX_PACKING: u8 = std::mem::size_of::<u32>() as u8;
