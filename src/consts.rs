//! Shared constants: on-flash formats, capability bits, function ids.

// -------- Out-of-band commit stamp --------
// Written into plane 0's OOB region when a page is committed. Erased flash
// reads back 0xFF, so an erased page can never match.
pub const STAMP_MAGIC: &[u8; 4] = b"EFC1";
pub const STAMP_SIZE: usize = 8; // [magic4][reserved u32]

// -------- FTL identity --------
pub const FTL_ID: u8 = 3;
pub const FTL_NAME: &str = "EMBERFTL";

// -------- Capability bits (FtlDescriptor::cap) --------
pub const CAP_GET_BBTBL: u32 = 1 << 0;
pub const CAP_SET_BBTBL: u32 = 1 << 1;
pub const CAP_INIT_FN: u32 = 1 << 2;
pub const CAP_EXIT_FN: u32 = 1 << 3;

// -------- Bad-block table storage format tags --------
// One byte per (lun, block, plane), flat row-major order.
pub const BBT_FORMAT_BYTE: u8 = 1;

// -------- Generic init/exit function ids --------
pub const FN_GLOBAL: u16 = 0;

// -------- Channel exit drain defaults --------
// Bounded wait for in-flight threads on a channel: 200 retries x 5 ms ~ 1 s.
pub const DRAIN_RETRIES_DEFAULT: u32 = 200;
pub const DRAIN_BACKOFF_MS_DEFAULT: u64 = 5;

// -------- Misc defaults --------
pub const QUEUES_DEFAULT: u16 = 2;
pub const BBT_RSV_BLK_DEFAULT: u16 = 1;
