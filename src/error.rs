//! Error kinds for the FTL core.
//!
//! Policy:
//! - Allocation and I/O errors propagate immediately to the direct caller;
//!   retry, if any, belongs to the translation/GC layer above.
//! - Invalid arguments are rejected synchronously, before any state mutation.
//! - The one locally-handled failure is the bad-block flush (logged and
//!   swallowed; the in-memory table stays authoritative).

use thiserror::Error;

use crate::media::{CommandKind, PhysAddr};

pub type FtlResult<T> = Result<T, FtlError>;

#[derive(Debug, Error)]
pub enum FtlError {
    /// Buffer or command allocation failed.
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    /// A media-manager command failed. Planes already issued for the same
    /// logical operation are not rolled back.
    #[error("media i/o failed: {kind:?} at {addr}")]
    Io { kind: CommandKind, addr: PhysAddr },

    /// Bounds/size mismatch or malformed parameter, checked before mutation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Recency scan found no committed page.
    #[error("no committed page found")]
    NotFound,

    /// A global or per-channel collaborator failed to start.
    #[error("subsystem init failed: {0}")]
    SubsystemInit(&'static str),
}

impl FtlError {
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, FtlError::NotFound)
    }

    #[inline]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, FtlError::InvalidArgument(_))
    }
}
