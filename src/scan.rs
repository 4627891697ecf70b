//! Recency scanner: finds the newest committed page in a block by walking
//! the out-of-band commit stamps.
//!
//! Commit stamp format (LE), at the start of plane 0's OOB region:
//!
//! ```text
//! [magic4 = "EFC1"][reserved u32 = 0]
//! ```
//!
//! Erased flash reads back 0xFF, so an unwritten page never matches.

use byteorder::{ByteOrder, LittleEndian};

use crate::buffer::PageBuffer;
use crate::channel::Channel;
use crate::consts::{STAMP_MAGIC, STAMP_SIZE};
use crate::error::{FtlError, FtlResult};
use crate::media::{CommandKind, MediaManager};
use crate::metrics;
use crate::pgio::reserved_block_io;

/// The fixed-size commit marker kept in OOB metadata.
pub struct OobStamp;

impl OobStamp {
    /// Stamp `oob` as committed.
    pub fn write_to(oob: &mut [u8]) -> FtlResult<()> {
        if oob.len() < STAMP_SIZE {
            return Err(FtlError::InvalidArgument(format!(
                "oob region of {} bytes cannot hold a {}-byte stamp",
                oob.len(),
                STAMP_SIZE
            )));
        }
        oob[..4].copy_from_slice(STAMP_MAGIC);
        LittleEndian::write_u32(&mut oob[4..8], 0);
        Ok(())
    }

    /// Whether `oob` carries the commit sentinel.
    pub fn is_committed(oob: &[u8]) -> bool {
        oob.len() >= STAMP_SIZE && &oob[..4] == STAMP_MAGIC
    }
}

/// Walk block `blk` from page 0 in steps of `stride`, reading through the
/// reserved-block path and checking the plane-0 commit stamp. Returns the
/// last page whose stamp matched.
///
/// `NotFound` when page 0 never matched or its read failed. A read error
/// after a match ends the scan and returns the last match. When no buffer is
/// supplied, a scratch one is allocated and released on every exit path.
pub fn find_latest_committed_page(
    ch: &Channel,
    media: &dyn MediaManager,
    io: Option<&mut PageBuffer>,
    blk: u16,
    stride: u16,
) -> FtlResult<u32> {
    if stride == 0 {
        return Err(FtlError::InvalidArgument("scan stride must be non-zero".into()));
    }

    let geo = ch.geometry();
    let mut owned;
    let io: &mut PageBuffer = match io {
        Some(buf) => buf,
        None => {
            owned = PageBuffer::alloc(geo)?;
            &mut owned
        }
    };

    let pages = geo.pages_per_block;
    let mut pg: u32 = 0;
    let mut latest: Option<u32> = None;

    loop {
        io.zero();
        metrics::record_scan_page();

        if reserved_block_io(
            ch,
            media,
            CommandKind::ReadPage,
            Some(&mut *io),
            blk,
            pg as u16,
        )
        .is_err()
        {
            break;
        }

        if !OobStamp::is_committed(io.oob(0, 0)) {
            break;
        }
        latest = Some(pg);

        if pg + stride as u32 >= pages {
            break;
        }
        pg += stride as u32;
    }

    latest.ok_or(FtlError::NotFound)
}
