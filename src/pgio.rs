//! Physical I/O executor: one logical page operation striped across every
//! plane of a channel.
//!
//! Both entry points iterate planes `0..n_planes`, issuing one synchronous
//! media command per plane with the same lun/block/page. The first failure
//! stops the iteration and propagates; planes already issued are not rolled
//! back, so the caller owns any recovery (e.g. bad-block marking).

use crate::buffer::PageBuffer;
use crate::channel::Channel;
use crate::error::{FtlError, FtlResult};
use crate::media::{CommandKind, MediaCommand, MediaManager, PhysAddr};
use crate::metrics;

/// Which addressing path an operation takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    /// Standard logical-physical address (full lun/block/page).
    Logical,
    /// Reserved metadata block, addressed by explicit block/page on lun 0.
    Reserved,
}

/// Read, write or erase one logical page at `addr`, all planes.
pub fn page_io(
    ch: &Channel,
    media: &dyn MediaManager,
    kind: CommandKind,
    io: Option<&mut PageBuffer>,
    addr: &PhysAddr,
) -> FtlResult<()> {
    issue_all_planes(ch, media, kind, io, addr.lun, addr.blk, addr.pg)
}

/// Same plane-iteration contract, but targeting a reserved metadata block by
/// explicit block/page, bypassing logical-physical mapping. Reserved blocks
/// live on lun 0 only; there is no redundancy across luns for them.
pub fn reserved_block_io(
    ch: &Channel,
    media: &dyn MediaManager,
    kind: CommandKind,
    io: Option<&mut PageBuffer>,
    blk: u16,
    pg: u16,
) -> FtlResult<()> {
    metrics::record_reserved_op();
    issue_all_planes(ch, media, kind, io, 0, blk, pg)
}

/// Dispatch between the two addressing paths.
pub fn pg_io_switch(
    ch: &Channel,
    media: &dyn MediaManager,
    kind: CommandKind,
    io: Option<&mut PageBuffer>,
    addr: &PhysAddr,
    mode: Addressing,
) -> FtlResult<()> {
    match mode {
        Addressing::Logical => page_io(ch, media, kind, io, addr),
        Addressing::Reserved => reserved_block_io(ch, media, kind, io, addr.blk, addr.pg),
    }
}

fn issue_all_planes(
    ch: &Channel,
    media: &dyn MediaManager,
    kind: CommandKind,
    mut io: Option<&mut PageBuffer>,
    lun: u16,
    blk: u16,
    pg: u16,
) -> FtlResult<()> {
    let geo = ch.geometry();

    match (&io, kind) {
        (None, CommandKind::ReadPage | CommandKind::WritePage) => {
            return Err(FtlError::InvalidArgument(
                "page read/write needs an I/O buffer".into(),
            ));
        }
        (Some(buf), _) if buf.buf_size() != geo.buffer_size() => {
            return Err(FtlError::InvalidArgument(format!(
                "buffer size {} does not match channel geometry ({})",
                buf.buf_size(),
                geo.buffer_size()
            )));
        }
        _ => {}
    }

    for pl in 0..geo.n_planes {
        // Command descriptor is scoped to this call: built per plane, gone on
        // return, success or not.
        let cmd = MediaCommand {
            addr: PhysAddr {
                ch: ch.id(),
                lun,
                blk,
                pl,
                pg,
            },
            kind,
        };

        let buf = match (kind, io.as_mut()) {
            (CommandKind::EraseBlock, _) => None,
            (_, Some(b)) => Some(b.plane_mut(pl as usize)),
            // Unreachable: guarded above.
            (_, None) => None,
        };

        media.submit_sync(&cmd, buf)?;
    }

    match kind {
        CommandKind::ReadPage => metrics::record_page_read(),
        CommandKind::WritePage => metrics::record_page_written(),
        CommandKind::EraseBlock => metrics::record_block_erased(),
    }
    Ok(())
}
