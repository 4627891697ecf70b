//! Sequential table transfer: moves a flat table of fixed-size entries
//! between memory and consecutive flash pages, splitting entries across
//! planes on the way out and reassembling them on the way back.
//!
//! The entry-to-plane mapping is deterministic: page `i`, plane `p` holds
//! entries `[i*ent_per_pg + p*(ent_per_pg/n_planes), ..)`. Writing then
//! reading back with the same parameters reproduces the table bit-for-bit.
//! A table spans at most one flash block.

use crate::buffer::PageBuffer;
use crate::channel::Channel;
use crate::error::{FtlError, FtlResult};
use crate::media::{CommandKind, MediaManager, PhysAddr};
use crate::metrics;
use crate::pgio::{pg_io_switch, Addressing};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    FromFlash,
    ToFlash,
}

/// Transfer `ent_left` entries of `entry_sz` bytes between `table` and the
/// pages starting at `start`, one page per iteration.
///
/// For each page: read it first when the direction is `FromFlash`; copy
/// `min(ent_left, ent_per_pg/n_planes)` entries per plane until the table is
/// exhausted; issue the write after all planes are populated when the
/// direction is `ToFlash`. The first I/O failure aborts the transfer.
#[allow(clippy::too_many_arguments)]
pub fn seq_transfer(
    ch: &Channel,
    media: &dyn MediaManager,
    io: &mut PageBuffer,
    start: &PhysAddr,
    table: &mut [u8],
    ent_per_pg: u32,
    ent_left: u32,
    entry_sz: usize,
    dir: Direction,
    mode: Addressing,
) -> FtlResult<()> {
    if ent_left == 0 {
        return Ok(());
    }

    let geo = ch.geometry();
    let n_pl = geo.n_planes as u32;

    if ent_per_pg == 0 || ent_per_pg % n_pl != 0 {
        return Err(FtlError::InvalidArgument(format!(
            "entries per page {} must be a non-zero multiple of {} planes",
            ent_per_pg, n_pl
        )));
    }
    if entry_sz == 0 {
        return Err(FtlError::InvalidArgument("entry size must be non-zero".into()));
    }

    let per_pl = (ent_per_pg / n_pl) as usize;
    if per_pl * entry_sz > geo.page_size as usize {
        return Err(FtlError::InvalidArgument(format!(
            "{} entries of {} bytes exceed the {}-byte plane data area",
            per_pl, entry_sz, geo.page_size
        )));
    }

    let total = ent_left as usize * entry_sz;
    if table.len() < total {
        return Err(FtlError::InvalidArgument(format!(
            "table holds {} bytes, transfer needs {}",
            table.len(),
            total
        )));
    }

    let pgs = ent_left.div_ceil(ent_per_pg);
    if start.pg as u32 + pgs > geo.pages_per_block {
        return Err(FtlError::InvalidArgument(format!(
            "table of {} pages starting at page {} does not fit a {}-page block",
            pgs, start.pg, geo.pages_per_block
        )));
    }

    let pg_ent_sz = ent_per_pg as usize * entry_sz;
    let mut left = ent_left;
    let mut addr = *start;

    for i in 0..pgs {
        addr.pg = start.pg + i as u16;

        if dir == Direction::FromFlash {
            pg_io_switch(ch, media, CommandKind::ReadPage, Some(&mut *io), &addr, mode)?;
        }

        for pl in 0..n_pl as usize {
            let n = (left as usize).min(per_pl);
            let trf = n * entry_sz;
            let off = pg_ent_sz * i as usize + pl * (pg_ent_sz / n_pl as usize);

            match dir {
                Direction::ToFlash => {
                    io.plane_mut(pl)[..trf].copy_from_slice(&table[off..off + trf])
                }
                Direction::FromFlash => {
                    table[off..off + trf].copy_from_slice(&io.plane(pl)[..trf])
                }
            }

            left -= n as u32;
            if left == 0 {
                break;
            }
        }

        if dir == Direction::ToFlash {
            pg_io_switch(ch, media, CommandKind::WritePage, Some(&mut *io), &addr, mode)?;
        }
    }

    metrics::record_entries_moved(ent_left as u64);
    Ok(())
}
