//! Bad-block table: one status byte per (lun, block, plane), kept in memory
//! per channel and persisted to reserved flash on change.
//!
//! Flat index: `lun * blocks_per_lun * n_planes + blk * n_planes + pl`. The
//! persisted image is exactly these bytes in that row-major order (the
//! byte-granular format advertised at registration).

use std::sync::Arc;

use crate::buffer::PageBuffer;
use crate::channel::Channel;
use crate::consts::BBT_RSV_BLK_DEFAULT;
use crate::error::{FtlError, FtlResult};
use crate::geometry::ChannelGeometry;
use crate::media::{CommandKind, MediaManager, PhysAddr};
use crate::metrics;
use crate::pgio::{reserved_block_io, Addressing};
use crate::transfer::{seq_transfer, Direction};

/// Whether a `set` changed the stored value; only a change warrants a
/// persistence flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    Unchanged,
    Updated,
}

pub struct BadBlockTable {
    tbl: Vec<u8>,
    n_planes: u32,
    blocks_per_lun: u32,
    luns: u16,
}

impl BadBlockTable {
    /// All-zero table (every block good) sized for `geo`.
    pub fn new(geo: &ChannelGeometry) -> FtlResult<Self> {
        let entries = geo.bbt_entries();
        let mut tbl = Vec::new();
        tbl.try_reserve_exact(entries)
            .map_err(|_| FtlError::OutOfMemory(format!("bad-block table ({} bytes)", entries)))?;
        tbl.resize(entries, 0);
        Ok(Self {
            tbl,
            n_planes: geo.n_planes as u32,
            blocks_per_lun: geo.blocks_per_lun,
            luns: geo.luns_per_channel,
        })
    }

    /// Entries (bytes) covering one lun.
    #[inline]
    pub fn entries_per_lun(&self) -> usize {
        (self.blocks_per_lun * self.n_planes) as usize
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.tbl
    }

    /// Replace the whole table from a persisted image.
    pub fn load_from(&mut self, image: &[u8]) -> FtlResult<()> {
        if image.len() != self.tbl.len() {
            return Err(FtlError::InvalidArgument(format!(
                "bad-block image of {} bytes, table holds {}",
                image.len(),
                self.tbl.len()
            )));
        }
        self.tbl.copy_from_slice(image);
        Ok(())
    }

    /// Copy the contiguous per-lun slice of the table into `out`, which must
    /// be exactly `blocks_per_lun * n_planes` bytes. Nothing is copied on a
    /// size or bounds mismatch.
    pub fn get(&self, lun: u16, out: &mut [u8]) -> FtlResult<()> {
        if out.len() != self.entries_per_lun() {
            return Err(FtlError::InvalidArgument(format!(
                "bad-block slice of {} bytes requested, lun holds {}",
                out.len(),
                self.entries_per_lun()
            )));
        }
        if lun >= self.luns {
            return Err(FtlError::InvalidArgument(format!(
                "lun {} out of range 0..{}",
                lun, self.luns
            )));
        }
        let l_addr = lun as usize * self.blocks_per_lun as usize * self.n_planes as usize;
        out.copy_from_slice(&self.tbl[l_addr..l_addr + self.entries_per_lun()]);
        Ok(())
    }

    /// Store `value` for the (lun, block, plane) of `addr`, reporting whether
    /// the stored value actually changed.
    pub fn set(&mut self, addr: &PhysAddr, value: u8) -> FtlResult<SetOutcome> {
        let n_pl = self.n_planes;
        let off = addr.blk as u32 * n_pl + addr.pl as u32;

        if off > self.blocks_per_lun * n_pl - 1 {
            return Err(FtlError::InvalidArgument(format!(
                "block {} plane {} out of range for {} blocks x {} planes",
                addr.blk, addr.pl, self.blocks_per_lun, n_pl
            )));
        }
        if addr.lun >= self.luns {
            return Err(FtlError::InvalidArgument(format!(
                "lun {} out of range 0..{}",
                addr.lun, self.luns
            )));
        }

        let l_addr = addr.lun as usize * self.blocks_per_lun as usize * n_pl as usize;
        let idx = l_addr + off as usize;

        if self.tbl[idx] == value {
            return Ok(SetOutcome::Unchanged);
        }
        self.tbl[idx] = value;
        Ok(SetOutcome::Updated)
    }
}

/// Persists a channel's full in-memory bad-block table to reserved flash.
pub trait BadBlockSink: Send + Sync {
    fn flush(&self, ch: &Channel) -> FtlResult<()>;
}

/// `BadBlockSink` backed by a reserved block on lun 0: erase, then stream the
/// table bytes from page 0 through the sequential-transfer path.
pub struct ReservedBbtSink {
    media: Arc<dyn MediaManager>,
    rsv_blk: u16,
}

impl ReservedBbtSink {
    pub fn new(media: Arc<dyn MediaManager>) -> Self {
        Self::with_block(media, BBT_RSV_BLK_DEFAULT)
    }

    pub fn with_block(media: Arc<dyn MediaManager>, rsv_blk: u16) -> Self {
        Self { media, rsv_blk }
    }

    fn table_addr(&self, ch: &Channel) -> PhysAddr {
        PhysAddr {
            ch: ch.id(),
            lun: 0,
            blk: self.rsv_blk,
            pl: 0,
            pg: 0,
        }
    }

    /// Byte entries one multi-plane page holds.
    fn entries_per_page(geo: &ChannelGeometry) -> u32 {
        geo.page_size * geo.n_planes as u32
    }

    /// Read the persisted table image back from the reserved block.
    pub fn load(&self, ch: &Channel) -> FtlResult<Vec<u8>> {
        let geo = ch.geometry();
        let mut io = PageBuffer::alloc(geo)?;
        let mut image = vec![0u8; geo.bbt_entries()];
        let addr = self.table_addr(ch);
        seq_transfer(
            ch,
            self.media.as_ref(),
            &mut io,
            &addr,
            &mut image,
            Self::entries_per_page(geo),
            geo.bbt_entries() as u32,
            1,
            Direction::FromFlash,
            Addressing::Reserved,
        )?;
        Ok(image)
    }
}

impl BadBlockSink for ReservedBbtSink {
    fn flush(&self, ch: &Channel) -> FtlResult<()> {
        let geo = ch.geometry();
        let mut io = PageBuffer::alloc(geo)?;
        let mut image = ch.bbt().lock().unwrap().as_bytes().to_vec();

        // Rewrite in place: NAND wants an erase before the new image.
        reserved_block_io(
            ch,
            self.media.as_ref(),
            CommandKind::EraseBlock,
            None,
            self.rsv_blk,
            0,
        )?;

        let addr = self.table_addr(ch);
        let image_len = image.len() as u32;
        seq_transfer(
            ch,
            self.media.as_ref(),
            &mut io,
            &addr,
            &mut image,
            Self::entries_per_page(geo),
            image_len,
            1,
            Direction::ToFlash,
            Addressing::Reserved,
        )?;

        metrics::record_bbt_flush();
        Ok(())
    }
}
