//! Channel geometry: the read-only description of the raw flash behind a
//! channel, and the derived buffer-layout math.
//!
//! Every buffer/layout computation in the core derives exclusively from these
//! fields; the core never mutates a geometry.

use crate::error::{FtlError, FtlResult};

/// Physical geometry of one channel, as reported by the media manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelGeometry {
    /// Parallel planes per lun; one logical page operation stripes all of them.
    pub n_planes: u16,
    /// Data bytes per plane page.
    pub page_size: u32,
    /// Data bytes per sector.
    pub sector_size: u32,
    /// Sectors per plane page.
    pub sec_per_page: u16,
    /// Out-of-band metadata bytes per sector.
    pub sec_oob_size: u32,
    /// Pages per block.
    pub pages_per_block: u32,
    /// Blocks per lun (per plane).
    pub blocks_per_lun: u32,
    /// Luns per channel.
    pub luns_per_channel: u16,
}

impl ChannelGeometry {
    /// OOB bytes of one plane page (all sectors).
    #[inline]
    pub fn plane_oob_size(&self) -> u32 {
        self.sec_oob_size * self.sec_per_page as u32
    }

    /// Bytes one plane occupies in an I/O buffer: data followed by OOB.
    #[inline]
    pub fn plane_stride(&self) -> usize {
        (self.page_size + self.plane_oob_size()) as usize
    }

    /// Total I/O buffer size for a full multi-plane page.
    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.plane_stride() * self.n_planes as usize
    }

    /// Sector slots per multi-plane page, counting the per-plane OOB sentinel
    /// as one extra addressable "sector".
    #[inline]
    pub fn sec_per_plane_page(&self) -> usize {
        (self.sec_per_page as usize + 1) * self.n_planes as usize
    }

    /// Bad-block table entries for one lun: one byte per (block, plane).
    #[inline]
    pub fn bbt_entries_per_lun(&self) -> usize {
        self.blocks_per_lun as usize * self.n_planes as usize
    }

    /// Bad-block table entries for the whole channel.
    #[inline]
    pub fn bbt_entries(&self) -> usize {
        self.bbt_entries_per_lun() * self.luns_per_channel as usize
    }

    pub fn validate(&self) -> FtlResult<()> {
        if self.n_planes == 0
            || self.page_size == 0
            || self.sector_size == 0
            || self.sec_per_page == 0
            || self.pages_per_block == 0
            || self.blocks_per_lun == 0
            || self.luns_per_channel == 0
        {
            return Err(FtlError::InvalidArgument(
                "geometry fields must be non-zero".into(),
            ));
        }
        if self.sector_size * self.sec_per_page as u32 != self.page_size {
            return Err(FtlError::InvalidArgument(format!(
                "page_size {} != sector_size {} * sec_per_page {}",
                self.page_size, self.sector_size, self.sec_per_page
            )));
        }
        Ok(())
    }
}
