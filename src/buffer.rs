//! Geometry-aware multi-plane I/O buffer.
//!
//! One contiguous allocation holds every plane's page data plus its trailing
//! out-of-band region:
//!
//! ```text
//! [ plane0 data | plane0 oob | plane1 data | plane1 oob | ... ]
//! ```
//!
//! Three derived index tables address into it: per-plane offsets, per-plane
//! sector offsets (with one sentinel slot pointing at the plane's OOB region,
//! usable as an "extra sector"), and per (plane, sector) OOB offsets. All
//! layout math derives from `ChannelGeometry` alone.
//!
//! Single owner, never shared across threads. Construction failure leaves no
//! partial state behind: sub-allocations acquired so far are reclaimed by
//! ownership on the error return.

use crate::error::{FtlError, FtlResult};
use crate::geometry::ChannelGeometry;

pub struct PageBuffer {
    buf: Vec<u8>,
    n_planes: usize,
    page_size: usize,
    sector_size: usize,
    sec_per_page: usize,
    sec_oob_size: usize,
    meta_size: usize, // OOB bytes per plane
    plane_off: Vec<usize>,
    // sec_off[pl] has sec_per_page + 1 entries; the last is the OOB sentinel.
    sec_off: Vec<Vec<usize>>,
    // oob_off[pl * sec_per_page + sec]
    oob_off: Vec<usize>,
}

impl PageBuffer {
    /// Allocate a zero-initialized buffer sized for one full multi-plane page
    /// of `geo`, with the index tables prepared.
    pub fn alloc(geo: &ChannelGeometry) -> FtlResult<Self> {
        geo.validate()?;

        let size = geo.buffer_size();
        let mut buf = Vec::new();
        buf.try_reserve_exact(size)
            .map_err(|_| FtlError::OutOfMemory(format!("page buffer ({} bytes)", size)))?;
        buf.resize(size, 0);

        let n_pl = geo.n_planes as usize;
        let spp = geo.sec_per_page as usize;

        let mut plane_off = Vec::new();
        plane_off
            .try_reserve_exact(n_pl)
            .map_err(|_| FtlError::OutOfMemory("plane index".into()))?;

        let mut sec_off = Vec::new();
        sec_off
            .try_reserve_exact(n_pl)
            .map_err(|_| FtlError::OutOfMemory("sector index".into()))?;

        let mut oob_off = Vec::new();
        oob_off
            .try_reserve_exact(n_pl * spp)
            .map_err(|_| FtlError::OutOfMemory("oob index".into()))?;

        let mut out = Self {
            buf,
            n_planes: n_pl,
            page_size: geo.page_size as usize,
            sector_size: geo.sector_size as usize,
            sec_per_page: spp,
            sec_oob_size: geo.sec_oob_size as usize,
            meta_size: geo.plane_oob_size() as usize,
            plane_off,
            sec_off,
            oob_off,
        };
        out.rebuild_tables();
        Ok(out)
    }

    /// Recompute the index tables for `geo`. Idempotent; usable whenever the
    /// buffer's backing channel changes. The contiguous buffer itself is not
    /// reallocated, so the new geometry must describe the same buffer size.
    pub fn prepare_layout(&mut self, geo: &ChannelGeometry) -> FtlResult<()> {
        geo.validate()?;
        if geo.buffer_size() != self.buf.len() {
            return Err(FtlError::InvalidArgument(format!(
                "geometry needs a {}-byte buffer, have {}",
                geo.buffer_size(),
                self.buf.len()
            )));
        }
        self.n_planes = geo.n_planes as usize;
        self.page_size = geo.page_size as usize;
        self.sector_size = geo.sector_size as usize;
        self.sec_per_page = geo.sec_per_page as usize;
        self.sec_oob_size = geo.sec_oob_size as usize;
        self.meta_size = geo.plane_oob_size() as usize;
        self.rebuild_tables();
        Ok(())
    }

    fn rebuild_tables(&mut self) {
        let stride = self.page_size + self.meta_size;

        self.plane_off.clear();
        self.sec_off.clear();
        self.oob_off.clear();

        for pl in 0..self.n_planes {
            let base = pl * stride;
            self.plane_off.push(base);

            let mut secs = Vec::with_capacity(self.sec_per_page + 1);
            for sec in 0..self.sec_per_page {
                self.oob_off
                    .push(base + self.page_size + self.sec_oob_size * sec);
                secs.push(base + self.sector_size * sec);
            }
            // Sentinel: the plane's OOB region as one extra sector.
            secs.push(base + self.page_size);
            self.sec_off.push(secs);
        }
    }

    #[inline]
    pub fn n_planes(&self) -> usize {
        self.n_planes
    }

    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// OOB bytes per plane.
    #[inline]
    pub fn meta_size(&self) -> usize {
        self.meta_size
    }

    #[inline]
    pub fn buf_size(&self) -> usize {
        self.buf.len()
    }

    /// Bytes one plane occupies: data followed by OOB.
    #[inline]
    pub fn plane_stride(&self) -> usize {
        self.page_size + self.meta_size
    }

    /// One plane's sub-buffer (data + OOB), the unit a media command moves.
    pub fn plane(&self, pl: usize) -> &[u8] {
        let off = self.plane_off[pl];
        &self.buf[off..off + self.plane_stride()]
    }

    pub fn plane_mut(&mut self, pl: usize) -> &mut [u8] {
        let off = self.plane_off[pl];
        let stride = self.plane_stride();
        &mut self.buf[off..off + stride]
    }

    /// Sector `sec` of plane `pl`; index `sec_per_page` is the sentinel and
    /// yields the plane's whole OOB region.
    pub fn sector(&self, pl: usize, sec: usize) -> &[u8] {
        assert!(sec <= self.sec_per_page, "sector index out of range");
        let off = self.sec_off[pl][sec];
        let len = if sec == self.sec_per_page {
            self.meta_size
        } else {
            self.sector_size
        };
        &self.buf[off..off + len]
    }

    pub fn sector_mut(&mut self, pl: usize, sec: usize) -> &mut [u8] {
        assert!(sec <= self.sec_per_page, "sector index out of range");
        let off = self.sec_off[pl][sec];
        let len = if sec == self.sec_per_page {
            self.meta_size
        } else {
            self.sector_size
        };
        &mut self.buf[off..off + len]
    }

    /// OOB bytes of sector `sec` in plane `pl`.
    pub fn oob(&self, pl: usize, sec: usize) -> &[u8] {
        assert!(sec < self.sec_per_page, "oob sector index out of range");
        let off = self.oob_off[pl * self.sec_per_page + sec];
        &self.buf[off..off + self.sec_oob_size]
    }

    pub fn oob_mut(&mut self, pl: usize, sec: usize) -> &mut [u8] {
        assert!(sec < self.sec_per_page, "oob sector index out of range");
        let off = self.oob_off[pl * self.sec_per_page + sec];
        &mut self.buf[off..off + self.sec_oob_size]
    }

    pub fn zero(&mut self) {
        self.buf.fill(0);
    }
}
