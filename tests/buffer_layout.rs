use anyhow::Result;

use EmberFTL::{ChannelGeometry, PageBuffer};

fn geo(planes: u16, page_size: u32, sector_size: u32, sec_oob: u32) -> ChannelGeometry {
    ChannelGeometry {
        n_planes: planes,
        page_size,
        sector_size,
        sec_per_page: (page_size / sector_size) as u16,
        sec_oob_size: sec_oob,
        pages_per_block: 64,
        blocks_per_lun: 32,
        luns_per_channel: 2,
    }
}

#[test]
fn sizes_follow_geometry() -> Result<()> {
    for planes in [1u16, 2, 4] {
        let g = geo(planes, 4096, 512, 16);
        let buf = PageBuffer::alloc(&g)?;

        let plane_oob = 16 * 8; // sec_oob * sec_per_page
        assert_eq!(buf.meta_size(), plane_oob);
        assert_eq!(buf.plane_stride(), 4096 + plane_oob);
        assert_eq!(
            buf.buf_size(),
            (4096 + plane_oob) * planes as usize,
            "total buffer covers data + OOB for every plane"
        );
        assert_eq!(buf.n_planes(), planes as usize);
        for pl in 0..planes as usize {
            assert_eq!(buf.plane(pl).len(), buf.plane_stride());
        }
    }
    Ok(())
}

#[test]
fn fresh_buffer_is_zeroed() -> Result<()> {
    let buf = PageBuffer::alloc(&geo(2, 4096, 512, 16))?;
    for pl in 0..2 {
        assert!(buf.plane(pl).iter().all(|&b| b == 0));
    }
    Ok(())
}

#[test]
fn sector_and_oob_regions_are_disjoint() -> Result<()> {
    let g = geo(2, 2048, 512, 16);
    let spp = g.sec_per_page as usize;
    let mut buf = PageBuffer::alloc(&g)?;

    // Tag every sector and every OOB slot with a distinct byte.
    let mut tag = 1u8;
    for pl in 0..2 {
        for sec in 0..spp {
            buf.sector_mut(pl, sec).fill(tag);
            tag += 1;
        }
        for sec in 0..spp {
            buf.oob_mut(pl, sec).fill(tag);
            tag += 1;
        }
    }

    // Read everything back; no region may have been clobbered.
    let mut expect = 1u8;
    for pl in 0..2 {
        for sec in 0..spp {
            assert!(
                buf.sector(pl, sec).iter().all(|&b| b == expect),
                "sector {}/{} overwritten",
                pl,
                sec
            );
            expect += 1;
        }
        for sec in 0..spp {
            assert!(
                buf.oob(pl, sec).iter().all(|&b| b == expect),
                "oob {}/{} overwritten",
                pl,
                sec
            );
            expect += 1;
        }
    }
    Ok(())
}

#[test]
fn sentinel_sector_is_the_plane_oob_region() -> Result<()> {
    let g = geo(2, 2048, 512, 16);
    let spp = g.sec_per_page as usize;
    let mut buf = PageBuffer::alloc(&g)?;

    for pl in 0..2 {
        buf.sector_mut(pl, spp).fill(0xCD);
        assert_eq!(buf.sector(pl, spp).len(), buf.meta_size());
        // The sentinel aliases the whole OOB region of that plane.
        for sec in 0..spp {
            assert!(buf.oob(pl, sec).iter().all(|&b| b == 0xCD));
        }
    }
    Ok(())
}

#[test]
fn prepare_layout_is_idempotent() -> Result<()> {
    let g = geo(4, 4096, 512, 16);
    let mut buf = PageBuffer::alloc(&g)?;

    buf.sector_mut(3, 0).fill(0x5A);
    buf.prepare_layout(&g)?;
    buf.prepare_layout(&g)?;

    assert!(buf.sector(3, 0).iter().all(|&b| b == 0x5A), "data survives relayout");
    assert_eq!(buf.buf_size(), g.buffer_size());
    Ok(())
}

#[test]
fn relayout_for_a_size_compatible_channel() -> Result<()> {
    // 2 planes x (4096 + 8*16) == 1 plane x (8192 + 16*16): same backing size.
    let a = geo(2, 4096, 512, 16);
    let b = geo(1, 8192, 512, 16);
    assert_eq!(a.buffer_size(), b.buffer_size());

    let mut buf = PageBuffer::alloc(&a)?;
    buf.prepare_layout(&b)?;
    assert_eq!(buf.n_planes(), 1);
    assert_eq!(buf.page_size(), 8192);
    assert_eq!(buf.plane(0).len(), buf.buf_size());
    Ok(())
}

#[test]
fn relayout_rejects_a_size_mismatch() -> Result<()> {
    let mut buf = PageBuffer::alloc(&geo(2, 4096, 512, 16))?;
    let bigger = geo(4, 4096, 512, 16);

    let err = buf.prepare_layout(&bigger).unwrap_err();
    assert!(err.is_invalid_argument(), "got {err}");
    Ok(())
}

#[test]
fn alloc_rejects_degenerate_geometry() {
    let mut g = geo(2, 4096, 512, 16);
    g.n_planes = 0;
    assert!(PageBuffer::alloc(&g).is_err());

    let mut g = geo(2, 4096, 512, 16);
    g.sector_size = 500; // does not divide the page evenly
    g.sec_per_page = 8;
    assert!(PageBuffer::alloc(&g).is_err());
}
