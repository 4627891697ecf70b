use anyhow::Result;
use std::sync::Arc;

use EmberFTL::pgio::Addressing;
use EmberFTL::transfer::{seq_transfer, Direction};
use EmberFTL::{Channel, ChannelGeometry, CommandKind, PageBuffer, PhysAddr, RamMedia};

fn geo(planes: u16) -> ChannelGeometry {
    ChannelGeometry {
        n_planes: planes,
        page_size: 4096,
        sector_size: 512,
        sec_per_page: 8,
        sec_oob_size: 16,
        pages_per_block: 64,
        blocks_per_lun: 32,
        luns_per_channel: 2,
    }
}

fn pattern(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = oorandom::Rand32::new(seed);
    (0..len).map(|_| rng.rand_u32() as u8).collect()
}

/// Write `entries` fixed-size entries to flash and read them back with the
/// same parameters; the table must survive bit-for-bit.
fn roundtrip(planes: u16, entries: u32, entry_sz: usize, mode: Addressing) -> Result<()> {
    let g = geo(planes);
    let media = Arc::new(RamMedia::new(g.clone()));
    let ch = Channel::new(0, g.clone())?;
    let mut io = PageBuffer::alloc(&g)?;

    let ent_per_pg = g.page_size * planes as u32 / entry_sz as u32;
    let start = PhysAddr {
        ch: 0,
        lun: 1,
        blk: 5,
        pl: 0,
        pg: 0,
    };

    let original = pattern(entries as usize * entry_sz, 0x5EED + entries as u64);
    let mut table = original.clone();

    seq_transfer(
        &ch,
        media.as_ref(),
        &mut io,
        &start,
        &mut table,
        ent_per_pg,
        entries,
        entry_sz,
        Direction::ToFlash,
        mode,
    )?;

    table.fill(0);
    seq_transfer(
        &ch,
        media.as_ref(),
        &mut io,
        &start,
        &mut table,
        ent_per_pg,
        entries,
        entry_sz,
        Direction::FromFlash,
        mode,
    )?;

    assert_eq!(
        table, original,
        "round-trip mismatch: {} entries x {} B, {} planes",
        entries, entry_sz, planes
    );
    Ok(())
}

#[test]
fn roundtrip_spanning_page_boundaries() -> Result<()> {
    for planes in [1u16, 2, 4] {
        let per_page = 4096 * planes as u32 / 8;
        // zero, one, fewer-than-one-page, exactly-one-page, multiple pages
        for entries in [0, 1, per_page / 2 + 3, per_page, per_page * 2 + per_page / 2] {
            roundtrip(planes, entries, 8, Addressing::Logical)?;
        }
    }
    Ok(())
}

#[test]
fn roundtrip_through_the_reserved_path() -> Result<()> {
    roundtrip(4, 3000, 8, Addressing::Reserved)
}

#[test]
fn reserved_transfer_stays_on_lun_zero() -> Result<()> {
    let g = geo(2);
    let media = Arc::new(RamMedia::new(g.clone()));
    let ch = Channel::new(0, g.clone())?;
    let mut io = PageBuffer::alloc(&g)?;

    let mut table = pattern(1024 * 4, 1);
    let start = PhysAddr {
        ch: 0,
        lun: 1, // ignored by the reserved path
        blk: 2,
        pl: 0,
        pg: 0,
    };
    seq_transfer(
        &ch,
        media.as_ref(),
        &mut io,
        &start,
        &mut table,
        1024,
        1024,
        4,
        Direction::ToFlash,
        Addressing::Reserved,
    )?;

    let hist = media.take_history();
    assert!(!hist.is_empty());
    assert!(hist.iter().all(|c| c.addr.lun == 0), "reserved I/O pinned to lun 0");
    Ok(())
}

#[test]
fn zero_entries_issue_no_io() -> Result<()> {
    let g = geo(4);
    let media = Arc::new(RamMedia::new(g.clone()));
    let ch = Channel::new(0, g.clone())?;
    let mut io = PageBuffer::alloc(&g)?;

    let mut table = [0u8; 0];
    let start = PhysAddr::default();
    seq_transfer(
        &ch,
        media.as_ref(),
        &mut io,
        &start,
        &mut table,
        2048,
        0,
        8,
        Direction::ToFlash,
        Addressing::Logical,
    )?;
    assert!(media.take_history().is_empty());
    Ok(())
}

#[test]
fn page_consumption_matches_the_table_size() -> Result<()> {
    // 4-plane geometry, 4096-byte pages, 64 pages per block; 10 000 8-byte
    // entries starting at block 3 page 0 must touch exactly
    // ceil(10000*8 / (4096*4)) = 5 pages.
    let g = geo(4);
    let media = Arc::new(RamMedia::new(g.clone()));
    let ch = Channel::new(0, g.clone())?;
    let mut io = PageBuffer::alloc(&g)?;

    let entries: u32 = 10_000;
    let entry_sz = 8usize;
    let ent_per_pg = g.page_size * g.n_planes as u32 / entry_sz as u32; // 2048

    let original = pattern(entries as usize * entry_sz, 42);
    let mut table = original.clone();
    let start = PhysAddr {
        ch: 0,
        lun: 0,
        blk: 3,
        pl: 0,
        pg: 0,
    };

    seq_transfer(
        &ch,
        media.as_ref(),
        &mut io,
        &start,
        &mut table,
        ent_per_pg,
        entries,
        entry_sz,
        Direction::ToFlash,
        Addressing::Logical,
    )?;

    let hist = media.take_history();
    let writes: Vec<_> = hist
        .iter()
        .filter(|c| c.kind == CommandKind::WritePage)
        .collect();
    let expected_pages = (entries as usize * entry_sz).div_ceil(4096 * 4);
    assert_eq!(expected_pages, 5);

    let mut pages: Vec<u16> = writes.iter().map(|c| c.addr.pg).collect();
    pages.sort_unstable();
    pages.dedup();
    assert_eq!(pages, vec![0, 1, 2, 3, 4], "consecutive pages from page 0");
    assert_eq!(
        writes.len(),
        expected_pages * g.n_planes as usize,
        "one write command per plane per page"
    );
    assert!(writes.iter().all(|c| c.addr.blk == 3));

    table.fill(0);
    seq_transfer(
        &ch,
        media.as_ref(),
        &mut io,
        &start,
        &mut table,
        ent_per_pg,
        entries,
        entry_sz,
        Direction::FromFlash,
        Addressing::Logical,
    )?;
    assert_eq!(table, original);
    Ok(())
}

#[test]
fn oversized_table_is_rejected_before_any_io() -> Result<()> {
    let g = geo(2);
    let media = Arc::new(RamMedia::new(g.clone()));
    let ch = Channel::new(0, g.clone())?;
    let mut io = PageBuffer::alloc(&g)?;

    let ent_per_pg = 1024u32;
    // One block holds 64 pages; ask for 65 pages worth of entries.
    let entries = ent_per_pg * 65;
    let mut table = vec![0u8; entries as usize * 8];
    let start = PhysAddr::default();

    let err = seq_transfer(
        &ch,
        media.as_ref(),
        &mut io,
        &start,
        &mut table,
        ent_per_pg,
        entries,
        8,
        Direction::ToFlash,
        Addressing::Logical,
    )
    .unwrap_err();
    assert!(err.is_invalid_argument(), "got {err}");
    assert!(media.take_history().is_empty(), "no I/O before validation");
    Ok(())
}

#[test]
fn failing_page_write_aborts_the_transfer() -> Result<()> {
    let g = geo(2);
    let media = Arc::new(RamMedia::new(g.clone()));
    let ch = Channel::new(0, g.clone())?;
    let mut io = PageBuffer::alloc(&g)?;

    let ent_per_pg = 1024u32;
    let entries = ent_per_pg * 3; // three pages
    let mut table = pattern(entries as usize * 8, 7);
    let start = PhysAddr::default();

    // First page (2 plane writes) succeeds; the first write of page 1 fails.
    media.fail_after(2);
    let err = seq_transfer(
        &ch,
        media.as_ref(),
        &mut io,
        &start,
        &mut table,
        ent_per_pg,
        entries,
        8,
        Direction::ToFlash,
        Addressing::Logical,
    )
    .unwrap_err();
    assert!(matches!(err, EmberFTL::FtlError::Io { .. }), "got {err}");

    let hist = media.take_history();
    assert_eq!(hist.len(), 3, "no further planes or pages after the failure");
    Ok(())
}
