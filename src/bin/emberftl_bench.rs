use anyhow::{anyhow, Result};
use clap::Parser;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Instant;

use EmberFTL::metrics::MetricsSnapshot;
use EmberFTL::pgio::Addressing;
use EmberFTL::scan::{find_latest_committed_page, OobStamp};
use EmberFTL::transfer::{seq_transfer, Direction};
use EmberFTL::{ChannelGeometry, CommandKind, FtlCore, PageBuffer, PhysAddr, RamMedia};

/// EmberFTL micro-benchmark: sequential table transfer round-trip and
/// recency scan over the in-memory NAND model.
///
/// Examples:
///   emberftl_bench --entries 500000
///   emberftl_bench --planes 2 --page-size 8192 --scan-stride 4
#[derive(Parser, Debug)]
#[command(name = "emberftl_bench")]
struct Args {
    #[arg(long, default_value_t = 4)]
    planes: u16,

    #[arg(long, default_value_t = 4096)]
    page_size: u32,

    #[arg(long, default_value_t = 512)]
    sector_size: u32,

    /// OOB bytes per sector.
    #[arg(long, default_value_t = 16)]
    sec_oob: u32,

    #[arg(long, default_value_t = 512)]
    pages_per_block: u32,

    #[arg(long, default_value_t = 1024)]
    blocks_per_lun: u32,

    #[arg(long, default_value_t = 4)]
    luns: u16,

    /// Table entries for the round-trip phase (clamped to one block).
    #[arg(long, default_value_t = 1_000_000)]
    entries: u32,

    #[arg(long, default_value_t = 8)]
    entry_size: usize,

    /// Commit-stamp stride for the scan phase.
    #[arg(long, default_value_t = 8)]
    scan_stride: u16,

    #[arg(long, default_value_t = 0xE17F)]
    seed: u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.page_size % args.sector_size != 0 {
        return Err(anyhow!("page size must be a multiple of the sector size"));
    }

    let geo = ChannelGeometry {
        n_planes: args.planes,
        page_size: args.page_size,
        sector_size: args.sector_size,
        sec_per_page: (args.page_size / args.sector_size) as u16,
        sec_oob_size: args.sec_oob,
        pages_per_block: args.pages_per_block,
        blocks_per_lun: args.blocks_per_lun,
        luns_per_channel: args.luns,
    };

    let media = Arc::new(RamMedia::new(geo.clone()));
    let core = FtlCore::builder().media(media.clone()).build()?;
    let ch = core.init_channel(&geo)?;

    // ----- Phase 1: table round-trip -----

    let ent_per_pg = args.page_size * args.planes as u32 / args.entry_size as u32;
    let block_cap = ent_per_pg * args.pages_per_block;
    let entries = args.entries.min(block_cap);
    if entries < args.entries {
        println!(
            "[clamp] {} entries exceed one block, running with {}",
            args.entries, entries
        );
    }

    let mut rng = SmallRng::seed_from_u64(args.seed);
    let mut table = vec![0u8; entries as usize * args.entry_size];
    rng.fill(&mut table[..]);
    let original = table.clone();

    let mut io = PageBuffer::alloc(&geo)?;
    let start = PhysAddr {
        ch: ch.id(),
        lun: 0,
        blk: 3,
        pl: 0,
        pg: 0,
    };

    let t = Instant::now();
    seq_transfer(
        &ch,
        media.as_ref(),
        &mut io,
        &start,
        &mut table,
        ent_per_pg,
        entries,
        args.entry_size,
        Direction::ToFlash,
        Addressing::Logical,
    )?;
    let wr = t.elapsed().as_secs_f64();

    table.fill(0);
    let t = Instant::now();
    seq_transfer(
        &ch,
        media.as_ref(),
        &mut io,
        &start,
        &mut table,
        ent_per_pg,
        entries,
        args.entry_size,
        Direction::FromFlash,
        Addressing::Logical,
    )?;
    let rd = t.elapsed().as_secs_f64();

    if table != original {
        return Err(anyhow!("round-trip mismatch"));
    }

    let mb = (entries as f64 * args.entry_size as f64) / (1024.0 * 1024.0);
    println!(
        "[transfer] {} entries x {} B: write {:.2} MB/s, read {:.2} MB/s",
        entries,
        args.entry_size,
        mb / wr,
        mb / rd
    );

    // ----- Phase 2: recency scan -----

    let scan_blk = 7u16;
    let mut pg = 0u32;
    while pg < args.pages_per_block {
        io.zero();
        OobStamp::write_to(io.oob_mut(0, 0))?;
        EmberFTL::pgio::reserved_block_io(
            &ch,
            media.as_ref(),
            CommandKind::WritePage,
            Some(&mut io),
            scan_blk,
            pg as u16,
        )?;
        if pg + args.scan_stride as u32 >= args.pages_per_block {
            break;
        }
        pg += args.scan_stride as u32;
    }

    let t = Instant::now();
    let latest = find_latest_committed_page(&ch, media.as_ref(), Some(&mut io), scan_blk, args.scan_stride)?;
    let scan = t.elapsed().as_secs_f64() * 1e6;
    println!(
        "[scan] latest committed page {} (stride {}) in {:.1} us",
        latest, args.scan_stride, scan
    );

    let m = MetricsSnapshot::current();
    println!(
        "[metrics] pages written {} read {}, reserved ops {}, entries moved {}, scan probes {}",
        m.pages_written, m.pages_read, m.reserved_ops, m.table_entries_moved, m.scan_pages_probed
    );

    core.exit();
    Ok(())
}
