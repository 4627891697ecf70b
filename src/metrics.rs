//! Lightweight global metrics for the FTL core.
//!
//! Thread-safe atomic counters for:
//! - physical page I/O (read / write / erase)
//! - the reserved-block metadata path
//! - sequential table transfers
//! - recency scans
//! - bad-block table flushes

use std::sync::atomic::{AtomicU64, Ordering};

// ----- Physical I/O -----
static PAGES_READ: AtomicU64 = AtomicU64::new(0);
static PAGES_WRITTEN: AtomicU64 = AtomicU64::new(0);
static BLOCKS_ERASED: AtomicU64 = AtomicU64::new(0);

// ----- Reserved-block path -----
static RESERVED_OPS: AtomicU64 = AtomicU64::new(0);

// ----- Table transfer -----
static TABLE_ENTRIES_MOVED: AtomicU64 = AtomicU64::new(0);

// ----- Recency scan -----
static SCAN_PAGES_PROBED: AtomicU64 = AtomicU64::new(0);

// ----- Bad-block table -----
static BBT_FLUSHES: AtomicU64 = AtomicU64::new(0);
static BBT_FLUSH_FAILURES: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub pages_read: u64,
    pub pages_written: u64,
    pub blocks_erased: u64,
    pub reserved_ops: u64,
    pub table_entries_moved: u64,
    pub scan_pages_probed: u64,
    pub bbt_flushes: u64,
    pub bbt_flush_failures: u64,
}

impl MetricsSnapshot {
    pub fn current() -> Self {
        Self {
            pages_read: PAGES_READ.load(Ordering::Relaxed),
            pages_written: PAGES_WRITTEN.load(Ordering::Relaxed),
            blocks_erased: BLOCKS_ERASED.load(Ordering::Relaxed),
            reserved_ops: RESERVED_OPS.load(Ordering::Relaxed),
            table_entries_moved: TABLE_ENTRIES_MOVED.load(Ordering::Relaxed),
            scan_pages_probed: SCAN_PAGES_PROBED.load(Ordering::Relaxed),
            bbt_flushes: BBT_FLUSHES.load(Ordering::Relaxed),
            bbt_flush_failures: BBT_FLUSH_FAILURES.load(Ordering::Relaxed),
        }
    }
}

pub fn reset_metrics() {
    PAGES_READ.store(0, Ordering::Relaxed);
    PAGES_WRITTEN.store(0, Ordering::Relaxed);
    BLOCKS_ERASED.store(0, Ordering::Relaxed);
    RESERVED_OPS.store(0, Ordering::Relaxed);
    TABLE_ENTRIES_MOVED.store(0, Ordering::Relaxed);
    SCAN_PAGES_PROBED.store(0, Ordering::Relaxed);
    BBT_FLUSHES.store(0, Ordering::Relaxed);
    BBT_FLUSH_FAILURES.store(0, Ordering::Relaxed);
}

#[inline]
pub fn record_page_read() {
    PAGES_READ.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub fn record_page_written() {
    PAGES_WRITTEN.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub fn record_block_erased() {
    BLOCKS_ERASED.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub fn record_reserved_op() {
    RESERVED_OPS.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub fn record_entries_moved(n: u64) {
    TABLE_ENTRIES_MOVED.fetch_add(n, Ordering::Relaxed);
}

#[inline]
pub fn record_scan_page() {
    SCAN_PAGES_PROBED.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub fn record_bbt_flush() {
    BBT_FLUSHES.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub fn record_bbt_flush_failure() {
    BBT_FLUSH_FAILURES.fetch_add(1, Ordering::Relaxed);
}
