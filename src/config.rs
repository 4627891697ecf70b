//! Centralized configuration and builder for the FTL core.
//!
//! Goals:
//! - Single place to collect tunables instead of scattering env lookups.
//! - `FtlConfig::from_env()` reads the `EFTL_*` variables; fluent `with_*`
//!   setters override specific fields.
//!
//! Defaults match the shutdown-drain contract: 200 retries x 5 ms (~1 s of
//! bounded wait per channel before exit proceeds regardless).

use std::fmt;

use crate::consts::{
    BBT_RSV_BLK_DEFAULT, DRAIN_BACKOFF_MS_DEFAULT, DRAIN_RETRIES_DEFAULT, QUEUES_DEFAULT,
};

#[derive(Clone, Debug)]
pub struct FtlConfig {
    /// Busy-drain poll attempts per channel at exit.
    /// Env: EFTL_DRAIN_RETRIES (default 200)
    pub drain_retries: u32,

    /// Sleep between busy-drain polls, in milliseconds.
    /// Env: EFTL_DRAIN_BACKOFF_MS (default 5)
    pub drain_backoff_ms: u64,

    /// Submission queues advertised in the registration descriptor.
    /// Env: EFTL_QUEUES (default 2)
    pub queues: u16,

    /// Reserved block id used by the built-in bad-block flush sink.
    /// Env: EFTL_BBT_RSV_BLK (default 1)
    pub bbt_rsv_blk: u16,
}

impl Default for FtlConfig {
    fn default() -> Self {
        Self {
            drain_retries: DRAIN_RETRIES_DEFAULT,
            drain_backoff_ms: DRAIN_BACKOFF_MS_DEFAULT,
            queues: QUEUES_DEFAULT,
            bbt_rsv_blk: BBT_RSV_BLK_DEFAULT,
        }
    }
}

impl FtlConfig {
    /// Load configuration from environment variables; unset or unparsable
    /// values keep their defaults.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("EFTL_DRAIN_RETRIES") {
            if let Ok(n) = v.trim().parse::<u32>() {
                cfg.drain_retries = n;
            }
        }
        if let Ok(v) = std::env::var("EFTL_DRAIN_BACKOFF_MS") {
            if let Ok(n) = v.trim().parse::<u64>() {
                cfg.drain_backoff_ms = n;
            }
        }
        if let Ok(v) = std::env::var("EFTL_QUEUES") {
            if let Ok(n) = v.trim().parse::<u16>() {
                cfg.queues = n;
            }
        }
        if let Ok(v) = std::env::var("EFTL_BBT_RSV_BLK") {
            if let Ok(n) = v.trim().parse::<u16>() {
                cfg.bbt_rsv_blk = n;
            }
        }

        cfg
    }

    /// Fluent setters (builder-style) to override specific fields.

    pub fn with_drain_retries(mut self, retries: u32) -> Self {
        self.drain_retries = retries;
        self
    }

    pub fn with_drain_backoff_ms(mut self, ms: u64) -> Self {
        self.drain_backoff_ms = ms;
        self
    }

    pub fn with_queues(mut self, queues: u16) -> Self {
        self.queues = queues;
        self
    }

    pub fn with_bbt_rsv_blk(mut self, blk: u16) -> Self {
        self.bbt_rsv_blk = blk;
        self
    }
}

impl fmt::Display for FtlConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FtlConfig {{ drain_retries: {}, drain_backoff_ms: {}, queues: {}, bbt_rsv_blk: {} }}",
            self.drain_retries, self.drain_backoff_ms, self.queues, self.bbt_rsv_blk
        )
    }
}
