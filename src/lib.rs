#![allow(non_snake_case)]

// Base modules
pub mod consts;
pub mod error;
pub mod geometry;
pub mod config;
pub mod metrics;

// Media boundary and geometry-aware buffers
pub mod media; // MediaManager trait + RamMedia NAND model
pub mod buffer; // multi-plane page buffer with sector/OOB index tables

// Physical I/O and the paths built on it
pub mod pgio; // all-plane page read/write/erase + reserved-block path
pub mod transfer; // sequential table transfer across pages/planes
pub mod scan; // OOB commit stamps + recency scan

// Per-channel state and the core
pub mod bbt; // bad-block table + reserved-block flush sink
pub mod channel; // channel flags/registry
pub mod ftl; // FtlCore, collaborators, registration

// Convenience re-exports
pub use buffer::PageBuffer;
pub use channel::{Channel, ChannelFlags, ChannelRegistry, ChannelSet};
pub use config::FtlConfig;
pub use error::{FtlError, FtlResult};
pub use geometry::ChannelGeometry;
pub use media::{CommandKind, MediaCommand, MediaManager, PhysAddr, RamMedia};
pub use ftl::{
    register, FlashTranslation, FtlCore, FtlCoreBuilder, FtlDescriptor, FtlRegistry, HostIo,
};
