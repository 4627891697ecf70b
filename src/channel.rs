//! Per-channel runtime state and the channel-management boundary.
//!
//! Channel flags live in one atomic state word (active, need-gc) next to an
//! atomic busy counter; both are read/updated lock-free and never held across
//! an I/O call. The bad-block table is wrapped in a mutex for memory safety
//! only; logically conflicting get/set calls on one channel are serialized
//! by the translation layer that owns it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use crate::bbt::BadBlockTable;
use crate::error::{FtlError, FtlResult};
use crate::geometry::ChannelGeometry;

const CH_ACTIVE: u8 = 1 << 0;
const CH_NEED_GC: u8 = 1 << 1;

/// Lock-free channel flags: {active, need-gc} state word + busy counter.
#[derive(Debug, Default)]
pub struct ChannelFlags {
    state: AtomicU8,
    busy: AtomicU32,
}

impl ChannelFlags {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn active(&self) -> bool {
        self.state.load(Ordering::Acquire) & CH_ACTIVE != 0
    }

    #[inline]
    pub fn set_active(&self, on: bool) {
        if on {
            self.state.fetch_or(CH_ACTIVE, Ordering::AcqRel);
        } else {
            self.state.fetch_and(!CH_ACTIVE, Ordering::AcqRel);
        }
    }

    #[inline]
    pub fn need_gc(&self) -> bool {
        self.state.load(Ordering::Acquire) & CH_NEED_GC != 0
    }

    #[inline]
    pub fn set_need_gc(&self, on: bool) {
        if on {
            self.state.fetch_or(CH_NEED_GC, Ordering::AcqRel);
        } else {
            self.state.fetch_and(!CH_NEED_GC, Ordering::AcqRel);
        }
    }

    /// Threads currently inside logical I/O submission on this channel.
    #[inline]
    pub fn busy_count(&self) -> u32 {
        self.busy.load(Ordering::Acquire)
    }

    #[inline]
    pub fn busy_inc(&self) {
        self.busy.fetch_add(1, Ordering::AcqRel);
    }

    #[inline]
    pub fn busy_dec(&self) {
        self.busy.fetch_sub(1, Ordering::AcqRel);
    }
}

/// One channel's runtime structure: identity, geometry, flags and the
/// in-memory bad-block table, owned for the channel's lifetime.
pub struct Channel {
    id: u16,
    geometry: ChannelGeometry,
    pub flags: ChannelFlags,
    bbt: Mutex<BadBlockTable>,
}

impl Channel {
    pub fn new(id: u16, geometry: ChannelGeometry) -> FtlResult<Self> {
        geometry.validate()?;
        let bbt = BadBlockTable::new(&geometry)?;
        Ok(Self {
            id,
            geometry,
            flags: ChannelFlags::new(),
            bbt: Mutex::new(bbt),
        })
    }

    #[inline]
    pub fn id(&self) -> u16 {
        self.id
    }

    #[inline]
    pub fn geometry(&self) -> &ChannelGeometry {
        &self.geometry
    }

    pub fn bbt(&self) -> &Mutex<BadBlockTable> {
        &self.bbt
    }
}

/// Channel-management collaborator: lifecycle and lookup of per-channel
/// runtime structures.
pub trait ChannelRegistry: Send + Sync {
    /// Create the runtime structure for the channel at `index`.
    fn init(&self, geo: &ChannelGeometry, index: u16) -> FtlResult<Arc<Channel>>;
    fn get(&self, index: u16) -> Option<Arc<Channel>>;
    fn list(&self) -> Vec<Arc<Channel>>;
    /// Tear down one channel's runtime structure.
    fn exit(&self, ch: &Channel);
}

/// Minimal in-crate registry, enough for the test suites and the bench
/// binary.
#[derive(Default)]
pub struct ChannelSet {
    channels: Mutex<HashMap<u16, Arc<Channel>>>,
}

impl ChannelSet {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChannelRegistry for ChannelSet {
    fn init(&self, geo: &ChannelGeometry, index: u16) -> FtlResult<Arc<Channel>> {
        let mut chs = self.channels.lock().unwrap();
        if chs.contains_key(&index) {
            return Err(FtlError::InvalidArgument(format!(
                "channel {} already initialized",
                index
            )));
        }
        let ch = Arc::new(Channel::new(index, geo.clone())?);
        chs.insert(index, Arc::clone(&ch));
        Ok(ch)
    }

    fn get(&self, index: u16) -> Option<Arc<Channel>> {
        self.channels.lock().unwrap().get(&index).cloned()
    }

    fn list(&self) -> Vec<Arc<Channel>> {
        let mut out: Vec<_> = self.channels.lock().unwrap().values().cloned().collect();
        out.sort_by_key(|c| c.id());
        out
    }

    fn exit(&self, ch: &Channel) {
        self.channels.lock().unwrap().remove(&ch.id());
    }
}
