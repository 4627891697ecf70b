//! FTL core: collaborator wiring, global and per-channel lifecycle, and the
//! operation table registered with the controller.
//!
//! Collaborators (provisioning, mapping, logical I/O, channel management,
//! bad-block persistence) are injected at construction through traits; the
//! core only sequences them and implements the operation table. Subsystem
//! logic itself lives behind the traits.

use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::bbt::{BadBlockSink, ReservedBbtSink, SetOutcome};
use crate::channel::{Channel, ChannelRegistry, ChannelSet};
use crate::config::FtlConfig;
use crate::consts::{
    BBT_FORMAT_BYTE, CAP_EXIT_FN, CAP_GET_BBTBL, CAP_INIT_FN, CAP_SET_BBTBL, FN_GLOBAL, FTL_ID,
    FTL_NAME,
};
use crate::error::{FtlError, FtlResult};
use crate::geometry::ChannelGeometry;
use crate::media::{MediaCommand, MediaManager, PhysAddr};
use crate::metrics;

// ---------------------------------------------------------------------------
// Collaborator boundaries
// ---------------------------------------------------------------------------

/// A global collaborator with an ordered startup/shutdown slot (provisioning,
/// mapping, logical I/O).
pub trait Subsystem: Send + Sync {
    fn init(&self) -> FtlResult<()>;
    fn exit(&self);
}

/// One logical (host-side) I/O command handed through the operation table.
#[derive(Debug, Clone, Copy)]
pub struct HostIo {
    pub cmd_id: u64,
    pub slba: u64,
    pub n_sectors: u32,
    pub write: bool,
}

/// Logical-address I/O submission collaborator.
pub trait LbaIo: Subsystem {
    fn submit(&self, io: &HostIo) -> FtlResult<()>;
}

/// Physical-address I/O collaborator; receives media completion callbacks.
pub trait PpaIo: Send + Sync {
    fn callback(&self, cmd: &MediaCommand);
}

/// Controller-side FTL registry the descriptor and operation table are handed
/// to at startup.
pub trait FtlRegistry {
    fn register(&mut self, desc: FtlDescriptor, ops: Arc<dyn FlashTranslation>) -> FtlResult<()>;
}

/// Registration descriptor: identity plus the capability bitmask and the
/// bad-block-table storage format tag.
#[derive(Debug, Clone)]
pub struct FtlDescriptor {
    pub id: u8,
    pub name: &'static str,
    pub queues: u16,
    pub cap: u32,
    pub bbtbl_format: u8,
}

/// The exposed operation table.
pub trait FlashTranslation: Send + Sync {
    fn init_channel(&self, geo: &ChannelGeometry) -> FtlResult<u16>;
    fn submit_io(&self, io: &HostIo) -> FtlResult<()>;
    fn io_callback(&self, cmd: &MediaCommand);
    fn exit(&self);
    fn get_bbtbl(&self, addr: &PhysAddr, out: &mut [u8]) -> FtlResult<()>;
    fn set_bbtbl(&self, addr: &PhysAddr, value: u8) -> FtlResult<()>;
    fn init_fn(&self, fn_id: u16) -> FtlResult<()>;
    fn exit_fn(&self, fn_id: u16);
}

// ---------------------------------------------------------------------------
// Default no-op collaborators
// ---------------------------------------------------------------------------
// Registration-time wiring installs real subsystems; these stand in when a
// deployment (or a test) exercises the core without them.

struct NoopSubsystem(&'static str);

impl Subsystem for NoopSubsystem {
    fn init(&self) -> FtlResult<()> {
        debug!("{}: no-op subsystem started", self.0);
        Ok(())
    }
    fn exit(&self) {}
}

struct NoopLbaIo;

impl Subsystem for NoopLbaIo {
    fn init(&self) -> FtlResult<()> {
        Ok(())
    }
    fn exit(&self) {}
}

impl LbaIo for NoopLbaIo {
    fn submit(&self, io: &HostIo) -> FtlResult<()> {
        debug!("lba i/o stub: dropping command {}", io.cmd_id);
        Ok(())
    }
}

struct NoopPpaIo;

impl PpaIo for NoopPpaIo {
    fn callback(&self, _cmd: &MediaCommand) {}
}

// ---------------------------------------------------------------------------
// FtlCore
// ---------------------------------------------------------------------------

/// Context object holding the collaborator handles; replaces a process-wide
/// registry so the core can be constructed against fakes in isolation.
pub struct FtlCore {
    media: Arc<dyn MediaManager>,
    channels: Arc<dyn ChannelRegistry>,
    gl_prov: Box<dyn Subsystem>,
    gl_map: Box<dyn Subsystem>,
    lba_io: Box<dyn LbaIo>,
    ppa_io: Box<dyn PpaIo>,
    bbt_sink: Arc<dyn BadBlockSink>,
    cfg: FtlConfig,
    active_channels: AtomicU16,
    global_started: AtomicBool,
    // Coarse per-subsystem locks for the GC collaborators layered above.
    gc_ns_lock: Mutex<()>,
    gc_map_lock: Mutex<()>,
}

impl FtlCore {
    pub fn builder() -> FtlCoreBuilder {
        FtlCoreBuilder::new()
    }

    pub fn media(&self) -> &Arc<dyn MediaManager> {
        &self.media
    }

    pub fn channels(&self) -> &Arc<dyn ChannelRegistry> {
        &self.channels
    }

    pub fn config(&self) -> &FtlConfig {
        &self.cfg
    }

    pub fn active_channels(&self) -> u16 {
        self.active_channels.load(Ordering::Acquire)
    }

    pub fn gc_ns_lock(&self) -> &Mutex<()> {
        &self.gc_ns_lock
    }

    pub fn gc_map_lock(&self) -> &Mutex<()> {
        &self.gc_map_lock
    }

    /// Bring up one channel: registry slot first (failure aborts before any
    /// flag work), then enable it with no GC pending.
    pub fn init_channel(&self, geo: &ChannelGeometry) -> FtlResult<Arc<Channel>> {
        let index = self.active_channels.load(Ordering::Acquire);
        let ch = self.channels.init(geo, index)?;

        ch.flags.set_active(true);
        ch.flags.set_need_gc(false);

        self.active_channels.fetch_add(1, Ordering::AcqRel);
        info!("channel {} up ({} planes)", ch.id(), geo.n_planes);
        Ok(ch)
    }

    /// Tear down every active channel. Per channel: poll the busy counter
    /// with a bounded backoff (best-effort drain, not a guarantee of zero
    /// in-flight I/O), then release the registry slot regardless.
    pub fn exit(&self) {
        for ch in self.channels.list() {
            let mut retry = 0;
            while ch.flags.busy_count() > 0 && retry < self.cfg.drain_retries {
                thread::sleep(Duration::from_millis(self.cfg.drain_backoff_ms));
                retry += 1;
            }
            if ch.flags.busy_count() > 0 {
                warn!(
                    "channel {} still busy after {} drain attempts, exiting anyway",
                    ch.id(),
                    retry
                );
            }

            ch.flags.set_active(false);
            self.channels.exit(&ch);
            self.active_channels.fetch_sub(1, Ordering::AcqRel);
            info!("channel {} down", ch.id());
        }
    }

    /// Strict-order global startup: provisioning, mapping, logical I/O.
    /// Failure unwinds whatever already started, in reverse.
    pub fn global_init(&self) -> FtlResult<()> {
        if let Err(err) = self.gl_prov.init() {
            error!("global provisioning not started: {}", err);
            return Err(err);
        }
        if let Err(err) = self.gl_map.init() {
            error!("global mapping not started: {}", err);
            self.gl_prov.exit();
            return Err(err);
        }
        if let Err(err) = self.lba_io.init() {
            error!("lba i/o not started: {}", err);
            self.gl_map.exit();
            self.gl_prov.exit();
            return Err(err);
        }
        Ok(())
    }

    /// Teardown in the reverse of the init order, always.
    pub fn global_exit(&self) {
        self.lba_io.exit();
        self.gl_map.exit();
        self.gl_prov.exit();
    }

    pub fn init_by_id(&self, fn_id: u16) -> FtlResult<()> {
        match fn_id {
            FN_GLOBAL => {
                self.global_started.store(true, Ordering::Release);
                self.global_init()
            }
            _ => {
                info!("init_fn: function {} not found", fn_id);
                Err(FtlError::InvalidArgument(format!(
                    "unknown init function id {}",
                    fn_id
                )))
            }
        }
    }

    /// Runs the global teardown only if the matching init was recorded; the
    /// flag is consumed, so a second exit is a no-op.
    pub fn exit_by_id(&self, fn_id: u16) {
        match fn_id {
            FN_GLOBAL => {
                if self.global_started.swap(false, Ordering::AcqRel) {
                    self.global_exit();
                }
            }
            _ => info!("exit_fn: function {} not found", fn_id),
        }
    }

    pub fn get_bbtbl(&self, addr: &PhysAddr, out: &mut [u8]) -> FtlResult<()> {
        let ch = self.channels.get(addr.ch).ok_or_else(|| {
            FtlError::InvalidArgument(format!("channel {} not initialized", addr.ch))
        })?;
        let result = ch.bbt().lock().unwrap().get(addr.lun, out);
        result
    }

    /// Update one bad-block status byte; persist the full table only when the
    /// stored value changed. A flush failure is logged and swallowed; the
    /// in-memory table stays authoritative until the next successful flush.
    pub fn set_bbtbl(&self, addr: &PhysAddr, value: u8) -> FtlResult<()> {
        let ch = self.channels.get(addr.ch).ok_or_else(|| {
            FtlError::InvalidArgument(format!("channel {} not initialized", addr.ch))
        })?;

        let outcome = ch.bbt().lock().unwrap().set(addr, value)?;

        if outcome == SetOutcome::Updated {
            if let Err(err) = self.bbt_sink.flush(&ch) {
                metrics::record_bbt_flush_failure();
                warn!(
                    "error flushing bad block table for channel {}: {}",
                    ch.id(),
                    err
                );
            }
        }

        Ok(())
    }

    pub fn submit_io(&self, io: &HostIo) -> FtlResult<()> {
        self.lba_io.submit(io)
    }

    pub fn io_callback(&self, cmd: &MediaCommand) {
        self.ppa_io.callback(cmd);
    }

    /// Registration descriptor with the supported optional operations
    /// advertised in the capability bitmask.
    pub fn descriptor(&self) -> FtlDescriptor {
        let mut cap = 0u32;
        cap |= CAP_GET_BBTBL;
        cap |= CAP_SET_BBTBL;
        cap |= CAP_INIT_FN;
        cap |= CAP_EXIT_FN;

        FtlDescriptor {
            id: FTL_ID,
            name: FTL_NAME,
            queues: self.cfg.queues,
            cap,
            bbtbl_format: BBT_FORMAT_BYTE,
        }
    }
}

impl FlashTranslation for FtlCore {
    fn init_channel(&self, geo: &ChannelGeometry) -> FtlResult<u16> {
        FtlCore::init_channel(self, geo).map(|ch| ch.id())
    }

    fn submit_io(&self, io: &HostIo) -> FtlResult<()> {
        FtlCore::submit_io(self, io)
    }

    fn io_callback(&self, cmd: &MediaCommand) {
        FtlCore::io_callback(self, cmd)
    }

    fn exit(&self) {
        FtlCore::exit(self)
    }

    fn get_bbtbl(&self, addr: &PhysAddr, out: &mut [u8]) -> FtlResult<()> {
        FtlCore::get_bbtbl(self, addr, out)
    }

    fn set_bbtbl(&self, addr: &PhysAddr, value: u8) -> FtlResult<()> {
        FtlCore::set_bbtbl(self, addr, value)
    }

    fn init_fn(&self, fn_id: u16) -> FtlResult<()> {
        self.init_by_id(fn_id)
    }

    fn exit_fn(&self, fn_id: u16) {
        self.exit_by_id(fn_id)
    }
}

/// Hand the descriptor and operation table to the controller's registry.
pub fn register(core: Arc<FtlCore>, registry: &mut dyn FtlRegistry) -> FtlResult<()> {
    let desc = core.descriptor();
    info!(
        "registering ftl '{}' (id {}, cap {:#06b})",
        desc.name, desc.id, desc.cap
    );
    registry.register(desc, core)
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Construction-time wiring for `FtlCore`. Only the media manager is
/// mandatory; other collaborators default to in-crate stand-ins
/// (`ChannelSet`, `ReservedBbtSink`, no-op subsystems).
pub struct FtlCoreBuilder {
    media: Option<Arc<dyn MediaManager>>,
    channels: Option<Arc<dyn ChannelRegistry>>,
    gl_prov: Option<Box<dyn Subsystem>>,
    gl_map: Option<Box<dyn Subsystem>>,
    lba_io: Option<Box<dyn LbaIo>>,
    ppa_io: Option<Box<dyn PpaIo>>,
    bbt_sink: Option<Arc<dyn BadBlockSink>>,
    cfg: FtlConfig,
}

impl Default for FtlCoreBuilder {
    fn default() -> Self {
        Self {
            media: None,
            channels: None,
            gl_prov: None,
            gl_map: None,
            lba_io: None,
            ppa_io: None,
            bbt_sink: None,
            cfg: FtlConfig::from_env(),
        }
    }
}

impl FtlCoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn media(mut self, media: Arc<dyn MediaManager>) -> Self {
        self.media = Some(media);
        self
    }

    pub fn channels(mut self, channels: Arc<dyn ChannelRegistry>) -> Self {
        self.channels = Some(channels);
        self
    }

    pub fn gl_prov(mut self, sub: Box<dyn Subsystem>) -> Self {
        self.gl_prov = Some(sub);
        self
    }

    pub fn gl_map(mut self, sub: Box<dyn Subsystem>) -> Self {
        self.gl_map = Some(sub);
        self
    }

    pub fn lba_io(mut self, sub: Box<dyn LbaIo>) -> Self {
        self.lba_io = Some(sub);
        self
    }

    pub fn ppa_io(mut self, sub: Box<dyn PpaIo>) -> Self {
        self.ppa_io = Some(sub);
        self
    }

    pub fn bbt_sink(mut self, sink: Arc<dyn BadBlockSink>) -> Self {
        self.bbt_sink = Some(sink);
        self
    }

    pub fn config(mut self, cfg: FtlConfig) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn build(self) -> FtlResult<FtlCore> {
        let media = self
            .media
            .ok_or(FtlError::SubsystemInit("media manager not wired"))?;
        let bbt_sink = self.bbt_sink.unwrap_or_else(|| {
            Arc::new(ReservedBbtSink::with_block(
                Arc::clone(&media),
                self.cfg.bbt_rsv_blk,
            ))
        });

        Ok(FtlCore {
            media,
            channels: self.channels.unwrap_or_else(|| Arc::new(ChannelSet::new())),
            gl_prov: self
                .gl_prov
                .unwrap_or_else(|| Box::new(NoopSubsystem("global provisioning"))),
            gl_map: self
                .gl_map
                .unwrap_or_else(|| Box::new(NoopSubsystem("global mapping"))),
            lba_io: self.lba_io.unwrap_or_else(|| Box::new(NoopLbaIo)),
            ppa_io: self.ppa_io.unwrap_or_else(|| Box::new(NoopPpaIo)),
            bbt_sink,
            cfg: self.cfg,
            active_channels: AtomicU16::new(0),
            global_started: AtomicBool::new(false),
            gc_ns_lock: Mutex::new(()),
            gc_map_lock: Mutex::new(()),
        })
    }
}
