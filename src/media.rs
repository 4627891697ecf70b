//! Media-manager boundary: the synchronous physical-command primitive the
//! core submits to, plus `RamMedia`, an in-memory NAND model used by the
//! test suites and the bench binary.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use crate::error::{FtlError, FtlResult};
use crate::geometry::ChannelGeometry;

/// Physical command types. One logical page operation issues one command of
/// the same kind per plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    ReadPage,
    WritePage,
    EraseBlock,
}

/// One page-plane unit of flash.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PhysAddr {
    pub ch: u16,
    pub lun: u16,
    pub blk: u16,
    pub pl: u16,
    pub pg: u16,
}

impl fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ch{}/lun{}/blk{}/pl{}/pg{}",
            self.ch, self.lun, self.blk, self.pl, self.pg
        )
    }
}

/// Transient command descriptor; lives exactly for one `submit_sync` call.
#[derive(Debug, Clone, Copy)]
pub struct MediaCommand {
    pub addr: PhysAddr,
    pub kind: CommandKind,
}

/// Synchronous submission of one physical command. The buffer covers one
/// plane page (data followed by OOB): reads fill it, writes consume it,
/// erase passes none.
pub trait MediaManager: Send + Sync {
    fn submit_sync(&self, cmd: &MediaCommand, buf: Option<&mut [u8]>) -> FtlResult<()>;
}

// ---------------------------------------------------------------------------
// RamMedia
// ---------------------------------------------------------------------------

type PageKey = (u16, u16, u16, u16, u16); // (ch, lun, blk, pl, pg)

/// In-memory NAND model: pages absent from the store read back as erased
/// flash (0xFF). Records every submitted command and can inject a failure
/// after a chosen number of successful submissions.
pub struct RamMedia {
    geo: ChannelGeometry,
    pages: Mutex<HashMap<PageKey, Vec<u8>>>,
    history: Mutex<Vec<MediaCommand>>,
    fail_after: Mutex<Option<u32>>,
}

impl RamMedia {
    pub fn new(geo: ChannelGeometry) -> Self {
        Self {
            geo,
            pages: Mutex::new(HashMap::new()),
            history: Mutex::new(Vec::new()),
            fail_after: Mutex::new(None),
        }
    }

    pub fn geometry(&self) -> &ChannelGeometry {
        &self.geo
    }

    /// Let the next `n` submissions succeed, fail the one after, then clear
    /// the injection.
    pub fn fail_after(&self, n: u32) {
        *self.fail_after.lock().unwrap() = Some(n);
    }

    /// Drain and return the recorded command history.
    pub fn take_history(&self) -> Vec<MediaCommand> {
        std::mem::take(&mut *self.history.lock().unwrap())
    }

    /// Pages currently holding written (non-erased) data.
    pub fn written_pages(&self) -> usize {
        self.pages.lock().unwrap().len()
    }

    fn key(addr: &PhysAddr) -> PageKey {
        (addr.ch, addr.lun, addr.blk, addr.pl, addr.pg)
    }

    fn check_injected_failure(&self, cmd: &MediaCommand) -> FtlResult<()> {
        let mut slot = self.fail_after.lock().unwrap();
        if let Some(left) = *slot {
            if left == 0 {
                *slot = None;
                log::debug!("ram media: injected failure at {}", cmd.addr);
                return Err(FtlError::Io {
                    kind: cmd.kind,
                    addr: cmd.addr,
                });
            }
            *slot = Some(left - 1);
        }
        Ok(())
    }
}

impl MediaManager for RamMedia {
    fn submit_sync(&self, cmd: &MediaCommand, buf: Option<&mut [u8]>) -> FtlResult<()> {
        self.history.lock().unwrap().push(*cmd);
        self.check_injected_failure(cmd)?;

        match cmd.kind {
            CommandKind::ReadPage => {
                let buf = buf.ok_or_else(|| {
                    FtlError::InvalidArgument("read command without a buffer".into())
                })?;
                let pages = self.pages.lock().unwrap();
                match pages.get(&Self::key(&cmd.addr)) {
                    Some(data) => {
                        let n = data.len().min(buf.len());
                        buf[..n].copy_from_slice(&data[..n]);
                        buf[n..].fill(0xFF);
                    }
                    None => buf.fill(0xFF),
                }
            }
            CommandKind::WritePage => {
                let buf = buf.ok_or_else(|| {
                    FtlError::InvalidArgument("write command without a buffer".into())
                })?;
                self.pages
                    .lock()
                    .unwrap()
                    .insert(Self::key(&cmd.addr), buf.to_vec());
            }
            CommandKind::EraseBlock => {
                // Erase is per plane: drop every page of this (lun, blk, pl).
                let mut pages = self.pages.lock().unwrap();
                pages.retain(|&(ch, lun, blk, pl, _), _| {
                    !(ch == cmd.addr.ch
                        && lun == cmd.addr.lun
                        && blk == cmd.addr.blk
                        && pl == cmd.addr.pl)
                });
            }
        }
        Ok(())
    }
}
