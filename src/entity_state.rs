use std::fmt;

use portable_atomic::{AtomicU8, Ordering};

use crate::error::{Error, Result};

/// EntityState is the lifecycle of every worker-backed entity. It only
/// moves forward.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum EntityState {
    #[default]
    Open = 0,
    Closing = 1,
    Closed = 2,
}

impl From<u8> for EntityState {
    fn from(v: u8) -> Self {
        match v {
            0 => EntityState::Open,
            1 => EntityState::Closing,
            _ => EntityState::Closed,
        }
    }
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            EntityState::Open => "open",
            EntityState::Closing => "closing",
            EntityState::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Default)]
pub(crate) struct Lifecycle(AtomicU8);

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Lifecycle(AtomicU8::new(EntityState::Open as u8))
    }

    pub(crate) fn state(&self) -> EntityState {
        self.0.load(Ordering::SeqCst).into()
    }

    pub(crate) fn is_open(&self) -> bool {
        self.state() == EntityState::Open
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(Error::ErrInvalidState)
        }
    }

    /// begin_close moves Open to Closing. Only the first caller succeeds.
    pub(crate) fn begin_close(&self) -> Result<()> {
        self.0
            .compare_exchange(
                EntityState::Open as u8,
                EntityState::Closing as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .map(|_| ())
            .map_err(|_| Error::ErrInvalidState)
    }

    pub(crate) fn finish_close(&self) {
        self.0.store(EntityState::Closed as u8, Ordering::SeqCst);
    }
}
