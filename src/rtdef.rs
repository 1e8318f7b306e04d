//! RT-Thread core definitions
//! This module contains the basic type definitions shared by the scheduler core

use core::fmt;

/// Thread state
///
/// `Init` is a created thread that has not been started yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    Init,
    Ready,
    Running,
    Suspended,
    Terminated,
}

impl fmt::Display for ThreadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            ThreadState::Init => "init",
            ThreadState::Ready => "ready",
            ThreadState::Running => "running",
            ThreadState::Suspended => "suspend",
            ThreadState::Terminated => "close",
        })
    }
}

/// Error type for RT-Thread operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtError {
    Error,
    Timeout,
    Full,
    Empty,
    NoMemory,
    NoSystem,
    Busy,
    IoError,
    Interrupted,
    InvalidArgument,
}

impl RtError {
    /// RT-Thread style negative error code
    pub const fn code(self) -> isize {
        match self {
            RtError::Error => -1,
            RtError::Timeout => -2,
            RtError::Full => -3,
            RtError::Empty => -4,
            RtError::NoMemory => -5,
            RtError::NoSystem => -6,
            RtError::Busy => -7,
            RtError::IoError => -8,
            RtError::Interrupted => -9,
            RtError::InvalidArgument => -10,
        }
    }
}

impl fmt::Display for RtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            RtError::Error => "generic error",
            RtError::Timeout => "timed out",
            RtError::Full => "resource is full",
            RtError::Empty => "resource is empty",
            RtError::NoMemory => "no memory",
            RtError::NoSystem => "no such entry",
            RtError::Busy => "busy",
            RtError::IoError => "io error",
            RtError::Interrupted => "interrupted",
            RtError::InvalidArgument => "invalid argument",
        };
        f.write_str(msg)
    }
}

pub type RtResult<T = ()> = Result<T, RtError>;

/// Handle of a thread control block in the thread table
///
/// The generation changes every time the slot is reused, so a handle kept
/// after the thread was reaped never aliases a new thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadId {
    pub(crate) index: u16,
    pub(crate) generation: u16,
}

impl ThreadId {
    pub const fn index(&self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}
