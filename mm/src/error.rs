//! Error type for the memory subsystem.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmError {
    /// The arena cannot satisfy the request; it never will again for this size.
    AllocationExhausted { requested: usize, remaining: usize },
    /// Element count times element size does not fit in `usize`.
    CapacityOverflow,
}

impl fmt::Display for MmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocationExhausted {
                requested,
                remaining,
            } => write!(
                f,
                "arena exhausted: requested {} bytes, {} remaining",
                requested, remaining
            ),
            Self::CapacityOverflow => write!(f, "requested capacity overflows usize"),
        }
    }
}

pub type MmResult<T = ()> = Result<T, MmError>;
