//! Memory primitives for a machine with no general-purpose heap.
//!
//! - [`arena`]: a fixed byte region with a monotonic bump cursor. Nothing is
//!   ever reclaimed.
//! - [`sequence`]: a growable, owning container whose storage comes from an
//!   [`Arena`].
//! - [`boot_arena`]: the single process-wide arena, initialised once at boot.
//!
//! ```ignore
//! let arena = bootcore_mm::boot_arena::init();
//! let mut line = Sequence::new_in(arena);
//! line.append(b'h')?;
//! ```

#![no_std]
#![allow(unsafe_op_in_unsafe_fn)]

#[cfg(test)]
extern crate std;

pub mod arena;
pub mod boot_arena;
pub mod error;
pub mod sequence;

pub use arena::{ARENA_ALIGN, Arena};
pub use error::{MmError, MmResult};
pub use sequence::Sequence;
