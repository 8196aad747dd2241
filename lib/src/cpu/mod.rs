//! CPU primitives used on the firmware path.

pub mod core;
pub mod interrupts;

pub use self::core::*;
pub use interrupts::*;
