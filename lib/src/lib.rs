//! Freestanding support code shared by the bootcore crates.
//!
//! Nothing in here knows about ACPI or memory management. It provides the
//! leveled kernel log, port I/O, a handful of CPU primitives, a tick clock,
//! and the small parsing helpers used for kernel-command-line options.

#![no_std]
#![allow(unsafe_op_in_unsafe_fn)]

#[cfg(test)]
extern crate std;

pub mod alignment;
pub mod clock;
pub mod cmdline;
pub mod cpu;
pub mod io;
pub mod klog;
pub mod ports;

pub use alignment::checked_align_up_usize;
pub use clock::{Clock, delay_ticks};
pub use io::{Port, PortIo};
pub use klog::{
    KlogLevel, klog_get_level, klog_init, klog_is_enabled, klog_register_backend, klog_set_level,
};
pub use ports::COM1;
