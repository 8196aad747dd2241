//! ACPI table discovery and power control for bootcore.
//!
//! - [`rsdp`]: locating and validating the Root System Description Pointer.
//! - [`tables`]: RSDT/XSDT traversal and table lookup by signature.
//! - [`fadt`]: the FADT power-management fields.
//! - [`power`]: ACPI mode enable, soft-off and reset.
//!
//! Physical memory is read through [`memory::PhysMemory`] and ports through
//! [`bootcore_lib::PortIo`], so the whole path runs on the host in tests.
//!
//! ```ignore
//! let mem = unsafe { OffsetMapped::new(hhdm_offset, phys_limit) };
//! let root = locate_root(&mem)?;
//! let fadt = PowerTable::from_table(&find_table(&mem, &root, FADT_SIGNATURE)?)?;
//! ```

#![no_std]
#![allow(unsafe_op_in_unsafe_fn)]

#[cfg(test)]
extern crate std;

pub mod config;
pub mod error;
pub mod fadt;
pub mod memory;
pub mod power;
pub mod rsdp;
pub mod tables;

#[cfg(test)]
mod test_fixtures;

pub use config::{AcpiConfig, config_from_cmdline};
pub use error::{AcpiError, AcpiResult};
pub use fadt::{FADT_SIGNATURE, PowerTable};
pub use memory::{MemoryWindow, OffsetMapped, PhysMemory};
pub use power::{PowerController, PowerPlatform, PowerState, power_state, soft_off_value};
pub use rsdp::{RootDescriptor, locate_root};
pub use tables::{AcpiTable, RootTable, SdtHeader, find_table};
