//! Fixed ACPI Description Table (signature `FACP`).
//!
//! Only the fields the power path needs are extracted. Offsets are from the
//! start of the table, header included.

use bitflags::bitflags;
use bootcore_lib::{klog_debug, klog_info};

use crate::error::{AcpiError, AcpiResult};
use crate::memory::ByteReader;
use crate::tables::{AcpiTable, Signature};

pub const FADT_SIGNATURE: &[u8; 4] = b"FACP";

/// Length of an ACPI 1.0 FADT, the shortest table accepted.
pub const FADT_V1_LEN: usize = 116;

const OFF_FIRMWARE_CTRL: usize = 36;
const OFF_DSDT: usize = 40;
const OFF_SCI_INT: usize = 46;
const OFF_SMI_CMD: usize = 48;
const OFF_ACPI_ENABLE: usize = 52;
const OFF_ACPI_DISABLE: usize = 53;
const OFF_PM1A_EVT_BLK: usize = 56;
const OFF_PM1B_EVT_BLK: usize = 60;
const OFF_PM1A_CNT_BLK: usize = 64;
const OFF_PM1B_CNT_BLK: usize = 68;
const OFF_PM_TMR_BLK: usize = 76;
const OFF_PM1_EVT_LEN: usize = 88;
const OFF_PM1_CNT_LEN: usize = 89;
const OFF_PM_TMR_LEN: usize = 91;
const OFF_FLAGS: usize = 112;
const OFF_RESET_REG: usize = 116;
const OFF_RESET_VALUE: usize = 128;

bitflags! {
    /// Fixed feature flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct FadtFlags: u32 {
        const WBINVD = 1 << 0;
        const WBINVD_FLUSH = 1 << 1;
        const PROC_C1 = 1 << 2;
        const P_LVL2_UP = 1 << 3;
        const PWR_BUTTON = 1 << 4;
        const SLP_BUTTON = 1 << 5;
        const FIX_RTC = 1 << 6;
        const RTC_S4 = 1 << 7;
        const TMR_VAL_EXT = 1 << 8;
        const DCK_CAP = 1 << 9;
        const RESET_REG_SUP = 1 << 10;
        const SEALED_CASE = 1 << 11;
        const HEADLESS = 1 << 12;
        const CPU_SW_SLP = 1 << 13;
    }
}

pub const ADDRESS_SPACE_SYSTEM_MEMORY: u8 = 0;
pub const ADDRESS_SPACE_SYSTEM_IO: u8 = 1;

/// Generic Address Structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenericAddress {
    pub space_id: u8,
    pub bit_width: u8,
    pub bit_offset: u8,
    pub access_size: u8,
    pub address: u64,
}

impl GenericAddress {
    fn parse(bytes: &[u8], offset: usize) -> Option<Self> {
        Some(Self {
            space_id: bytes.read8(offset)?,
            bit_width: bytes.read8(offset + 1)?,
            bit_offset: bytes.read8(offset + 2)?,
            access_size: bytes.read8(offset + 3)?,
            address: bytes.read64(offset + 4)?,
        })
    }

    /// The address as an I/O port, if this register lives in I/O space.
    pub fn io_port(&self) -> Option<u16> {
        if self.space_id != ADDRESS_SPACE_SYSTEM_IO {
            return None;
        }
        u16::try_from(self.address).ok().filter(|&p| p != 0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResetRegister {
    pub register: GenericAddress,
    pub value: u8,
}

/// Power-management fields of the FADT. A zero port or value means the
/// platform does not provide it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PowerTable {
    pub address: u64,
    pub revision: u8,
    pub length: u32,
    pub firmware_ctrl: u32,
    pub dsdt: u32,
    pub sci_interrupt: u16,
    pub smi_command: u32,
    pub acpi_enable: u8,
    pub acpi_disable: u8,
    pub pm1a_event_block: u32,
    pub pm1b_event_block: u32,
    pub pm1a_control_block: u32,
    pub pm1b_control_block: u32,
    pub pm_timer_block: u32,
    pub pm1_event_length: u8,
    pub pm1_control_length: u8,
    pub pm_timer_length: u8,
    pub flags: FadtFlags,
    /// Present only in revision 2+ tables long enough to hold it.
    pub reset: Option<ResetRegister>,
}

impl PowerTable {
    pub fn from_table(table: &AcpiTable<'_>) -> AcpiResult<Self> {
        if table.signature() != FADT_SIGNATURE {
            klog_debug!("ACPI: expected FACP, got {}", Signature(table.signature()));
            return Err(AcpiError::NotFound);
        }
        let b = table.bytes();
        if b.len() < FADT_V1_LEN {
            return Err(AcpiError::InvalidTableLength);
        }
        let field32 = |off: usize| b.read32(off).ok_or(AcpiError::InvalidTableLength);
        let field8 = |off: usize| b.read8(off).ok_or(AcpiError::InvalidTableLength);

        let reset = if table.revision() >= 2 && b.len() > OFF_RESET_VALUE {
            GenericAddress::parse(b, OFF_RESET_REG).and_then(|register| {
                Some(ResetRegister {
                    register,
                    value: b.read8(OFF_RESET_VALUE)?,
                })
            })
        } else {
            None
        };

        Ok(Self {
            address: table.address(),
            revision: table.revision(),
            length: table.header().length,
            firmware_ctrl: field32(OFF_FIRMWARE_CTRL)?,
            dsdt: field32(OFF_DSDT)?,
            sci_interrupt: b
                .read16(OFF_SCI_INT)
                .ok_or(AcpiError::InvalidTableLength)?,
            smi_command: field32(OFF_SMI_CMD)?,
            acpi_enable: field8(OFF_ACPI_ENABLE)?,
            acpi_disable: field8(OFF_ACPI_DISABLE)?,
            pm1a_event_block: field32(OFF_PM1A_EVT_BLK)?,
            pm1b_event_block: field32(OFF_PM1B_EVT_BLK)?,
            pm1a_control_block: field32(OFF_PM1A_CNT_BLK)?,
            pm1b_control_block: field32(OFF_PM1B_CNT_BLK)?,
            pm_timer_block: field32(OFF_PM_TMR_BLK)?,
            pm1_event_length: field8(OFF_PM1_EVT_LEN)?,
            pm1_control_length: field8(OFF_PM1_CNT_LEN)?,
            pm_timer_length: field8(OFF_PM_TMR_LEN)?,
            flags: FadtFlags::from_bits_retain(field32(OFF_FLAGS)?),
            reset,
        })
    }

    pub fn smi_command_port(&self) -> Option<u16> {
        io_port(self.smi_command)
    }

    pub fn pm1a_event_port(&self) -> Option<u16> {
        io_port(self.pm1a_event_block)
    }

    pub fn pm1a_control_port(&self) -> Option<u16> {
        io_port(self.pm1a_control_block)
    }

    pub fn pm1b_control_port(&self) -> Option<u16> {
        io_port(self.pm1b_control_block)
    }

    /// SMI command port, enable value and PM1a event block are all present.
    pub fn supports_mode_enable(&self) -> bool {
        self.smi_command_port().is_some()
            && self.acpi_enable != 0
            && self.pm1a_event_port().is_some()
    }

    /// The reset register, if the firmware advertises it and it is an I/O port.
    pub fn reset_port(&self) -> Option<(u16, u8)> {
        if !self.flags.contains(FadtFlags::RESET_REG_SUP) {
            return None;
        }
        let reset = self.reset?;
        Some((reset.register.io_port()?, reset.value))
    }

    pub fn log(&self) {
        klog_info!(
            "ACPI: FADT rev {} at {:#x}: SCI {} SMI_CMD {:#x} enable {:#x} disable {:#x}",
            self.revision,
            self.address,
            self.sci_interrupt,
            self.smi_command,
            self.acpi_enable,
            self.acpi_disable
        );
        klog_info!(
            "ACPI: PM1a evt {:#x} cnt {:#x}, PM1b evt {:#x} cnt {:#x}, PM timer {:#x}",
            self.pm1a_event_block,
            self.pm1a_control_block,
            self.pm1b_event_block,
            self.pm1b_control_block,
            self.pm_timer_block
        );
        klog_debug!(
            "ACPI: PM1 evt len {} cnt len {} tmr len {} flags {:#x} reset {:?}",
            self.pm1_event_length,
            self.pm1_control_length,
            self.pm_timer_length,
            self.flags.bits(),
            self.reset
        );
    }
}

/// Port blocks are 32-bit fields; only the low 64 KiB is addressable and zero
/// means absent.
fn io_port(block: u32) -> Option<u16> {
    u16::try_from(block).ok().filter(|&p| p != 0)
}
