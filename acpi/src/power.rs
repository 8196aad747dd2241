//! ACPI mode switch, soft-off and reset.
//!
//! [`PowerController`] walks the firmware tables once at boot, keeps the FADT
//! power fields, and asks the firmware to hand the PM registers over to the
//! OS. Shutdown later writes `SLP_TYP | SLP_EN` into PM1a (and PM1b) control.
//!
//! The S5 sleep type really lives in the DSDT's `\_S5` package and needs AML
//! evaluation to read. We use a fixed value instead (5 unless overridden with
//! `acpi.slp_typ`), which matches QEMU, Bochs and VirtualBox. On firmware where
//! it is wrong the write is accepted and the machine simply stays on.
//!
//! Hardware is reached only through [`PowerPlatform`] and
//! [`PhysMemory`](crate::memory::PhysMemory), so everything here runs against
//! mocks on the host.

use core::convert::Infallible;

use bitflags::bitflags;
use bootcore_lib::ports::{PS2_CMD_PULSE_RESET, PS2_COMMAND, PS2_STATUS, PS2_STATUS_INPUT_FULL};
use bootcore_lib::{Clock, PortIo, delay_ticks, klog_error, klog_info, klog_warn};
use spin::Mutex;

use crate::config::AcpiConfig;
use crate::error::{AcpiError, AcpiResult};
use crate::fadt::{FADT_SIGNATURE, PowerTable};
use crate::memory::PhysMemory;
use crate::rsdp::locate_root;
use crate::tables::find_table;

bitflags! {
    /// PM1 control register.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Pm1Control: u16 {
        const SCI_EN = 1 << 0;
        const BM_RLD = 1 << 1;
        const GBL_RLS = 1 << 2;
        const SLP_TYP = 0b111 << 10;
        const SLP_EN = 1 << 13;
    }
}

/// Bit polled in the PM1a event block to confirm ACPI mode.
pub const PM1_EVT_ACPI_MODE: u16 = 1 << 0;

pub const SLP_TYP_SHIFT: u16 = 10;
pub const SLP_TYP_MAX: u8 = 7;
pub const DEFAULT_S5_SLP_TYP: u8 = 5;

/// PM1 control value requesting sleep state `slp_typ`. Bits above the 3-bit
/// field are dropped.
pub const fn soft_off_value(slp_typ: u8) -> u16 {
    (((slp_typ & SLP_TYP_MAX) as u16) << SLP_TYP_SHIFT) | Pm1Control::SLP_EN.bits()
}

/// `soft_off_value(DEFAULT_S5_SLP_TYP)`, i.e. `0x3400`.
pub const S5_SOFT_OFF: u16 = soft_off_value(DEFAULT_S5_SLP_TYP);

/// Spins spent waiting for the keyboard controller input buffer to drain.
const KBC_DRAIN_SPINS: u32 = 0x1_0000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PowerState {
    Uninitialized,
    /// FADT parsed; ACPI mode not confirmed.
    Located,
    /// Firmware confirmed ACPI mode.
    Enabled,
    /// Soft-off registers are being written. The machine never leaves this
    /// state when the write works.
    HaltRequested,
    /// Soft-off could not be attempted.
    ShutdownFailed,
}

impl PowerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Located => "located",
            Self::Enabled => "enabled",
            Self::HaltRequested => "halt requested",
            Self::ShutdownFailed => "shutdown failed",
        }
    }
}

impl core::fmt::Display for PowerState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The machine-level operations power transitions need beyond port I/O.
pub trait PowerPlatform: PortIo {
    fn disable_interrupts(&mut self);
    fn halt_forever(&mut self) -> !;
}

#[cfg(target_arch = "x86_64")]
pub use hardware::HardwarePlatform;

#[cfg(target_arch = "x86_64")]
mod hardware {
    use bootcore_lib::PortIo;
    use bootcore_lib::cpu;
    use bootcore_lib::io::HardwarePorts;

    use super::PowerPlatform;

    pub struct HardwarePlatform {
        ports: HardwarePorts,
    }

    impl HardwarePlatform {
        /// # Safety
        ///
        /// Same as [`HardwarePorts::new`]. The caller must also be allowed
        /// to execute `cli` and `hlt`.
        pub const unsafe fn new() -> Self {
            Self {
                ports: unsafe { HardwarePorts::new() },
            }
        }
    }

    impl PortIo for HardwarePlatform {
        fn read_u8(&mut self, port: u16) -> u8 {
            self.ports.read_u8(port)
        }
        fn write_u8(&mut self, port: u16, value: u8) {
            self.ports.write_u8(port, value)
        }
        fn read_u16(&mut self, port: u16) -> u16 {
            self.ports.read_u16(port)
        }
        fn write_u16(&mut self, port: u16, value: u16) {
            self.ports.write_u16(port, value)
        }
        fn read_u32(&mut self, port: u16) -> u32 {
            self.ports.read_u32(port)
        }
        fn write_u32(&mut self, port: u16, value: u32) {
            self.ports.write_u32(port, value)
        }
    }

    impl PowerPlatform for HardwarePlatform {
        fn disable_interrupts(&mut self) {
            cpu::disable_interrupts();
        }

        fn halt_forever(&mut self) -> ! {
            cpu::halt_loop()
        }
    }
}

#[derive(Debug)]
pub struct PowerController {
    config: AcpiConfig,
    state: PowerState,
    table: Option<PowerTable>,
}

impl PowerController {
    pub const fn new(config: AcpiConfig) -> Self {
        Self {
            config,
            state: PowerState::Uninitialized,
            table: None,
        }
    }

    pub fn state(&self) -> PowerState {
        self.state
    }

    pub fn table(&self) -> Option<&PowerTable> {
        self.table.as_ref()
    }

    pub fn config(&self) -> &AcpiConfig {
        &self.config
    }

    /// Locate the FADT and try to switch the machine into ACPI mode.
    ///
    /// `Ok(Located)` means the table was found but the firmware offers no
    /// mode switch (already in ACPI mode, or hardware-reduced). On
    /// `Err(EnableTimeout)` the table is still kept and the state is
    /// `Located`, so shutdown can still be tried.
    pub fn init<M, P, C>(&mut self, mem: &M, ports: &mut P, clock: &C) -> AcpiResult<PowerState>
    where
        M: PhysMemory + ?Sized,
        P: PortIo + ?Sized,
        C: Clock + ?Sized,
    {
        self.state = PowerState::Uninitialized;
        self.table = None;

        if !self.config.enabled {
            klog_info!("ACPI: disabled on the command line");
            return Err(AcpiError::Disabled);
        }

        let root = locate_root(mem)?;
        let table = find_table(mem, &root, FADT_SIGNATURE)
            .and_then(|fadt| PowerTable::from_table(&fadt))
            .inspect_err(|err| klog_warn!("ACPI: no usable FADT: {}", err))?;
        table.log();

        self.table = Some(table);
        self.state = PowerState::Located;

        if !table.supports_mode_enable() {
            klog_info!("ACPI: SMI_CMD, ACPI_ENABLE or PM1a_EVT_BLK is zero, not switching modes");
            return Ok(self.state);
        }
        self.enable_mode(&table, ports, clock)
    }

    fn enable_mode<P, C>(&mut self, table: &PowerTable, ports: &mut P, clock: &C) -> AcpiResult<PowerState>
    where
        P: PortIo + ?Sized,
        C: Clock + ?Sized,
    {
        let (Some(smi_cmd), Some(pm1a_evt)) = (table.smi_command_port(), table.pm1a_event_port())
        else {
            return Ok(self.state);
        };

        klog_info!(
            "ACPI: enabling ACPI mode (SMI_CMD {:#x} <- {:#x})",
            smi_cmd,
            table.acpi_enable
        );
        ports.write_u8(smi_cmd, table.acpi_enable);

        for poll in 0..self.config.enable_polls {
            if ports.read_u16(pm1a_evt) & PM1_EVT_ACPI_MODE != 0 {
                klog_info!("ACPI: mode enabled after {} polls", poll + 1);
                self.state = PowerState::Enabled;
                return Ok(self.state);
            }
            delay_ticks(clock, self.config.poll_delay_ticks);
        }

        klog_warn!(
            "ACPI: mode not confirmed after {} polls, PM1a_EVT {:#x} reads {:#x}",
            self.config.enable_polls,
            pm1a_evt,
            ports.read_u16(pm1a_evt)
        );
        Err(AcpiError::EnableTimeout)
    }

    /// Enter S5. Only returns when the attempt could not be made.
    pub fn power_off<P: PowerPlatform + ?Sized>(&mut self, hw: &mut P) -> AcpiResult<Infallible> {
        let Some(table) = self.table else {
            klog_warn!("ACPI: shutdown requested before initialization");
            return Err(AcpiError::NotInitialized);
        };
        let Some(pm1a_cnt) = table.pm1a_control_port() else {
            klog_error!("ACPI: PM1a_CNT_BLK is not provided, cannot power off");
            self.state = PowerState::ShutdownFailed;
            return Err(AcpiError::UnsupportedConfiguration);
        };

        if let Some(pm1a_evt) = table.pm1a_event_port() {
            if hw.read_u16(pm1a_evt) & PM1_EVT_ACPI_MODE == 0 {
                klog_warn!("ACPI: ACPI mode not reported enabled, trying soft-off anyway");
            }
        }

        let value = soft_off_value(self.config.slp_typ);
        let pm1b_cnt = table.pm1b_control_port().filter(|&port| port != pm1a_cnt);
        klog_info!("ACPI: writing {:#x} to PM1a_CNT {:#x}", value, pm1a_cnt);
        if let Some(port) = pm1b_cnt {
            klog_info!("ACPI: writing {:#x} to PM1b_CNT {:#x}", value, port);
        }

        self.state = PowerState::HaltRequested;
        hw.disable_interrupts();
        hw.write_u16(pm1a_cnt, value);
        if let Some(port) = pm1b_cnt {
            hw.write_u16(port, value);
        }
        hw.halt_forever()
    }

    /// Reset the machine through the FADT reset register when it is usable,
    /// falling back to the keyboard controller.
    pub fn reboot<P: PowerPlatform + ?Sized>(&mut self, hw: &mut P) -> ! {
        let reset = self
            .table
            .as_ref()
            .filter(|_| self.config.reset_register)
            .and_then(PowerTable::reset_port);

        hw.disable_interrupts();
        if let Some((port, value)) = reset {
            klog_info!("ACPI: writing {:#x} to reset register {:#x}", value, port);
            hw.write_u8(port, value);
        }

        klog_info!("ACPI: rebooting via keyboard controller");
        for _ in 0..KBC_DRAIN_SPINS {
            if hw.read_u8(PS2_STATUS.number()) & PS2_STATUS_INPUT_FULL == 0 {
                break;
            }
        }
        hw.write_u8(PS2_COMMAND.number(), PS2_CMD_PULSE_RESET);
        hw.halt_forever()
    }
}

static POWER: Mutex<PowerController> = Mutex::new(PowerController::new(AcpiConfig::DEFAULT));

/// Initialise the process-wide controller with options from `cmdline`.
///
/// # Safety
///
/// Physical memory below `phys_limit` must be mapped at `phys + phys_offset`
/// as described for [`OffsetMapped::new`](crate::memory::OffsetMapped::new),
/// and the caller must be allowed to perform port I/O.
#[cfg(target_arch = "x86_64")]
pub unsafe fn power_init(
    phys_offset: u64,
    phys_limit: u64,
    cmdline: Option<&str>,
) -> AcpiResult<PowerState> {
    use bootcore_lib::clock::TscClock;
    use bootcore_lib::io::HardwarePorts;

    let mem = unsafe { crate::memory::OffsetMapped::new(phys_offset, phys_limit) };
    let mut ports = unsafe { HardwarePorts::new() };
    let mut controller = POWER.lock();
    *controller = PowerController::new(crate::config::config_from_cmdline(cmdline));
    controller.init(&mem, &mut ports, &TscClock)
}

/// Power off through the process-wide controller.
#[cfg(target_arch = "x86_64")]
pub fn power_off() -> AcpiResult<Infallible> {
    // SAFETY: ports are only touched once `power_init` has stored a table,
    // and its contract covers port access.
    let mut hw = unsafe { HardwarePlatform::new() };
    POWER.lock().power_off(&mut hw)
}

/// Reboot through the process-wide controller.
#[cfg(target_arch = "x86_64")]
pub fn reboot() -> ! {
    // SAFETY: reboot is a ring-0 request; the keyboard controller port is
    // always present on PC-compatible machines.
    let mut hw = unsafe { HardwarePlatform::new() };
    POWER.lock().reboot(&mut hw)
}

pub fn power_state() -> PowerState {
    POWER.lock().state()
}
