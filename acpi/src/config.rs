//! ACPI options from the kernel command line.
//!
//! ```text
//! acpi=off                 skip ACPI entirely
//! acpi.enable_polls=<n>    status polls while waiting for ACPI mode
//! acpi.poll_delay=<ticks>  clock ticks between polls
//! acpi.slp_typ=<0..7>      S5 sleep type written on power-off
//! acpi.reset=off           never use the FADT reset register
//! ```
//!
//! Unknown keys and unparsable values are logged and ignored.

use bootcore_lib::cmdline::{options_with_prefix, parse_bool, parse_u64};
use bootcore_lib::klog_warn;

use crate::power::{DEFAULT_S5_SLP_TYP, SLP_TYP_MAX};

const DEFAULT_ENABLED: bool = true;
const DEFAULT_ENABLE_POLLS: u32 = 500_000;
const DEFAULT_POLL_DELAY_TICKS: u64 = 100;
const DEFAULT_RESET_REGISTER: bool = true;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AcpiConfig {
    pub enabled: bool,
    pub enable_polls: u32,
    pub poll_delay_ticks: u64,
    pub slp_typ: u8,
    pub reset_register: bool,
}

impl AcpiConfig {
    pub const DEFAULT: Self = Self {
        enabled: DEFAULT_ENABLED,
        enable_polls: DEFAULT_ENABLE_POLLS,
        poll_delay_ticks: DEFAULT_POLL_DELAY_TICKS,
        slp_typ: DEFAULT_S5_SLP_TYP,
        reset_register: DEFAULT_RESET_REGISTER,
    };
}

impl Default for AcpiConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

pub fn config_from_cmdline(cmdline: Option<&str>) -> AcpiConfig {
    let mut cfg = AcpiConfig::default();
    let Some(cmdline) = cmdline else {
        return cfg;
    };

    for (key, value) in options_with_prefix(cmdline, "acpi") {
        match key {
            "acpi" => match parse_bool(value) {
                Some(enabled) => cfg.enabled = enabled,
                None => klog_warn!("acpi: ignoring acpi={}", value),
            },
            "acpi.enable_polls" => match parse_u64(value).and_then(|n| u32::try_from(n).ok()) {
                Some(polls) => cfg.enable_polls = polls,
                None => klog_warn!("acpi: ignoring enable_polls={}", value),
            },
            "acpi.poll_delay" => match parse_u64(value) {
                Some(ticks) => cfg.poll_delay_ticks = ticks,
                None => klog_warn!("acpi: ignoring poll_delay={}", value),
            },
            "acpi.slp_typ" => match parse_u64(value) {
                Some(typ) if typ <= u64::from(SLP_TYP_MAX) => cfg.slp_typ = typ as u8,
                _ => klog_warn!("acpi: ignoring slp_typ={} (0..={})", value, SLP_TYP_MAX),
            },
            "acpi.reset" => match parse_bool(value) {
                Some(enabled) => cfg.reset_register = enabled,
                None => klog_warn!("acpi: ignoring reset={}", value),
            },
            k if k.starts_with("acpi.") => klog_warn!("acpi: unknown option {}", k),
            _ => {}
        }
    }

    cfg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_cmdline() {
        let cfg = config_from_cmdline(None);
        assert_eq!(cfg, AcpiConfig::DEFAULT);
        assert!(cfg.enabled);
        assert_eq!(cfg.enable_polls, 500_000);
        assert_eq!(cfg.slp_typ, 5);
    }

    #[test]
    fn test_all_options() {
        let cfg = config_from_cmdline(Some(
            "console=ttyS0 acpi=off acpi.enable_polls=0x40 acpi.poll_delay=7 acpi.slp_typ=0 acpi.reset=no",
        ));
        assert!(!cfg.enabled);
        assert_eq!(cfg.enable_polls, 64);
        assert_eq!(cfg.poll_delay_ticks, 7);
        assert_eq!(cfg.slp_typ, 0);
        assert!(!cfg.reset_register);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let cfg = config_from_cmdline(Some(
            "acpi=maybe acpi.slp_typ=8 acpi.enable_polls=99999999999 acpi.poll_delay=soon acpi.bogus=1",
        ));
        assert_eq!(cfg, AcpiConfig::default());
    }

    #[test]
    fn test_later_tokens_win() {
        let cfg = config_from_cmdline(Some("acpi=off acpi.slp_typ=7 acpi=on acpi.slp_typ=2"));
        assert!(cfg.enabled);
        assert_eq!(cfg.slp_typ, 2);
    }
}
