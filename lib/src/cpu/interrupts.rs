//! Interrupt flag management.

#[cfg(target_arch = "x86_64")]
use x86_64::instructions::interrupts;

/// Disable interrupts (CLI).
#[cfg(target_arch = "x86_64")]
#[inline(always)]
pub fn disable_interrupts() {
    interrupts::disable();
}
