//! Monotonic tick source.
//!
//! Code that waits on hardware takes a [`Clock`] instead of spinning a fixed
//! number of loop iterations, so a test can drive time forward
//! deterministically. Ticks have no fixed unit; on hardware they are TSC
//! cycles, so a delay expressed in ticks still scales with CPU speed.

/// A monotonically non-decreasing tick counter.
pub trait Clock {
    fn now(&self) -> u64;

    /// Called once per iteration while busy-waiting.
    #[inline]
    fn relax(&self) {
        core::hint::spin_loop();
    }
}

/// Busy-wait until `ticks` have elapsed on `clock`.
pub fn delay_ticks<C: Clock + ?Sized>(clock: &C, ticks: u64) {
    let start = clock.now();
    while clock.now().wrapping_sub(start) < ticks {
        clock.relax();
    }
}

/// [`Clock`] backed by the CPU timestamp counter.
#[cfg(target_arch = "x86_64")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TscClock;

#[cfg(target_arch = "x86_64")]
impl Clock for TscClock {
    #[inline]
    fn now(&self) -> u64 {
        crate::cpu::rdtsc()
    }

    #[inline]
    fn relax(&self) {
        crate::cpu::pause();
    }
}
