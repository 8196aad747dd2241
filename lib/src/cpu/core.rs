//! Primitive CPU instructions: hlt, pause, halt loop, timestamp counter.

/// Execute the HLT instruction, halting the CPU until the next interrupt.
#[cfg(target_arch = "x86_64")]
#[inline(always)]
pub fn hlt() {
    x86_64::instructions::hlt();
}

/// Spin-loop hint (PAUSE on x86).
#[inline(always)]
pub fn pause() {
    ::core::hint::spin_loop();
}

/// Halt forever in a loop. Does not return.
///
/// With interrupts disabled this parks the CPU for good.
#[cfg(target_arch = "x86_64")]
#[inline(always)]
pub fn halt_loop() -> ! {
    loop {
        hlt();
    }
}

/// Read the timestamp counter.
#[cfg(target_arch = "x86_64")]
#[inline(always)]
pub fn rdtsc() -> u64 {
    // SAFETY: RDTSC has no memory effects and is available on every x86_64 CPU.
    unsafe { ::core::arch::x86_64::_rdtsc() }
}
