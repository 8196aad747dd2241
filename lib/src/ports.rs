use crate::io::Port;

pub const COM1: Port<u8> = Port::new(0x3F8);

pub const PS2_STATUS: Port<u8> = Port::new(0x64);
pub const PS2_COMMAND: Port<u8> = Port::new(0x64);

/// Status bit: the controller has not consumed the last command yet.
pub const PS2_STATUS_INPUT_FULL: u8 = 0x02;

/// Keyboard-controller command that pulses the CPU reset line.
pub const PS2_CMD_PULSE_RESET: u8 = 0xFE;

pub const UART_REG_THR: u16 = 0;
pub const UART_REG_LSR: u16 = 5;

pub const UART_LSR_TX_EMPTY: u8 = 0x20;

// ---------------------------------------------------------------------------
// Low-level serial output
// ---------------------------------------------------------------------------
//
// Only the early klog backend uses these. They take no lock; callers
// serialise access themselves.

/// Write one byte to a UART, polling the Line Status Register until the
/// transmit holding register is empty.
///
/// # Safety
///
/// Port I/O. `base` must refer to an initialised 8250/16550-compatible UART.
#[cfg(target_arch = "x86_64")]
#[inline(always)]
pub unsafe fn serial_putc(base: Port<u8>, byte: u8) {
    let lsr = base.offset(UART_REG_LSR);
    let thr = base.offset(UART_REG_THR);
    unsafe {
        while (lsr.read() & UART_LSR_TX_EMPTY) == 0 {
            core::hint::spin_loop();
        }
        thr.write(byte);
    }
}

/// Write a byte slice to a UART, converting lone `\n` into `\r\n`.
///
/// # Safety
///
/// Same requirements as [`serial_putc`].
#[cfg(target_arch = "x86_64")]
#[inline]
pub unsafe fn serial_write_bytes(base: Port<u8>, bytes: &[u8]) {
    for &b in bytes {
        if b == b'\n' {
            unsafe { serial_putc(base, b'\r') };
        }
        unsafe { serial_putc(base, b) };
    }
}
