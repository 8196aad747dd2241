//! x86 port I/O.
//!
//! [`Port`] is a typed handle to a fixed port number, used for the handful of
//! ports the kernel knows at compile time (COM1, the keyboard controller).
//! Ports discovered at runtime from firmware tables go through the
//! [`PortIo`] trait instead, so the code that drives them can be exercised
//! against a recording mock.

use core::marker::PhantomData;

#[cfg(target_arch = "x86_64")]
use x86_64::instructions::port::{Port as RawPort, PortRead, PortWrite};

/// Typed handle to an I/O port of width `T` (`u8`, `u16` or `u32`).
#[derive(Debug)]
pub struct Port<T> {
    port: u16,
    _width: PhantomData<T>,
}

impl<T> Clone for Port<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Port<T> {}

impl<T> Port<T> {
    pub const fn new(port: u16) -> Self {
        Self {
            port,
            _width: PhantomData,
        }
    }

    /// Port at `self + offset`, e.g. a UART register relative to its base.
    pub const fn offset(self, offset: u16) -> Self {
        Self::new(self.port.wrapping_add(offset))
    }

    pub const fn number(self) -> u16 {
        self.port
    }
}

#[cfg(target_arch = "x86_64")]
impl<T: PortRead> Port<T> {
    /// # Safety
    ///
    /// Reading a port can have device side effects; the caller must know what
    /// lives behind it.
    #[inline(always)]
    pub unsafe fn read(self) -> T {
        unsafe { RawPort::<T>::new(self.port).read() }
    }
}

#[cfg(target_arch = "x86_64")]
impl<T: PortWrite> Port<T> {
    /// # Safety
    ///
    /// Writing a port can reprogram or power down hardware.
    #[inline(always)]
    pub unsafe fn write(self, value: T) {
        unsafe { RawPort::<T>::new(self.port).write(value) }
    }
}

/// Port I/O capability for ports only known at runtime.
pub trait PortIo {
    fn read_u8(&mut self, port: u16) -> u8;
    fn write_u8(&mut self, port: u16, value: u8);
    fn read_u16(&mut self, port: u16) -> u16;
    fn write_u16(&mut self, port: u16, value: u16);
    fn read_u32(&mut self, port: u16) -> u32;
    fn write_u32(&mut self, port: u16, value: u32);
}

/// [`PortIo`] backed by the real `in`/`out` instructions.
#[cfg(target_arch = "x86_64")]
pub struct HardwarePorts {
    _private: (),
}

#[cfg(target_arch = "x86_64")]
impl HardwarePorts {
    /// # Safety
    ///
    /// The caller must be running at an I/O privilege level that permits port
    /// access, and must only hand this to code that addresses real devices.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

#[cfg(target_arch = "x86_64")]
impl PortIo for HardwarePorts {
    fn read_u8(&mut self, port: u16) -> u8 {
        unsafe { Port::<u8>::new(port).read() }
    }

    fn write_u8(&mut self, port: u16, value: u8) {
        unsafe { Port::<u8>::new(port).write(value) }
    }

    fn read_u16(&mut self, port: u16) -> u16 {
        unsafe { Port::<u16>::new(port).read() }
    }

    fn write_u16(&mut self, port: u16, value: u16) {
        unsafe { Port::<u16>::new(port).write(value) }
    }

    fn read_u32(&mut self, port: u16) -> u32 {
        unsafe { Port::<u32>::new(port).read() }
    }

    fn write_u32(&mut self, port: u16, value: u32) {
        unsafe { Port::<u32>::new(port).write(value) }
    }
}
