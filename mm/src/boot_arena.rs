//! The process-wide boot arena.
//!
//! One 1 MiB region lives in `.bss`. [`init`] wraps it in an [`Arena`] exactly
//! once and hands out the shared reference; every later call returns the
//! same arena. The arena is never torn down.
//!
//! Components take `&Arena` as a parameter rather than reaching for this
//! module, so they can be tested against a private region.

use core::cell::UnsafeCell;

use bootcore_lib::klog_info;
use spin::Once;

use crate::arena::Arena;

pub const BOOT_ARENA_SIZE: usize = 1024 * 1024;

#[repr(C, align(16))]
struct BootArenaStorage(UnsafeCell<[u8; BOOT_ARENA_SIZE]>);

// SAFETY: the storage is only ever borrowed once, inside `BOOT_ARENA.call_once`.
unsafe impl Sync for BootArenaStorage {}

static STORAGE: BootArenaStorage = BootArenaStorage(UnsafeCell::new([0; BOOT_ARENA_SIZE]));
static BOOT_ARENA: Once<Arena<'static>> = Once::new();

/// Initialise (first call) and return the boot arena.
pub fn init() -> &'static Arena<'static> {
    BOOT_ARENA.call_once(|| {
        // SAFETY: `call_once` runs this closure at most once, so this is the
        // only mutable borrow of the storage for the program's lifetime.
        let region = unsafe { &mut *STORAGE.0.get() };
        klog_info!("boot arena: {} KiB at {:p}", BOOT_ARENA_SIZE / 1024, region.as_ptr());
        Arena::new(region)
    })
}

/// The boot arena, if [`init`] has run.
pub fn get() -> Option<&'static Arena<'static>> {
    BOOT_ARENA.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ARENA_ALIGN;

    #[test]
    fn test_init_is_idempotent() {
        let first = init();
        let second = init();
        assert!(core::ptr::eq(first, second));
        assert!(get().is_some());
        assert_eq!(first.capacity(), BOOT_ARENA_SIZE);
    }

    #[test]
    fn test_boot_arena_allocates() {
        let arena = init();
        let p = arena.allocate(24).unwrap();
        assert_eq!(p.as_ptr() as usize % ARENA_ALIGN, 0);
        assert!(arena.used() >= 24);
    }
}
