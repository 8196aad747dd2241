//! Growable, ordered, owning container backed by an [`Arena`].
//!
//! `Sequence<T>` is the dynamic array the rest of the system builds on (the
//! console input line, for instance). It behaves like a small `Vec` with two
//! differences that follow from the arena:
//!
//! - Growth allocates a fresh buffer, moves the elements over and abandons the
//!   old buffer. Nothing is ever returned to the arena.
//! - Growth can fail. [`Sequence::append`] then leaves the sequence exactly as
//!   it was and reports [`MmError`]; callers must not assume an append lands.
//!
//! Capacity grows to `max(10, capacity * 2)` when full. `reserve` and `resize`
//! grow to exactly the requested count.
//!
//! Indexing goes through the slice `Deref` and is bounds-checked. The
//! unchecked path is [`Sequence::get_unchecked`].

use core::alloc::Layout;
use core::fmt;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};
use core::ptr::{self, NonNull};

use bootcore_lib::klog_trace;

use crate::arena::Arena;
use crate::boot_arena;
use crate::error::{MmError, MmResult};

/// Capacity of the first buffer a sequence allocates on its own.
pub const MIN_GROWTH_CAPACITY: usize = 10;

pub struct Sequence<'a, T> {
    /// Dangling while `capacity == 0`.
    ptr: NonNull<T>,
    len: usize,
    capacity: usize,
    arena: &'a Arena<'a>,
    _owns: PhantomData<T>,
}

// SAFETY: a sequence owns its elements exactly like `Vec<T>`; the arena it
// borrows is `Sync`.
unsafe impl<T: Send> Send for Sequence<'_, T> {}
unsafe impl<T: Sync> Sync for Sequence<'_, T> {}

fn grown_capacity(capacity: usize) -> MmResult<usize> {
    capacity
        .checked_mul(2)
        .map(|doubled| doubled.max(MIN_GROWTH_CAPACITY))
        .ok_or(MmError::CapacityOverflow)
}

impl<'a, T> Sequence<'a, T> {
    /// Empty sequence with no buffer. Does not touch the arena.
    pub const fn new_in(arena: &'a Arena<'a>) -> Self {
        Self {
            ptr: NonNull::dangling(),
            len: 0,
            capacity: 0,
            arena,
            _owns: PhantomData,
        }
    }

    pub fn with_capacity_in(capacity: usize, arena: &'a Arena<'a>) -> MmResult<Self> {
        let mut seq = Self::new_in(arena);
        seq.reserve(capacity)?;
        Ok(seq)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether this sequence currently owns a buffer.
    #[inline]
    pub fn has_buffer(&self) -> bool {
        self.capacity != 0
    }

    pub fn arena(&self) -> &'a Arena<'a> {
        self.arena
    }

    /// Move the elements into a new buffer of `new_capacity` slots.
    ///
    /// On failure nothing changes. On success the old buffer is abandoned.
    fn relocate(&mut self, new_capacity: usize) -> MmResult<()> {
        debug_assert!(new_capacity >= self.len);
        let layout = Layout::array::<T>(new_capacity).map_err(|_| MmError::CapacityOverflow)?;
        let fresh = self.arena.allocate_layout(layout)?.cast::<T>();

        // SAFETY: `fresh` holds at least `new_capacity >= len` slots and was
        // just carved from the arena, so it cannot overlap the old buffer.
        // After the bitwise move the old slots are treated as uninitialised
        // and never dropped.
        unsafe {
            ptr::copy_nonoverlapping(self.ptr.as_ptr(), fresh.as_ptr(), self.len);
        }
        if self.has_buffer() {
            self.arena.free(self.ptr.cast());
        }

        klog_trace!(
            "sequence: relocated {} elements, capacity {} -> {}",
            self.len,
            self.capacity,
            new_capacity
        );
        self.ptr = fresh;
        self.capacity = new_capacity;
        Ok(())
    }

    /// Make room for at least `capacity` elements in total.
    pub fn reserve(&mut self, capacity: usize) -> MmResult<()> {
        if capacity > self.capacity {
            self.relocate(capacity)?;
        }
        Ok(())
    }

    /// Append `value` at the end, growing the buffer if it is full.
    ///
    /// If growth fails, `value` is dropped and the sequence is unchanged.
    pub fn append(&mut self, value: T) -> MmResult<()> {
        if self.len == self.capacity {
            self.relocate(grown_capacity(self.capacity)?)?;
        }
        // SAFETY: len < capacity after the check above.
        unsafe { self.ptr.as_ptr().add(self.len).write(value) };
        self.len += 1;
        Ok(())
    }

    /// Remove and return the last element, or `None` if empty.
    pub fn remove_last(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // SAFETY: slot `len` was initialised and is now outside the live range.
        Some(unsafe { self.ptr.as_ptr().add(self.len).read() })
    }

    /// Drop elements past `len`. Does nothing if `len >= self.len()`.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }
        let tail = ptr::slice_from_raw_parts_mut(
            // SAFETY: len < self.len <= capacity.
            unsafe { self.ptr.as_ptr().add(len) },
            self.len - len,
        );
        // Shrink first so a panicking destructor cannot cause a double drop.
        self.len = len;
        // SAFETY: the tail slots were initialised and are no longer reachable.
        unsafe { ptr::drop_in_place(tail) };
    }

    /// Drop every element. The buffer is kept.
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Change the length to `new_len`, cloning `fill` into new trailing slots
    /// or dropping surplus ones.
    pub fn resize(&mut self, new_len: usize, fill: T) -> MmResult<()>
    where
        T: Clone,
    {
        self.resize_with(new_len, || fill.clone())
    }

    /// Like [`resize`](Self::resize) but fills with `T::default()`.
    pub fn resize_default(&mut self, new_len: usize) -> MmResult<()>
    where
        T: Default,
    {
        self.resize_with(new_len, T::default)
    }

    fn resize_with<F: FnMut() -> T>(&mut self, new_len: usize, mut fill: F) -> MmResult<()> {
        if new_len <= self.len {
            self.truncate(new_len);
            return Ok(());
        }
        self.reserve(new_len)?;
        while self.len < new_len {
            // SAFETY: reserve guaranteed capacity >= new_len.
            unsafe { self.ptr.as_ptr().add(self.len).write(fill()) };
            self.len += 1;
        }
        Ok(())
    }

    /// Clone every element of `items` onto the end.
    ///
    /// Capacity is secured up front, so either all of `items` is appended or
    /// none of it is.
    pub fn extend_from_slice(&mut self, items: &[T]) -> MmResult<()>
    where
        T: Clone,
    {
        let needed = self
            .len
            .checked_add(items.len())
            .ok_or(MmError::CapacityOverflow)?;
        if needed > self.capacity {
            self.relocate(needed.max(grown_capacity(self.capacity)?))?;
        }
        for item in items {
            // SAFETY: capacity >= needed.
            unsafe { self.ptr.as_ptr().add(self.len).write(item.clone()) };
            self.len += 1;
        }
        Ok(())
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: [0, len) is initialised; a dangling pointer is valid for
        // an empty slice.
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: as above, and `&mut self` gives exclusive access.
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Element at `index` without a bounds check.
    ///
    /// # Safety
    ///
    /// `index` must be less than `len()`. Anything else is undefined behaviour.
    #[inline]
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        unsafe { &*self.ptr.as_ptr().add(index) }
    }

    /// # Safety
    ///
    /// Same contract as [`get_unchecked`](Self::get_unchecked).
    #[inline]
    pub unsafe fn get_unchecked_mut(&mut self, index: usize) -> &mut T {
        unsafe { &mut *self.ptr.as_ptr().add(index) }
    }

    /// Move the buffer and its elements out, leaving `self` empty with no
    /// buffer. The returned sequence is the only owner of the buffer.
    pub fn take(&mut self) -> Self {
        let taken = Self {
            ptr: self.ptr,
            len: self.len,
            capacity: self.capacity,
            arena: self.arena,
            _owns: PhantomData,
        };
        self.ptr = NonNull::dangling();
        self.len = 0;
        self.capacity = 0;
        taken
    }

    pub fn swap(&mut self, other: &mut Self) {
        core::mem::swap(self, other);
    }
}

impl<T> Sequence<'static, T> {
    /// Empty sequence in the process-wide boot arena.
    pub fn new() -> Self {
        Self::new_in(boot_arena::init())
    }

    pub fn with_capacity(capacity: usize) -> MmResult<Self> {
        Self::with_capacity_in(capacity, boot_arena::init())
    }
}

impl<T> Default for Sequence<'static, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Sequence<'_, T> {
    fn drop(&mut self) {
        self.clear();
        if self.has_buffer() {
            self.arena.free(self.ptr.cast());
        }
    }
}

impl<T: Clone> Clone for Sequence<'_, T> {
    /// Deep copy into freshly allocated storage of the same capacity.
    ///
    /// If the arena cannot supply the storage the copy is empty, never partial.
    fn clone(&self) -> Self {
        let mut copy = Self::new_in(self.arena);
        if !self.has_buffer() {
            return copy;
        }
        if copy.reserve(self.capacity).is_err() {
            return copy;
        }
        for item in self.as_slice() {
            // SAFETY: copy.capacity == self.capacity >= self.len.
            unsafe { copy.ptr.as_ptr().add(copy.len).write(item.clone()) };
            copy.len += 1;
        }
        copy
    }
}

impl<T> Deref for Sequence<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> DerefMut for Sequence<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<'s, T> IntoIterator for &'s Sequence<'_, T> {
    type Item = &'s T;
    type IntoIter = core::slice::Iter<'s, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for Sequence<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

impl<T: PartialEq> PartialEq<[T]> for Sequence<'_, T> {
    fn eq(&self, other: &[T]) -> bool {
        self.as_slice() == other
    }
}
