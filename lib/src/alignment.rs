/// Align `value` up to a power-of-two `alignment`, or `None` if the result
/// does not fit. An alignment of zero leaves `value` unchanged.
#[inline(always)]
pub const fn checked_align_up_usize(value: usize, alignment: usize) -> Option<usize> {
    if alignment == 0 {
        return Some(value);
    }
    match value.checked_add(alignment - 1) {
        Some(adjusted) => Some(adjusted & !(alignment - 1)),
        None => None,
    }
}
