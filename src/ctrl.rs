//! Control-byte encoding. One signed byte per bucket: non-negative bytes
//! carry the 7-bit hash tag of a live entry, negative bytes encode the
//! special states below. A "has high bit" test therefore separates full
//! buckets from everything else in a single SIMD movemask.

/// Slot has never held a value since the last reset.
pub(crate) const EMPTY: i8 = -1;

/// Logical end of the control array; terminates iteration, never probed.
pub(crate) const SENTINEL: i8 = -2;

/// Tombstone: the slot held a value and probe chains must run through it.
pub(crate) const DELETED: i8 = -128;

#[inline(always)]
pub(crate) fn is_full(ctrl: i8) -> bool {
    ctrl >= 0
}

/// Probe start selector: everything above the tag bits.
#[inline(always)]
pub(crate) fn h1(hash: u64) -> usize {
    (hash >> 7) as usize
}

/// The 7-bit tag stored in the control byte. Never sets the sign bit, so
/// it cannot collide with `EMPTY`, `SENTINEL` or `DELETED`.
#[inline(always)]
pub(crate) fn h2(hash: u64) -> i8 {
    (hash & 0x7f) as i8
}
