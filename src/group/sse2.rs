use crate::ctrl::{DELETED, EMPTY};
use crate::group::BitMask;

#[cfg(target_arch = "x86")]
use std::arch::x86;
#[cfg(target_arch = "x86_64")]
use std::arch::x86_64 as x86;

/// A 128-bit window of control bytes, scanned with one compare + movemask.
#[derive(Copy, Clone)]
pub(crate) struct Group(x86::__m128i);

impl Group {
    pub(crate) const WIDTH: usize = std::mem::size_of::<Self>();

    /// # Safety
    ///
    /// `ptr` must be valid for an unaligned 16-byte read.
    #[inline(always)]
    pub(crate) unsafe fn load(ptr: *const i8) -> Self {
        Group(x86::_mm_loadu_si128(ptr as *const x86::__m128i))
    }

    #[inline(always)]
    pub(crate) fn match_tag(self, tag: i8) -> BitMask {
        unsafe {
            let cmp = x86::_mm_cmpeq_epi8(self.0, x86::_mm_set1_epi8(tag));
            BitMask(x86::_mm_movemask_epi8(cmp) as u16)
        }
    }

    #[inline(always)]
    pub(crate) fn match_empty(self) -> BitMask {
        self.match_tag(EMPTY)
    }

    /// Matches `EMPTY` and `DELETED` but not `SENTINEL`, which shares the
    /// sign bit with them.
    #[inline(always)]
    pub(crate) fn match_empty_or_deleted(self) -> BitMask {
        unsafe {
            let empty = x86::_mm_cmpeq_epi8(self.0, x86::_mm_set1_epi8(EMPTY));
            let deleted = x86::_mm_cmpeq_epi8(self.0, x86::_mm_set1_epi8(DELETED));
            BitMask(x86::_mm_movemask_epi8(x86::_mm_or_si128(empty, deleted)) as u16)
        }
    }

    /// A byte is full iff its sign bit is clear.
    #[inline(always)]
    pub(crate) fn match_full(self) -> BitMask {
        unsafe { BitMask(!(x86::_mm_movemask_epi8(self.0) as u16)) }
    }
}
