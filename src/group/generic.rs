use crate::ctrl::{DELETED, EMPTY};
use crate::group::BitMask;

/// Scalar fallback: a plain byte loop over the window, producing masks
/// bit-identical to the SSE2 backend.
#[derive(Copy, Clone)]
pub(crate) struct Group([i8; 16]);

impl Group {
    pub(crate) const WIDTH: usize = 16;

    /// # Safety
    ///
    /// `ptr` must be valid for an unaligned 16-byte read.
    #[inline(always)]
    pub(crate) unsafe fn load(ptr: *const i8) -> Self {
        Group(std::ptr::read_unaligned(ptr as *const [i8; 16]))
    }

    #[inline(always)]
    fn mask_of(self, pred: impl Fn(i8) -> bool) -> BitMask {
        let mut mask = 0u16;
        for (i, &byte) in self.0.iter().enumerate() {
            if pred(byte) {
                mask |= 1 << i;
            }
        }
        BitMask(mask)
    }

    #[inline(always)]
    pub(crate) fn match_tag(self, tag: i8) -> BitMask {
        self.mask_of(|byte| byte == tag)
    }

    #[inline(always)]
    pub(crate) fn match_empty(self) -> BitMask {
        self.mask_of(|byte| byte == EMPTY)
    }

    #[inline(always)]
    pub(crate) fn match_empty_or_deleted(self) -> BitMask {
        self.mask_of(|byte| byte == EMPTY || byte == DELETED)
    }

    #[inline(always)]
    pub(crate) fn match_full(self) -> BitMask {
        self.mask_of(|byte| byte >= 0)
    }
}
