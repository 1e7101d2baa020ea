//! 16-wide control-byte matcher. Both backends answer the same queries
//! with bit-identical masks, so everything above them is target-agnostic.

cfg_if::cfg_if! {
    if #[cfg(all(
        any(target_arch = "x86", target_arch = "x86_64"),
        target_feature = "sse2",
        not(miri),
    ))] {
        mod sse2;
        use sse2 as imp;
    } else {
        mod generic;
        use generic as imp;
    }
}

pub(crate) use self::imp::Group;

/// One bit per control byte in a group; bit `i` refers to byte `i`.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) struct BitMask(pub(crate) u16);

impl BitMask {
    #[inline(always)]
    pub(crate) fn any_bit_set(self) -> bool {
        self.0 != 0
    }

    #[inline(always)]
    pub(crate) fn lowest_set_bit(self) -> Option<usize> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0.trailing_zeros() as usize)
        }
    }
}

impl Iterator for BitMask {
    type Item = usize;

    #[inline(always)]
    fn next(&mut self) -> Option<usize> {
        let bit = self.lowest_set_bit()?;
        self.0 &= self.0 - 1;
        Some(bit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ctrl::{DELETED, EMPTY, SENTINEL};

    fn expected(bytes: &[i8; Group::WIDTH], pred: impl Fn(i8) -> bool) -> u16 {
        bytes
            .iter()
            .enumerate()
            .filter(|&(_, &b)| pred(b))
            .fold(0u16, |mask, (i, _)| mask | 1 << i)
    }

    fn samples() -> Vec<[i8; Group::WIDTH]> {
        vec![
            [EMPTY; Group::WIDTH],
            [DELETED; Group::WIDTH],
            [0, 1, 2, 3, 4, 5, 6, 7, 120, 121, 122, 123, 124, 125, 126, 127],
            [
                EMPTY, DELETED, SENTINEL, 0, 42, EMPTY, 42, DELETED, 127, SENTINEL, 1, EMPTY, 42,
                0, DELETED, 42,
            ],
            [42; Group::WIDTH],
        ]
    }

    #[test]
    fn match_tag() {
        for bytes in samples() {
            let group = unsafe { Group::load(bytes.as_ptr()) };
            for tag in [0i8, 1, 42, 127] {
                assert_eq!(group.match_tag(tag).0, expected(&bytes, |b| b == tag));
            }
        }
    }

    #[test]
    fn match_empty() {
        for bytes in samples() {
            let group = unsafe { Group::load(bytes.as_ptr()) };
            assert_eq!(group.match_empty().0, expected(&bytes, |b| b == EMPTY));
        }
    }

    #[test]
    fn match_empty_or_deleted_excludes_sentinel() {
        for bytes in samples() {
            let group = unsafe { Group::load(bytes.as_ptr()) };
            assert_eq!(
                group.match_empty_or_deleted().0,
                expected(&bytes, |b| b == EMPTY || b == DELETED)
            );
        }
    }

    #[test]
    fn match_full() {
        for bytes in samples() {
            let group = unsafe { Group::load(bytes.as_ptr()) };
            assert_eq!(group.match_full().0, expected(&bytes, |b| b >= 0));
        }
    }

    #[test]
    fn bitmask_iterates_ascending() {
        let bits: Vec<usize> = BitMask(0b1010_0000_0000_0101).collect();
        assert_eq!(bits, vec![0, 2, 13, 15]);
        assert_eq!(BitMask(0).lowest_set_bit(), None);
    }
}
