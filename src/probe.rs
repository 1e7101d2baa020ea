use crate::group::Group;

/// Triangular-stride group probing. For a power-of-two bucket count the
/// stride sequence 16, 32, 48, ... visits every group exactly once before
/// repeating, so probing never loops while an empty byte exists.
pub(crate) struct ProbeSeq {
    pub(crate) pos: usize,
    stride: usize,
}

impl ProbeSeq {
    #[inline(always)]
    pub(crate) fn new(h1: usize, bucket_mask: usize) -> Self {
        ProbeSeq {
            pos: h1 & bucket_mask,
            stride: 0,
        }
    }

    #[inline(always)]
    pub(crate) fn move_next(&mut self, bucket_mask: usize) {
        self.stride += Group::WIDTH;
        self.pos = (self.pos + self.stride) & bucket_mask;
    }
}
