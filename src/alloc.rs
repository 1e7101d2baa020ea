use std::alloc::Layout;
use std::ptr::NonNull;

/// Memory capability injected into the table. One block is allocated per
/// table and freed with exactly the layout it was allocated with; there
/// is no partial free and no retry on failure.
pub trait Allocator: Clone {
    /// Allocates a block for `layout`. Failure is fatal: implementations
    /// abort via [`std::alloc::handle_alloc_error`] rather than return.
    fn allocate(&self, layout: Layout) -> NonNull<u8>;

    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` on an equal allocator
    /// with the same `layout`, and must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

    /// Whether blocks from `other` may be freed through `self`.
    fn equals(&self, other: &Self) -> bool;
}

/// The process-wide default allocator.
#[derive(Copy, Clone, Default, Debug)]
pub struct Global;

impl Allocator for Global {
    #[inline]
    fn allocate(&self, layout: Layout) -> NonNull<u8> {
        match NonNull::new(unsafe { std::alloc::alloc(layout) }) {
            Some(ptr) => ptr,
            None => std::alloc::handle_alloc_error(layout),
        }
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        std::alloc::dealloc(ptr.as_ptr(), layout);
    }

    #[inline]
    fn equals(&self, _: &Self) -> bool {
        true
    }
}

/// Bump allocation out of a [`bumpalo::Bump`]. Deallocation is a no-op;
/// the arena reclaims everything at once when it drops. Useful for
/// short-lived tables built in batches.
#[derive(Copy, Clone)]
pub struct Arena<'a>(pub &'a bumpalo::Bump);

impl<'a> Allocator for Arena<'a> {
    #[inline]
    fn allocate(&self, layout: Layout) -> NonNull<u8> {
        self.0.alloc_layout(layout)
    }

    #[inline]
    unsafe fn deallocate(&self, _: NonNull<u8>, _: Layout) {}

    #[inline]
    fn equals(&self, other: &Self) -> bool {
        std::ptr::eq(self.0, other.0)
    }
}
