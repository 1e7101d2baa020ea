use crate::alloc::{Allocator, Global};
use crate::ctrl::{self, DELETED, EMPTY, SENTINEL};
use crate::group::{BitMask, Group};
use crate::probe::ProbeSeq;
use static_assertions::const_assert;
use std::alloc::Layout;
use std::marker::PhantomData;
use std::mem;
use std::ptr::{self, NonNull};

const_assert!(Group::WIDTH == 16);
const_assert!(((EMPTY as u8) & 0x80) == 0x80);
const_assert!(((DELETED as u8) & 0x80) == 0x80);
const_assert!(((SENTINEL as u8) & 0x80) == 0x80);

const MIN_BUCKETS: usize = Group::WIDTH;

/// Smallest power-of-two bucket count that holds `n` entries under the
/// 80% load-factor ceiling. The slack is a quarter of `n`, expressed as
/// a shift; the extra one compensates the flooring so that
/// `full_capacity(capacity_for(n)) >= n` always holds.
pub(crate) fn capacity_for(n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    ((n + (n >> 2) + 1).next_power_of_two()).max(MIN_BUCKETS)
}

/// How many entries a table with `buckets` slots admits before growing.
#[inline(always)]
fn full_capacity(buckets: usize) -> usize {
    buckets - buckets / 5
}

/// Block layout: `buckets + 16` control bytes, then the bucket array at
/// an alignment-padded offset. One allocation, one free.
fn table_layout<T>(buckets: usize) -> (Layout, usize) {
    let align = mem::align_of::<T>().max(Group::WIDTH);
    let header = Layout::from_size_align(buckets + Group::WIDTH, align).unwrap();
    let (layout, data_offset) = header.extend(Layout::array::<T>(buckets).unwrap()).unwrap();
    (layout, data_offset)
}

/// Open-addressing table over a single owned block of control bytes and
/// value buckets. Hashing and equality are injected per call; the table
/// itself only sees `T` and the 64-bit hashes.
pub(crate) struct RawTable<T, A: Allocator = Global> {
    // Null iff `buckets == 0`; points at the control array, which is
    // followed by the bucket array inside the same block.
    ctrl: *mut i8,
    // 0 or a power of two >= MIN_BUCKETS.
    buckets: usize,
    len: usize,
    // Remaining EMPTY -> FULL transitions before the next rehash.
    growth_left: usize,
    alloc: A,
    _marker: PhantomData<T>,
}

impl<T, A: Allocator> RawTable<T, A> {
    pub(crate) fn new_in(alloc: A) -> Self {
        Self {
            ctrl: ptr::null_mut(),
            buckets: 0,
            len: 0,
            growth_left: 0,
            alloc,
            _marker: PhantomData,
        }
    }

    pub(crate) fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        let mut table = Self::new_in(alloc);
        if capacity > 0 {
            table.allocate(capacity_for(capacity));
        }
        table
    }

    #[inline(always)]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub(crate) fn buckets(&self) -> usize {
        self.buckets
    }

    /// Entries the table can hold before the next growth.
    #[inline(always)]
    pub(crate) fn capacity(&self) -> usize {
        self.len + self.growth_left
    }

    #[inline(always)]
    pub(crate) fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Fraction of buckets that are not `EMPTY`.
    pub(crate) fn load_factor(&self) -> f64 {
        if self.buckets == 0 {
            return 0.0;
        }
        let occupied = full_capacity(self.buckets) - self.growth_left;
        occupied as f64 / self.buckets as f64
    }

    #[inline(always)]
    fn bucket_mask(&self) -> usize {
        self.buckets - 1
    }

    #[inline(always)]
    unsafe fn data_ptr(&self) -> *mut T {
        debug_assert!(self.buckets != 0);
        let (_, data_offset) = table_layout::<T>(self.buckets);
        (self.ctrl as *mut u8).add(data_offset) as *mut T
    }

    /// # Safety
    ///
    /// The table must be allocated and `index < self.buckets()`.
    #[inline(always)]
    pub(crate) unsafe fn bucket(&self, index: usize) -> *mut T {
        debug_assert!(index < self.buckets);
        self.data_ptr().add(index)
    }

    fn allocate(&mut self, buckets: usize) {
        debug_assert!(self.buckets == 0 && self.len == 0);
        debug_assert!(buckets.is_power_of_two() && buckets >= MIN_BUCKETS);
        let (layout, _) = table_layout::<T>(buckets);
        self.ctrl = self.alloc.allocate(layout).as_ptr() as *mut i8;
        self.buckets = buckets;
        self.growth_left = full_capacity(buckets);
        unsafe { self.reset_ctrl() };
    }

    /// Marks every bucket `EMPTY` and restores the sentinel at the end of
    /// the control array.
    unsafe fn reset_ctrl(&mut self) {
        ptr::write_bytes(self.ctrl, EMPTY as u8, self.buckets + Group::WIDTH);
        *self.ctrl.add(self.buckets) = SENTINEL;
    }

    /// Writes a control byte and returns the previous one. Bytes of the
    /// leading window are replicated past the sentinel so that wrapped
    /// group loads stay coherent; slot 0 is shadowed there by the
    /// sentinel and is only reachable through the unwrapped window at
    /// offset 0, for insertion and lookup alike.
    #[inline(always)]
    unsafe fn set_ctrl(&mut self, index: usize, byte: i8) -> i8 {
        debug_assert!(index < self.buckets);
        let prev = *self.ctrl.add(index);
        *self.ctrl.add(index) = byte;
        if index.wrapping_sub(1) < Group::WIDTH - 1 {
            *self.ctrl.add(self.buckets + index) = byte;
        }
        prev
    }

    /// Tombstones a slot, or demotes it straight to `EMPTY` when the next
    /// control byte is already `EMPTY` and no fully-occupied probe window
    /// spans the slot. Keeping empty runs long shortens future probe
    /// chains without a rehash.
    unsafe fn set_deleted(&mut self, index: usize) {
        let next = *self.ctrl.add((index + 1) & self.bucket_mask());
        if next == EMPTY && !self.full_window_spans(index) {
            self.set_ctrl(index, EMPTY);
            self.growth_left += 1;
        } else {
            self.set_ctrl(index, DELETED);
        }
    }

    /// Whether some 16-byte probe window containing `index` has no empty
    /// byte. Such a window lets chains run through the slot, so the slot
    /// must stay a tombstone. Uses the same physical loads as probing, so
    /// the answer is exactly as conservative as the probe loop itself.
    unsafe fn full_window_spans(&self, index: usize) -> bool {
        let before = index.wrapping_sub(Group::WIDTH) & self.bucket_mask();
        let empty_before = Group::load(self.ctrl.add(before)).match_empty();
        let empty_after = Group::load(self.ctrl.add(index)).match_empty();
        empty_before.0.leading_zeros() + empty_after.0.trailing_zeros() >= Group::WIDTH as u32
    }

    /// Bucket of the live entry matching `hash` and `eq`, if any.
    #[inline]
    pub(crate) fn find(&self, hash: u64, mut eq: impl FnMut(&T) -> bool) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        let mask = self.bucket_mask();
        let tag = ctrl::h2(hash);
        let mut seq = ProbeSeq::new(ctrl::h1(hash), mask);
        unsafe {
            loop {
                let group = Group::load(self.ctrl.add(seq.pos));
                for bit in group.match_tag(tag) {
                    let index = (seq.pos + bit) & mask;
                    if eq(&*self.bucket(index)) {
                        return Some(index);
                    }
                }
                // An empty byte proves the key is absent: insertion would
                // have used it. Tombstones keep the chain going.
                if group.match_empty().any_bit_set() {
                    return None;
                }
                seq.move_next(mask);
            }
        }
    }

    #[inline]
    pub(crate) fn get(&self, hash: u64, eq: impl FnMut(&T) -> bool) -> Option<&T> {
        let index = self.find(hash, eq)?;
        Some(unsafe { &*self.bucket(index) })
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, hash: u64, eq: impl FnMut(&T) -> bool) -> Option<&mut T> {
        let index = self.find(hash, eq)?;
        Some(unsafe { &mut *self.bucket(index) })
    }

    /// Probes for `hash`, returning the matching bucket (`Ok`) or the
    /// slot a new entry should go into (`Err`). Room for one more entry
    /// is ensured up front, so the returned slot is always usable and the
    /// probe loop always terminates on an empty byte.
    #[inline]
    pub(crate) fn find_or_find_insert_slot(
        &mut self,
        hash: u64,
        mut eq: impl FnMut(&T) -> bool,
        hasher: impl Fn(&T) -> u64,
    ) -> Result<usize, usize> {
        self.reserve(1, hasher);
        let mask = self.bucket_mask();
        let tag = ctrl::h2(hash);
        let mut seq = ProbeSeq::new(ctrl::h1(hash), mask);
        let mut insert_slot = None;
        unsafe {
            loop {
                let group = Group::load(self.ctrl.add(seq.pos));
                for bit in group.match_tag(tag) {
                    let index = (seq.pos + bit) & mask;
                    if eq(&*self.bucket(index)) {
                        return Ok(index);
                    }
                }
                // Reusing the first tombstone on the chain bounds probe
                // chain growth under churn.
                if insert_slot.is_none() {
                    if let Some(bit) = group.match_empty_or_deleted().lowest_set_bit() {
                        insert_slot = Some((seq.pos + bit) & mask);
                    }
                }
                if group.match_empty().any_bit_set() {
                    return Err(insert_slot.unwrap());
                }
                seq.move_next(mask);
            }
        }
    }

    /// # Safety
    ///
    /// `slot` must come from `find_insert_slot` or the `Err` branch of
    /// `find_or_find_insert_slot` for this `hash`, with no intervening
    /// mutation.
    #[inline]
    pub(crate) unsafe fn insert_in_slot(&mut self, hash: u64, slot: usize, value: T) -> usize {
        let prev = self.set_ctrl(slot, ctrl::h2(hash));
        if prev == EMPTY {
            self.growth_left -= 1;
        }
        ptr::write(self.bucket(slot), value);
        self.len += 1;
        slot
    }

    /// First empty-or-deleted slot on the probe chain. No duplicate
    /// check; callers guarantee the key is absent.
    unsafe fn find_insert_slot(&self, hash: u64) -> usize {
        let mask = self.bucket_mask();
        let mut seq = ProbeSeq::new(ctrl::h1(hash), mask);
        loop {
            let group = Group::load(self.ctrl.add(seq.pos));
            if let Some(bit) = group.match_empty_or_deleted().lowest_set_bit() {
                return (seq.pos + bit) & mask;
            }
            seq.move_next(mask);
        }
    }

    /// Inserts without probing for a duplicate. Inserting a key that is
    /// already present corrupts the table; callers check the precondition
    /// (asserted in debug builds at the container layer).
    #[inline]
    pub(crate) fn insert_unique_unchecked(
        &mut self,
        hash: u64,
        value: T,
        hasher: impl Fn(&T) -> u64,
    ) -> usize {
        self.reserve(1, hasher);
        unsafe {
            let slot = self.find_insert_slot(hash);
            self.insert_in_slot(hash, slot, value)
        }
    }

    /// # Safety
    ///
    /// `index` must hold a live value.
    pub(crate) unsafe fn erase(&mut self, index: usize) -> T {
        debug_assert!(ctrl::is_full(*self.ctrl.add(index)));
        let item = ptr::read(self.bucket(index));
        self.set_deleted(index);
        self.len -= 1;
        item
    }

    pub(crate) fn remove(&mut self, hash: u64, eq: impl FnMut(&T) -> bool) -> Option<T> {
        let index = self.find(hash, eq)?;
        Some(unsafe { self.erase(index) })
    }

    pub(crate) fn retain(&mut self, mut keep: impl FnMut(&mut T) -> bool) {
        if self.len == 0 {
            return;
        }
        unsafe {
            let mut pos = 0;
            while pos < self.buckets {
                let group = Group::load(self.ctrl.add(pos));
                for bit in group.match_full() {
                    let index = pos + bit;
                    if !keep(&mut *self.bucket(index)) {
                        drop(self.erase(index));
                    }
                }
                pos += Group::WIDTH;
            }
        }
    }

    /// Ensures room for `additional` more entries, growing (or rehashing
    /// in place to shed tombstones) if needed.
    pub(crate) fn reserve(&mut self, additional: usize, hasher: impl Fn(&T) -> u64) {
        if additional > self.growth_left {
            let buckets = capacity_for(self.len + additional).max(self.buckets);
            self.resize(buckets, hasher);
        }
    }

    /// Rehashes into a table sized for `capacity` entries (never below
    /// the current length). Always reallocates, clearing all tombstones.
    pub(crate) fn rehash(&mut self, capacity: usize, hasher: impl Fn(&T) -> u64) {
        let buckets = capacity_for(capacity.max(self.len));
        if buckets == 0 {
            self.release();
        } else {
            self.resize(buckets, hasher);
        }
    }

    pub(crate) fn shrink_to_fit(&mut self, hasher: impl Fn(&T) -> u64) {
        if self.len == 0 {
            self.release();
        } else {
            let buckets = capacity_for(self.len);
            if buckets < self.buckets {
                self.resize(buckets, hasher);
            }
        }
    }

    /// Moves every live entry into a freshly allocated block of
    /// `new_buckets` slots and frees the old one. Each hash is recomputed
    /// from the live value; a debug assertion compares the recomputed tag
    /// with the stored control byte, catching keys whose hash changed
    /// after insertion.
    fn resize(&mut self, new_buckets: usize, hasher: impl Fn(&T) -> u64) {
        debug_assert!(full_capacity(new_buckets) >= self.len);
        let mut new = Self::new_in(self.alloc.clone());
        new.allocate(new_buckets);
        unsafe {
            if self.buckets != 0 {
                let mut pos = 0;
                while pos < self.buckets {
                    let group = Group::load(self.ctrl.add(pos));
                    for bit in group.match_full() {
                        let index = pos + bit;
                        let item = ptr::read(self.bucket(index));
                        let hash = hasher(&item);
                        debug_assert_eq!(
                            ctrl::h2(hash),
                            *self.ctrl.add(index),
                            "hash of a live key changed after insertion",
                        );
                        let slot = new.find_insert_slot(hash);
                        new.insert_in_slot(hash, slot, item);
                    }
                    pos += Group::WIDTH;
                }
                // Every value has been moved out; reset the old control
                // array so dropping the old table frees the block only.
                self.reset_ctrl();
                self.len = 0;
                self.growth_left = full_capacity(self.buckets);
            }
        }
        mem::swap(self, &mut new);
    }

    /// Drops all live values but keeps the allocation.
    pub(crate) fn clear(&mut self) {
        if self.buckets == 0 {
            return;
        }
        unsafe {
            self.drop_values();
            self.reset_ctrl();
        }
        self.len = 0;
        self.growth_left = full_capacity(self.buckets);
    }

    /// Drops all live values and frees the block.
    pub(crate) fn release(&mut self) {
        let empty = Self::new_in(self.alloc.clone());
        drop(mem::replace(self, empty));
    }

    unsafe fn drop_values(&mut self) {
        if mem::needs_drop::<T>() && self.len != 0 {
            let mut pos = 0;
            while pos < self.buckets {
                let group = Group::load(self.ctrl.add(pos));
                for bit in group.match_full() {
                    ptr::drop_in_place(self.bucket(pos + bit));
                }
                pos += Group::WIDTH;
            }
        }
    }

    /// Worst probe-chain length, in groups, over all live entries.
    /// Diagnostic only; walks every entry's chain.
    pub(crate) fn max_probe_dist(&self, hasher: impl Fn(&T) -> u64) -> usize {
        let mut worst = 0;
        if self.len == 0 {
            return worst;
        }
        let mask = self.bucket_mask();
        unsafe {
            let mut pos = 0;
            while pos < self.buckets {
                let group = Group::load(self.ctrl.add(pos));
                for bit in group.match_full() {
                    let index = pos + bit;
                    let hash = hasher(&*self.bucket(index));
                    let mut seq = ProbeSeq::new(ctrl::h1(hash), mask);
                    let mut dist = 0;
                    while (index.wrapping_sub(seq.pos) & mask) >= Group::WIDTH {
                        dist += 1;
                        seq.move_next(mask);
                    }
                    worst = worst.max(dist);
                }
                pos += Group::WIDTH;
            }
        }
        worst
    }

    pub(crate) fn iter(&self) -> RawIter<T> {
        if self.buckets == 0 {
            return RawIter {
                ctrl: ptr::null(),
                data: ptr::null(),
                current: BitMask(0),
                remaining: 0,
            };
        }
        unsafe {
            RawIter {
                ctrl: self.ctrl,
                data: self.data_ptr(),
                current: Group::load(self.ctrl).match_full(),
                remaining: self.len,
            }
        }
    }

    pub(crate) fn drain(&mut self) -> RawDrain<'_, T, A> {
        let iter = self.iter();
        RawDrain { iter, table: self }
    }

    pub(crate) fn into_iter(self) -> RawIntoIter<T, A> {
        let iter = self.iter();
        RawIntoIter { iter, table: self }
    }
}

impl<T, A: Allocator> Drop for RawTable<T, A> {
    fn drop(&mut self) {
        if self.buckets != 0 {
            unsafe {
                self.drop_values();
                let (layout, _) = table_layout::<T>(self.buckets);
                self.alloc
                    .deallocate(NonNull::new_unchecked(self.ctrl as *mut u8), layout);
            }
        }
    }
}

/// Control-byte pointer and bucket pointer advanced in lockstep, one
/// group at a time, draining the full-byte mask of the current group.
pub(crate) struct RawIter<T> {
    ctrl: *const i8,
    data: *const T,
    current: BitMask,
    remaining: usize,
}

impl<T> RawIter<T> {
    #[inline(always)]
    pub(crate) fn len(&self) -> usize {
        self.remaining
    }

    /// # Safety
    ///
    /// The table must outlive the iterator and must not be mutated while
    /// it is advanced.
    pub(crate) unsafe fn next_ptr(&mut self) -> Option<*const T> {
        if self.remaining == 0 {
            return None;
        }
        loop {
            if let Some(bit) = self.current.next() {
                self.remaining -= 1;
                return Some(self.data.add(bit));
            }
            self.ctrl = self.ctrl.add(Group::WIDTH);
            // The sentinel closes the control array; stop before reading
            // the replicated bytes behind it.
            if *self.ctrl == SENTINEL {
                return None;
            }
            self.data = self.data.add(Group::WIDTH);
            self.current = Group::load(self.ctrl).match_full();
        }
    }
}

pub(crate) struct RawDrain<'a, T, A: Allocator> {
    iter: RawIter<T>,
    table: &'a mut RawTable<T, A>,
}

impl<T, A: Allocator> RawDrain<'_, T, A> {
    #[inline(always)]
    pub(crate) fn len(&self) -> usize {
        self.iter.len()
    }
}

impl<T, A: Allocator> Iterator for RawDrain<'_, T, A> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        unsafe { Some(ptr::read(self.iter.next_ptr()?)) }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.iter.len(), Some(self.iter.len()))
    }
}

impl<T, A: Allocator> Drop for RawDrain<'_, T, A> {
    fn drop(&mut self) {
        unsafe {
            while let Some(ptr) = self.iter.next_ptr() {
                ptr::drop_in_place(ptr as *mut T);
            }
            if self.table.buckets != 0 {
                self.table.reset_ctrl();
                self.table.growth_left = full_capacity(self.table.buckets);
            }
            self.table.len = 0;
        }
    }
}

pub(crate) struct RawIntoIter<T, A: Allocator> {
    iter: RawIter<T>,
    table: RawTable<T, A>,
}

impl<T, A: Allocator> RawIntoIter<T, A> {
    #[inline(always)]
    pub(crate) fn len(&self) -> usize {
        self.iter.len()
    }
}

impl<T, A: Allocator> Iterator for RawIntoIter<T, A> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        unsafe { Some(ptr::read(self.iter.next_ptr()?)) }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.iter.len(), Some(self.iter.len()))
    }
}

impl<T, A: Allocator> Drop for RawIntoIter<T, A> {
    fn drop(&mut self) {
        unsafe {
            // Values already yielded were moved out; drop the rest and
            // let the table's drop free the block only.
            while let Some(ptr) = self.iter.next_ptr() {
                ptr::drop_in_place(ptr as *mut T);
            }
            if self.table.buckets != 0 {
                self.table.reset_ctrl();
            }
            self.table.len = 0;
        }
    }
}
