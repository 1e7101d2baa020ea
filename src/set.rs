use crate::alloc::{Allocator, Global};
use crate::raw::{RawDrain, RawIntoIter, RawIter, RawTable};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;

/// Hash set over the same open-addressing table as [`crate::HashMap`].
/// There is no mutable access to stored values: mutating a key in place
/// would desynchronize it from its control byte.
pub struct HashSet<T, S = ahash::RandomState, A: Allocator = Global> {
    hash_builder: S,
    table: RawTable<T, A>,
}

impl<T> HashSet<T> {
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, Default::default())
    }
}

impl<T, S: Default, A: Allocator> HashSet<T, S, A> {
    pub fn new_in(alloc: A) -> Self {
        Self {
            hash_builder: Default::default(),
            table: RawTable::new_in(alloc),
        }
    }

    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        Self {
            hash_builder: Default::default(),
            table: RawTable::with_capacity_in(capacity, alloc),
        }
    }
}

impl<T, S> HashSet<T, S> {
    pub fn with_hasher(hash_builder: S) -> Self {
        Self {
            hash_builder,
            table: RawTable::new_in(Global),
        }
    }

    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            hash_builder,
            table: RawTable::with_capacity_in(capacity, Global),
        }
    }
}

impl<T, S, A: Allocator> HashSet<T, S, A> {
    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.table.buckets()
    }

    pub fn load_factor(&self) -> f64 {
        self.table.load_factor()
    }

    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    pub fn allocator(&self) -> &A {
        self.table.allocator()
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Drops all values and releases the allocation.
    pub fn reset(&mut self) {
        self.table.release();
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.table.iter(),
            _marker: PhantomData,
        }
    }

    pub fn drain(&mut self) -> Drain<'_, T, A> {
        Drain {
            inner: self.table.drain(),
        }
    }
}

impl<T, S, A> HashSet<T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    #[inline]
    fn hash_value<Q: Hash + ?Sized>(&self, value: &Q) -> u64 {
        self.hash_builder.hash_one(value)
    }

    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_value(value);
        self.table.find(hash, |v| v.borrow() == value).is_some()
    }

    pub fn get<Q>(&self, value: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_value(value);
        self.table.get(hash, |v| v.borrow() == value)
    }

    /// Returns whether the value was newly inserted.
    pub fn insert(&mut self, value: T) -> bool {
        let hash = self.hash_value(&value);
        let hash_builder = &self.hash_builder;
        match self
            .table
            .find_or_find_insert_slot(hash, |v| *v == value, |v| hash_builder.hash_one(v))
        {
            Ok(_) => false,
            Err(slot) => {
                unsafe { self.table.insert_in_slot(hash, slot, value) };
                true
            }
        }
    }

    /// Inserts without checking for an existing equal value; see
    /// [`crate::HashMap::insert_unique_unchecked`] for the contract.
    pub fn insert_unique_unchecked(&mut self, value: T) -> &T {
        debug_assert!(
            self.get(&value).is_none(),
            "insert_unique_unchecked on a value that is already present",
        );
        let hash = self.hash_value(&value);
        let hash_builder = &self.hash_builder;
        let index = self
            .table
            .insert_unique_unchecked(hash, value, |v| hash_builder.hash_one(v));
        unsafe { &*self.table.bucket(index) }
    }

    pub fn remove<Q>(&mut self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.take(value).is_some()
    }

    /// Removes and returns the stored value, for callers reclaiming the
    /// payload.
    pub fn take<Q>(&mut self, value: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_value(value);
        self.table.remove(hash, |v| v.borrow() == value)
    }

    pub fn retain(&mut self, mut f: impl FnMut(&T) -> bool) {
        self.table.retain(|v| f(v));
    }

    pub fn reserve(&mut self, additional: usize) {
        let hash_builder = &self.hash_builder;
        self.table
            .reserve(additional, |v| hash_builder.hash_one(v));
    }

    pub fn rehash(&mut self, capacity: usize) {
        let hash_builder = &self.hash_builder;
        self.table.rehash(capacity, |v| hash_builder.hash_one(v));
    }

    pub fn shrink_to_fit(&mut self) {
        let hash_builder = &self.hash_builder;
        self.table.shrink_to_fit(|v| hash_builder.hash_one(v));
    }

    pub fn max_probe_dist(&self) -> usize {
        let hash_builder = &self.hash_builder;
        self.table.max_probe_dist(|v| hash_builder.hash_one(v))
    }

    /// Union in place: moves all values of `other` into `self`, keeping
    /// existing values on collision. `other` is left empty.
    pub fn append<S2, A2>(&mut self, other: &mut HashSet<T, S2, A2>)
    where
        S2: BuildHasher,
        A2: Allocator,
    {
        self.reserve(other.len());
        for value in other.drain() {
            self.insert(value);
        }
    }
}

impl<T, S: Default> Default for HashSet<T, S> {
    fn default() -> Self {
        Self::with_hasher(Default::default())
    }
}

impl<T, S, A> Clone for HashSet<T, S, A>
where
    T: Clone + Hash + Eq,
    S: Clone + BuildHasher,
    A: Allocator,
{
    fn clone(&self) -> Self {
        let mut new = HashSet {
            hash_builder: self.hash_builder.clone(),
            table: RawTable::with_capacity_in(self.len(), self.allocator().clone()),
        };
        for value in self.iter() {
            new.insert_unique_unchecked(value.clone());
        }
        new
    }
}

impl<T, S, A> PartialEq for HashSet<T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|v| other.contains(v))
    }
}

impl<T, S, A> Eq for HashSet<T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
}

impl<T, S, A> fmt::Debug for HashSet<T, S, A>
where
    T: fmt::Debug,
    A: Allocator,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T, S, A> Extend<T> for HashSet<T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for value in iter {
            self.insert(value);
        }
    }
}

impl<T, S> FromIterator<T> for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::with_hasher(Default::default());
        set.extend(iter);
        set
    }
}

impl<T, const N: usize> From<[T; N]> for HashSet<T>
where
    T: Hash + Eq,
{
    fn from(values: [T; N]) -> Self {
        values.into_iter().collect()
    }
}

impl<'a, T, S, A: Allocator> IntoIterator for &'a HashSet<T, S, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<T, S, A: Allocator> IntoIterator for HashSet<T, S, A> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    fn into_iter(self) -> IntoIter<T, A> {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

pub struct Iter<'a, T> {
    inner: RawIter<T>,
    _marker: PhantomData<&'a T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        unsafe { Some(&*self.inner.next_ptr()?) }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.inner.len(), Some(self.inner.len()))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

pub struct Drain<'a, T, A: Allocator = Global> {
    inner: RawDrain<'a, T, A>,
}

impl<T, A: Allocator> Iterator for Drain<'_, T, A> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.inner.len(), Some(self.inner.len()))
    }
}

impl<T, A: Allocator> ExactSizeIterator for Drain<'_, T, A> {}

pub struct IntoIter<T, A: Allocator = Global> {
    inner: RawIntoIter<T, A>,
}

impl<T, A: Allocator> Iterator for IntoIter<T, A> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.inner.len(), Some(self.inner.len()))
    }
}

impl<T, A: Allocator> ExactSizeIterator for IntoIter<T, A> {}
