use crate::alloc::{Allocator, Global};
use crate::raw::{RawDrain, RawIntoIter, RawIter, RawTable};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;
use std::mem;
use std::ops::Index;

/// Hash map over an open-addressing SIMD-probed table. Not internally
/// synchronized; hashing comes from `S`, memory from `A`.
pub struct HashMap<K, V, S = ahash::RandomState, A: Allocator = Global> {
    hash_builder: S,
    table: RawTable<(K, V), A>,
}

impl<K, V> HashMap<K, V> {
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, Default::default())
    }
}

impl<K, V, S: Default, A: Allocator> HashMap<K, V, S, A> {
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

impl<K, V, S> HashMap<K, V, S> {
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

impl<K, V, S, A: Allocator> HashMap<K, V, S, A> {
    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    /// Entries the map can hold before the next growth.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.table.buckets()
    }

    /// Fraction of buckets that are occupied or tombstoned. Bounded by
    /// the growth policy to stay near 0.8.
    pub fn load_factor(&self) -> f64 {
        self.table.load_factor()
    }

    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    pub fn allocator(&self) -> &A {
        self.table.allocator()
    }

    /// Drops all entries but keeps the allocation.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Drops all entries and releases the allocation.
    pub fn reset(&mut self) {
        self.table.release();
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.table.iter(),
            _marker: PhantomData,
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            inner: self.table.iter(),
            _marker: PhantomData,
        }
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    /// Removes and yields every entry; the allocation is kept.
    pub fn drain(&mut self) -> Drain<'_, K, V, A> {
        Drain {
            inner: self.table.drain(),
        }
    }
}

impl<K, V, S, A> HashMap<K, V, S, A>
where
    K: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    #[inline]
    fn hash_key<Q: Hash + ?Sized>(&self, key: &Q) -> u64 {
        self.hash_builder.hash_one(key)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_key(key);
        let entry = self.table.get(hash, |e| e.0.borrow() == key)?;
        Some(&entry.1)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_key(key);
        let entry = self.table.get_mut(hash, |e| e.0.borrow() == key)?;
        Some(&mut entry.1)
    }

    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_key(key);
        let entry = self.table.get(hash, |e| e.0.borrow() == key)?;
        Some((&entry.0, &entry.1))
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_key(key);
        self.table.find(hash, |e| e.0.borrow() == key).is_some()
    }

    /// Inserts or assigns, returning the previous value if any.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let hash = self.hash_key(&key);
        let hash_builder = &self.hash_builder;
        match self.table.find_or_find_insert_slot(
            hash,
            |e| e.0 == key,
            |e| hash_builder.hash_one(&e.0),
        ) {
            Ok(index) => unsafe {
                let entry = &mut *self.table.bucket(index);
                Some(mem::replace(&mut entry.1, value))
            },
            Err(slot) => unsafe {
                self.table.insert_in_slot(hash, slot, (key, value));
                None
            },
        }
    }

    /// Returns the value for `key`, inserting `default()` first if absent.
    pub fn get_or_insert_with(&mut self, key: K, default: impl FnOnce() -> V) -> &mut V {
        let hash = self.hash_key(&key);
        let hash_builder = &self.hash_builder;
        let index = match self.table.find_or_find_insert_slot(
            hash,
            |e| e.0 == key,
            |e| hash_builder.hash_one(&e.0),
        ) {
            Ok(index) => index,
            Err(slot) => unsafe { self.table.insert_in_slot(hash, slot, (key, default())) },
        };
        unsafe { &mut (*self.table.bucket(index)).1 }
    }

    /// Subscript semantics: the entry for `key`, default-constructed on a
    /// miss.
    pub fn entry_or_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.get_or_insert_with(key, V::default)
    }

    /// Inserts without checking for an existing equal key. Much faster
    /// for bulk loads known to be duplicate-free; inserting a duplicate
    /// corrupts the map. Checked by an assertion in debug builds only.
    pub fn insert_unique_unchecked(&mut self, key: K, value: V) -> (&K, &mut V) {
        debug_assert!(
            self.get(&key).is_none(),
            "insert_unique_unchecked on a key that is already present",
        );
        let hash = self.hash_key(&key);
        let hash_builder = &self.hash_builder;
        let index =
            self.table
                .insert_unique_unchecked(hash, (key, value), |e| hash_builder.hash_one(&e.0));
        unsafe {
            let entry = &mut *self.table.bucket(index);
            (&entry.0, &mut entry.1)
        }
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.remove_entry(key).map(|(_, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_key(key);
        self.table.remove(hash, |e| e.0.borrow() == key)
    }

    pub fn retain(&mut self, mut f: impl FnMut(&K, &mut V) -> bool) {
        self.table.retain(|e| f(&e.0, &mut e.1));
    }

    pub fn reserve(&mut self, additional: usize) {
        let hash_builder = &self.hash_builder;
        self.table
            .reserve(additional, |e| hash_builder.hash_one(&e.0));
    }

    /// Rehashes into a table sized for at least `capacity` entries,
    /// dropping all tombstones. Never shrinks below the current length.
    pub fn rehash(&mut self, capacity: usize) {
        let hash_builder = &self.hash_builder;
        self.table
            .rehash(capacity, |e| hash_builder.hash_one(&e.0));
    }

    pub fn shrink_to_fit(&mut self) {
        let hash_builder = &self.hash_builder;
        self.table
            .shrink_to_fit(|e| hash_builder.hash_one(&e.0));
    }

    /// Worst-case probe chain length currently present, in groups.
    pub fn max_probe_dist(&self) -> usize {
        let hash_builder = &self.hash_builder;
        self.table.max_probe_dist(|e| hash_builder.hash_one(&e.0))
    }

    /// Moves all entries of `other` into `self`, overwriting on key
    /// collisions. `other` is left empty but keeps its allocation.
    pub fn append<S2, A2>(&mut self, other: &mut HashMap<K, V, S2, A2>)
    where
        S2: BuildHasher,
        A2: Allocator,
    {
        self.reserve(other.len());
        for (k, v) in other.drain() {
            self.insert(k, v);
        }
    }
}

impl<K, V, S: Default> Default for HashMap<K, V, S> {
    fn default() -> Self {
        Self::with_hasher(Default::default())
    }
}

impl<K, V, S, A> Clone for HashMap<K, V, S, A>
where
    K: Clone + Hash + Eq,
    V: Clone,
    S: Clone + BuildHasher,
    A: Allocator,
{
    fn clone(&self) -> Self {
        // Key-by-key rebuild: panic-safe and sheds tombstones. The source
        // guarantees uniqueness, so the unchecked path is fine.
        let mut new = HashMap {
            hash_builder: self.hash_builder.clone(),
            table: RawTable::with_capacity_in(self.len(), self.allocator().clone()),
        };
        for (k, v) in self.iter() {
            new.insert_unique_unchecked(k.clone(), v.clone());
        }
        new
    }
}

impl<K, V, S, A> PartialEq for HashMap<K, V, S, A>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
    A: Allocator,
{
    /// Order-independent: equal sizes and every entry of one present with
    /// an equal value in the other.
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K, V, S, A> Eq for HashMap<K, V, S, A>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
    A: Allocator,
{
}

impl<K, V, S, A> fmt::Debug for HashMap<K, V, S, A>
where
    K: fmt::Debug,
    V: fmt::Debug,
    A: Allocator,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, Q, V, S, A> Index<&Q> for HashMap<K, V, S, A>
where
    K: Borrow<Q> + Hash + Eq,
    Q: Hash + Eq + ?Sized,
    S: BuildHasher,
    A: Allocator,
{
    type Output = V;

    /// # Panics
    ///
    /// Panics if the key is absent; check with `contains_key` or `get`
    /// first.
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("no entry found for key")
    }
}

impl<K, V, S, A> Extend<(K, V)> for HashMap<K, V, S, A>
where
    K: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::with_hasher(Default::default());
        map.extend(iter);
        map
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for HashMap<K, V>
where
    K: Hash + Eq,
{
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl<'a, K, V, S, A: Allocator> IntoIterator for &'a HashMap<K, V, S, A> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<'a, K, V, S, A: Allocator> IntoIterator for &'a mut HashMap<K, V, S, A> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> IterMut<'a, K, V> {
        self.iter_mut()
    }
}

impl<K, V, S, A: Allocator> IntoIterator for HashMap<K, V, S, A> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, A>;

    fn into_iter(self) -> IntoIter<K, V, A> {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

pub struct Iter<'a, K, V> {
    inner: RawIter<(K, V)>,
    _marker: PhantomData<&'a (K, V)>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        unsafe {
            let entry = &*self.inner.next_ptr()?;
            Some((&entry.0, &entry.1))
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.inner.len(), Some(self.inner.len()))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

pub struct IterMut<'a, K, V> {
    inner: RawIter<(K, V)>,
    _marker: PhantomData<&'a mut (K, V)>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        unsafe {
            let entry = &mut *(self.inner.next_ptr()? as *mut (K, V));
            Some((&entry.0, &mut entry.1))
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.inner.len(), Some(self.inner.len()))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}

pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

pub struct ValuesMut<'a, K, V> {
    inner: IterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<&'a mut V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

pub struct Drain<'a, K, V, A: Allocator = Global> {
    inner: RawDrain<'a, (K, V), A>,
}

impl<K, V, A: Allocator> Iterator for Drain<'_, K, V, A> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.inner.len(), Some(self.inner.len()))
    }
}

impl<K, V, A: Allocator> ExactSizeIterator for Drain<'_, K, V, A> {}

pub struct IntoIter<K, V, A: Allocator = Global> {
    inner: RawIntoIter<(K, V), A>,
}

impl<K, V, A: Allocator> Iterator for IntoIter<K, V, A> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.inner.len(), Some(self.inner.len()))
    }
}

impl<K, V, A: Allocator> ExactSizeIterator for IntoIter<K, V, A> {}
