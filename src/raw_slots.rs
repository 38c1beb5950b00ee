//! RawSlots: the single allocation behind a `RobinTable`.
//!
//! One block holds three parallel regions, all indexed by slot:
//!
//! ```text
//! [ V; slots ][ K; slots ][ u8; slots ]
//!   values      identifiers  metadata (probe distance, 0 = empty)
//! ```
//!
//! Every `unsafe` operation of the crate lives in this file. Callers only
//! see safe methods whose preconditions are checked here: a slot's key and
//! value are initialized iff its metadata byte is non-zero.

use crate::robin_table::TableError;
use core::marker::PhantomData;
use core::mem::MaybeUninit;
use core::ptr::NonNull;
use std::alloc::{self, Layout};

pub(crate) struct RawSlots<K, V> {
    base: NonNull<u8>,
    layout: Layout,
    keys_offset: usize,
    meta_offset: usize,
    len: usize,
    _owns: PhantomData<(K, V)>,
}

impl<K, V> RawSlots<K, V> {
    /// Storage with no slots and no allocation.
    pub(crate) const fn empty() -> Self {
        Self {
            base: NonNull::dangling(),
            layout: Layout::new::<u8>(),
            keys_offset: 0,
            meta_offset: 0,
            len: 0,
            _owns: PhantomData,
        }
    }

    /// Layout of the whole block plus the byte offsets of the key and
    /// metadata regions.
    pub(crate) fn layout_for(slots: usize) -> Result<(Layout, usize, usize), TableError> {
        let overflow = || TableError::CapacityOverflow { slots };
        let values = Layout::array::<V>(slots).map_err(|_| overflow())?;
        let keys = Layout::array::<K>(slots).map_err(|_| overflow())?;
        let meta = Layout::array::<u8>(slots).map_err(|_| overflow())?;
        let (with_keys, keys_offset) = values.extend(keys).map_err(|_| overflow())?;
        let (block, meta_offset) = with_keys.extend(meta).map_err(|_| overflow())?;
        Ok((block.pad_to_align(), keys_offset, meta_offset))
    }

    /// Allocate `slots` empty slots. Zero slots never allocates.
    pub(crate) fn allocate(slots: usize) -> Result<Self, TableError> {
        if slots == 0 {
            return Ok(Self::empty());
        }
        let (layout, keys_offset, meta_offset) = Self::layout_for(slots)?;
        // The metadata region alone makes the block at least `slots` bytes.
        let raw = unsafe { alloc::alloc(layout) };
        let base = NonNull::new(raw).ok_or(TableError::AllocationFailed {
            bytes: layout.size(),
        })?;
        unsafe { core::ptr::write_bytes(base.as_ptr().add(meta_offset), 0, slots) };
        Ok(Self {
            base,
            layout,
            keys_offset,
            meta_offset,
            len: slots,
            _owns: PhantomData,
        })
    }

    /// Number of physical slots, overflow margin included.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Bytes held by the block (0 when unallocated).
    pub(crate) fn allocated_bytes(&self) -> usize {
        if self.len == 0 {
            0
        } else {
            self.layout.size()
        }
    }

    #[inline]
    pub(crate) fn meta(&self) -> &[u8] {
        if self.len == 0 {
            return &[];
        }
        unsafe { core::slice::from_raw_parts(self.base.as_ptr().add(self.meta_offset), self.len) }
    }

    #[inline]
    fn regions(&self) -> (&[u8], &[MaybeUninit<K>], &[MaybeUninit<V>]) {
        if self.len == 0 {
            return (&[], &[], &[]);
        }
        let base = self.base.as_ptr();
        unsafe {
            (
                core::slice::from_raw_parts(base.add(self.meta_offset), self.len),
                core::slice::from_raw_parts(base.add(self.keys_offset).cast(), self.len),
                core::slice::from_raw_parts(base.cast(), self.len),
            )
        }
    }

    // The three regions never overlap, so handing out one `&mut` slice per
    // region is sound.
    #[inline]
    fn regions_mut(&mut self) -> (&mut [u8], &mut [MaybeUninit<K>], &mut [MaybeUninit<V>]) {
        if self.len == 0 {
            return (&mut [], &mut [], &mut []);
        }
        let base = self.base.as_ptr();
        unsafe {
            (
                core::slice::from_raw_parts_mut(base.add(self.meta_offset), self.len),
                core::slice::from_raw_parts_mut(base.add(self.keys_offset).cast(), self.len),
                core::slice::from_raw_parts_mut(base.cast(), self.len),
            )
        }
    }

    /// Probe distance stored at `index`; 0 means empty.
    #[inline]
    pub(crate) fn distance(&self, index: usize) -> u8 {
        self.meta()[index]
    }

    pub(crate) fn get(&self, index: usize) -> Option<(&K, &V)> {
        let (meta, keys, values) = self.regions();
        if *meta.get(index)? == 0 {
            return None;
        }
        unsafe { Some((keys[index].assume_init_ref(), values[index].assume_init_ref())) }
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<(&K, &mut V)> {
        let (meta, keys, values) = self.regions_mut();
        if *meta.get(index)? == 0 {
            return None;
        }
        unsafe { Some((keys[index].assume_init_ref(), values[index].assume_init_mut())) }
    }

    /// Move a record into an empty slot.
    pub(crate) fn write(&mut self, index: usize, distance: u8, key: K, value: V) {
        assert!(distance != 0, "occupied slots carry a non-zero distance");
        let (meta, keys, values) = self.regions_mut();
        assert_eq!(meta[index], 0, "write into occupied slot {index}");
        keys[index].write(key);
        values[index].write(value);
        meta[index] = distance;
    }

    /// Move a record out of an occupied slot, leaving it empty.
    pub(crate) fn take(&mut self, index: usize) -> (K, V, u8) {
        let (meta, keys, values) = self.regions_mut();
        let distance = meta[index];
        assert!(distance != 0, "take from empty slot {index}");
        meta[index] = 0;
        unsafe {
            (
                keys[index].assume_init_read(),
                values[index].assume_init_read(),
                distance,
            )
        }
    }

    /// Swap the resident of an occupied slot for a new record.
    pub(crate) fn replace(&mut self, index: usize, distance: u8, key: K, value: V) -> (K, V, u8) {
        let evicted = self.take(index);
        self.write(index, distance, key, value);
        evicted
    }

    pub(crate) fn iter(&self) -> SlotIter<'_, K, V> {
        let (meta, keys, values) = self.regions();
        SlotIter {
            meta: meta.iter().zip(keys.iter().zip(values.iter())).enumerate(),
        }
    }

    pub(crate) fn iter_mut(&mut self) -> SlotIterMut<'_, K, V> {
        let (meta, keys, values) = self.regions_mut();
        SlotIterMut {
            meta: meta.iter().zip(keys.iter().zip(values.iter_mut())).enumerate(),
        }
    }
}

impl<K: Clone, V: Clone> RawSlots<K, V> {
    /// Copy every record into a block of the same size, keeping each record
    /// in the same slot with the same distance.
    pub(crate) fn try_clone(&self) -> Result<Self, TableError> {
        let mut copy = Self::allocate(self.len)?;
        for (index, distance, key, value) in self.iter() {
            copy.write(index, distance, key.clone(), value.clone());
        }
        Ok(copy)
    }
}

impl<K, V> Drop for RawSlots<K, V> {
    fn drop(&mut self) {
        if self.len == 0 {
            return;
        }
        let (meta, keys, values) = self.regions_mut();
        for ((m, key), value) in meta.iter().zip(keys.iter_mut()).zip(values.iter_mut()) {
            if *m != 0 {
                unsafe {
                    key.assume_init_drop();
                    value.assume_init_drop();
                }
            }
        }
        unsafe { alloc::dealloc(self.base.as_ptr(), self.layout) };
    }
}

type Zipped<'a, K, V> = core::iter::Enumerate<
    core::iter::Zip<
        core::slice::Iter<'a, u8>,
        core::iter::Zip<core::slice::Iter<'a, MaybeUninit<K>>, core::slice::Iter<'a, MaybeUninit<V>>>,
    >,
>;

type ZippedMut<'a, K, V> = core::iter::Enumerate<
    core::iter::Zip<
        core::slice::Iter<'a, u8>,
        core::iter::Zip<
            core::slice::Iter<'a, MaybeUninit<K>>,
            core::slice::IterMut<'a, MaybeUninit<V>>,
        >,
    >,
>;

/// Occupied slots in physical order: `(index, distance, key, value)`.
pub(crate) struct SlotIter<'a, K, V> {
    meta: Zipped<'a, K, V>,
}

impl<'a, K, V> Iterator for SlotIter<'a, K, V> {
    type Item = (usize, u8, &'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        for (index, (&distance, (key, value))) in self.meta.by_ref() {
            if distance != 0 {
                return Some(unsafe {
                    (index, distance, key.assume_init_ref(), value.assume_init_ref())
                });
            }
        }
        None
    }
}

pub(crate) struct SlotIterMut<'a, K, V> {
    meta: ZippedMut<'a, K, V>,
}

impl<'a, K, V> Iterator for SlotIterMut<'a, K, V> {
    type Item = (usize, u8, &'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        for (index, (&distance, (key, value))) in self.meta.by_ref() {
            if distance != 0 {
                return Some(unsafe {
                    (index, distance, key.assume_init_ref(), value.assume_init_mut())
                });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::RawSlots;
    use std::rc::Rc;

    /// Invariant: zero slots never allocate and expose empty regions.
    #[test]
    fn empty_storage_has_no_slots() {
        let slots: RawSlots<u32, u64> = RawSlots::allocate(0).unwrap();
        assert_eq!(slots.len(), 0);
        assert_eq!(slots.allocated_bytes(), 0);
        assert!(slots.meta().is_empty());
        assert!(slots.get(0).is_none());
    }

    /// Invariant: a fresh block has every metadata byte cleared.
    #[test]
    fn fresh_block_is_all_empty() {
        let slots: RawSlots<String, String> = RawSlots::allocate(40).unwrap();
        assert_eq!(slots.len(), 40);
        assert!(slots.meta().iter().all(|&d| d == 0));
        assert_eq!(slots.iter().count(), 0);
    }

    /// Invariant: write/take/replace move records without duplicating them and
    /// keep the metadata byte in step.
    #[test]
    fn write_take_replace_move_records() {
        let mut slots: RawSlots<String, i32> = RawSlots::allocate(4).unwrap();
        slots.write(1, 1, "a".to_string(), 10);
        assert_eq!(slots.distance(1), 1);
        assert_eq!(slots.get(1), Some((&"a".to_string(), &10)));

        let (k, v, d) = slots.replace(1, 2, "b".to_string(), 20);
        assert_eq!((k.as_str(), v, d), ("a", 10, 1));
        assert_eq!(slots.distance(1), 2);

        if let Some((_, v)) = slots.get_mut(1) {
            *v += 1;
        }
        let (k, v, d) = slots.take(1);
        assert_eq!((k.as_str(), v, d), ("b", 21, 2));
        assert_eq!(slots.distance(1), 0);
        assert!(slots.get(1).is_none());
    }

    /// Invariant: dropping the storage drops each occupied record exactly once.
    #[test]
    fn drop_releases_occupied_records_once() {
        let probe = Rc::new(());
        {
            let mut slots: RawSlots<u8, Rc<()>> = RawSlots::allocate(8).unwrap();
            slots.write(0, 1, 0, probe.clone());
            slots.write(5, 3, 5, probe.clone());
            let (_, taken, _) = slots.take(5);
            drop(taken);
            assert_eq!(Rc::strong_count(&probe), 2);
        }
        assert_eq!(Rc::strong_count(&probe), 1);
    }

    /// Invariant: clones keep every record in the same slot with the same distance.
    #[test]
    fn clone_preserves_physical_layout() {
        let mut slots: RawSlots<u16, String> = RawSlots::allocate(6).unwrap();
        slots.write(2, 1, 7, "seven".into());
        slots.write(3, 2, 9, "nine".into());
        let copy = slots.try_clone().unwrap();
        assert_eq!(copy.meta(), slots.meta());
        let seen: Vec<_> = copy.iter().map(|(i, d, k, v)| (i, d, *k, v.clone())).collect();
        assert_eq!(seen, vec![(2, 1, 7, "seven".to_string()), (3, 2, 9, "nine".to_string())]);
    }

    /// Invariant: zero-sized keys and values still get a metadata region.
    #[test]
    fn zero_sized_records_are_tracked() {
        let mut slots: RawSlots<(), ()> = RawSlots::allocate(3).unwrap();
        slots.write(2, 1, (), ());
        assert_eq!(slots.iter().map(|(i, ..)| i).collect::<Vec<_>>(), vec![2]);
        let _ = slots.take(2);
        assert_eq!(slots.iter().count(), 0);
    }

    /// Invariant: impossible layouts are reported instead of allocating.
    #[test]
    fn oversized_layout_is_an_error() {
        assert!(RawSlots::<u64, u64>::allocate(usize::MAX / 4).is_err());
    }
}
