//! RobinTable: open addressing with Robin Hood insertion and backward-shift
//! deletion over a single three-region allocation (see `raw_slots`).
//!
//! The table never wraps around: it is allocated with `MAX_PROBE_DISTANCE`
//! extra slots past `capacity`, so a probe that starts in the last usable
//! slot can still run its full length. The stored distance of every record
//! is therefore `slot - home + 1`.

use crate::policy::{PowerOfTwo, TablePolicy};
use crate::raw_slots::{RawSlots, SlotIter, SlotIterMut};
use core::borrow::Borrow;
use core::fmt;
use core::ops::ControlFlow;
use core::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::{debug, trace};

/// Load factor, in percent, above which `insert` asks for growth.
pub const MAX_LOAD_FACTOR: usize = 90;

/// Longest probe distance a record may have. Also the size of the overflow
/// margin allocated past `capacity`.
pub const MAX_PROBE_DISTANCE: u8 = 32;

// Growths one insert may force before giving up on the policy.
const MAX_FORCED_GROWTHS: u32 = 4;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("capacity {capacity} is not accepted by the table policy")]
    InvalidCapacity { capacity: usize },
    #[error("capacity {capacity} cannot hold {len} entries")]
    CapacityTooSmall { capacity: usize, len: usize },
    #[error("a table of {slots} slots does not fit in the address space")]
    CapacityOverflow { slots: usize },
    #[error("failed to allocate {bytes} bytes of table storage")]
    AllocationFailed { bytes: usize },
    #[error("policy mapped a key to slot {slot} in a table of capacity {capacity}")]
    SlotOutOfRange { slot: usize, capacity: usize },
    #[error("growth policy did not enlarge capacity {capacity}")]
    GrowthStalled { capacity: usize },
    #[error("probe distance stayed above {limit} after {growths} forced growths")]
    ProbeOverflow { limit: u8, growths: u32 },
}

/// Position of a record, validated by `find`.
///
/// A slot stays usable until the next structural change of the table
/// (insert, remove, grow); after that the accessors return `None`, since
/// Robin Hood displacement and backward shifts move records between slots.
/// Other tables, clones included, reject it.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Slot {
    index: usize,
    table: u64,
    epoch: u64,
}

impl Slot {
    /// Physical index of the slot.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn key<'a, K, V, P>(&self, table: &'a RobinTable<K, V, P>) -> Option<&'a K> {
        table.identifier_at(*self)
    }

    pub fn value<'a, K, V, P>(&self, table: &'a RobinTable<K, V, P>) -> Option<&'a V> {
        table.element_at(*self)
    }

    pub fn value_mut<'a, K, V, P>(&self, table: &'a mut RobinTable<K, V, P>) -> Option<&'a mut V> {
        table.element_at_mut(*self)
    }
}

pub struct RobinTable<K, V, P = PowerOfTwo> {
    slots: RawSlots<K, V>,
    capacity: usize,
    len: usize,
    max_search_length: u8,
    // `Slot`s carry both; a slot from another table or layout is rejected.
    id: u64,
    epoch: u64,
    policy: P,
}

fn next_table_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

fn physical_slots(capacity: usize) -> Result<usize, TableError> {
    capacity
        .checked_add(usize::from(MAX_PROBE_DISTANCE))
        .ok_or(TableError::CapacityOverflow { slots: capacity })
}

impl<K, V, P> RobinTable<K, V, P> {
    fn check_slot(&self, slot: Slot) -> Option<usize> {
        (slot.table == self.id && slot.epoch == self.epoch).then_some(slot.index)
    }

    fn bump_epoch(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
    }

    fn find_index<Q>(&self, q: &Q) -> Option<usize>
    where
        Q: ?Sized,
        K: Borrow<Q>,
        P: TablePolicy<Q>,
    {
        if self.capacity == 0 {
            return None;
        }
        let mut index = self.policy.map(self.policy.hash(q), self.capacity);
        if index >= self.capacity {
            return None;
        }
        // A record found at probe depth `d` must have stored distance `d`.
        for depth in 1..=self.max_search_length {
            if index >= self.slots.len() {
                break;
            }
            if self.slots.distance(index) == depth {
                if let Some((key, _)) = self.slots.get(index) {
                    if self.policy.same_key(key.borrow(), q) {
                        return Some(index);
                    }
                }
            }
            index += 1;
        }
        None
    }

    /// Take the record at `index` and close the gap by shifting the
    /// following displaced records back one slot.
    fn remove_index(&mut self, index: usize) -> (K, V) {
        let (key, value, _) = self.slots.take(index);
        let mut hole = index;
        while hole + 1 < self.slots.len() {
            // Distance 1 sits at its home slot and must stay; 0 is empty.
            if self.slots.distance(hole + 1) <= 1 {
                break;
            }
            let (k, v, d) = self.slots.take(hole + 1);
            self.slots.write(hole, d - 1, k, v);
            hole += 1;
        }
        self.len -= 1;
        self.bump_epoch();
        (key, value)
    }
}

impl<K, V, P> RobinTable<K, V, P>
where
    P: TablePolicy<K>,
{
    fn home_of_hash(&self, hash: u64) -> Result<usize, TableError> {
        let slot = self.policy.map(hash, self.capacity);
        if slot < self.capacity {
            Ok(slot)
        } else {
            Err(TableError::SlotOutOfRange {
                slot,
                capacity: self.capacity,
            })
        }
    }

    fn next_capacity(&self) -> Result<usize, TableError> {
        let next = self.policy.grow(self.capacity);
        if next > self.capacity {
            Ok(next)
        } else {
            Err(TableError::GrowthStalled {
                capacity: self.capacity,
            })
        }
    }

    /// Robin Hood probe from `home`. Returns the distance of the record that
    /// filled the empty slot, or the record carried at the point where the
    /// probe would leave the overflow margin.
    fn settle(&mut self, home: usize, mut key: K, mut value: V) -> Result<u8, (K, V)> {
        let mut index = home;
        let mut distance: u8 = 1;
        loop {
            if index >= self.slots.len() || distance > MAX_PROBE_DISTANCE {
                return Err((key, value));
            }
            let resident = self.slots.distance(index);
            if resident == 0 {
                self.slots.write(index, distance, key, value);
                self.max_search_length = self.max_search_length.max(distance);
                return Ok(distance);
            }
            if resident <= distance {
                let (k, v, d) = self.slots.replace(index, distance, key, value);
                self.max_search_length = self.max_search_length.max(distance);
                key = k;
                value = v;
                distance = d;
            }
            index += 1;
            distance += 1;
        }
    }

    /// Insert one record, forcing policy growth while the probe cannot settle.
    fn place(&mut self, mut key: K, mut value: V) -> Result<u8, TableError> {
        if self.capacity == 0 {
            let initial = self.policy.initial_capacity();
            self.rehash(initial)?;
        }
        let mut forced = 0u32;
        loop {
            let home = self.home_of_hash(self.policy.hash(&key))?;
            match self.settle(home, key, value) {
                Ok(distance) => {
                    self.len += 1;
                    return Ok(distance);
                }
                Err((k, v)) => {
                    forced += 1;
                    if forced > MAX_FORCED_GROWTHS {
                        return Err(TableError::ProbeOverflow {
                            limit: MAX_PROBE_DISTANCE,
                            growths: MAX_FORCED_GROWTHS,
                        });
                    }
                    let next = self.next_capacity()?;
                    debug!(
                        capacity = self.capacity,
                        next, "probe left the overflow margin; forcing growth"
                    );
                    self.rehash(next)?;
                    key = k;
                    value = v;
                }
            }
        }
    }

    /// Whether every record settles in a table of `capacity` usable slots.
    /// Placement depends only on stored distances, so this replays the moves
    /// `rehash` would make on a distance array.
    fn fits(&self, capacity: usize) -> Result<bool, TableError> {
        let slots = physical_slots(capacity)?;
        let mut distances: Vec<u8> = Vec::new();
        distances
            .try_reserve_exact(slots)
            .map_err(|_| TableError::AllocationFailed { bytes: slots })?;
        distances.resize(slots, 0);
        for (_, _, key, _) in self.slots.iter() {
            let home = self.policy.map(self.policy.hash(key), capacity);
            if home >= capacity {
                return Err(TableError::SlotOutOfRange {
                    slot: home,
                    capacity,
                });
            }
            let mut index = home;
            let mut carried: u8 = 1;
            loop {
                if index >= slots || carried > MAX_PROBE_DISTANCE {
                    return Ok(false);
                }
                let resident = distances[index];
                if resident == 0 {
                    distances[index] = carried;
                    break;
                }
                if resident <= carried {
                    distances[index] = carried;
                    carried = resident;
                }
                index += 1;
                carried += 1;
            }
        }
        Ok(true)
    }

    /// First of `capacity` and up to `MAX_FORCED_GROWTHS` policy growths of
    /// it that holds every record.
    fn fitting_capacity(&self, capacity: usize) -> Result<usize, TableError> {
        let mut candidate = capacity;
        for growths in 0..=MAX_FORCED_GROWTHS {
            if growths > 0 {
                let next = self.policy.grow(candidate);
                if next <= candidate {
                    return Err(TableError::GrowthStalled {
                        capacity: candidate,
                    });
                }
                debug!(
                    capacity = candidate,
                    next, "records do not fit; forcing growth"
                );
                candidate = next;
            }
            if candidate == 0 || !self.policy.accepts_capacity(candidate) {
                return Err(TableError::InvalidCapacity {
                    capacity: candidate,
                });
            }
            if self.fits(candidate)? {
                return Ok(candidate);
            }
        }
        Err(TableError::ProbeOverflow {
            limit: MAX_PROBE_DISTANCE,
            growths: MAX_FORCED_GROWTHS,
        })
    }

    /// Move every record into a fresh allocation. On error the table is left
    /// as it was.
    fn rehash(&mut self, capacity: usize) -> Result<(), TableError> {
        let capacity = self.fitting_capacity(capacity)?;
        let fresh = RawSlots::allocate(physical_slots(capacity)?)?;
        let mut old = core::mem::replace(&mut self.slots, fresh);
        debug!(
            from = self.capacity,
            to = capacity,
            len = self.len,
            "rehashing robin table"
        );
        self.capacity = capacity;
        self.len = 0;
        self.max_search_length = 0;
        self.bump_epoch();
        for index in 0..old.len() {
            if old.distance(index) != 0 {
                let (key, value, _) = old.take(index);
                let home = self.policy.map(self.policy.hash(&key), capacity);
                if self.settle(home, key, value).is_err() {
                    unreachable!("record did not settle in a layout `fits` accepted");
                }
                self.len += 1;
            }
        }
        Ok(())
    }
}

/// Iterator over records in physical slot order.
pub struct Iter<'a, K, V> {
    it: SlotIter<'a, K, V>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, _, k, v)| (k, v))
    }
}

/// Mutable iterator over records in physical slot order.
pub struct IterMut<'a, K, V> {
    it: SlotIterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, _, k, v)| (k, v))
    }
}

impl<K, V> RobinTable<K, V> {
    /// Empty table with the default policy; allocates on first insert.
    pub fn new() -> Self {
        Self::with_policy(PowerOfTwo::default())
    }
}

impl<K, V> Default for RobinTable<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> RobinTable<K, V>
where
    PowerOfTwo: TablePolicy<K>,
{
    pub fn with_capacity(capacity: usize) -> Result<Self, TableError> {
        Self::with_capacity_and_policy(capacity, PowerOfTwo::default())
    }
}

impl<K, V, P> RobinTable<K, V, P> {
    /// Empty table; allocates `policy.initial_capacity()` on first insert.
    pub fn with_policy(policy: P) -> Self {
        Self {
            slots: RawSlots::empty(),
            capacity: 0,
            len: 0,
            max_search_length: 0,
            id: next_table_id(),
            epoch: 0,
            policy,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Usable slots, overflow margin excluded.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Longest probe distance currently bounding lookups.
    pub fn max_search_length(&self) -> u8 {
        self.max_search_length
    }

    /// Occupancy in percent of `capacity`.
    pub fn load_factor(&self) -> usize {
        if self.capacity == 0 {
            0
        } else {
            self.len * 100 / self.capacity
        }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Bytes of storage a table of `capacity` usable slots allocates, or
    /// `None` if that layout cannot exist.
    pub fn memory_of(capacity: usize) -> Option<usize> {
        let slots = physical_slots(capacity).ok()?;
        RawSlots::<K, V>::layout_for(slots)
            .ok()
            .map(|(layout, _, _)| layout.size())
    }

    /// Bytes currently allocated.
    pub fn allocated_bytes(&self) -> usize {
        self.slots.allocated_bytes()
    }

    /// Whether physical slot `index` holds a record. Indexes past the
    /// overflow margin are simply unoccupied.
    pub fn is_occupied(&self, index: usize) -> bool {
        self.distance_at(index).is_some_and(|d| d != 0)
    }

    /// Stored probe distance at physical slot `index` (0 = empty).
    pub fn distance_at(&self, index: usize) -> Option<u8> {
        self.slots.meta().get(index).copied()
    }

    pub fn element_at(&self, slot: Slot) -> Option<&V> {
        let index = self.check_slot(slot)?;
        self.slots.get(index).map(|(_, v)| v)
    }

    pub fn element_at_mut(&mut self, slot: Slot) -> Option<&mut V> {
        let index = self.check_slot(slot)?;
        self.slots.get_mut(index).map(|(_, v)| v)
    }

    pub fn identifier_at(&self, slot: Slot) -> Option<&K> {
        let index = self.check_slot(slot)?;
        self.slots.get(index).map(|(k, _)| k)
    }

    /// Visit every record in physical order, overflow margin included,
    /// until `visit` breaks.
    pub fn for_each<F>(&self, mut visit: F) -> ControlFlow<()>
    where
        F: FnMut(&K, &V) -> ControlFlow<()>,
    {
        for (_, _, key, value) in self.slots.iter() {
            visit(key, value)?;
        }
        ControlFlow::Continue(())
    }

    pub fn for_each_mut<F>(&mut self, mut visit: F) -> ControlFlow<()>
    where
        F: FnMut(&K, &mut V) -> ControlFlow<()>,
    {
        for (_, _, key, value) in self.slots.iter_mut() {
            visit(key, value)?;
        }
        ControlFlow::Continue(())
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            it: self.slots.iter(),
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            it: self.slots.iter_mut(),
        }
    }

    /// Recompute `max_search_length` from the stored distances. Removal never
    /// lowers the bound on its own.
    pub fn reset_search_length(&mut self) {
        self.max_search_length = self.slots.meta().iter().copied().max().unwrap_or(0);
    }

    /// Drop every record; capacity is kept.
    pub fn clear(&mut self) {
        let slots = &mut self.slots;
        for index in 0..slots.len() {
            if slots.distance(index) != 0 {
                drop(slots.take(index));
            }
        }
        self.len = 0;
        self.max_search_length = 0;
        self.bump_epoch();
    }

    /// Remove the record a still-valid `slot` points at.
    pub fn remove_at(&mut self, slot: Slot) -> Option<(K, V)> {
        let index = self.check_slot(slot)?;
        self.slots.get(index)?;
        Some(self.remove_index(index))
    }

    /// Locate `q`, probing no further than `max_search_length`.
    pub fn find<Q>(&self, q: &Q) -> Option<Slot>
    where
        Q: ?Sized,
        K: Borrow<Q>,
        P: TablePolicy<Q>,
    {
        self.find_index(q).map(|index| Slot {
            index,
            table: self.id,
            epoch: self.epoch,
        })
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        Q: ?Sized,
        K: Borrow<Q>,
        P: TablePolicy<Q>,
    {
        self.find(q).is_some()
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        Q: ?Sized,
        K: Borrow<Q>,
        P: TablePolicy<Q>,
    {
        let index = self.find_index(q)?;
        self.slots.get(index).map(|(_, v)| v)
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        Q: ?Sized,
        K: Borrow<Q>,
        P: TablePolicy<Q>,
    {
        let index = self.find_index(q)?;
        self.slots.get_mut(index).map(|(_, v)| v)
    }

    /// Home slot of `q` in the current capacity.
    pub fn home_of<Q>(&self, q: &Q) -> Option<usize>
    where
        Q: ?Sized,
        K: Borrow<Q>,
        P: TablePolicy<Q>,
    {
        (self.capacity > 0).then(|| self.policy.map(self.policy.hash(q), self.capacity))
    }

    /// Remove `q`, backward-shifting its displaced successors.
    pub fn remove<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        Q: ?Sized,
        K: Borrow<Q>,
        P: TablePolicy<Q>,
    {
        let index = self.find_index(q)?;
        trace!(index, "removing robin table record");
        Some(self.remove_index(index))
    }
}

impl<K, V, P> RobinTable<K, V, P>
where
    P: TablePolicy<K>,
{
    /// Table with `capacity` usable slots; 0 defers the allocation.
    pub fn with_capacity_and_policy(capacity: usize, policy: P) -> Result<Self, TableError> {
        let mut table = Self::with_policy(policy);
        if capacity > 0 {
            table.rehash(capacity)?;
        }
        Ok(table)
    }

    /// Insert `key -> value` without looking for an existing equal key.
    ///
    /// Returns `Ok(true)` when the load factor exceeds `MAX_LOAD_FACTOR` or
    /// the record landed at `MAX_PROBE_DISTANCE`; the caller should then
    /// `grow_to_next` before inserting again. The table only grows on its own
    /// when a probe would otherwise run past the overflow margin.
    ///
    /// On `ProbeOverflow` the record being carried at that moment (not
    /// necessarily `key`) is dropped; every other record stays findable.
    pub fn insert(&mut self, key: K, value: V) -> Result<bool, TableError> {
        // A failed placement may still have displaced records.
        let placed = self.place(key, value);
        self.bump_epoch();
        let distance = placed?;
        Ok(self.len * 100 / self.capacity > MAX_LOAD_FACTOR || distance == MAX_PROBE_DISTANCE)
    }

    /// Insert and grow by policy if the insert asks for it.
    pub fn insert_and_grow(&mut self, key: K, value: V) -> Result<(), TableError> {
        if self.insert(key, value)? {
            self.grow_to_next()?;
        }
        Ok(())
    }

    /// Grow (or re-layout) the table to `capacity` usable slots, re-placing
    /// every record against the new capacity.
    pub fn grow(&mut self, capacity: usize) -> Result<(), TableError> {
        if capacity < self.len {
            return Err(TableError::CapacityTooSmall {
                capacity,
                len: self.len,
            });
        }
        self.rehash(capacity)
    }

    /// Grow to the capacity the policy picks next.
    pub fn grow_to_next(&mut self) -> Result<(), TableError> {
        let next = self.next_capacity()?;
        self.rehash(next)
    }
}

impl<K: Clone, V: Clone, P: Clone> RobinTable<K, V, P> {
    /// Copy with the same capacity and the same physical layout.
    pub fn try_clone(&self) -> Result<Self, TableError> {
        Ok(Self {
            slots: self.slots.try_clone()?,
            capacity: self.capacity,
            len: self.len,
            max_search_length: self.max_search_length,
            id: next_table_id(),
            epoch: 0,
            policy: self.policy.clone(),
        })
    }
}

impl<K: Clone, V: Clone, P: Clone> Clone for RobinTable<K, V, P> {
    fn clone(&self) -> Self {
        self.try_clone()
            .unwrap_or_else(|e| panic!("cloning robin table: {e}"))
    }
}

impl<K: fmt::Debug, V: fmt::Debug, P> fmt::Debug for RobinTable<K, V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, K, V, P> IntoIterator for &'a RobinTable<K, V, P> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
