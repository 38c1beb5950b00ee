//! Table policies: hashing, slot mapping, key equality and growth bundled
//! into one trait so a capacity scheme always travels with the mapping that
//! depends on it.

use core::hash::{BuildHasher, Hash, Hasher};
use hashbrown::hash_map::DefaultHashBuilder;

/// Smallest capacity the bundled policies allocate or grow from.
pub const MIN_CAPACITY: usize = 8;

/// Behaviour a `RobinTable` needs from its keys.
///
/// `map` must return a slot below `capacity` for every capacity accepted by
/// `accepts_capacity`, and `grow` must return an accepted capacity strictly
/// larger than its input.
pub trait TablePolicy<K: ?Sized> {
    fn hash(&self, key: &K) -> u64;

    /// Home slot of `hash` in a table of `capacity` usable slots.
    fn map(&self, hash: u64, capacity: usize) -> usize;

    fn same_key(&self, stored: &K, probe: &K) -> bool;

    /// Capacity to grow to from `capacity`.
    fn grow(&self, capacity: usize) -> usize;

    fn accepts_capacity(&self, capacity: usize) -> bool {
        capacity > 0
    }

    /// Capacity allocated by the first insert into an empty table.
    fn initial_capacity(&self) -> usize {
        MIN_CAPACITY
    }
}

fn doubled(capacity: usize) -> usize {
    if capacity < MIN_CAPACITY {
        MIN_CAPACITY
    } else {
        capacity.saturating_mul(2)
    }
}

/// Power-of-two capacities with bitmask mapping and doubling growth.
#[derive(Clone, Debug, Default)]
pub struct PowerOfTwo<S = DefaultHashBuilder> {
    hasher: S,
}

impl<S> PowerOfTwo<S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self { hasher }
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }
}

impl<Q, S> TablePolicy<Q> for PowerOfTwo<S>
where
    Q: ?Sized + Hash + Eq,
    S: BuildHasher,
{
    #[inline]
    fn hash(&self, key: &Q) -> u64 {
        self.hasher.hash_one(key)
    }

    #[inline]
    fn map(&self, hash: u64, capacity: usize) -> usize {
        (hash as usize) & (capacity - 1)
    }

    #[inline]
    fn same_key(&self, stored: &Q, probe: &Q) -> bool {
        stored == probe
    }

    fn grow(&self, capacity: usize) -> usize {
        doubled(capacity)
    }

    fn accepts_capacity(&self, capacity: usize) -> bool {
        capacity.is_power_of_two()
    }
}

/// Arbitrary non-zero capacities with remainder mapping and doubling growth.
#[derive(Clone, Debug, Default)]
pub struct Modulo<S = DefaultHashBuilder> {
    hasher: S,
}

impl<S> Modulo<S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self { hasher }
    }
}

impl<Q, S> TablePolicy<Q> for Modulo<S>
where
    Q: ?Sized + Hash + Eq,
    S: BuildHasher,
{
    #[inline]
    fn hash(&self, key: &Q) -> u64 {
        self.hasher.hash_one(key)
    }

    #[inline]
    fn map(&self, hash: u64, capacity: usize) -> usize {
        (hash % capacity as u64) as usize
    }

    #[inline]
    fn same_key(&self, stored: &Q, probe: &Q) -> bool {
        stored == probe
    }

    fn grow(&self, capacity: usize) -> usize {
        doubled(capacity)
    }
}

/// Fall-through hasher for integer keys: the hash of `n` is `n`.
///
/// Byte input that does not come from a fixed-width integer is folded in
/// big-endian order, so short byte strings still spread over slots.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityHasher {
    state: u64,
}

impl Hasher for IdentityHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state = (self.state << 8) | u64::from(b);
        }
    }

    fn write_u8(&mut self, n: u8) {
        self.state = n.into();
    }

    fn write_u16(&mut self, n: u16) {
        self.state = n.into();
    }

    fn write_u32(&mut self, n: u32) {
        self.state = n.into();
    }

    fn write_u64(&mut self, n: u64) {
        self.state = n;
    }

    fn write_usize(&mut self, n: usize) {
        self.state = n as u64;
    }

    fn write_i32(&mut self, n: i32) {
        self.state = n as u32 as u64;
    }

    fn write_i64(&mut self, n: i64) {
        self.state = n as u64;
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BuildIdentity;

impl BuildHasher for BuildIdentity {
    type Hasher = IdentityHasher;

    fn build_hasher(&self) -> IdentityHasher {
        IdentityHasher::default()
    }
}
