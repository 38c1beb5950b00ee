//! DynArray: growable contiguous sequence with an explicit growth policy.
//!
//! Capacity is tracked by the array itself rather than left to `Vec`, so
//! growth follows `floor(1.5 * capacity) + 1` exactly and is observable.
//! Every positional accessor is bounds-checked.

use core::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ArrayError {
    #[error("index {index} is out of bounds for length {len}")]
    OutOfBounds { index: usize, len: usize },
}

/// Next capacity when a full array receives another element.
#[inline]
pub fn grown_capacity(capacity: usize) -> usize {
    capacity
        .checked_add(capacity / 2)
        .and_then(|c| c.checked_add(1))
        .expect("DynArray capacity overflow")
}

pub struct DynArray<T> {
    items: Vec<T>,
    capacity: usize,
}

impl<T> DynArray<T> {
    /// Empty array without an allocation.
    pub const fn new() -> Self {
        Self {
            items: Vec::new(),
            capacity: 0,
        }
    }

    /// Empty array; allocates only when `capacity > 0`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    fn check(&self, index: usize) -> Result<(), ArrayError> {
        if index < self.items.len() {
            Ok(())
        } else {
            Err(ArrayError::OutOfBounds {
                index,
                len: self.items.len(),
            })
        }
    }

    /// Set the capacity to exactly `capacity`, dropping the tail if it no
    /// longer fits.
    pub fn resize_capacity(&mut self, capacity: usize) {
        self.items.truncate(capacity);
        if capacity > self.items.capacity() {
            self.items.reserve_exact(capacity - self.items.len());
        } else {
            self.items.shrink_to(capacity);
        }
        self.capacity = capacity;
    }

    pub fn push(&mut self, value: T) {
        if self.items.len() == self.capacity {
            self.resize_capacity(grown_capacity(self.capacity));
        }
        self.items.push(value);
    }

    /// Make room for `extra` more elements without changing the length.
    pub fn reserve(&mut self, extra: usize) {
        let needed = self
            .items
            .len()
            .checked_add(extra)
            .expect("DynArray capacity overflow");
        if needed <= self.capacity {
            return;
        }
        let mut capacity = self.capacity;
        while capacity < needed {
            capacity = grown_capacity(capacity);
        }
        self.resize_capacity(capacity);
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    /// Overwrite the element at `index`, returning the previous one.
    pub fn set(&mut self, index: usize, value: T) -> Result<T, ArrayError> {
        self.check(index)?;
        Ok(core::mem::replace(&mut self.items[index], value))
    }

    /// Remove the element at `index`, shifting later elements down.
    pub fn remove(&mut self, index: usize) -> Result<T, ArrayError> {
        self.check(index)?;
        Ok(self.items.remove(index))
    }

    /// Remove the element at `index` by moving the last element into its
    /// place. O(1); does not preserve order.
    pub fn swap_remove(&mut self, index: usize) -> Result<T, ArrayError> {
        self.check(index)?;
        Ok(self.items.swap_remove(index))
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    /// Drop every element; capacity is kept.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }
}

impl<T: PartialEq> DynArray<T> {
    /// Position of the first element equal to `value`.
    pub fn find(&self, value: &T) -> Option<usize> {
        self.items.iter().position(|item| item == value)
    }

    pub fn contains(&self, value: &T) -> bool {
        self.find(value).is_some()
    }
}

impl<T> Default for DynArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

// A copy is sized to its contents.
impl<T: Clone> Clone for DynArray<T> {
    fn clone(&self) -> Self {
        let mut copy = Self::with_capacity(self.items.len());
        copy.items.extend(self.items.iter().cloned());
        copy
    }
}

impl<T: PartialEq> PartialEq for DynArray<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Eq> Eq for DynArray<T> {}

impl<T: fmt::Debug> fmt::Debug for DynArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}

impl<T> FromIterator<T> for DynArray<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let items: Vec<T> = iter.into_iter().collect();
        let capacity = items.len();
        Self { items, capacity }
    }
}

impl<T> Extend<T> for DynArray<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.push(item);
        }
    }
}

impl<'a, T> IntoIterator for &'a DynArray<T> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T> IntoIterator for DynArray<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Invariant: a zero-capacity array does not allocate until the first push,
    /// then grows by `floor(1.5 * capacity) + 1`.
    #[test]
    fn growth_follows_factor() {
        let mut a: DynArray<u32> = DynArray::new();
        assert_eq!(a.capacity(), 0);
        let mut seen = Vec::new();
        for i in 0..20 {
            a.push(i);
            if seen.last() != Some(&a.capacity()) {
                seen.push(a.capacity());
            }
        }
        assert_eq!(seen, vec![1, 2, 4, 7, 11, 17, 26]);
        assert!(a.len() <= a.capacity());
    }

    /// Invariant: checked accessors report out-of-bounds instead of panicking.
    #[test]
    fn out_of_bounds_is_an_error() {
        let mut a: DynArray<char> = ['a', 'b'].into_iter().collect();
        assert_eq!(a.get(2), None);
        assert_eq!(a.set(2, 'z'), Err(ArrayError::OutOfBounds { index: 2, len: 2 }));
        assert_eq!(a.remove(5), Err(ArrayError::OutOfBounds { index: 5, len: 2 }));
        assert!(a.swap_remove(2).is_err());
        assert_eq!(a.set(1, 'c'), Ok('b'));
        assert_eq!(a.as_slice(), &['a', 'c']);
    }

    /// Invariant: `remove` keeps order, `swap_remove` moves the last element in.
    #[test]
    fn remove_variants() {
        let mut a: DynArray<i32> = (0..5).collect();
        assert_eq!(a.remove(1), Ok(1));
        assert_eq!(a.as_slice(), &[0, 2, 3, 4]);
        assert_eq!(a.swap_remove(0), Ok(0));
        assert_eq!(a.as_slice(), &[4, 2, 3]);
    }

    /// Invariant: `find` returns the first equal element or `None`.
    #[test]
    fn find_is_linear_first_match() {
        let a: DynArray<(char, usize)> = [('a', 1), ('b', 2), ('a', 1)].into_iter().collect();
        assert_eq!(a.find(&('a', 1)), Some(0));
        assert_eq!(a.find(&('b', 2)), Some(1));
        assert_eq!(a.find(&('c', 0)), None);
    }

    /// Invariant: `reserve` makes room for the whole request without touching len.
    #[test]
    fn reserve_fits_request() {
        let mut a: DynArray<u8> = DynArray::with_capacity(2);
        a.push(1);
        a.reserve(10);
        assert_eq!(a.len(), 1);
        assert!(a.capacity() >= 11);
        let before = a.capacity();
        a.reserve(1);
        assert_eq!(a.capacity(), before);
    }

    /// Invariant: shrinking the capacity below the length drops the tail.
    #[test]
    fn resize_capacity_truncates() {
        let mut a: DynArray<u8> = (0..10).collect();
        a.resize_capacity(4);
        assert_eq!(a.capacity(), 4);
        assert_eq!(a.as_slice(), &[0, 1, 2, 3]);
        a.push(9);
        assert_eq!(a.capacity(), 7);
    }

    /// Invariant: clones are independent and sized to their contents.
    #[test]
    fn clone_is_independent() {
        let mut a: DynArray<String> = DynArray::with_capacity(16);
        a.push("x".into());
        let mut b = a.clone();
        b.push("y".into());
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 2);
        assert_eq!(a.capacity(), 16);
        assert_ne!(a, b);
    }
}
