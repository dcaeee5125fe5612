//! One value per device.

use std::ops::{Index, IndexMut};

use crate::backend::SetIdx;

/// A container holding exactly one `T` per device, indexed by [`SetIdx`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSet<T> {
    data: Vec<T>,
}

impl<T> DataSet<T> {
    /// Build a data set by calling `f` for each device index.
    pub fn from_fn(count: usize, mut f: impl FnMut(SetIdx) -> T) -> Self {
        Self {
            data: (0..count).map(|i| f(SetIdx(i))).collect(),
        }
    }

    /// Wrap an existing vector (one entry per device).
    pub fn from_vec(data: Vec<T>) -> Self {
        Self { data }
    }

    /// Number of devices.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when no device is present.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Entry of one device.
    pub fn get(&self, idx: SetIdx) -> Option<&T> {
        self.data.get(idx.0)
    }

    /// Visit every entry with its device index.
    pub fn for_each(&self, mut f: impl FnMut(SetIdx, &T)) {
        for (i, v) in self.data.iter().enumerate() {
            f(SetIdx(i), v);
        }
    }

    /// Visit every entry mutably with its device index.
    pub fn for_each_mut(&mut self, mut f: impl FnMut(SetIdx, &mut T)) {
        for (i, v) in self.data.iter_mut().enumerate() {
            f(SetIdx(i), v);
        }
    }

    /// Transform every entry.
    pub fn map<U>(&self, mut f: impl FnMut(SetIdx, &T) -> U) -> DataSet<U> {
        DataSet {
            data: self.data.iter().enumerate().map(|(i, v)| f(SetIdx(i), v)).collect(),
        }
    }

    /// Iterate entries with their device index.
    pub fn iter(&self) -> impl Iterator<Item = (SetIdx, &T)> {
        self.data.iter().enumerate().map(|(i, v)| (SetIdx(i), v))
    }

    /// Entries as a slice.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Consume into the underlying vector.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

impl<T> Index<SetIdx> for DataSet<T> {
    type Output = T;

    fn index(&self, idx: SetIdx) -> &T {
        &self.data[idx.0]
    }
}

impl<T> IndexMut<SetIdx> for DataSet<T> {
    fn index_mut(&mut self, idx: SetIdx) -> &mut T {
        &mut self.data[idx.0]
    }
}

impl<T> IntoIterator for DataSet<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.into_iter()
    }
}
