//! Ready-made [`Store`] implementations.

use crate::fieldset::FieldSet;
use crate::model::Model;
use crate::scanner::Store;
use crate::types::ScanTarget;

/// Grow policy shared by the stores below: double, at least one slot.
fn grow(capacity: usize) -> usize {
    capacity.saturating_mul(2).max(1)
}

/// Collects whole models, scanning only the selected fields of each row.
#[derive(Debug, Clone)]
pub struct ModelStore<M> {
    pub models: Vec<M>,
    fields: FieldSet,
}

impl<M: Model + Default> ModelStore<M> {
    #[must_use]
    pub fn new(fields: FieldSet) -> Self {
        Self {
            models: Vec::new(),
            fields,
        }
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<M> {
        self.models
    }
}

impl<M: Model + Default> Store for ModelStore<M> {
    fn init(&mut self, capacity: usize) {
        self.models.clear();
        self.models.resize_with(capacity, M::default);
    }

    fn realloc(&mut self, capacity: usize) -> usize {
        let grown = grow(capacity);
        self.models.resize_with(grown, M::default);
        grown
    }

    fn ptrs<'a>(&'a mut self, index: usize, ptrs: &mut Vec<&'a mut dyn ScanTarget>) {
        self.models[index].ptrs(self.fields, ptrs);
    }

    fn finish(&mut self, len: usize) {
        self.models.truncate(len);
    }
}

/// Collects a single column.
#[derive(Debug, Clone, Default)]
pub struct ValueStore<T> {
    pub values: Vec<T>,
}

impl<T: ScanTarget + Default> ValueStore<T> {
    #[must_use]
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }
}

impl<T: ScanTarget + Default> Store for ValueStore<T> {
    fn init(&mut self, capacity: usize) {
        self.values.clear();
        self.values.resize_with(capacity, T::default);
    }

    fn realloc(&mut self, capacity: usize) -> usize {
        let grown = grow(capacity);
        self.values.resize_with(grown, T::default);
        grown
    }

    fn ptrs<'a>(&'a mut self, index: usize, ptrs: &mut Vec<&'a mut dyn ScanTarget>) {
        ptrs.push(&mut self.values[index]);
    }

    fn finish(&mut self, len: usize) {
        self.values.truncate(len);
    }
}

/// Collects two columns as parallel key and value vectors.
#[derive(Debug, Clone, Default)]
pub struct PairStore<K, V> {
    pub keys: Vec<K>,
    pub values: Vec<V>,
}

impl<K, V> PairStore<K, V>
where
    K: ScanTarget + Default,
    V: ScanTarget + Default,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            keys: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.keys.iter().zip(&self.values)
    }
}

impl<K, V> Store for PairStore<K, V>
where
    K: ScanTarget + Default,
    V: ScanTarget + Default,
{
    fn init(&mut self, capacity: usize) {
        self.keys.clear();
        self.values.clear();
        self.keys.resize_with(capacity, K::default);
        self.values.resize_with(capacity, V::default);
    }

    fn realloc(&mut self, capacity: usize) -> usize {
        let grown = grow(capacity);
        self.keys.resize_with(grown, K::default);
        self.values.resize_with(grown, V::default);
        grown
    }

    fn ptrs<'a>(&'a mut self, index: usize, ptrs: &mut Vec<&'a mut dyn ScanTarget>) {
        ptrs.push(&mut self.keys[index]);
        ptrs.push(&mut self.values[index]);
    }

    fn finish(&mut self, len: usize) {
        self.keys.truncate(len);
        self.values.truncate(len);
    }
}
