//! Multidimensional attribute index
//!
//! An [`AttributeIndex`] owns an ordered arena of items plus, for every
//! indexed dimension, a column of per-position values and a bucket map
//! `value -> positions`. A [`Subset`] is a borrowed view over the arena: a
//! reference to the index and the list of included positions. Narrowing a
//! subset only ever computes new position lists; items are never copied.
//!
//! ```text
//!   arena:    [ w0, w1, w2, w3, w4 ]
//!   slot:     { kinetic: [0, 3], energy: [1, 2], power: [4] }
//!   damage:   { solar: [0, 1], void: [2, 3, 4] }
//!
//!   all()                         -> [0, 1, 2, 3, 4]
//!   all().get_subset(slot, [kinetic, energy]) -> [0, 1, 2, 3]
//!        .get_subset(damage, [void])          -> [2, 3]
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

/// Raw value of a dimension (catalog hashes and enum discriminants are all numeric)
pub type DimValue = u32;

/// Items that expose a value for every dimension `D`.
pub trait Dimensioned<D> {
    fn dimension_value(&self, dimension: D) -> DimValue;
}

/// Errors raised by index queries. These signal configuration mistakes,
/// not data issues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    #[error("Dimension '{0}' is not indexed")]
    UnknownDimension(String),

    #[error("Position {position} is outside an index of {len} items")]
    PositionOutOfRange { position: usize, len: usize },
}

/// Per-dimension storage
#[derive(Debug, Clone)]
struct DimensionColumn {
    /// Value of each arena position
    values: Vec<DimValue>,
    /// value -> ascending arena positions
    buckets: HashMap<DimValue, Vec<usize>>,
}

/// Item arena plus per-dimension value indices
#[derive(Debug, Clone)]
pub struct AttributeIndex<T, D> {
    items: Vec<T>,
    dimensions: Vec<D>,
    columns: HashMap<D, DimensionColumn>,
}

impl<T, D> AttributeIndex<T, D>
where
    T: Dimensioned<D>,
    D: Copy + Eq + Hash + fmt::Debug,
{
    /// Build the index in one pass over `items` per dimension.
    pub fn build(items: Vec<T>, dimensions: &[D]) -> Self {
        let mut columns = HashMap::with_capacity(dimensions.len());
        let mut indexed = Vec::with_capacity(dimensions.len());

        for &dimension in dimensions {
            if columns.contains_key(&dimension) {
                continue;
            }

            let mut values = Vec::with_capacity(items.len());
            let mut buckets: HashMap<DimValue, Vec<usize>> = HashMap::new();
            for (position, item) in items.iter().enumerate() {
                let value = item.dimension_value(dimension);
                values.push(value);
                buckets.entry(value).or_default().push(position);
            }

            columns.insert(dimension, DimensionColumn { values, buckets });
            indexed.push(dimension);
        }

        tracing::debug!(
            items = items.len(),
            dimensions = indexed.len(),
            "Built attribute index"
        );

        Self {
            items,
            dimensions: indexed,
            columns,
        }
    }

    /// View over every item in the arena
    pub fn all(&self) -> Subset<'_, T, D> {
        Subset {
            index: self,
            positions: (0..self.items.len()).collect(),
        }
    }

    /// Positions of the whole arena whose `dimension` value is in `matching`.
    pub fn get_subset(
        &self,
        dimension: D,
        matching: &[DimValue],
    ) -> Result<Subset<'_, T, D>, IndexError> {
        self.all().get_subset(dimension, matching)
    }

    /// Distinct values present for `dimension` across the whole arena.
    /// Order is unspecified.
    pub fn values(&self, dimension: D) -> Result<Vec<DimValue>, IndexError> {
        Ok(self.column(dimension)?.buckets.keys().copied().collect())
    }

    pub fn value_at(&self, position: usize, dimension: D) -> Result<DimValue, IndexError> {
        self.column(dimension)?
            .values
            .get(position)
            .copied()
            .ok_or(IndexError::PositionOutOfRange {
                position,
                len: self.items.len(),
            })
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn dimensions(&self) -> &[D] {
        &self.dimensions
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn column(&self, dimension: D) -> Result<&DimensionColumn, IndexError> {
        self.columns
            .get(&dimension)
            .ok_or_else(|| IndexError::UnknownDimension(format!("{:?}", dimension)))
    }
}

/// Read-only view over part of an [`AttributeIndex`] arena
pub struct Subset<'a, T, D> {
    index: &'a AttributeIndex<T, D>,
    positions: Vec<usize>,
}

impl<'a, T, D> Subset<'a, T, D>
where
    T: Dimensioned<D>,
    D: Copy + Eq + Hash + fmt::Debug,
{
    /// Narrow this view to positions whose `dimension` value is in `matching`.
    ///
    /// Cost is proportional to the size of this view. Relative order of the
    /// retained positions is preserved.
    pub fn get_subset(
        &self,
        dimension: D,
        matching: &[DimValue],
    ) -> Result<Subset<'a, T, D>, IndexError> {
        let column = self.index.column(dimension)?;

        // the full view with a single value is exactly one bucket
        if self.positions.len() == self.index.items.len() && matching.len() == 1 {
            let positions = column.buckets.get(&matching[0]).cloned().unwrap_or_default();
            return Ok(self.narrowed(positions));
        }

        let wanted: HashSet<DimValue> = matching.iter().copied().collect();
        let positions = self
            .positions
            .iter()
            .copied()
            .filter(|&p| wanted.contains(&column.values[p]))
            .collect();

        Ok(self.narrowed(positions))
    }

    /// Distinct values of `dimension` in this view, in order of first appearance.
    pub fn distinct_values(&self, dimension: D) -> Result<Vec<DimValue>, IndexError> {
        let column = self.index.column(dimension)?;
        let mut seen = HashSet::new();

        Ok(self
            .positions
            .iter()
            .map(|&p| column.values[p])
            .filter(|value| seen.insert(*value))
            .collect())
    }

    fn narrowed(&self, positions: Vec<usize>) -> Subset<'a, T, D> {
        Subset {
            index: self.index,
            positions,
        }
    }
}

impl<'a, T, D> Subset<'a, T, D> {
    /// Items in this view, in arena order
    pub fn items(&self) -> impl Iterator<Item = &'a T> + '_ {
        let index: &'a AttributeIndex<T, D> = self.index;
        let items = &index.items;
        self.positions.iter().map(move |&p| &items[p])
    }

    pub fn entries(&self) -> Vec<&'a T> {
        self.items().collect()
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn index(&self) -> &'a AttributeIndex<T, D> {
        self.index
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl<T, D> Clone for Subset<'_, T, D> {
    fn clone(&self) -> Self {
        Self {
            index: self.index,
            positions: self.positions.clone(),
        }
    }
}

impl<T, D> fmt::Debug for Subset<'_, T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subset")
            .field("positions", &self.positions)
            .finish()
    }
}
