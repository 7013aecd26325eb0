//! Recursive breakdown of an attribute index
//!
//! Groups a [`Subset`] by an ordered list of dimensions, one tree level per
//! dimension. Leaves keep their subset so callers can list the raw items.

pub mod dimensions;

use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::index::{DimValue, Dimensioned, IndexError, Subset};

pub use dimensions::{item_descriptor, item_descriptors, GroupTitle, ItemDimension};

/// Sibling ordering, applied independently at every level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Descending by subset size
    Count,
    /// Ascending by display name
    Alpha,
    /// Ascending by the raw dimension value compared as a string
    #[default]
    Key,
}

impl SortMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::Count => "count",
            SortMode::Alpha => "alpha",
            SortMode::Key => "key",
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "count" => Ok(SortMode::Count),
            "alpha" => Ok(SortMode::Alpha),
            "key" => Ok(SortMode::Key),
            other => Err(format!("Unknown sort mode '{}'", other)),
        }
    }
}

type NameFn<'f> = Box<dyn Fn(DimValue) -> String + Send + Sync + 'f>;
type TitleFn<'f, T, D> =
    Box<dyn for<'s> Fn(DimValue, &str, &Subset<'s, T, D>) -> GroupTitle + Send + Sync + 'f>;

/// How one dimension is keyed, named and titled in the tree
pub struct DimensionDescriptor<'f, T, D> {
    pub dimension: D,
    name: NameFn<'f>,
    title: TitleFn<'f, T, D>,
}

impl<'f, T, D> DimensionDescriptor<'f, T, D> {
    pub fn new<N, L>(dimension: D, name: N, title: L) -> Self
    where
        N: Fn(DimValue) -> String + Send + Sync + 'f,
        L: for<'s> Fn(DimValue, &str, &Subset<'s, T, D>) -> GroupTitle + Send + Sync + 'f,
    {
        Self {
            dimension,
            name: Box::new(name),
            title: Box::new(title),
        }
    }

    /// Descriptor whose title is the plain [`GroupTitle::basic`] summary
    pub fn named<N>(dimension: D, name: N) -> Self
    where
        N: Fn(DimValue) -> String + Send + Sync + 'f,
        T: 'f,
        D: 'f,
    {
        Self::new(dimension, name, |_, name, subset| {
            GroupTitle::basic(name, subset.len())
        })
    }

    pub fn name(&self, value: DimValue) -> String {
        (self.name)(value)
    }
}

impl<T, D: fmt::Debug> fmt::Debug for DimensionDescriptor<'_, T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DimensionDescriptor")
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

/// One group in the breakdown tree
#[derive(Debug, Clone)]
pub struct BreakdownNode<'a, T, D> {
    pub key: DimValue,
    pub name: String,
    pub title: GroupTitle,
    pub subset: Subset<'a, T, D>,
    /// `None` at leaf depth; the subset's items are the leaf content
    pub children: Option<Vec<BreakdownNode<'a, T, D>>>,
}

impl<'a, T, D> BreakdownNode<'a, T, D>
where
    T: Dimensioned<D>,
    D: Copy + Eq + Hash + fmt::Debug,
{
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    pub fn len(&self) -> usize {
        self.subset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subset.is_empty()
    }

    /// Number of leaf groups under (and including) this node
    pub fn leaf_count(&self) -> usize {
        match &self.children {
            None => 1,
            Some(children) => children.iter().map(BreakdownNode::leaf_count).sum(),
        }
    }

    /// Items of this group, in arena order
    pub fn items(&self) -> Vec<&'a T> {
        self.subset.entries()
    }
}

/// Group `view` by `dimensions`, first dimension at the top level.
///
/// An empty dimension list or an empty view yields no nodes.
pub fn breakdown<'a, T, D>(
    view: &Subset<'a, T, D>,
    dimensions: &[DimensionDescriptor<'_, T, D>],
    sort: SortMode,
) -> Result<Vec<BreakdownNode<'a, T, D>>, IndexError>
where
    T: Dimensioned<D>,
    D: Copy + Eq + Hash + fmt::Debug,
{
    let Some((descriptor, rest)) = dimensions.split_first() else {
        return Ok(Vec::new());
    };
    if view.is_empty() {
        return Ok(Vec::new());
    }

    let mut nodes = Vec::new();
    for key in view.distinct_values(descriptor.dimension)? {
        let subset = view.get_subset(descriptor.dimension, &[key])?;
        let name = descriptor.name(key);
        let title = (descriptor.title)(key, &name, &subset);

        let children = if rest.is_empty() {
            None
        } else {
            Some(breakdown(&subset, rest, sort)?)
        };

        nodes.push(BreakdownNode {
            key,
            name,
            title,
            subset,
            children,
        });
    }

    sort_siblings(&mut nodes, sort);
    Ok(nodes)
}

// stable sorts: ties keep enumeration order
fn sort_siblings<T, D>(nodes: &mut [BreakdownNode<'_, T, D>], sort: SortMode) {
    match sort {
        SortMode::Count => nodes.sort_by(|a, b| b.subset.len().cmp(&a.subset.len())),
        SortMode::Alpha => nodes.sort_by(|a, b| a.name.cmp(&b.name)),
        SortMode::Key => nodes.sort_by_cached_key(|node| node.key.to_string()),
    }
}
