use super::Item;
use crate::engine::error::{Error, ErrorCode};
use std::sync::Arc;

/// Ordered, immutable collection of items.
///
/// The empty and singleton cases have their own representation; a longer sequence shares its
/// backing storage between clones so that focus sequences can be re-read cheaply.
#[derive(Debug, Clone)]
pub enum Sequence<N> {
    Empty,
    Singleton(Item<N>),
    Many(Arc<[Item<N>]>),
}

impl<N> Default for Sequence<N> {
    fn default() -> Self {
        Sequence::Empty
    }
}

impl<N> Sequence<N> {
    pub fn empty() -> Self {
        Sequence::Empty
    }

    /// A sequence of at most one item; `None` yields the empty sequence.
    pub fn of(item: impl Into<Option<Item<N>>>) -> Self {
        match item.into() {
            Some(it) => Sequence::Singleton(it),
            None => Sequence::Empty,
        }
    }

    pub fn from_vec(mut items: Vec<Item<N>>) -> Self {
        match items.len() {
            0 => Sequence::Empty,
            1 => match items.pop() {
                Some(it) => Sequence::Singleton(it),
                None => Sequence::Empty,
            },
            _ => Sequence::Many(items.into()),
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    pub fn as_slice(&self) -> &[Item<N>] {
        match self {
            Sequence::Empty => &[],
            Sequence::Singleton(it) => std::slice::from_ref(it),
            Sequence::Many(items) => items,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item<N>> {
        self.as_slice().iter()
    }

    pub fn first(&self) -> Option<&Item<N>> {
        self.as_slice().first()
    }

    /// The first item, requiring a singleton when `require_singleton` is set.
    pub fn first_item(&self, require_singleton: bool) -> Result<Option<&Item<N>>, Error> {
        if require_singleton && self.len() > 1 {
            return Err(Error::dynamic(
                ErrorCode::FORG0003,
                format!("expected at most one item, but the sequence has {} items", self.len()),
            ));
        }
        Ok(self.first())
    }
}

impl<N: Clone> Sequence<N> {
    /// Lazy traversal yielding owned items.
    pub fn stream(&self) -> impl Iterator<Item = Item<N>> + '_ {
        self.iter().cloned()
    }

    pub fn to_vec(&self) -> Vec<Item<N>> {
        self.as_slice().to_vec()
    }

    pub fn concat(&self, other: &Sequence<N>) -> Sequence<N> {
        match (self, other) {
            (Sequence::Empty, _) => other.clone(),
            (_, Sequence::Empty) => self.clone(),
            _ => self.stream().chain(other.stream()).collect(),
        }
    }
}

impl<N> FromIterator<Item<N>> for Sequence<N> {
    fn from_iter<T: IntoIterator<Item = Item<N>>>(iter: T) -> Self {
        Sequence::from_vec(iter.into_iter().collect())
    }
}

impl<N> From<Item<N>> for Sequence<N> {
    fn from(item: Item<N>) -> Self {
        Sequence::Singleton(item)
    }
}

impl<N> From<Vec<Item<N>>> for Sequence<N> {
    fn from(items: Vec<Item<N>>) -> Self {
        Sequence::from_vec(items)
    }
}

impl<N> From<super::AtomicItem> for Sequence<N> {
    fn from(a: super::AtomicItem) -> Self {
        Sequence::Singleton(Item::Atomic(a))
    }
}

impl<'a, N> IntoIterator for &'a Sequence<N> {
    type Item = &'a Item<N>;
    type IntoIter = std::slice::Iter<'a, Item<N>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<N: PartialEq> PartialEq for Sequence<N> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<N: Eq> Eq for Sequence<N> {}

impl<N: std::hash::Hash> std::hash::Hash for Sequence<N> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state);
    }
}
