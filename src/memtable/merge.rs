//! K-way merge over sorted version streams
//!
//! Used by the merge-on-read index (one stream per segment) and by the file
//! store (one stream per run). Streams are merged on internal-key order; on an
//! exact tie the lower source index comes first. Deduplication is left to the
//! scan collector, which needs every version to apply the snapshot bound.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use bytes::Bytes;

use crate::key::InternalKey;

/// A borrowed version: internal key and value (`None` = tombstone)
pub(crate) type Version<'a> = (&'a InternalKey, &'a Option<Bytes>);

struct HeapEntry<'a, I> {
    key: &'a InternalKey,
    value: &'a Option<Bytes>,
    source: usize,
    iter: I,
}

impl<I> PartialEq for HeapEntry<'_, I> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.source == other.source
    }
}

impl<I> Eq for HeapEntry<'_, I> {}

impl<I> PartialOrd for HeapEntry<'_, I> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// BinaryHeap is a max-heap; reverse so the smallest head is on top.
impl<I> Ord for HeapEntry<'_, I> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .key
            .cmp(self.key)
            .then_with(|| other.source.cmp(&self.source))
    }
}

/// Merges sorted version streams into one sorted stream
pub(crate) struct MergeIter<'a, I> {
    heap: BinaryHeap<HeapEntry<'a, I>>,
}

impl<'a, I> MergeIter<'a, I>
where
    I: Iterator<Item = Version<'a>>,
{
    /// Sources are numbered in iteration order for tie-breaking
    pub(crate) fn new(sources: impl IntoIterator<Item = I>) -> Self {
        let mut heap = BinaryHeap::new();
        for (source, mut iter) in sources.into_iter().enumerate() {
            if let Some((key, value)) = iter.next() {
                heap.push(HeapEntry {
                    key,
                    value,
                    source,
                    iter,
                });
            }
        }
        Self { heap }
    }
}

impl<'a, I> Iterator for MergeIter<'a, I>
where
    I: Iterator<Item = Version<'a>>,
{
    type Item = Version<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut smallest = self.heap.pop()?;
        let item = (smallest.key, smallest.value);

        if let Some((key, value)) = smallest.iter.next() {
            smallest.key = key;
            smallest.value = value;
            self.heap.push(smallest);
        }

        Some(item)
    }
}
