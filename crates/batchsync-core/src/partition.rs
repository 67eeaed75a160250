// Batch partitioning
//
// Splits an ordered record collection into contiguous, non-overlapping batches.
// Only the first batch of a collection carries the reset flag.

use std::num::NonZeroUsize;

use serde::Serialize;

use crate::record::Record;

/// A bounded slice of the collection, sent in one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Zero-based position in the session.
    pub index: usize,
    /// Instructs the destination to discard previously stored data first.
    pub reset: bool,
    pub records: Vec<Record>,
}

impl Batch {
    fn new(index: usize, records: Vec<Record>) -> Self {
        Self {
            index,
            reset: index == 0,
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// One-based batch number, as shown in progress logs.
    pub fn number(&self) -> usize {
        self.index + 1
    }

    /// Wire body: the records as a JSON array.
    pub fn body(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&BatchBody(&self.records))
    }
}

#[derive(Serialize)]
#[serde(transparent)]
struct BatchBody<'a>(&'a [Record]);

/// Number of batches `len` records split into: ⌈len / size⌉.
pub fn batch_count(len: usize, size: NonZeroUsize) -> usize {
    len.div_ceil(size.get())
}

/// Split `records` into batches of at most `size`, preserving order.
///
/// An empty collection yields no batches.
pub fn partition(records: Vec<Record>, size: NonZeroUsize) -> Vec<Batch> {
    let mut batches = Vec::with_capacity(batch_count(records.len(), size));
    let mut rows = records.into_iter().peekable();

    while rows.peek().is_some() {
        let chunk: Vec<Record> = rows.by_ref().take(size.get()).collect();
        batches.push(Batch::new(batches.len(), chunk));
    }

    batches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| Record::new().with("seq", i as i64))
            .collect()
    }

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_thousand_records_in_quarters() {
        let batches = partition(records(1000), size(250));
        let sizes: Vec<_> = batches.iter().map(Batch::len).collect();
        assert_eq!(sizes, vec![250, 250, 250, 250]);
    }

    #[test]
    fn test_small_collection_is_single_reset_batch() {
        let batches = partition(records(10), size(250));
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 10);
        assert!(batches[0].reset);
    }

    #[test]
    fn test_empty_collection_yields_no_batches() {
        assert!(partition(Vec::new(), size(100)).is_empty());
        assert_eq!(batch_count(0, size(100)), 0);
    }

    #[test]
    fn test_only_first_batch_resets() {
        let batches = partition(records(501), size(100));
        assert_eq!(batches.len(), 6);
        assert_eq!(batches.iter().filter(|b| b.reset).count(), 1);
        assert!(batches[0].reset);
        assert_eq!(batches.last().unwrap().len(), 1);
    }

    #[test]
    fn test_concatenation_reconstructs_input() {
        for n in [0usize, 1, 99, 100, 101, 250, 777] {
            for s in [1usize, 7, 100, 250, 500] {
                let input = records(n);
                let batches = partition(input.clone(), size(s));
                assert_eq!(batches.len(), batch_count(n, size(s)), "n={n} size={s}");
                assert!(batches.iter().all(|b| !b.is_empty() && b.len() <= s));
                assert!(batches.iter().enumerate().all(|(i, b)| b.index == i));
                let rebuilt: Vec<Record> =
                    batches.into_iter().flat_map(|b| b.records).collect();
                assert_eq!(rebuilt, input, "n={n} size={s}");
            }
        }
    }

    #[test]
    fn test_body_is_json_array() {
        let batches = partition(records(2), size(5));
        let body = batches[0].body().unwrap();
        assert_eq!(body, br#"[{"seq":0},{"seq":1}]"#.to_vec());
    }
}
