//! Greedy token-budget batching.
//!
//! Splits an ordered sequence into contiguous batches whose estimated token
//! sum stays under a threshold. A batch always contains at least one item,
//! so a single oversized item still makes forward progress (the caller
//! decides how to shrink it).

use std::ops::Range;

/// One greedy batch: the item range and its estimated token sum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Half-open index range into the input sequence.
    pub range: Range<usize>,
    /// Estimated token sum of the items in `range`.
    pub tokens: usize,
}

impl Batch {
    /// Index of the first item after this batch.
    #[must_use]
    pub const fn next_start(&self) -> usize {
        self.range.end
    }

    /// Number of items in the batch.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.range.end - self.range.start
    }

    /// Returns true when the batch contains no items.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.range.start == self.range.end
    }
}

/// Returns the next greedy batch starting at `start`.
///
/// A batch closes as soon as adding the next item would reach the
/// threshold, so multi-item batches always sum strictly below it. The
/// first item is always taken, even when its estimate alone exceeds the
/// threshold; `batch.tokens` then reports the overshoot honestly.
///
/// Returns an empty batch at `start` when `start >= items.len()`.
pub fn next_batch<T, F>(items: &[T], estimate: F, threshold: usize, start: usize) -> Batch
where
    F: Fn(&T) -> usize,
{
    if start >= items.len() {
        return Batch {
            range: start..start,
            tokens: 0,
        };
    }

    let mut end = start;
    let mut tokens = 0usize;
    while end < items.len() {
        let item_tokens = estimate(&items[end]);
        if end > start && tokens + item_tokens >= threshold {
            break;
        }
        tokens += item_tokens;
        end += 1;
        // An oversized first item forms a batch of one.
        if tokens > threshold {
            break;
        }
    }

    Batch {
        range: start..end,
        tokens,
    }
}

/// Splits the whole sequence into consecutive greedy batches.
pub fn split_all<T, F>(items: &[T], estimate: F, threshold: usize) -> Vec<Batch>
where
    F: Fn(&T) -> usize,
{
    let mut batches = Vec::new();
    let mut start = 0;
    while start < items.len() {
        let batch = next_batch(items, &estimate, threshold, start);
        start = batch.next_start();
        batches.push(batch);
    }
    batches
}
