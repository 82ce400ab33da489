use std::num::NonZeroUsize;
use std::ops::Range;

/// Partition of `total` records into contiguous chunks of at most `chunk_size`.
///
/// Chunk indices are 1-based. The last chunk holds `total % chunk_size` records
/// when that is nonzero; an empty input yields no chunks at all.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    total: usize,
    chunk_size: NonZeroUsize,
}

/// One chunk of a [`ChunkPlan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSpan {
    /// 1-based position of the chunk.
    pub index: usize,
    pub range: Range<usize>,
    pub is_last: bool,
}

impl ChunkSpan {
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

impl ChunkPlan {
    pub fn new(total: usize, chunk_size: NonZeroUsize) -> Self {
        Self { total, chunk_size }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn chunk_size(&self) -> NonZeroUsize {
        self.chunk_size
    }

    pub fn chunk_count(&self) -> usize {
        self.total.div_ceil(self.chunk_size.get())
    }

    pub fn chunks(&self) -> ChunkIter {
        ChunkIter {
            plan: *self,
            next_start: 0,
            next_index: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChunkIter {
    plan: ChunkPlan,
    next_start: usize,
    next_index: usize,
}

impl Iterator for ChunkIter {
    type Item = ChunkSpan;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_start >= self.plan.total {
            return None;
        }
        let start = self.next_start;
        let end = start
            .saturating_add(self.plan.chunk_size.get())
            .min(self.plan.total);
        let span = ChunkSpan {
            index: self.next_index,
            range: start..end,
            is_last: end == self.plan.total,
        };
        self.next_start = end;
        self.next_index += 1;
        Some(span)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.plan.total.saturating_sub(self.next_start);
        let n = remaining.div_ceil(self.plan.chunk_size.get());
        (n, Some(n))
    }
}

impl ExactSizeIterator for ChunkIter {}
