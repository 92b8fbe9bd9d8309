//! Recipient chunking.

use std::num::NonZeroUsize;

/// Split registration ids into contiguous chunks of at most `max` entries.
///
/// Order is preserved and nothing is deduplicated. An input whose length is
/// exactly `max` yields a single chunk; an empty input yields none.
pub fn chunks<T>(ids: &[T], max: NonZeroUsize) -> std::slice::Chunks<'_, T> {
    ids.chunks(max.get())
}

/// Number of chunks [`chunks`] produces for `len` ids.
pub fn chunk_count(len: usize, max: NonZeroUsize) -> usize {
    len.div_ceil(max.get())
}
