//! Data-parallel chunked loops for per-element filter bodies.
//!
//! A tuple range `[0, N)` is partitioned into contiguous disjoint
//! chunks; each worker writes only its own exclusive range of a
//! pre-sized output. The cancel token is polled at every chunk start;
//! chunks already dispatched run to completion, so cancellation is
//! best-effort and never rolls anything back. No ordering holds between
//! chunks.
//!
//! With the `parallel` feature the chunks run on a rayon pool;
//! otherwise the same loop runs sequentially.

use std::ops::Range;

use crate::filter::CancelToken;

/// Marker error for a loop stopped by the cancel token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cancelled")]
pub struct Cancelled;

/// Partition `[0, total)` into contiguous ranges of at most `chunk` elements.
pub fn chunk_ranges(total: usize, chunk: usize) -> Vec<Range<usize>> {
    let chunk = chunk.max(1);
    (0..total.div_ceil(chunk))
        .map(|i| (i * chunk)..((i + 1) * chunk).min(total))
        .collect()
}

/// Policy for running chunked loops.
#[derive(Debug, Clone)]
pub struct DataParallel {
    /// Worker count; `None` uses the pool default.
    pub parallelism: Option<usize>,
    /// Tuples per chunk.
    pub chunk_size: usize,
}

impl Default for DataParallel {
    fn default() -> Self {
        Self {
            parallelism: None,
            chunk_size: 4096,
        }
    }
}

impl DataParallel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parallelism(mut self, workers: usize) -> Self {
        self.parallelism = Some(workers);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Run `f` over every chunk of `[0, total)`.
    ///
    /// `f` must only touch state it owns for its range; per-call
    /// immutable inputs (lookup tables, bin edges) are computed by the
    /// caller before dispatch.
    pub fn for_each_chunk<F>(
        &self,
        total: usize,
        cancel: &CancelToken,
        f: F,
    ) -> Result<(), Cancelled>
    where
        F: Fn(Range<usize>) + Send + Sync,
    {
        self.drive(chunk_ranges(total, self.chunk_size), cancel, f)
    }

    /// Run `f` over disjoint mutable chunks of a pre-sized output slice.
    ///
    /// `stride` is the number of elements per tuple; `f` receives the
    /// first tuple index of its chunk and the chunk itself.
    pub fn for_each_slice_chunk<T, F>(
        &self,
        out: &mut [T],
        stride: usize,
        cancel: &CancelToken,
        f: F,
    ) -> Result<(), Cancelled>
    where
        T: Send,
        F: Fn(usize, &mut [T]) + Send + Sync,
    {
        let stride = stride.max(1);
        let step = self.chunk_size.max(1) * stride;

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;

            let run = || {
                out.par_chunks_mut(step).enumerate().try_for_each(
                    |(index, chunk)| {
                        if cancel.is_cancelled() {
                            return Err(Cancelled);
                        }
                        f(index * self.chunk_size.max(1), chunk);
                        Ok(())
                    },
                )
            };
            match self.build_pool() {
                Some(pool) => pool.install(run),
                None => run(),
            }
        }

        #[cfg(not(feature = "parallel"))]
        {
            for (index, chunk) in out.chunks_mut(step).enumerate() {
                if cancel.is_cancelled() {
                    return Err(Cancelled);
                }
                f(index * self.chunk_size.max(1), chunk);
            }
            Ok(())
        }
    }

    #[cfg(feature = "parallel")]
    fn build_pool(&self) -> Option<rayon::ThreadPool> {
        self.parallelism.and_then(|workers| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()
                .ok()
        })
    }

    #[cfg(feature = "parallel")]
    fn drive<F>(
        &self,
        ranges: Vec<Range<usize>>,
        cancel: &CancelToken,
        f: F,
    ) -> Result<(), Cancelled>
    where
        F: Fn(Range<usize>) + Send + Sync,
    {
        use rayon::prelude::*;

        let run = || {
            ranges.into_par_iter().try_for_each(|range| {
                if cancel.is_cancelled() {
                    return Err(Cancelled);
                }
                f(range);
                Ok(())
            })
        };
        match self.build_pool() {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn drive<F>(
        &self,
        ranges: Vec<Range<usize>>,
        cancel: &CancelToken,
        f: F,
    ) -> Result<(), Cancelled>
    where
        F: Fn(Range<usize>) + Send + Sync,
    {
        for range in ranges {
            if cancel.is_cancelled() {
                return Err(Cancelled);
            }
            f(range);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_chunk_ranges_cover_and_disjoint() {
        let ranges = chunk_ranges(10, 3);
        assert_eq!(ranges, vec![0..3, 3..6, 6..9, 9..10]);
        assert!(chunk_ranges(0, 3).is_empty());
        // Degenerate chunk size is clamped
        assert_eq!(chunk_ranges(2, 0), vec![0..1, 1..2]);
    }

    #[test]
    fn test_for_each_chunk_visits_everything() {
        let counted = AtomicUsize::new(0);
        let cancel = CancelToken::new();
        DataParallel::new()
            .with_chunk_size(7)
            .for_each_chunk(100, &cancel, |range| {
                counted.fetch_add(range.len(), Ordering::Relaxed);
            })
            .unwrap();
        assert_eq!(counted.load(Ordering::Relaxed), 100);
    }

    #[test]
    fn test_slice_chunks_write_disjoint_ranges() {
        let mut out = vec![0u32; 30];
        let cancel = CancelToken::new();
        DataParallel::new()
            .with_chunk_size(4)
            .for_each_slice_chunk(&mut out, 3, &cancel, |first_tuple, chunk| {
                for (i, v) in chunk.iter_mut().enumerate() {
                    *v = (first_tuple * 3 + i) as u32;
                }
            })
            .unwrap();
        let expected: Vec<u32> = (0..30).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_cancel_stops_before_next_chunk() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let touched = AtomicUsize::new(0);
        let result = DataParallel::new().for_each_chunk(10, &cancel, |_| {
            touched.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(result, Err(Cancelled));
        assert_eq!(touched.load(Ordering::Relaxed), 0);
    }
}
