//! Property-based tests for the chunking planner

use proptest::prelude::*;
use rowboat_core::{ChunkCoordinates, ChunkPlan};

proptest! {
    #[test]
    fn planner_is_idempotent(
        input_size in 0usize..(1usize << 34),
        mean_line_len in 1.0f64..100_000.0,
        nthreads in 1usize..256,
    ) {
        let a = ChunkPlan::new(input_size, mean_line_len, nthreads);
        let b = ChunkPlan::new(input_size, mean_line_len, nthreads);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn planner_never_exceeds_requested_threads(
        input_size in 0usize..(1usize << 34),
        mean_line_len in 1.0f64..100_000.0,
        nthreads in 1usize..256,
    ) {
        let plan = ChunkPlan::new(input_size, mean_line_len, nthreads);
        prop_assert!(plan.nthreads >= 1);
        prop_assert!(plan.nthreads <= nthreads);
    }

    #[test]
    fn chunk_count_divides_evenly_or_threads_shrink(
        input_size in 0usize..(1usize << 34),
        mean_line_len in 1.0f64..100_000.0,
        nthreads in 1usize..256,
    ) {
        let plan = ChunkPlan::new(input_size, mean_line_len, nthreads);
        if plan.nthreads == nthreads {
            prop_assert_eq!(plan.chunk_count % plan.nthreads, 0);
        } else {
            // Thread reduction only happens when there are fewer chunks
            // than requested workers.
            prop_assert_eq!(plan.nthreads, plan.chunk_count);
        }
    }

    #[test]
    fn nominal_chunks_tile_the_input(
        input_size in 1usize..(1usize << 32),
        mean_line_len in 1.0f64..100_000.0,
        nthreads in 1usize..256,
    ) {
        let plan = ChunkPlan::new(input_size, mean_line_len, nthreads);
        // chunk_size is the floor share; the final chunk absorbs the
        // remainder, so chunk_size * chunk_count never overshoots and the
        // shortfall is always less than one extra chunk.
        let covered = plan.chunk_size * plan.chunk_count;
        prop_assert!(covered <= input_size);
        prop_assert!(input_size - covered < plan.chunk_count.max(1));
    }

    #[test]
    fn degenerate_line_length_is_clamped(
        input_size in 0usize..(1usize << 30),
        mean_line_len in -1000.0f64..1.0,
        nthreads in 1usize..64,
    ) {
        let clamped = ChunkPlan::new(input_size, mean_line_len, nthreads);
        let unit = ChunkPlan::new(input_size, 1.0, nthreads);
        prop_assert_eq!(clamped, unit);
    }
}

proptest! {
    #[test]
    fn coordinates_len_matches_range(start in 0usize..1_000_000, len in 0usize..1_000_000) {
        let c = ChunkCoordinates::exact(start, start + len);
        prop_assert_eq!(c.len(), len);
        prop_assert_eq!(c.is_empty(), len == 0);
    }
}
