//! Order-preserving parallel maps over independent mesh entities
//!
//! Work runs on the global rayon pool. Output order always matches input
//! order, so results are identical with parallelism on or off.

use crate::config::ParallelConfig;
use rayon::prelude::*;

/// Map `f` over `0..n`, in parallel when enabled and `n` is large enough
pub fn parallel_map_range<U, F>(config: &ParallelConfig, n: usize, f: F) -> Vec<U>
where
    U: Send,
    F: Fn(usize) -> U + Sync + Send,
{
    if !config.enabled || n < config.min_chunk_size {
        return (0..n).map(f).collect();
    }
    (0..n)
        .into_par_iter()
        .with_min_len(config.min_chunk_size)
        .map(f)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parallel_map_preserves_order() {
        let config = ParallelConfig {
            enabled: true,
            min_chunk_size: 16,
        };
        let result = parallel_map_range(&config, 10_000, |i| i * 2);
        assert_eq!(result, (0..10_000).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_disabled_matches_enabled() {
        let on = ParallelConfig {
            enabled: true,
            min_chunk_size: 1,
        };
        let off = ParallelConfig {
            enabled: false,
            ..on
        };
        let f = |i: usize| (i as f64).sqrt();
        assert_eq!(parallel_map_range(&on, 5000, f), parallel_map_range(&off, 5000, f));
    }

    #[test]
    fn test_small_input() {
        let result = parallel_map_range(&ParallelConfig::default(), 3, |i| i + 2);
        assert_eq!(result, vec![2, 3, 4]);
    }
}
