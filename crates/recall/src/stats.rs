// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// Lookup counters of a [`MemoCache`](crate::MemoCache).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that found nothing, each followed by a run of the function body.
    pub misses: u64,
}

impl CacheStats {
    /// Total number of lookups.
    #[must_use]
    pub const fn lookups(&self) -> u64 {
        self.hits.saturating_add(self.misses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_sum_hits_and_misses() {
        let stats = CacheStats { hits: 3, misses: 2 };
        assert_eq!(stats.lookups(), 5);
        assert_eq!(CacheStats::default().lookups(), 0);
    }

    #[test]
    fn lookups_saturate() {
        let stats = CacheStats { hits: u64::MAX, misses: 1 };
        assert_eq!(stats.lookups(), u64::MAX);
    }
}
