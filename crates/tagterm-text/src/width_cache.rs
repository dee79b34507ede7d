#![forbid(unsafe_code)]

//! LRU cache of markup line widths.
//!
//! Reflowing a view without wrapping only needs each line's stripped width,
//! and most lines do not change between rebuilds. Widths are cached per
//! grammar: the same text measures differently depending on which tag forms
//! are recognized.
//!
//! # Example
//! ```
//! use tagterm_text::markup::Grammar;
//! use tagterm_text::width_cache::WidthCache;
//!
//! let mut cache = WidthCache::new(64);
//!
//! assert_eq!(cache.markup_width("[red]Hello", Grammar::MARKUP), 5);
//! assert_eq!(cache.markup_width("[red]Hello", Grammar::PLAIN), 10);
//! assert_eq!(cache.markup_width("[red]Hello", Grammar::MARKUP), 5);
//!
//! let stats = cache.stats();
//! assert_eq!(stats.hits, 1);
//! assert_eq!(stats.misses, 2);
//! ```

use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;

use lru::LruCache;
use rustc_hash::FxHasher;

use crate::markup::{Decomposed, Grammar};

/// Default cache capacity.
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// Statistics about cache performance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Current number of entries.
    pub size: usize,
    /// Maximum capacity.
    pub capacity: usize,
}

/// LRU cache for text width measurements.
///
/// Keys are 64-bit FxHash values of the grammar and the text, not the text
/// itself.
#[derive(Debug)]
pub struct WidthCache {
    cache: LruCache<u64, usize>,
    hits: u64,
    misses: u64,
}

impl WidthCache {
    /// Create a cache holding up to `capacity` widths (at least 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(non_zero(capacity)),
            hits: 0,
            misses: 0,
        }
    }

    /// Stripped width of `text` under `grammar`.
    pub fn markup_width(&mut self, text: &str, grammar: Grammar) -> usize {
        let hash = hash_key(text, grammar);
        if let Some(&width) = self.cache.get(&hash) {
            self.hits += 1;
            return width;
        }
        self.misses += 1;
        let width = Decomposed::with_grammar(text, grammar).width;
        self.cache.put(hash, width);
        width
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            size: self.cache.len(),
            capacity: self.cache.cap().get(),
        }
    }
}

impl Default for WidthCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

fn non_zero(capacity: usize) -> NonZeroUsize {
    NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)
}

#[inline]
fn hash_key(text: &str, grammar: Grammar) -> u64 {
    let mut hasher = FxHasher::default();
    grammar.hash(&mut hasher);
    text.hash(&mut hasher);
    hasher.finish()
}
