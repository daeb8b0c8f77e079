//! String interner implementation using DashMap for concurrent access.
//!
//! The table is global: symbols from one program remain valid in another,
//! which lets the evaluator cache parsed imports across runs. Interned
//! strings are leaked intentionally to obtain `'static` references; the
//! table lives for the whole process and entries are never removed.
//!
//! # Thread safety
//!
//! Fully `Sync + Send`. Lookups go through a lock-free `DashMap`; the
//! reverse index (symbol -> string) is an append-only vector behind a
//! `parking_lot::RwLock`, write-locked only on a genuine miss.

use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::LazyLock;

use super::Symbol;

/// Strings interned at table construction, in index order.
///
/// The order must match the constants in [`super::kw`].
pub(super) const KNOWN_SYMBOLS: [&str; super::kw::COUNT] = [
    "define", "option", "for", "if", "else", "switch", "case", "import", "and", "or", "not", "to",
    "step", "in", "true", "false",
];

/// Global string table instance.
pub static STRING_TABLE: LazyLock<StringTable> = LazyLock::new(StringTable::with_known_symbols);

/// Thread-safe string table.
pub struct StringTable {
    /// Forward map: string -> symbol index.
    map: DashMap<&'static str, u32, RandomState>,

    /// Reverse map: symbol index -> string. Append-only.
    strings: RwLock<Vec<&'static str>>,

    /// Number of intern calls that found an existing entry.
    hits: AtomicUsize,

    /// Number of intern calls that allocated a new entry.
    misses: AtomicUsize,
}

impl StringTable {
    fn with_known_symbols() -> Self {
        let table = Self {
            map: DashMap::with_capacity_and_hasher(256, RandomState::new()),
            strings: RwLock::new(Vec::with_capacity(256)),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        };
        for name in KNOWN_SYMBOLS {
            table.intern(name);
        }
        table
    }

    /// Intern a string, returning its symbol.
    pub fn intern(&self, string: &str) -> Symbol {
        if let Some(index) = self.map.get(string) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Symbol(*index);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let mut strings = self.strings.write();
        // A racing writer may have inserted between the read miss and
        // taking the write lock.
        if let Some(index) = self.map.get(string) {
            return Symbol(*index);
        }
        let leaked: &'static str = Box::leak(string.to_owned().into_boxed_str());
        let index = strings.len() as u32;
        strings.push(leaked);
        self.map.insert(leaked, index);
        Symbol(index)
    }

    /// Resolve a symbol back to its string.
    ///
    /// # Panics
    ///
    /// Panics if the symbol did not come from this table. Symbols are only
    /// constructed through [`Symbol::intern`], so this cannot happen in
    /// safe code.
    pub fn resolve(&self, symbol: Symbol) -> &'static str {
        self.strings.read()[symbol.0 as usize]
    }

    /// Number of distinct strings interned.
    pub fn len(&self) -> usize {
        self.strings.read().len()
    }

    /// Whether the table is empty (never true after construction).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// (hits, misses) counters, for profiling.
    pub fn stats(&self) -> (usize, usize) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_symbols_are_pre_interned() {
        // Interning a keyword must not grow the table.
        let before = STRING_TABLE.len();
        let sym = STRING_TABLE.intern("switch");
        assert_eq!(STRING_TABLE.len(), before);
        assert_eq!(STRING_TABLE.resolve(sym), "switch");
    }

    #[test]
    fn concurrent_interning_agrees() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| STRING_TABLE.intern("concurrent_probe")))
            .collect();
        let symbols: Vec<Symbol> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(symbols.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn stats_track_hits() {
        STRING_TABLE.intern("stats_probe");
        let (hits_before, _) = STRING_TABLE.stats();
        STRING_TABLE.intern("stats_probe");
        let (hits_after, _) = STRING_TABLE.stats();
        assert!(hits_after > hits_before);
    }
}
