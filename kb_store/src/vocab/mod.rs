//! Vocabulary Index - bidirectional symbol <-> id mapping with frequency counts.

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashMap;

use crate::SymbolId;

/// Sentinel returned by [`Vocabulary::id_or`] callers that want the
/// conventional "not found" id.
pub const NO_ID: SymbolId = SymbolId::MAX;

/// An append-only vocabulary.
///
/// Ids are assigned densely in first-seen order: the n-th distinct symbol
/// interned gets id `n`. `symbols`, `counts` and the lookup map always have
/// the same length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "VocabularyRepr", into = "VocabularyRepr")]
pub struct Vocabulary {
    symbols: Vec<String>,
    counts: Vec<u64>,
    ids: HashMap<String, SymbolId>,
}

impl Vocabulary {
    /// Create a new empty vocabulary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id of `symbol`, adding it if unseen, and bump its count.
    pub fn intern(&mut self, symbol: &str) -> SymbolId {
        let id = match self.ids.get(symbol) {
            Some(&id) => id,
            None => {
                let id = self.symbols.len() as SymbolId;
                self.ids.insert(symbol.to_owned(), id);
                self.symbols.push(symbol.to_owned());
                self.counts.push(0);
                id
            }
        };
        self.counts[id as usize] += 1;
        id
    }

    /// Look up a symbol without mutating anything.
    pub fn id(&self, symbol: &str) -> Option<SymbolId> {
        self.ids.get(symbol).copied()
    }

    /// Look up a symbol, returning `fallback` when it is absent.
    pub fn id_or(&self, symbol: &str, fallback: SymbolId) -> SymbolId {
        self.id(symbol).unwrap_or(fallback)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.ids.contains_key(symbol)
    }

    /// Resolve an id back to its symbol.
    pub fn symbol(&self, id: SymbolId) -> Option<&str> {
        self.symbols.get(id as usize).map(String::as_str)
    }

    /// Number of times the symbol with this id was interned.
    pub fn count(&self, id: SymbolId) -> Option<u64> {
        self.counts.get(id as usize).copied()
    }

    /// All symbols, indexed by id.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// All counts, indexed by id.
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Renumber ids so that id 0 is the most frequent symbol.
    ///
    /// Ties keep their original relative order. Returns the remap table:
    /// `mapping[old_id] == new_id`.
    pub fn order_by_frequency(&mut self) -> Vec<SymbolId> {
        let mut order: Vec<usize> = (0..self.symbols.len()).collect();
        order.sort_by_key(|&old| Reverse(self.counts[old]));

        let mut mapping = vec![0; order.len()];
        for (new, &old) in order.iter().enumerate() {
            mapping[old] = new as SymbolId;
        }

        let mut old_symbols = std::mem::take(&mut self.symbols);
        self.symbols = order
            .iter()
            .map(|&old| std::mem::take(&mut old_symbols[old]))
            .collect();
        self.counts = order.iter().map(|&old| self.counts[old]).collect();
        for id in self.ids.values_mut() {
            *id = mapping[*id as usize];
        }

        mapping
    }
}

/// On-disk form: the lookup map is rebuilt on load instead of stored.
#[derive(Serialize, Deserialize)]
struct VocabularyRepr {
    symbols: Vec<String>,
    counts: Vec<u64>,
}

impl From<Vocabulary> for VocabularyRepr {
    fn from(vocab: Vocabulary) -> Self {
        Self {
            symbols: vocab.symbols,
            counts: vocab.counts,
        }
    }
}

impl TryFrom<VocabularyRepr> for Vocabulary {
    type Error = String;

    fn try_from(repr: VocabularyRepr) -> Result<Self, Self::Error> {
        if repr.symbols.len() != repr.counts.len() {
            return Err(format!(
                "vocabulary has {} symbols but {} counts",
                repr.symbols.len(),
                repr.counts.len()
            ));
        }
        let mut ids = HashMap::with_capacity(repr.symbols.len());
        for (id, symbol) in repr.symbols.iter().enumerate() {
            if ids.insert(symbol.clone(), id as SymbolId).is_some() {
                return Err(format!("duplicate vocabulary symbol `{symbol}`"));
            }
        }
        Ok(Self {
            symbols: repr.symbols,
            counts: repr.counts,
            ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_assigns_sequential_ids() {
        let mut vocab = Vocabulary::new();
        assert_eq!(vocab.intern("a"), 0);
        assert_eq!(vocab.intern("b"), 1);
        assert_eq!(vocab.intern("a"), 0);

        assert_eq!(vocab.len(), 2);
        assert_eq!(vocab.count(0), Some(2));
        assert_eq!(vocab.count(1), Some(1));
        assert_eq!(vocab.symbol(1), Some("b"));
    }

    #[test]
    fn test_lookup_does_not_mutate() {
        let mut vocab = Vocabulary::new();
        vocab.intern("x");

        assert_eq!(vocab.id("x"), Some(0));
        assert_eq!(vocab.id("y"), None);
        assert_eq!(vocab.id_or("y", NO_ID), NO_ID);
        assert_eq!(vocab.len(), 1);
        assert_eq!(vocab.count(0), Some(1));
    }

    #[test]
    fn test_order_by_frequency() {
        let mut vocab = Vocabulary::new();
        for symbol in ["rare", "common", "tie1", "common", "tie2", "common", "tie1", "tie2"] {
            vocab.intern(symbol);
        }

        let mapping = vocab.order_by_frequency();

        assert_eq!(vocab.symbols(), ["common", "tie1", "tie2", "rare"]);
        assert_eq!(vocab.counts(), [3, 2, 2, 1]);
        assert_eq!(mapping, vec![3, 0, 1, 2]);
        for (id, symbol) in vocab.symbols().iter().enumerate() {
            assert_eq!(vocab.id(symbol), Some(id as SymbolId));
        }
    }

    #[test]
    fn test_repr_rejects_duplicates() {
        let repr = VocabularyRepr {
            symbols: vec!["a".into(), "a".into()],
            counts: vec![1, 1],
        };
        assert!(Vocabulary::try_from(repr).is_err());
    }

    #[test]
    fn test_repr_rebuilds_ids() {
        let mut vocab = Vocabulary::new();
        vocab.intern("alpha");
        vocab.intern("beta");

        let rebuilt = Vocabulary::try_from(VocabularyRepr::from(vocab.clone())).unwrap();
        assert_eq!(rebuilt, vocab);
        assert_eq!(rebuilt.id("beta"), Some(1));
    }
}
