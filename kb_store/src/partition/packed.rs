//! Packed Context Store - all contexts of a partition in one flat array.

use serde::{Deserialize, Serialize};
use std::ops::Range;

use super::check_offsets;
use crate::SymbolId;

/// Variable-length token sequences concatenated into a single `u32` buffer.
///
/// `offsets[i]` is where context `i` starts; it ends where context `i + 1`
/// starts, or at the end of the buffer for the last context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PackedContextsRepr")]
pub struct PackedContexts {
    tokens: Vec<SymbolId>,
    offsets: Vec<usize>,
}

impl PackedContexts {
    pub fn with_capacity(tokens: usize) -> Self {
        Self {
            tokens: Vec::with_capacity(tokens),
            offsets: Vec::new(),
        }
    }

    /// Append one context and return its index.
    pub fn push(&mut self, ids: impl IntoIterator<Item = SymbolId>) -> usize {
        let index = self.offsets.len();
        self.offsets.push(self.tokens.len());
        self.tokens.extend(ids);
        index
    }

    fn bounds(&self, index: usize) -> Option<Range<usize>> {
        let start = *self.offsets.get(index)?;
        let end = self
            .offsets
            .get(index + 1)
            .copied()
            .unwrap_or(self.tokens.len());
        Some(start..end)
    }

    pub fn get(&self, index: usize) -> Option<&[SymbolId]> {
        self.bounds(index).map(|range| &self.tokens[range])
    }

    /// Number of stored contexts.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Total tokens across all contexts.
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[SymbolId]> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// The whole token buffer, every context back to back.
    pub fn tokens(&self) -> &[SymbolId] {
        &self.tokens
    }

    /// Rewrite every stored token through `mapping[old] == new`.
    /// Offsets and lengths are untouched.
    pub(crate) fn remap(&mut self, mapping: &[SymbolId]) {
        for token in &mut self.tokens {
            *token = mapping[*token as usize];
        }
    }
}

#[derive(Deserialize)]
struct PackedContextsRepr {
    tokens: Vec<SymbolId>,
    offsets: Vec<usize>,
}

impl TryFrom<PackedContextsRepr> for PackedContexts {
    type Error = String;

    fn try_from(repr: PackedContextsRepr) -> Result<Self, Self::Error> {
        check_offsets("context", &repr.offsets, repr.tokens.len())?;
        Ok(Self {
            tokens: repr.tokens,
            offsets: repr.offsets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_get() {
        let mut packed = PackedContexts::default();
        assert_eq!(packed.push([1, 2, 3]), 0);
        assert_eq!(packed.push([4]), 1);
        assert_eq!(packed.push([5, 6]), 2);

        assert_eq!(packed.get(0), Some(&[1, 2, 3][..]));
        assert_eq!(packed.get(1), Some(&[4][..]));
        assert_eq!(packed.get(2), Some(&[5, 6][..]));
        assert_eq!(packed.get(3), None);
        assert_eq!(packed.len(), 3);
        assert_eq!(packed.token_count(), 6);
    }

    #[test]
    fn test_iter_restarts() {
        let mut packed = PackedContexts::default();
        packed.push([7, 8]);
        packed.push([9]);

        let first: Vec<_> = packed.iter().collect();
        let second: Vec<_> = packed.iter().collect();
        assert_eq!(first, second);
        assert_eq!(first, vec![&[7, 8][..], &[9][..]]);
    }

    #[test]
    fn test_remap_keeps_layout() {
        let mut packed = PackedContexts::default();
        packed.push([0, 1]);
        packed.push([2, 0, 2]);

        packed.remap(&[2, 0, 1]);

        assert_eq!(packed.get(0), Some(&[2, 0][..]));
        assert_eq!(packed.get(1), Some(&[1, 2, 1][..]));
    }

    #[test]
    fn test_repr_rejects_offsets_past_buffer() {
        let repr = PackedContextsRepr {
            tokens: vec![0],
            offsets: vec![5],
        };
        assert!(PackedContexts::try_from(repr).is_err());

        let repr = PackedContextsRepr {
            tokens: vec![0, 1, 2],
            offsets: vec![0, 2, 1],
        };
        assert!(PackedContexts::try_from(repr).is_err());
    }

    #[test]
    fn test_repr_accepts_pushed_layout() {
        let mut packed = PackedContexts::default();
        packed.push([3, 4]);
        packed.push([5]);

        let repr = PackedContextsRepr {
            tokens: packed.tokens().to_vec(),
            offsets: vec![0, 2],
        };
        assert_eq!(PackedContexts::try_from(repr), Ok(packed));
    }
}
