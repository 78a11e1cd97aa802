//! Span/Answer Store - span boundaries and answer ids in parallel flat arrays.

use serde::{Deserialize, Serialize};
use std::ops::Range;

use super::check_offsets;
use crate::{Span, SymbolId};

/// Spans of every context in a partition.
///
/// `starts`, `ends` and (when populated) `answers` are aligned element-wise.
/// `offsets[i]` points at the first span of context `i` in those arrays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SpanTableRepr")]
pub struct SpanTable {
    starts: Vec<u32>,
    ends: Vec<u32>,
    answers: Vec<SymbolId>,
    offsets: Vec<usize>,
}

impl SpanTable {
    pub fn with_capacity(spans: usize) -> Self {
        Self {
            starts: Vec::with_capacity(spans),
            ends: Vec::with_capacity(spans),
            answers: Vec::new(),
            offsets: Vec::new(),
        }
    }

    /// Append the span block of one context and return where it starts.
    ///
    /// `answers` is either empty or exactly as long as `spans`.
    pub fn push(&mut self, spans: &[Span], answers: &[SymbolId]) -> usize {
        debug_assert!(answers.is_empty() || answers.len() == spans.len());
        let block_start = self.starts.len();
        self.offsets.push(block_start);
        for &(start, end) in spans {
            self.starts.push(start);
            self.ends.push(end);
        }
        self.answers.extend_from_slice(answers);
        block_start
    }

    fn bounds(&self, index: usize) -> Option<Range<usize>> {
        let start = *self.offsets.get(index)?;
        let end = self
            .offsets
            .get(index + 1)
            .copied()
            .unwrap_or(self.starts.len());
        Some(start..end)
    }

    /// Span starts and ends of context `index`.
    pub fn get(&self, index: usize) -> Option<(&[u32], &[u32])> {
        self.bounds(index)
            .map(|range| (&self.starts[range.clone()], &self.ends[range]))
    }

    /// Explicit answer ids of context `index`, if this table stores answers.
    pub fn answers(&self, index: usize) -> Option<&[SymbolId]> {
        if !self.has_answers() {
            return None;
        }
        self.bounds(index).map(|range| &self.answers[range])
    }

    /// Every stored answer id, aligned with the span arrays.
    pub fn answer_ids(&self) -> &[SymbolId] {
        &self.answers
    }

    pub fn has_answers(&self) -> bool {
        !self.answers.is_empty()
    }

    /// Number of span blocks (one per context).
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Total spans across all contexts.
    pub fn span_count(&self) -> usize {
        self.starts.len()
    }
}

#[derive(Deserialize)]
struct SpanTableRepr {
    starts: Vec<u32>,
    ends: Vec<u32>,
    answers: Vec<SymbolId>,
    offsets: Vec<usize>,
}

impl TryFrom<SpanTableRepr> for SpanTable {
    type Error = String;

    fn try_from(repr: SpanTableRepr) -> Result<Self, Self::Error> {
        if repr.starts.len() != repr.ends.len() {
            return Err(format!(
                "span table has {} starts but {} ends",
                repr.starts.len(),
                repr.ends.len()
            ));
        }
        if !repr.answers.is_empty() && repr.answers.len() != repr.starts.len() {
            return Err(format!(
                "span table has {} answers for {} spans",
                repr.answers.len(),
                repr.starts.len()
            ));
        }
        check_offsets("span block", &repr.offsets, repr.starts.len())?;
        Ok(Self {
            starts: repr.starts,
            ends: repr.ends,
            answers: repr.answers,
            offsets: repr.offsets,
        })
    }
}
