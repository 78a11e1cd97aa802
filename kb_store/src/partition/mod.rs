//! Dataset partitions - independent packed storage per named dataset.
//!
//! A partition owns:
//! - **contexts**: every context's token ids in one flat array
//! - **spans**: span boundaries and answer ids in parallel flat arrays

mod packed;
mod spans;

pub use packed::*;
pub use spans::*;

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use crate::{KbConfig, Span, SymbolId};

/// How answers are stored for a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerMode {
    /// One answer-vocabulary id per span.
    Explicit,
    /// No answers stored; the token at each span start is the answer.
    DefaultFromSpanStart,
}

impl AnswerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerMode::Explicit => "explicit",
            AnswerMode::DefaultFromSpanStart => "defaulted",
        }
    }
}

/// Check a start-offset table over a flat array of `len` elements: offsets
/// begin at 0, never decrease and stay inside the array.
pub(crate) fn check_offsets(what: &str, offsets: &[usize], len: usize) -> Result<(), String> {
    if let Some(&first) = offsets.first() {
        if first != 0 {
            return Err(format!("first {what} starts at {first}, not 0"));
        }
    }
    if let Some(pair) = offsets.windows(2).find(|pair| pair[0] > pair[1]) {
        return Err(format!("{what} offsets decrease from {} to {}", pair[0], pair[1]));
    }
    match offsets.last() {
        Some(&last) if last > len => Err(format!("{what} offset {last} is past the end of {len} elements")),
        None if len > 0 => Err(format!("{len} elements stored without any {what} offsets")),
        _ => Ok(()),
    }
}

/// All stored data for one named dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PartitionRepr")]
pub struct Partition {
    name: String,
    contexts: PackedContexts,
    spans: SpanTable,
}

impl Partition {
    pub(crate) fn new(name: impl Into<String>, config: &KbConfig) -> Self {
        Self {
            name: name.into(),
            contexts: PackedContexts::with_capacity(config.token_capacity),
            spans: SpanTable::with_capacity(config.span_capacity),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of contexts in this partition.
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// The answer layout fixed by the first append, if any.
    pub fn answer_mode(&self) -> Option<AnswerMode> {
        if self.is_empty() {
            None
        } else if self.spans.has_answers() {
            Some(AnswerMode::Explicit)
        } else {
            Some(AnswerMode::DefaultFromSpanStart)
        }
    }

    pub fn contexts(&self) -> &PackedContexts {
        &self.contexts
    }

    pub fn span_table(&self) -> &SpanTable {
        &self.spans
    }

    pub fn context(&self, index: usize) -> Option<&[SymbolId]> {
        self.contexts.get(index)
    }

    pub fn spans(&self, index: usize) -> Option<(&[u32], &[u32])> {
        self.spans.get(index)
    }

    /// Answers of context `index`.
    ///
    /// Borrowed when explicit answers are stored; otherwise computed as the
    /// token id found at each span start.
    pub fn answers(&self, index: usize) -> Option<Cow<'_, [SymbolId]>> {
        if let Some(answers) = self.spans.answers(index) {
            return Some(Cow::Borrowed(answers));
        }
        let context = self.contexts.get(index)?;
        let (starts, _) = self.spans.get(index)?;
        Some(Cow::Owned(
            starts
                .iter()
                .filter_map(|&start| context.get(start as usize).copied())
                .collect(),
        ))
    }

    /// Append the tokens of an already-validated context and return its index.
    ///
    /// Must be followed by exactly one [`Partition::push_spans`] for the same
    /// context before the partition is read.
    pub(crate) fn push_context(&mut self, tokens: impl IntoIterator<Item = SymbolId>) -> usize {
        self.contexts.push(tokens)
    }

    pub(crate) fn push_spans(&mut self, spans: &[Span], answers: &[SymbolId]) {
        self.spans.push(spans, answers);
    }

    pub(crate) fn remap_tokens(&mut self, mapping: &[SymbolId]) {
        self.contexts.remap(mapping);
    }
}

#[derive(Deserialize)]
struct PartitionRepr {
    name: String,
    contexts: PackedContexts,
    spans: SpanTable,
}

impl TryFrom<PartitionRepr> for Partition {
    type Error = String;

    fn try_from(repr: PartitionRepr) -> Result<Self, Self::Error> {
        let PartitionRepr { name, contexts, spans } = repr;
        if contexts.len() != spans.len() {
            return Err(format!(
                "partition `{name}` has {} contexts but {} span blocks",
                contexts.len(),
                spans.len()
            ));
        }
        for (index, context) in contexts.iter().enumerate() {
            let (starts, ends) = spans.get(index).unwrap_or_default();
            if starts.is_empty() {
                return Err(format!("context {index} of `{name}` has no spans"));
            }
            let outside = starts
                .iter()
                .zip(ends)
                .any(|(&start, &end)| start >= end || end as usize > context.len());
            if outside {
                return Err(format!("context {index} of `{name}` has a span outside its tokens"));
            }
        }
        Ok(Self { name, contexts, spans })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partition() -> Partition {
        Partition::new("train", &KbConfig::default())
    }

    #[test]
    fn test_answer_mode_follows_first_append() {
        let mut explicit = partition();
        assert_eq!(explicit.answer_mode(), None);
        explicit.push_context([0, 1]);
        explicit.push_spans(&[(0, 1)], &[5]);
        assert_eq!(explicit.answer_mode(), Some(AnswerMode::Explicit));

        let mut defaulted = partition();
        defaulted.push_context([0, 1]);
        defaulted.push_spans(&[(0, 1)], &[]);
        assert_eq!(defaulted.answer_mode(), Some(AnswerMode::DefaultFromSpanStart));
    }

    #[test]
    fn test_default_answers_read_span_starts() {
        let mut part = partition();
        assert_eq!(part.push_context([10, 11, 12]), 0);
        part.push_spans(&[(1, 2), (0, 3)], &[]);

        let answers = part.answers(0).unwrap();
        assert!(matches!(answers, Cow::Owned(_)));
        assert_eq!(&*answers, &[11, 10]);
    }

    #[test]
    fn test_explicit_answers_are_borrowed() {
        let mut part = partition();
        part.push_context([10, 11]);
        part.push_spans(&[(0, 1)], &[3]);
        assert_eq!(part.push_context([12]), 1);
        part.push_spans(&[(0, 1)], &[4]);

        let answers = part.answers(1).unwrap();
        assert!(matches!(answers, Cow::Borrowed(_)));
        assert_eq!(&*answers, &[4]);
        assert!(part.answers(2).is_none());
    }

    #[test]
    fn test_check_offsets() {
        assert!(check_offsets("context", &[], 0).is_ok());
        assert!(check_offsets("context", &[0, 2, 2], 3).is_ok());
        assert!(check_offsets("context", &[1], 3).is_err());
        assert!(check_offsets("context", &[0, 3, 2], 3).is_err());
        assert!(check_offsets("context", &[0, 4], 3).is_err());
        assert!(check_offsets("context", &[], 2).is_err());
    }

    #[test]
    fn test_repr_rejects_spans_outside_context() {
        let mut contexts = PackedContexts::default();
        contexts.push([1, 2]);
        let mut spans = SpanTable::default();
        spans.push(&[(1, 3)], &[]);

        let repr = PartitionRepr {
            name: "train".into(),
            contexts,
            spans,
        };
        assert!(Partition::try_from(repr).is_err());
    }

    #[test]
    fn test_repr_rejects_missing_span_blocks() {
        let mut contexts = PackedContexts::default();
        contexts.push([1, 2]);
        contexts.push([3]);
        let mut spans = SpanTable::default();
        spans.push(&[(0, 1)], &[]);

        let repr = PartitionRepr {
            name: "train".into(),
            contexts,
            spans,
        };
        assert!(Partition::try_from(repr).is_err());
    }
}
