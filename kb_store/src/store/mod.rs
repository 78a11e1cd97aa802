//! The knowledge base - vocabularies plus one packed partition per dataset.

mod reorder;
mod shared;

pub use shared::*;

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::{debug, warn};

use crate::{AnswerMode, KbConfig, KbError, Partition, Result, Span, SymbolId, Vocabulary};

/// Answers supplied alongside the spans of a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answers<'a> {
    /// One answer string per span.
    Explicit(&'a [&'a str]),
    /// The token at each span start is the answer.
    DefaultFromSpanStart,
}

impl<'a> From<Option<&'a [&'a str]>> for Answers<'a> {
    fn from(answers: Option<&'a [&'a str]>) -> Self {
        answers.map_or(Answers::DefaultFromSpanStart, Answers::Explicit)
    }
}

impl Answers<'_> {
    fn mode(&self) -> AnswerMode {
        match self {
            Answers::Explicit(_) => AnswerMode::Explicit,
            Answers::DefaultFromSpanStart => AnswerMode::DefaultFromSpanStart,
        }
    }
}

/// A knowledge base of contexts with points of interest.
///
/// Appends take `&mut self`; wrap the store in a [`SharedKnowledgeBase`] to
/// load from several threads at once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "KnowledgeBaseRepr")]
pub struct KnowledgeBase {
    config: KbConfig,
    vocab: Vocabulary,
    answer_vocab: Vocabulary,
    /// In creation order.
    partitions: Vec<Partition>,
    max_context_length: usize,
    max_span_count: usize,
    ordered: bool,
}

impl KnowledgeBase {
    /// Create a new empty knowledge base.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: KbConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &KbConfig {
        &self.config
    }

    /// Add a context with its spans of interest to `dataset`.
    ///
    /// Returns the index of the new context within its partition. All input
    /// is validated before anything is written, so on error the store is
    /// unchanged.
    pub fn add<S: AsRef<str>>(
        &mut self,
        context: &[S],
        spans: &[Span],
        answers: Answers<'_>,
        dataset: &str,
    ) -> Result<usize> {
        if let Err(err) = self.validate(context.len(), spans, &answers, dataset) {
            warn!(dataset, error = %err, "rejected context");
            return Err(err);
        }

        self.ordered = false;
        let slot = self.partition_slot(dataset);
        let vocab = &mut self.vocab;
        let partition = &mut self.partitions[slot];

        let index = partition.push_context(context.iter().map(|token| vocab.intern(token.as_ref())));
        let answer_ids: Vec<SymbolId> = match answers {
            Answers::Explicit(names) => names
                .iter()
                .map(|name| {
                    // answers share embeddings with context tokens
                    vocab.intern(name);
                    self.answer_vocab.intern(name)
                })
                .collect(),
            Answers::DefaultFromSpanStart => Vec::new(),
        };
        partition.push_spans(spans, &answer_ids);

        self.max_context_length = self.max_context_length.max(context.len());
        self.max_span_count = self.max_span_count.max(spans.len());
        Ok(index)
    }

    fn validate(
        &self,
        context_len: usize,
        spans: &[Span],
        answers: &Answers<'_>,
        dataset: &str,
    ) -> Result<()> {
        if spans.is_empty() {
            return Err(KbError::NoSpans);
        }
        if context_len == 0 {
            return Err(KbError::EmptyContext);
        }
        if let Some(&(start, end)) = spans
            .iter()
            .find(|&&(start, end)| start >= end || end as usize > context_len)
        {
            return Err(KbError::SpanOutOfBounds {
                start,
                end,
                len: context_len,
            });
        }
        if let Answers::Explicit(names) = answers {
            if names.len() != spans.len() {
                return Err(KbError::AnswerCountMismatch {
                    spans: spans.len(),
                    answers: names.len(),
                });
            }
        }
        if let Some(existing) = self.partition(dataset).and_then(Partition::answer_mode) {
            if existing != answers.mode() {
                return Err(KbError::AnswerModeMismatch {
                    dataset: dataset.to_string(),
                    expected: existing.as_str(),
                });
            }
        }
        Ok(())
    }

    fn partition_slot(&mut self, dataset: &str) -> usize {
        if let Some(slot) = self.partitions.iter().position(|p| p.name() == dataset) {
            return slot;
        }
        debug!(dataset, "creating partition");
        self.partitions.push(Partition::new(dataset, &self.config));
        self.partitions.len() - 1
    }

    /// Get the partition for a dataset, if anything was added to it.
    pub fn partition(&self, dataset: &str) -> Option<&Partition> {
        self.partitions.iter().find(|p| p.name() == dataset)
    }

    fn existing_partition(&self, dataset: &str) -> Result<&Partition> {
        self.partition(dataset)
            .ok_or_else(|| KbError::UnknownDataset(dataset.to_string()))
    }

    fn out_of_range(dataset: &str, index: usize, len: usize) -> KbError {
        KbError::IndexOutOfRange {
            dataset: dataset.to_string(),
            index,
            len,
        }
    }

    /// Names of all partitions, in creation order.
    pub fn datasets(&self) -> impl Iterator<Item = &str> + '_ {
        self.partitions.iter().map(Partition::name)
    }

    /// Token ids of context `index`.
    pub fn context(&self, index: usize, dataset: &str) -> Result<&[SymbolId]> {
        let partition = self.existing_partition(dataset)?;
        partition
            .context(index)
            .ok_or_else(|| Self::out_of_range(dataset, index, partition.len()))
    }

    /// Span starts and ends of context `index`.
    pub fn spans(&self, index: usize, dataset: &str) -> Result<(&[u32], &[u32])> {
        let partition = self.existing_partition(dataset)?;
        partition
            .spans(index)
            .ok_or_else(|| Self::out_of_range(dataset, index, partition.len()))
    }

    /// Answer ids of context `index`.
    ///
    /// Explicit answers are ids into [`KnowledgeBase::answer_vocab`]; when the
    /// partition stores none, these are word ids of the tokens at the span
    /// starts.
    pub fn answers(&self, index: usize, dataset: &str) -> Result<Cow<'_, [SymbolId]>> {
        let partition = self.existing_partition(dataset)?;
        partition
            .answers(index)
            .ok_or_else(|| Self::out_of_range(dataset, index, partition.len()))
    }

    /// Number of contexts in `dataset`; 0 for unknown datasets.
    pub fn num_contexts(&self, dataset: &str) -> usize {
        self.partition(dataset).map_or(0, Partition::len)
    }

    pub fn iter_contexts<'a>(&'a self, dataset: &str) -> impl Iterator<Item = &'a [SymbolId]> + 'a {
        self.partition(dataset)
            .into_iter()
            .flat_map(|p| p.contexts().iter())
    }

    pub fn iter_spans<'a>(
        &'a self,
        dataset: &str,
    ) -> impl Iterator<Item = (&'a [u32], &'a [u32])> + 'a {
        self.partition(dataset)
            .into_iter()
            .flat_map(|p| (0..p.len()).filter_map(move |i| p.spans(i)))
    }

    pub fn iter_answers<'a>(
        &'a self,
        dataset: &str,
    ) -> impl Iterator<Item = Cow<'a, [SymbolId]>> + 'a {
        self.partition(dataset)
            .into_iter()
            .flat_map(|p| (0..p.len()).filter_map(move |i| p.answers(i)))
    }

    /// Length of the longest context ever added.
    pub fn max_context_length(&self) -> usize {
        self.max_context_length
    }

    /// Largest number of spans ever added for one context.
    pub fn max_span_count(&self) -> usize {
        self.max_span_count
    }

    pub fn is_ordered(&self) -> bool {
        self.ordered
    }

    pub fn id(&self, word: &str) -> Option<SymbolId> {
        self.vocab.id(word)
    }

    pub fn id_or(&self, word: &str, fallback: SymbolId) -> SymbolId {
        self.vocab.id_or(word, fallback)
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    /// How often a word id was seen, including as an answer.
    pub fn count(&self, id: SymbolId) -> Option<u64> {
        self.vocab.count(id)
    }

    pub fn answer_count(&self, id: SymbolId) -> Option<u64> {
        self.answer_vocab.count(id)
    }

    pub fn answer_id(&self, answer: &str) -> Option<SymbolId> {
        self.answer_vocab.id(answer)
    }

    pub fn answer_id_or(&self, answer: &str, fallback: SymbolId) -> SymbolId {
        self.answer_vocab.id_or(answer, fallback)
    }

    pub fn answer_vocab(&self) -> &Vocabulary {
        &self.answer_vocab
    }

    /// Map an answer id to the word id of the same string.
    pub fn answer_id_to_word_id(&self, answer_id: SymbolId) -> Option<SymbolId> {
        self.answer_vocab
            .symbol(answer_id)
            .and_then(|answer| self.vocab.id(answer))
    }

    /// Decode a context back into its token strings.
    pub fn decode(&self, ids: &[SymbolId]) -> Vec<&str> {
        ids.iter().filter_map(|&id| self.vocab.symbol(id)).collect()
    }
}

#[derive(Deserialize)]
struct KnowledgeBaseRepr {
    config: KbConfig,
    vocab: Vocabulary,
    answer_vocab: Vocabulary,
    partitions: Vec<Partition>,
    max_context_length: usize,
    max_span_count: usize,
    ordered: bool,
}

impl TryFrom<KnowledgeBaseRepr> for KnowledgeBase {
    type Error = String;

    /// Cross-checks the parts of a decoded store. Each part has already
    /// checked its own layout.
    fn try_from(repr: KnowledgeBaseRepr) -> std::result::Result<Self, Self::Error> {
        for (slot, partition) in repr.partitions.iter().enumerate() {
            let name = partition.name();
            if repr.partitions[..slot].iter().any(|p| p.name() == name) {
                return Err(format!("dataset `{name}` is stored twice"));
            }
            if let Some(&token) = partition
                .contexts()
                .tokens()
                .iter()
                .find(|&&token| token as usize >= repr.vocab.len())
            {
                return Err(format!("dataset `{name}` holds word id {token} outside the vocabulary"));
            }
            if let Some(&answer) = partition
                .span_table()
                .answer_ids()
                .iter()
                .find(|&&answer| answer as usize >= repr.answer_vocab.len())
            {
                return Err(format!("dataset `{name}` holds answer id {answer} outside the answer vocabulary"));
            }
        }
        Ok(Self {
            config: repr.config,
            vocab: repr.vocab,
            answer_vocab: repr.answer_vocab,
            partitions: repr.partitions,
            max_context_length: repr.max_context_length,
            max_span_count: repr.max_span_count,
            ordered: repr.ordered,
        })
    }
}
