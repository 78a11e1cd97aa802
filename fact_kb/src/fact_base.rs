//! Fact knowledge base - facts stored as contexts, entities as their spans.

use kb_store::snapshot::{read_snapshot, write_snapshot};
use kb_store::{AnswerMode, Answers, KbConfig, KbError, KnowledgeBase, Partition, Result, Span, SymbolId};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::{info, instrument};

use crate::{EntityId, EntityIndex, EntityRef};

/// Magic header of a [`FactKnowledgeBase`] snapshot.
pub const FACT_KB_MAGIC: [u8; 8] = *b"FACTKB\0\0";

/// Name each span by joining its tokens with `separator`.
///
/// Spans that do not fit the fact get an empty name; the store rejects them
/// before anything is recorded.
pub fn default_entity_names<S: AsRef<str>>(fact: &[S], spans: &[Span], separator: &str) -> Vec<String> {
    spans
        .iter()
        .map(|&(start, end)| {
            fact.get(start as usize..end as usize)
                .map(|tokens| {
                    tokens
                        .iter()
                        .map(AsRef::as_ref)
                        .collect::<Vec<&str>>()
                        .join(separator)
                })
                .unwrap_or_default()
        })
        .collect()
}

/// Check entity names against spans and fill in defaults.
pub(crate) fn resolve_entity_names<S: AsRef<str>>(
    fact: &[S],
    spans: &[Span],
    entities: Option<&[&str]>,
    separator: &str,
) -> Result<Vec<String>> {
    match entities {
        Some(names) if names.len() != spans.len() => Err(KbError::EntityCountMismatch {
            spans: spans.len(),
            entities: names.len(),
        }),
        Some(names) => Ok(names.iter().map(|&name| name.to_owned()).collect()),
        None => Ok(default_entity_names(fact, spans, separator)),
    }
}

/// Read-only queries over a knowledge base and its entity index.
#[derive(Debug, Clone, Copy)]
pub struct FactView<'a> {
    kb: &'a KnowledgeBase,
    index: &'a EntityIndex,
}

impl<'a> FactView<'a> {
    pub fn new(kb: &'a KnowledgeBase, index: &'a EntityIndex) -> Self {
        Self { kb, index }
    }

    pub fn kb(&self) -> &'a KnowledgeBase {
        self.kb
    }

    pub fn index(&self) -> &'a EntityIndex {
        self.index
    }

    /// Ids of facts in `dataset` that mention `entity`, in insertion order.
    pub fn facts_about<'e>(&self, entity: impl Into<EntityRef<'e>>, dataset: &str) -> &'a [usize] {
        self.index.facts_about(entity, dataset)
    }

    /// Token ids of a stored fact.
    pub fn fact_from_id(&self, fact_id: usize, dataset: &str) -> Result<&'a [SymbolId]> {
        self.kb.context(fact_id, dataset)
    }

    /// Entities mentioned by a stored fact, with the span of each mention.
    ///
    /// Entities are read back from the fact's explicit answers, so a dataset
    /// holding defaulted answers (plain contexts added to a shared store) is
    /// rejected with [`KbError::AnswerModeMismatch`].
    pub fn fact_entities(&self, fact_id: usize, dataset: &str) -> Result<(Vec<EntityId>, Vec<Span>)> {
        let (starts, ends) = self.kb.spans(fact_id, dataset)?;
        if let Some(mode) = self.kb.partition(dataset).and_then(Partition::answer_mode) {
            if mode != AnswerMode::Explicit {
                return Err(KbError::AnswerModeMismatch {
                    dataset: dataset.to_string(),
                    expected: mode.as_str(),
                });
            }
        }
        let answers = self.kb.answers(fact_id, dataset)?;
        let entities = answers
            .iter()
            .map(|&answer| {
                self.kb
                    .answer_vocab()
                    .symbol(answer)
                    .and_then(|name| self.index.id(name))
                    .ok_or(KbError::UnknownId {
                        vocab: "entity",
                        id: answer,
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        let spans = starts.iter().copied().zip(ends.iter().copied()).collect();
        Ok((entities, spans))
    }

    /// Every fact id recorded in `dataset`.
    pub fn facts(&self, dataset: &str) -> &'a [usize] {
        self.index.facts(dataset)
    }

    pub fn entity_id(&self, entity: &str) -> Option<EntityId> {
        self.index.id(entity)
    }

    pub fn entity_vocab(&self) -> &'a [String] {
        self.index.vocab()
    }
}

/// A knowledge base of facts indexed by the entities they mention.
///
/// Each fact is a context of the inner [`KnowledgeBase`]; each entity
/// mention is one of its spans, answered by the entity name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FactKnowledgeBaseRepr")]
pub struct FactKnowledgeBase {
    kb: KnowledgeBase,
    index: EntityIndex,
}

impl FactKnowledgeBase {
    /// Create a new empty fact knowledge base.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: KbConfig) -> Self {
        Self::from_kb(KnowledgeBase::with_config(config))
    }

    /// Index facts on top of an existing store.
    pub fn from_kb(kb: KnowledgeBase) -> Self {
        Self {
            kb,
            index: EntityIndex::new(),
        }
    }

    /// Add a fact and index its entity mentions.
    ///
    /// Without explicit `entities`, each entity is named by joining the
    /// fact's tokens inside its span with the configured separator.
    pub fn add_fact<S: AsRef<str>>(
        &mut self,
        fact: &[S],
        entity_spans: &[Span],
        entities: Option<&[&str]>,
        dataset: &str,
    ) -> Result<usize> {
        let names = resolve_entity_names(fact, entity_spans, entities, &self.kb.config().entity_separator)?;
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let fact_id = self.kb.add(fact, entity_spans, Answers::Explicit(&refs), dataset)?;
        self.index.record(fact_id, &names, entity_spans, dataset);
        Ok(fact_id)
    }

    /// Add a whitespace-tokenized fact.
    pub fn add_fact_text(
        &mut self,
        fact: &str,
        entity_spans: &[Span],
        entities: Option<&[&str]>,
        dataset: &str,
    ) -> Result<usize> {
        let tokens: Vec<&str> = fact.split_whitespace().collect();
        self.add_fact(&tokens, entity_spans, entities, dataset)
    }

    pub fn view(&self) -> FactView<'_> {
        FactView::new(&self.kb, &self.index)
    }

    pub fn facts_about<'e>(&self, entity: impl Into<EntityRef<'e>>, dataset: &str) -> &[usize] {
        self.index.facts_about(entity, dataset)
    }

    pub fn fact_from_id(&self, fact_id: usize, dataset: &str) -> Result<&[SymbolId]> {
        self.view().fact_from_id(fact_id, dataset)
    }

    pub fn fact_entities(&self, fact_id: usize, dataset: &str) -> Result<(Vec<EntityId>, Vec<Span>)> {
        self.view().fact_entities(fact_id, dataset)
    }

    pub fn entity_id(&self, entity: &str) -> Option<EntityId> {
        self.index.id(entity)
    }

    pub fn entity_vocab(&self) -> &[String] {
        self.index.vocab()
    }

    pub fn num_entities(&self) -> usize {
        self.index.len()
    }

    /// Every fact id recorded in `dataset`, in insertion order.
    pub fn facts(&self, dataset: &str) -> &[usize] {
        self.index.facts(dataset)
    }

    pub fn kb(&self) -> &KnowledgeBase {
        &self.kb
    }

    pub fn index(&self) -> &EntityIndex {
        &self.index
    }

    /// Reorder the word vocabulary of the inner store; entity ids and
    /// mention lists are unaffected.
    pub fn order_vocab_by_freq(&mut self) -> bool {
        self.kb.order_vocab_by_freq()
    }

    pub(crate) fn into_parts(self) -> (KnowledgeBase, EntityIndex) {
        (self.kb, self.index)
    }

    pub(crate) fn from_parts(kb: KnowledgeBase, index: EntityIndex) -> Self {
        Self { kb, index }
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        write_snapshot(writer, &FACT_KB_MAGIC, self)
    }

    pub fn read_from<R: Read>(reader: R) -> Result<Self> {
        read_snapshot(reader, &FACT_KB_MAGIC)
    }

    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path.as_ref())?;
        self.write_to(BufWriter::new(file))?;
        info!(entities = self.index.len(), "saved fact knowledge base");
        Ok(())
    }

    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let fkb = Self::read_from(BufReader::new(file))?;
        info!(entities = fkb.index.len(), "loaded fact knowledge base");
        Ok(fkb)
    }
}

#[derive(Deserialize)]
struct FactKnowledgeBaseRepr {
    kb: KnowledgeBase,
    index: EntityIndex,
}

impl TryFrom<FactKnowledgeBaseRepr> for FactKnowledgeBase {
    type Error = String;

    fn try_from(repr: FactKnowledgeBaseRepr) -> std::result::Result<Self, Self::Error> {
        for table in repr.index.tables() {
            let stored = repr.kb.num_contexts(table.name());
            if let Some(&fact_id) = table.facts().iter().find(|&&fact_id| fact_id >= stored) {
                return Err(format!(
                    "fact {fact_id} is indexed but dataset `{}` stores {stored} facts",
                    table.name()
                ));
            }
        }
        Ok(Self::from_parts(repr.kb, repr.index))
    }
}
