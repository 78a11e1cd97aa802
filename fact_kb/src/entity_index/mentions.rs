//! Per-partition mention lists.

use kb_store::Span;
use serde::{Deserialize, Serialize};

use super::EntityId;

/// Which facts mention which entity, for one dataset.
///
/// `facts_by_entity` and `spans_by_entity` are indexed by entity id and
/// always hold one (possibly empty) list per known entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MentionTableRepr")]
pub struct MentionTable {
    name: String,
    facts_by_entity: Vec<Vec<usize>>,
    spans_by_entity: Vec<Vec<Span>>,
    /// One entry per recorded mention, in insertion order.
    facts: Vec<usize>,
}

impl MentionTable {
    /// Create a table with an empty slot for each of `entity_count` entities.
    pub(crate) fn new(name: impl Into<String>, entity_count: usize) -> Self {
        Self {
            name: name.into(),
            facts_by_entity: vec![Vec::new(); entity_count],
            spans_by_entity: vec![Vec::new(); entity_count],
            facts: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn push_entity(&mut self) {
        self.facts_by_entity.push(Vec::new());
        self.spans_by_entity.push(Vec::new());
    }

    pub(crate) fn record_fact(&mut self, fact_id: usize) {
        self.facts.push(fact_id);
    }

    pub(crate) fn record_mention(&mut self, entity: EntityId, fact_id: usize, span: Span) {
        let slot = entity.index();
        self.facts_by_entity[slot].push(fact_id);
        self.spans_by_entity[slot].push(span);
    }

    /// Facts mentioning `entity`, in insertion order.
    pub fn facts_of(&self, entity: EntityId) -> &[usize] {
        self.facts_by_entity
            .get(entity.index())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Spans of each mention returned by [`MentionTable::facts_of`].
    pub fn spans_of(&self, entity: EntityId) -> &[Span] {
        self.spans_by_entity
            .get(entity.index())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn facts(&self) -> &[usize] {
        &self.facts
    }

    /// Number of entity slots.
    pub fn entity_slots(&self) -> usize {
        self.facts_by_entity.len()
    }
}

#[derive(Deserialize)]
struct MentionTableRepr {
    name: String,
    facts_by_entity: Vec<Vec<usize>>,
    spans_by_entity: Vec<Vec<Span>>,
    facts: Vec<usize>,
}

impl TryFrom<MentionTableRepr> for MentionTable {
    type Error = String;

    fn try_from(repr: MentionTableRepr) -> Result<Self, Self::Error> {
        if repr.facts_by_entity.len() != repr.spans_by_entity.len() {
            return Err(format!(
                "mention table `{}` has {} fact lists but {} span lists",
                repr.name,
                repr.facts_by_entity.len(),
                repr.spans_by_entity.len()
            ));
        }
        let misaligned = repr
            .facts_by_entity
            .iter()
            .zip(&repr.spans_by_entity)
            .position(|(facts, spans)| facts.len() != spans.len());
        if let Some(entity) = misaligned {
            return Err(format!(
                "mention table `{}` has unaligned facts and spans for entity {entity}",
                repr.name
            ));
        }
        Ok(Self {
            name: repr.name,
            facts_by_entity: repr.facts_by_entity,
            spans_by_entity: repr.spans_by_entity,
            facts: repr.facts,
        })
    }
}
