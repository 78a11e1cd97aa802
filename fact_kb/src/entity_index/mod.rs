//! Entity-Fact Index - which facts mention which entities, per dataset.

mod mentions;

pub use mentions::*;

use kb_store::Span;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Dense identifier of an entity, assigned in first-seen order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An entity given either by name or by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRef<'a> {
    Name(&'a str),
    Id(EntityId),
}

impl<'a> From<&'a str> for EntityRef<'a> {
    fn from(name: &'a str) -> Self {
        EntityRef::Name(name)
    }
}

impl From<EntityId> for EntityRef<'_> {
    fn from(id: EntityId) -> Self {
        EntityRef::Id(id)
    }
}

/// Entity vocabulary plus one [`MentionTable`] per dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EntityIndexRepr")]
pub struct EntityIndex {
    names: Vec<String>,
    ids: HashMap<String, EntityId>,
    /// In creation order.
    tables: Vec<MentionTable>,
}

impl EntityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every entity mention of a stored fact.
    ///
    /// `entities` and `spans` are aligned and already validated. The flat fact
    /// list gains one entry per mention.
    pub fn record<S: AsRef<str>>(&mut self, fact_id: usize, entities: &[S], spans: &[Span], dataset: &str) {
        let slot = self.table_slot(dataset);
        for (entity, &span) in entities.iter().zip(spans) {
            let id = self.intern(entity.as_ref());
            let table = &mut self.tables[slot];
            table.record_mention(id, fact_id, span);
            table.record_fact(fact_id);
        }
    }

    fn intern(&mut self, name: &str) -> EntityId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = EntityId(self.names.len() as u32);
        self.names.push(name.to_owned());
        self.ids.insert(name.to_owned(), id);
        for table in &mut self.tables {
            table.push_entity();
        }
        id
    }

    /// Find or create the table for `dataset`. A new table gets an empty slot
    /// for every entity already known.
    fn table_slot(&mut self, dataset: &str) -> usize {
        if let Some(slot) = self.tables.iter().position(|t| t.name() == dataset) {
            return slot;
        }
        debug!(dataset, entities = self.names.len(), "creating mention table");
        self.tables.push(MentionTable::new(dataset, self.names.len()));
        self.tables.len() - 1
    }

    /// Mention tables in creation order.
    pub fn tables(&self) -> &[MentionTable] {
        &self.tables
    }

    pub fn table(&self, dataset: &str) -> Option<&MentionTable> {
        self.tables.iter().find(|t| t.name() == dataset)
    }

    fn resolve(&self, entity: EntityRef<'_>) -> Option<EntityId> {
        match entity {
            EntityRef::Name(name) => self.id(name),
            EntityRef::Id(id) if id.index() < self.names.len() => Some(id),
            EntityRef::Id(_) => None,
        }
    }

    /// Facts in `dataset` mentioning `entity`; empty for unknown entities
    /// or datasets.
    pub fn facts_about<'a>(&self, entity: impl Into<EntityRef<'a>>, dataset: &str) -> &[usize] {
        match (self.resolve(entity.into()), self.table(dataset)) {
            (Some(id), Some(table)) => table.facts_of(id),
            _ => &[],
        }
    }

    /// Mention spans aligned with [`EntityIndex::facts_about`].
    pub fn mention_spans<'a>(&self, entity: impl Into<EntityRef<'a>>, dataset: &str) -> &[Span] {
        match (self.resolve(entity.into()), self.table(dataset)) {
            (Some(id), Some(table)) => table.spans_of(id),
            _ => &[],
        }
    }

    /// Fact ids recorded in `dataset`, once per mention, in insertion order.
    pub fn facts(&self, dataset: &str) -> &[usize] {
        self.table(dataset).map(MentionTable::facts).unwrap_or_default()
    }

    pub fn id(&self, name: &str) -> Option<EntityId> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, id: EntityId) -> Option<&str> {
        self.names.get(id.index()).map(String::as_str)
    }

    /// All entity names, indexed by id.
    pub fn vocab(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Deserialize)]
struct EntityIndexRepr {
    names: Vec<String>,
    ids: HashMap<String, EntityId>,
    tables: Vec<MentionTable>,
}

impl TryFrom<EntityIndexRepr> for EntityIndex {
    type Error = String;

    fn try_from(repr: EntityIndexRepr) -> Result<Self, Self::Error> {
        if repr.ids.len() != repr.names.len() {
            return Err(format!(
                "entity index has {} names but {} ids",
                repr.names.len(),
                repr.ids.len()
            ));
        }
        for (index, name) in repr.names.iter().enumerate() {
            if repr.ids.get(name).map(|id| id.index()) != Some(index) {
                return Err(format!("entity `{name}` is not mapped to id {index}"));
            }
        }
        for (slot, table) in repr.tables.iter().enumerate() {
            if table.entity_slots() != repr.names.len() {
                return Err(format!(
                    "mention table `{}` has {} entity slots for {} entities",
                    table.name(),
                    table.entity_slots(),
                    repr.names.len()
                ));
            }
            if repr.tables[..slot].iter().any(|t| t.name() == table.name()) {
                return Err(format!("mention table `{}` is stored twice", table.name()));
            }
        }
        Ok(Self {
            names: repr.names,
            ids: repr.ids,
            tables: repr.tables,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_interns_entities() {
        let mut index = EntityIndex::new();
        index.record(0, &["Paris", "France"], &[(0, 1), (3, 4)], "train");
        index.record(1, &["France"], &[(2, 3)], "train");

        assert_eq!(index.vocab(), ["Paris", "France"]);
        assert_eq!(index.facts_about("France", "train"), &[0, 1]);
        assert_eq!(index.mention_spans("France", "train"), &[(3, 4), (2, 3)]);
        assert_eq!(index.facts_about(EntityId(0), "train"), &[0]);
        assert_eq!(index.facts("train"), &[0, 0, 1]);
    }

    #[test]
    fn test_unknown_lookups_are_empty() {
        let mut index = EntityIndex::new();
        index.record(0, &["Paris"], &[(0, 1)], "train");

        assert!(index.facts_about("Berlin", "train").is_empty());
        assert!(index.facts_about(EntityId(7), "train").is_empty());
        assert!(index.facts_about("Paris", "test").is_empty());
        assert!(index.facts("test").is_empty());
    }

    #[test]
    fn test_tables_stay_aligned_with_entities() {
        let mut index = EntityIndex::new();
        index.record(0, &["a"], &[(0, 1)], "train");
        index.record(0, &["b"], &[(0, 1)], "valid");
        index.record(1, &["c"], &[(0, 1)], "train");

        for dataset in ["train", "valid"] {
            assert_eq!(index.table(dataset).unwrap().entity_slots(), 3);
        }
        assert_eq!(index.facts_about("a", "valid"), &[] as &[usize]);
        assert_eq!(index.facts_about("b", "valid"), &[0]);
    }

    #[test]
    fn test_partition_created_after_entities_is_backfilled() {
        let mut index = EntityIndex::new();
        index.record(0, &["a", "b"], &[(0, 1), (1, 2)], "train");
        index.record(0, &["b"], &[(0, 1)], "test");

        let test = index.table("test").unwrap();
        assert_eq!(test.entity_slots(), 2);
        assert!(test.facts_of(EntityId(0)).is_empty());
        assert_eq!(test.facts_of(EntityId(1)), &[0]);
    }

    #[test]
    fn test_flat_list_has_one_entry_per_mention() {
        let mut index = EntityIndex::new();
        index.record(0, &["Paris", "France"], &[(0, 1), (4, 5)], "train");
        index.record(1, &["Rome"], &[(0, 1)], "train");

        assert_eq!(index.facts("train"), &[0, 0, 1]);
    }

    #[test]
    fn test_repr_rejects_short_mention_tables() {
        let mut index = EntityIndex::new();
        index.record(0, &["a"], &[(0, 1)], "train");
        let repr = EntityIndexRepr {
            names: vec!["a".into(), "b".into()],
            ids: HashMap::from([("a".to_string(), EntityId(0)), ("b".to_string(), EntityId(1))]),
            tables: index.tables,
        };
        assert!(EntityIndex::try_from(repr).is_err());
    }

    #[test]
    fn test_repr_rejects_mismatched_ids() {
        let repr = EntityIndexRepr {
            names: vec!["a".into()],
            ids: HashMap::from([("a".to_string(), EntityId(3))]),
            tables: Vec::new(),
        };
        assert!(EntityIndex::try_from(repr).is_err());
    }
}
