//! Concurrent fact loading over a shared knowledge base.

use kb_store::{Answers, KnowledgeBase, Result, SharedKnowledgeBase, Span};
use parking_lot::{RwLock, RwLockReadGuard};
use std::sync::Arc;

use crate::fact_base::resolve_entity_names;
use crate::{EntityIndex, FactKnowledgeBase, FactView};

/// A fact knowledge base that many loader threads can add to at once.
///
/// The entity index has its own lock, separate from the store's. `add_fact`
/// holds the index lock for the whole call; the store lock is taken and
/// released inside it before the index is touched, so the two never deadlock.
/// The inner store can be shared with loaders that add plain contexts.
#[derive(Debug)]
pub struct SharedFactKnowledgeBase {
    kb: Arc<SharedKnowledgeBase>,
    index: RwLock<EntityIndex>,
    separator: String,
}

/// Shared read access to both the entity index and the store.
pub struct FactReadGuard<'a> {
    index: RwLockReadGuard<'a, EntityIndex>,
    kb: RwLockReadGuard<'a, KnowledgeBase>,
}

impl FactReadGuard<'_> {
    pub fn view(&self) -> FactView<'_> {
        FactView::new(&self.kb, &self.index)
    }

    /// The store, read under this guard's lock.
    pub fn kb(&self) -> &KnowledgeBase {
        &self.kb
    }
}

impl Default for SharedFactKnowledgeBase {
    fn default() -> Self {
        Self::from_shared_kb(Arc::default())
    }
}

impl SharedFactKnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index facts on top of a store other loaders may also append to.
    pub fn from_shared_kb(kb: Arc<SharedKnowledgeBase>) -> Self {
        let separator = kb.read().config().entity_separator.clone();
        Self {
            kb,
            index: RwLock::new(EntityIndex::new()),
            separator,
        }
    }

    /// Add a fact; see [`FactKnowledgeBase::add_fact`].
    pub fn add_fact<S: AsRef<str>>(
        &self,
        fact: &[S],
        entity_spans: &[Span],
        entities: Option<&[&str]>,
        dataset: &str,
    ) -> Result<usize> {
        let mut index = self.index.write();
        let names = resolve_entity_names(fact, entity_spans, entities, &self.separator)?;
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let fact_id = self
            .kb
            .add(fact, entity_spans, Answers::Explicit(&refs), dataset)?;
        index.record(fact_id, &names, entity_spans, dataset);
        Ok(fact_id)
    }

    pub fn read(&self) -> FactReadGuard<'_> {
        // same order as add_fact: index first, then store
        let index = self.index.read();
        let kb = self.kb.read();
        FactReadGuard { index, kb }
    }

    /// The inner store, for sharing with loaders that add plain contexts.
    ///
    /// Locks are always taken index first, then store. Do not call
    /// [`SharedFactKnowledgeBase::read`] or [`SharedFactKnowledgeBase::add_fact`]
    /// while holding a guard from this store: a pending `add_fact` holds the
    /// index lock while it waits for the store, and the two calls deadlock.
    /// Read the store through [`FactReadGuard::kb`] instead.
    pub fn kb(&self) -> &Arc<SharedKnowledgeBase> {
        &self.kb
    }

    /// Reorder the store's word vocabulary while holding its write lock.
    pub fn order_vocab_by_freq(&self) -> bool {
        self.kb.write().order_vocab_by_freq()
    }

    /// Unwrap into a plain [`FactKnowledgeBase`]; fails while the store is
    /// still shared elsewhere.
    pub fn into_inner(self) -> std::result::Result<FactKnowledgeBase, Self> {
        match Arc::try_unwrap(self.kb) {
            Ok(kb) => Ok(FactKnowledgeBase::from_parts(
                kb.into_inner(),
                self.index.into_inner(),
            )),
            Err(kb) => Err(Self {
                kb,
                index: self.index,
                separator: self.separator,
            }),
        }
    }
}

impl From<FactKnowledgeBase> for SharedFactKnowledgeBase {
    fn from(fkb: FactKnowledgeBase) -> Self {
        let (kb, index) = fkb.into_parts();
        let separator = kb.config().entity_separator.clone();
        Self {
            kb: Arc::new(SharedKnowledgeBase::new(kb)),
            index: RwLock::new(index),
            separator,
        }
    }
}
