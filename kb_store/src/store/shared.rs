//! Concurrent Append Coordinator - one lock around the whole store.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{Answers, KnowledgeBase};
use crate::{Result, Span};

/// A [`KnowledgeBase`] that many loader threads can append to at once.
///
/// Every `add` runs under one exclusive lock for the whole store, so its
/// vocabulary, context, span and answer updates land as one unit. Readers
/// take a shared guard through [`SharedKnowledgeBase::read`], which waits
/// for in-flight appends instead of observing a torn record.
#[derive(Debug, Default)]
pub struct SharedKnowledgeBase {
    inner: RwLock<KnowledgeBase>,
}

impl SharedKnowledgeBase {
    pub fn new(kb: KnowledgeBase) -> Self {
        Self {
            inner: RwLock::new(kb),
        }
    }

    /// Append a context; see [`KnowledgeBase::add`].
    ///
    /// The returned index is valid as soon as this call returns.
    pub fn add<S: AsRef<str>>(
        &self,
        context: &[S],
        spans: &[Span],
        answers: Answers<'_>,
        dataset: &str,
    ) -> Result<usize> {
        self.inner.write().add(context, spans, answers, dataset)
    }

    /// Shared read access to the whole store.
    pub fn read(&self) -> RwLockReadGuard<'_, KnowledgeBase> {
        self.inner.read()
    }

    /// Exclusive access, e.g. for a bulk load.
    pub fn write(&self) -> RwLockWriteGuard<'_, KnowledgeBase> {
        self.inner.write()
    }

    pub fn num_contexts(&self, dataset: &str) -> usize {
        self.inner.read().num_contexts(dataset)
    }

    /// Run the frequency reordering pass. Needs exclusive ownership, so no
    /// reader or writer can be active.
    pub fn order_vocab_by_freq(&mut self) -> bool {
        self.inner.get_mut().order_vocab_by_freq()
    }

    pub fn get_mut(&mut self) -> &mut KnowledgeBase {
        self.inner.get_mut()
    }

    pub fn into_inner(self) -> KnowledgeBase {
        self.inner.into_inner()
    }
}

impl From<KnowledgeBase> for SharedKnowledgeBase {
    fn from(kb: KnowledgeBase) -> Self {
        Self::new(kb)
    }
}
