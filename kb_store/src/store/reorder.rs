//! Frequency reordering pass.

use tracing::info;

use super::KnowledgeBase;

impl KnowledgeBase {
    /// Renumber the word vocabulary by descending frequency and rewrite every
    /// stored context to the new ids.
    ///
    /// Offsets, spans and answer ids are untouched. Runs at most once until
    /// the next successful `add`; returns whether any work was done.
    pub fn order_vocab_by_freq(&mut self) -> bool {
        if self.ordered {
            return false;
        }

        let mapping = self.vocab.order_by_frequency();
        for partition in &mut self.partitions {
            partition.remap_tokens(&mapping);
        }
        self.ordered = true;

        info!(
            vocab_size = self.vocab.len(),
            partitions = self.partitions.len(),
            "ordered vocabulary by frequency"
        );
        true
    }
}
