//! Parallel fact loading, optionally sharing the store with text loaders.

use fact_kb::SharedFactKnowledgeBase;
use kb_store::{Answers, SharedKnowledgeBase};
use std::sync::Arc;
use std::thread;

const CITIES: [&str; 6] = ["paris", "rome", "berlin", "madrid", "oslo", "lisbon"];

#[test]
fn test_parallel_add_fact_keeps_index_consistent() {
    let shared = Arc::new(SharedFactKnowledgeBase::new());

    let handles: Vec<_> = (0..6)
        .map(|worker| {
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                let mut ids = Vec::new();
                for i in 0..40 {
                    let city = CITIES[(worker + i) % CITIES.len()];
                    let country = format!("country{worker}");
                    let fact = [city, "is", "in", country.as_str()];
                    let fact_id = shared.add_fact(&fact, &[(0, 1), (3, 4)], None, "train").unwrap();
                    ids.push((fact_id, city, country));
                }
                ids
            })
        })
        .collect();

    let added: Vec<_> = handles
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect();

    let guard = shared.read();
    let view = guard.view();
    assert_eq!(view.kb().num_contexts("train"), 240);
    assert_eq!(view.facts("train").len(), 480);
    // both mentions of a fact are recorded together
    for pair in view.facts("train").chunks(2) {
        assert_eq!(pair[0], pair[1]);
    }

    for (fact_id, city, country) in &added {
        assert!(view.facts_about(*city, "train").contains(fact_id));
        assert!(view.facts_about(country.as_str(), "train").contains(fact_id));

        let (entities, spans) = view.fact_entities(*fact_id, "train").unwrap();
        assert_eq!(spans, vec![(0, 1), (3, 4)]);
        assert_eq!(view.index().name(entities[0]), Some(*city));
        assert_eq!(view.index().name(entities[1]), Some(country.as_str()));
    }

    let mention_total: usize = view
        .entity_vocab()
        .iter()
        .map(|name| view.facts_about(name.as_str(), "train").len())
        .sum();
    assert_eq!(mention_total, 480);

    // every mention list is in insertion order
    for name in view.entity_vocab() {
        let facts = view.facts_about(name.as_str(), "train");
        assert!(facts.windows(2).all(|pair| pair[0] < pair[1]));
    }
}

#[test]
fn test_facts_and_text_share_one_store() {
    let kb = Arc::new(SharedKnowledgeBase::default());
    let facts = Arc::new(SharedFactKnowledgeBase::from_shared_kb(Arc::clone(&kb)));

    let fact_loader = {
        let facts = Arc::clone(&facts);
        thread::spawn(move || {
            for i in 0..100 {
                let entity = format!("e{i}");
                facts
                    .add_fact(&[entity.as_str(), "related_to", "hub"], &[(0, 1), (2, 3)], None, "train")
                    .unwrap();
            }
        })
    };
    let text_loader = {
        let kb = Arc::clone(&kb);
        thread::spawn(move || {
            for i in 0..100 {
                let word = format!("w{i}");
                kb.add(&[word.as_str(), "said", "hub"], &[(2, 3)], Answers::DefaultFromSpanStart, "train_text")
                    .unwrap();
            }
        })
    };
    fact_loader.join().unwrap();
    text_loader.join().unwrap();

    let guard = facts.read();
    let view = guard.view();
    assert_eq!(view.kb().num_contexts("train"), 100);
    assert_eq!(view.kb().num_contexts("train_text"), 100);
    assert_eq!(view.facts_about("hub", "train").len(), 100);
    assert!(view.facts_about("hub", "train_text").is_empty());

    let hub = view.kb().id("hub").unwrap();
    // 100 text tokens + 100 fact tokens + 100 answer interns
    assert_eq!(view.kb().vocab().count(hub), Some(300));
}
