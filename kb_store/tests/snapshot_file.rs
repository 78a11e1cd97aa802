//! Saving and loading snapshots on disk.

use kb_store::{Answers, KbError, KnowledgeBase};

#[test]
fn test_save_and_load_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kb.snapshot");

    let mut kb = KnowledgeBase::new();
    kb.add(&["paris", "is", "big"], &[(0, 1)], Answers::Explicit(&["paris"]), "train")
        .unwrap();
    kb.add(&["rome"], &[(0, 1)], Answers::Explicit(&["rome"]), "train")
        .unwrap();
    kb.add(&["oslo", "is", "cold"], &[(0, 1), (2, 3)], Answers::DefaultFromSpanStart, "test")
        .unwrap();
    kb.save(&path).unwrap();

    let loaded = KnowledgeBase::load(&path).unwrap();
    assert_eq!(loaded, kb);
    assert_eq!(loaded.num_contexts("train"), 2);
    assert_eq!(loaded.decode(&loaded.answers(0, "test").unwrap()), ["oslo", "cold"]);
    assert_eq!(loaded.max_context_length(), 3);
    assert_eq!(loaded.max_span_count(), 2);
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = KnowledgeBase::load(dir.path().join("absent")).unwrap_err();
    assert!(matches!(err, KbError::Io(_)));
}

#[test]
fn test_load_truncated_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kb.snapshot");

    let mut kb = KnowledgeBase::new();
    kb.add(&["a", "b"], &[(0, 2)], Answers::DefaultFromSpanStart, "train")
        .unwrap();
    kb.save(&path).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() - 4]).unwrap();

    assert!(matches!(KnowledgeBase::load(&path), Err(KbError::Encoding(_))));
}
