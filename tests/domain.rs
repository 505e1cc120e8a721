use archive_ledger::domain::{CacheRecord, FolderKey, ItemId, Layout, validate_label};
use archive_ledger::error::ArchiveError;
use assert_matches::assert_matches;

#[test]
fn folder_name_follows_convention() {
    let id: ItemId = "123".parse().unwrap();
    let key = FolderKey::new("UID", id, "post");
    assert_eq!(key.folder_name("A"), "UID123_A_post");
    assert_eq!(key.folder_name(""), "UID123__post");
}

#[test]
fn cache_record_fields_default_when_absent() {
    let record: CacheRecord = serde_json::from_str(r#"{"mark": "al"}"#).unwrap();
    assert_eq!(record, CacheRecord::new("al", ""));
    let record: CacheRecord = serde_json::from_str("{}").unwrap();
    assert_eq!(record, CacheRecord::default());
}

#[test]
fn layout_parses_lowercase() {
    let layout: Layout = serde_json::from_str(r#""flat""#).unwrap();
    assert_eq!(layout, Layout::Flat);
    assert_eq!(Layout::Nested.to_string(), "nested");
}

#[test]
fn labels_reject_path_separators() {
    assert!(validate_label("小明 ✨").is_ok());
    assert_matches!(validate_label("a/b"), Err(ArchiveError::InvalidLabel(_)));
    assert_matches!(validate_label("a\\b"), Err(ArchiveError::InvalidLabel(_)));
}
