use std::collections::HashMap;
use tierdex::core::config::Config;
use tierdex::core::error::ErrorKind;
use tierdex::core::store::DocumentStore;
use tierdex::core::types::{Content, DocumentFormat};

fn keys(docs: &[tierdex::core::types::Document]) -> Vec<&str> {
    docs.iter().map(|d| d.key().as_str()).collect()
}

fn meta(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[test]
fn put_then_get_returns_the_same_content() {
    let mut store = DocumentStore::new().unwrap();
    assert_eq!(store.put_text("http://site/a", "Hello World").unwrap(), 0);
    assert_eq!(store.put_binary("http://site/b", &[0, 1, 2, 255]).unwrap(), 0);

    let a = store.get("http://site/a").unwrap().unwrap();
    assert_eq!(a.text_content(), Some("Hello World"));
    assert_eq!(a.format(), DocumentFormat::Txt);
    assert_eq!(a.word_count("Hello"), 1);

    let b = store.get("http://site/b").unwrap().unwrap();
    assert_eq!(b.content(), &Content::Binary(vec![0, 1, 2, 255]));
    assert!(b.words().is_empty());

    assert!(store.get("http://site/missing").unwrap().is_none());
    assert_eq!(store.len(), 2);
}

#[test]
fn replacing_returns_the_previous_identity_code() {
    let mut store = DocumentStore::new().unwrap();
    store.put_text("k", "first version").unwrap();
    let first = store.get("k").unwrap().unwrap().identity_code();

    assert_eq!(store.put_text("k", "second version").unwrap(), first);
    assert_ne!(first, 0);
    assert_eq!(store.search("first").unwrap().len(), 0);
    assert_eq!(keys(&store.search("second").unwrap()), vec!["k"]);
    assert_eq!(store.len(), 1);
}

#[test]
fn put_without_content_deletes() {
    let mut store = DocumentStore::new().unwrap();
    assert_eq!(store.put("k", None, DocumentFormat::Txt).unwrap(), 0);
    assert_eq!(store.undo_depth(), 0, "deleting nothing is not logged");

    store.put_text("k", "some words").unwrap();
    let code = store.get("k").unwrap().unwrap().identity_code();
    assert_eq!(store.put("k", None, DocumentFormat::Txt).unwrap(), code);
    assert!(!store.contains("k"));
    assert!(store.search("words").unwrap().is_empty());
}

#[test]
fn delete_reports_whether_anything_was_removed() {
    let mut store = DocumentStore::new().unwrap();
    store.put_text("k", "text").unwrap();
    assert!(store.delete("k").unwrap());
    assert!(!store.delete("k").unwrap());
    assert!(store.get("k").unwrap().is_none());
    assert!(store.is_empty());
}

#[test]
fn invalid_input_is_rejected() {
    let mut store = DocumentStore::new().unwrap();
    let blank_key = store.put_text("  ", "text").unwrap_err();
    assert_eq!(blank_key.kind, ErrorKind::InvalidArgument);
    assert!(blank_key.is_invalid_argument());

    assert_eq!(store.put_text("k", "   ").unwrap_err().kind, ErrorKind::InvalidArgument);
    assert_eq!(store.put_binary("k", &[]).unwrap_err().kind, ErrorKind::InvalidArgument);
    assert_eq!(
        store.put("k", Some(&[0xff, 0xfe]), DocumentFormat::Txt).unwrap_err().kind,
        ErrorKind::InvalidArgument
    );
    assert!(store.is_empty());
    assert_eq!(store.undo_depth(), 0);
}

#[test]
fn metadata_round_trip_and_errors() {
    let mut store = DocumentStore::new().unwrap();
    store.put_text("k", "text").unwrap();

    assert_eq!(store.set_metadata("k", "author", "ann").unwrap(), None);
    assert_eq!(store.set_metadata("k", "author", "bob").unwrap(), Some("ann".to_string()));
    assert_eq!(store.get_metadata("k", "author").unwrap(), Some("bob".to_string()));
    assert_eq!(store.get_metadata("k", "year").unwrap(), None);

    assert_eq!(store.set_metadata("missing", "a", "b").unwrap_err().kind, ErrorKind::NotFound);
    assert_eq!(store.get_metadata("missing", "a").unwrap_err().kind, ErrorKind::NotFound);
    assert_eq!(store.set_metadata("k", " ", "b").unwrap_err().kind, ErrorKind::InvalidArgument);
    assert_eq!(store.get_metadata("k", "").unwrap_err().kind, ErrorKind::InvalidArgument);
}

#[test]
fn metadata_filters_require_every_pair() {
    let mut store = DocumentStore::new().unwrap();
    for (key, text, author, year) in [
        ("a", "apple pie", "ann", "2020"),
        ("b", "apple tart", "ann", "2021"),
        ("c", "banana bread", "bob", "2020"),
    ] {
        store.put_text(key, text).unwrap();
        store.set_metadata(key, "author", author).unwrap();
        store.set_metadata(key, "year", year).unwrap();
    }

    assert_eq!(keys(&store.search_by_metadata(&meta(&[("author", "ann")])).unwrap()), vec!["a", "b"]);
    assert_eq!(
        keys(&store.search_by_metadata(&meta(&[("author", "ann"), ("year", "2020")])).unwrap()),
        vec!["a"]
    );
    assert!(store.search_by_metadata(&meta(&[("genre", "x")])).unwrap().is_empty());
    assert!(store.search_by_metadata(&HashMap::new()).unwrap().is_empty());

    assert_eq!(
        keys(&store.search_by_keyword_and_metadata("apple", &meta(&[("year", "2021")])).unwrap()),
        vec!["b"]
    );
    assert_eq!(
        keys(&store.search_by_prefix_and_metadata("b", &meta(&[("year", "2020")])).unwrap()),
        vec!["c"]
    );
    assert!(store.search_by_keyword_and_metadata("apple", &HashMap::new()).unwrap().is_empty());
}

#[test]
fn bulk_deletes_return_removed_keys() {
    let mut store = DocumentStore::new().unwrap();
    store.put_text("a", "apple pie").unwrap();
    store.put_text("b", "apple tart").unwrap();
    store.put_text("c", "apricot jam").unwrap();
    store.put_text("d", "banana bread").unwrap();
    store.set_metadata("d", "shelf", "top").unwrap();
    store.set_metadata("b", "shelf", "top").unwrap();

    let removed = store.delete_all_with_keyword_and_metadata("apple", &meta(&[("shelf", "top")])).unwrap();
    assert_eq!(removed.len(), 1);
    assert!(store.contains("a") && !store.contains("b"));

    let removed = store.delete_all_with_prefix("ap").unwrap();
    let mut removed: Vec<String> = removed.into_iter().map(|k| k.to_string()).collect();
    removed.sort();
    assert_eq!(removed, vec!["a", "c"]);
    assert!(store.search_by_prefix("ap").unwrap().is_empty());

    assert!(store.delete_all_with_metadata(&HashMap::new()).unwrap().is_empty());
    assert_eq!(store.delete_all_with_metadata(&meta(&[("shelf", "top")])).unwrap().len(), 1);
    assert!(store.is_empty());
    assert!(store.delete_all("nothing").unwrap().is_empty());
}

#[test]
fn stats_report_live_and_resident_documents() {
    let mut store = DocumentStore::open(Config::default().with_max_document_count(2)).unwrap();
    for i in 0..5 {
        store.put_text(&format!("k{}", i), "counted words").unwrap();
    }
    let stats = store.stats();
    assert_eq!(stats.live_documents, 5);
    assert_eq!(stats.memory.resident_documents, 2);
    assert_eq!(stats.memory.tiered_out_documents, 3);
    assert_eq!(stats.evictions, 3);
    assert_eq!(stats.undo_depth, 5);
    assert!(stats.to_json().unwrap().contains("\"live_documents\": 5"));
}
