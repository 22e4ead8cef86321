/// Example: Tiering, search and undo with DocumentStore
///
/// Keeps at most two documents in memory; the rest live on disk until read.

use std::collections::HashMap;
use tierdex::core::config::Config;
use tierdex::core::store::DocumentStore;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Open a store that tiers to a temp dir and keeps two documents resident
    let config = Config::default().with_max_document_count(2);
    let mut store = DocumentStore::open(config)?;

    // 2. Add documents
    store.put_text("http://notes/rust", "Rust is fast and Rust is safe")?;
    store.put_text("http://notes/go", "Go is simple")?;
    store.put_text("http://notes/zig", "Zig is small and fast")?;
    store.set_metadata("http://notes/rust", "level", "advanced")?;
    println!("✓ {} documents, {} resident", store.len(), store.resident_count());

    // 3. Keyword and prefix search, most occurrences first
    for doc in store.search("fast")? {
        println!("fast → {} ({}x)", doc.key(), doc.word_count("fast"));
    }
    let prefixed: Vec<String> = store.search_by_prefix("s")?.iter().map(|d| d.key().to_string()).collect();
    println!("prefix 's' → {:?}", prefixed);

    // 4. Metadata filter
    let advanced = HashMap::from([("level".to_string(), "advanced".to_string())]);
    println!("advanced → {} match(es)", store.search_by_metadata(&advanced)?.len());

    // 5. Bulk delete and per-key undo
    let removed = store.delete_all("is")?;
    println!("deleted {} documents containing 'is'", removed.len());
    store.undo_key("http://notes/go")?;
    println!("✓ restored go: {}", store.contains("http://notes/go"));

    // 6. Stats
    println!("{}", store.stats().to_json()?);
    Ok(())
}
