pub mod core;
pub mod storage;
pub mod analysis;
pub mod index;
pub mod memory;
pub mod undo;
pub mod compression;

/*
┌──────────────────────────────────────────────────────────────────────────────────┐
│                           TIERDEX STRUCT ARCHITECTURE                            │
└──────────────────────────────────────────────────────────────────────────────────┘

┌─────────────────────────────────── CORE LAYER ───────────────────────────────────┐
│                                                                                  │
│  ┌────────────────────────────────────────────────────────────────────────────┐  │
│  │                          struct DocumentStore                              │  │
│  │  core: StoreCore                  // Everything undo reverts against       │  │
│  │  undo: UndoLog<DocKey, Reversal>  // Single + batch entries                │  │
│  │  config: Config                                                            │  │
│  │  started / start_time             // Uptime for StoreStats                 │  │
│  └────────────────────────────────────────────────────────────────────────────┘  │
│                                                                                  │
│  ┌────────────────────────────────────────────────────────────────────────────┐  │
│  │                            struct StoreCore                                │  │
│  │  docs: TieredBTree<DocKey, Document>  // Authoritative, tiers to disk      │  │
│  │  handles: HandleArena                 // One DocHandle per live key        │  │
│  │  words: WordIndex<HandleId>           // Word → handles                    │  │
│  │  heap: EvictionHeap<HandleId>         // Resident handles, LRU at root     │  │
│  │  budget: MemoryBudget                 // Count / byte caps                 │  │
│  │  tokenizer: Box<dyn Tokenizer>                                             │  │
│  │  clock: u64                           // Logical last-used time            │  │
│  └────────────────────────────────────────────────────────────────────────────┘  │
│                                                                                  │
│  ┌──────────────────┐  ┌──────────────────────┐  ┌───────────────────────────┐   │
│  │ struct Document  │  │ struct DocHandle     │  │ enum Reversal             │   │
│  │ • key: DocKey    │  │ • key, resident      │  │ • Replace { previous }    │   │
│  │ • content        │  │ • byte_len           │  │ • SetMetadata {           │   │
│  │ • metadata       │  │ • word_counts (copy) │  │     field, previous }     │   │
│  │ • word_counts    │  │ • metadata (copy)    │  └───────────────────────────┘   │
│  │ • last_used      │  └──────────────────────┘                                  │
│  └──────────────────┘                                                            │
│                         SharedDocumentStore = Arc<Mutex<DocumentStore>>          │
└──────────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────── STORAGE LAYER ─────────────────────────────────┐
│                                                                                  │
│  TieredBTree ── leaf slot: Some(doc) = resident, None = tombstone                │
│       │            (tiered out or deleted; the backing store decides)            │
│       ▼                                                                          │
│  trait PersistenceManager ──┬── DocumentPersistence (file per key)               │
│                             └── MemoryPersistence                                │
│                                                                                  │
│  <base>/docs/<scheme>%3A%2F%2F/<seg>/<seg>.doc   (cleared at open)               │
│  [ version | stored_at | codec | compression | crc32 | payload ]                 │
└──────────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────────── OPERATIONS ──────────────────────────────────┐
│                                                                                  │
│  put ──► docs.put (resolve tombstone) ──► forget old handle ──► adopt new        │
│          ──► undo.push ──► enforce_budget                                        │
│                                                                                  │
│  get / metadata / search ──► with_document (stamp, promote or re-heapify)        │
│          ──► enforce_budget                                                      │
│                                                                                  │
│  enforce_budget: while over count, then while over bytes:                        │
│          heap.peek_min ──► docs.move_to_disk ──► heap.remove_min ──► release     │
└──────────────────────────────────────────────────────────────────────────────────┘
*/
