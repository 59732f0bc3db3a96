//! # Repository Module
//!
//! Database repository implementations for Billbook.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  NumberingService                    Save workflow / exporters          │
//! │       │                                    │                            │
//! │       │  store.advance(kind)               │  db.documents()            │
//! │       ▼                                    ▼                            │
//! │  SequenceRepository                  DocumentRepository                 │
//! │  ├── load / seed                     ├── insert_snapshot                │
//! │  ├── advance (atomic reserve)        ├── get_by_number                  │
//! │  ├── fast_forward                    ├── highest_sequence_value         │
//! │  └── list                            └── count                          │
//! │       │                                    │                            │
//! │       ▼                                    ▼                            │
//! │  document_sequences                  documents                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod document;
pub mod sequence;
