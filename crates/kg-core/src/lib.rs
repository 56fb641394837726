//! Pure domain layer for the knowledge graph service: entity types, the
//! error taxonomy, principal/authorization primitives, port traits every
//! adapter implements, and the storage-independent derivations (canonical
//! ids, malformed-title detection, retry-ladder arithmetic) shared by more
//! than one adapter crate.

pub mod canonical;
pub mod dto;
pub mod error;
pub mod graph_value;
pub mod ports;
pub mod principal;
pub mod retry_ladder;
pub mod tenant;
pub mod types;
