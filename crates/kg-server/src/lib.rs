//! kg-server — standalone REST composition root for the knowledge graph
//! service.
//!
//! Wires `kg-graph`'s Neo4j adapters plus the `kg-search`, `kg-context`,
//! `kg-events`, `kg-dlq`, and `kg-verify` ports behind JWT-authenticated
//! routes. A small illustrative subset of each component's operations is
//! exposed here; the full HTTP/GraphQL surface is an excluded collaborator
//! concern.
//!
//! Routes:
//!   GET  /health                          — liveness (no auth)
//!   POST /session/start                   — C6 session bootstrap
//!   POST /context/strategic               — C6 strategic context
//!   POST /events                          — C7 append
//!   GET  /events/stream                   — C7 long-poll tail
//!   POST /search                          — C5 semantic search
//!   GET  /dlq, /dlq/:id                   — C8 inspection
//!   POST /dlq/:id/retry                   — C8 manual retry
//!   POST /tasks/:id/verify                — C10 verification
//!   POST /tasks/:id/override              — C10 human override
//!   POST /migrations/:id/backfill         — C9 backfill
//!   POST /migrations/cleanup              — C9 cleanup
//!   POST /migrations/reconcile            — C4 duplicate reconciliation
//!   /nodes*, /relationships               — C3 typed repository

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;
pub mod tenant;
