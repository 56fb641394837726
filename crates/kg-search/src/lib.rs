//! kg-search — C5 Embedding & Semantic Search. Calls the (excluded)
//! embedding provider through a narrow trait, issues the vector-index
//! top-K query through `GraphGateway`, and maps scores to relationship
//! kinds, grounded on `dashflow-neo4j`'s `Neo4jVector::similarity_search_by_vector_internal`
//! (`CALL db.index.vector.queryNodes(...) YIELD node, score`).

pub mod embedding;
pub mod search;
pub mod thresholds;

pub use embedding::HttpEmbeddingClient;
pub use search::GraphSemanticSearch;
pub use thresholds::SimilarityThresholds;
