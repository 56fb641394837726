//! kg-context — C6 Context Synthesizer. Builds the session-start and
//! strategic-context responses by fanning read-only queries out across
//! `GraphGateway` and absorbing per-branch failures under a wall-clock
//! budget, grounded on the fan-out/fan-in shape documented in SPEC_FULL §9.

mod fanout;
mod mappers;
mod queries;
mod synthesizer;
mod token_estimate;

pub use synthesizer::GraphContextSynthesizer;
pub use token_estimate::TokenEstimateCoefficients;
