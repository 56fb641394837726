//! Score → relationship-kind mapping (§4.5 step 5). Thresholds are
//! configuration constants in production (`kg-server::config::KgConfig`)
//! but the mapping function itself is pure and crate-local so it can be
//! unit tested without a running server.

use kg_core::types::SearchRelationshipKind;

#[derive(Debug, Clone, Copy)]
pub struct SimilarityThresholds {
    pub duplicate: f32,
    pub high: f32,
    pub medium: f32,
}

impl Default for SimilarityThresholds {
    /// §4.5 documents `minScore` default `0.75` as the medium threshold;
    /// duplicate and high are configuration constants per the same section.
    fn default() -> Self {
        Self {
            duplicate: 0.95,
            high: 0.85,
            medium: 0.75,
        }
    }
}

impl SimilarityThresholds {
    pub fn classify(&self, score: f32) -> SearchRelationshipKind {
        if score >= self.duplicate {
            SearchRelationshipKind::DuplicateOf
        } else if score >= self.high {
            SearchRelationshipKind::HighlyRelatedTo
        } else if score >= self.medium {
            SearchRelationshipKind::RelatedTo
        } else {
            SearchRelationshipKind::LooselyRelatedTo
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_each_band() {
        let t = SimilarityThresholds::default();
        assert_eq!(t.classify(0.97), SearchRelationshipKind::DuplicateOf);
        assert_eq!(t.classify(0.9), SearchRelationshipKind::HighlyRelatedTo);
        assert_eq!(t.classify(0.8), SearchRelationshipKind::RelatedTo);
        assert_eq!(t.classify(0.5), SearchRelationshipKind::LooselyRelatedTo);
    }

    #[test]
    fn boundary_values_belong_to_the_higher_band() {
        let t = SimilarityThresholds::default();
        assert_eq!(t.classify(0.95), SearchRelationshipKind::DuplicateOf);
        assert_eq!(t.classify(0.85), SearchRelationshipKind::HighlyRelatedTo);
        assert_eq!(t.classify(0.75), SearchRelationshipKind::RelatedTo);
    }
}
