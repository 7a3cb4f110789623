//! Quality scoring for enriched component records
//!
//! Produces a 0-100 score from field completeness, a confidence axis,
//! and how far down the tier chain the answer came from. The confidence
//! axis blends the supplier chain's match confidence with the mean
//! per-field confidence the normalizer assigned to the present fields.
//! The score is monotonic in completeness: filling in another field
//! never lowers it.

use crate::models::CanonicalField;
use crate::normalize::NormalizedRecord;

/// Relative weight of the scored dimensions
#[derive(Debug, Clone, Copy)]
pub struct ScorerWeights {
    pub completeness: f64,
    pub confidence: f64,
    /// Share of the confidence axis taken by the supplier match
    /// confidence; the remainder comes from mean per-field confidence
    pub match_share: f64,
    /// Points subtracted per tier below the primary source
    pub tier_penalty: f64,
}

impl Default for ScorerWeights {
    fn default() -> Self {
        Self {
            completeness: 0.65,
            confidence: 0.35,
            match_share: 0.6,
            tier_penalty: 0.5,
        }
    }
}

/// Score with its contributing dimensions, kept for audit rows
#[derive(Debug, Clone, Copy)]
pub struct QualityBreakdown {
    pub completeness: f64,
    pub match_confidence: f64,
    pub field_confidence: f64,
    pub tier_reached: u8,
    pub score: f64,
}

/// Weighted quality scorer
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityScorer {
    weights: ScorerWeights,
}

impl QualityScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: ScorerWeights) -> Self {
        Self { weights }
    }

    /// Score one normalized record
    ///
    /// `match_confidence` is the supplier chain's 0-100 confidence in the
    /// part identity; `tier_reached` is 1-based.
    pub fn score(
        &self,
        record: &NormalizedRecord,
        match_confidence: f64,
        tier_reached: u8,
    ) -> QualityBreakdown {
        let completeness = self.completeness(record);
        let match_confidence = match_confidence.clamp(0.0, 100.0);
        let field_confidence = Self::field_confidence(record);

        let confidence = self.weights.match_share * match_confidence
            + (1.0 - self.weights.match_share) * field_confidence;

        let raw = self.weights.completeness * completeness
            + self.weights.confidence * confidence
            - self.weights.tier_penalty * f64::from(tier_reached.saturating_sub(1));

        QualityBreakdown {
            completeness,
            match_confidence,
            field_confidence,
            tier_reached,
            score: raw.clamp(0.0, 100.0),
        }
    }

    /// Weighted field presence, 0-100
    ///
    /// Required fields count double. A field whose supplier value was
    /// dropped as invalid has no normalized value and counts as absent.
    fn completeness(&self, record: &NormalizedRecord) -> f64 {
        let mut achieved = 0.0;
        let mut total = 0.0;

        for (comparison, field) in record.comparisons.iter().zip(CanonicalField::ALL) {
            let weight = if field.is_required() { 2.0 } else { 1.0 };
            total += weight;
            if comparison.normalized_value.is_some() {
                achieved += weight;
            }
        }

        if total == 0.0 {
            0.0
        } else {
            achieved / total * 100.0
        }
    }

    /// Mean per-field confidence across present fields, 0-100
    ///
    /// Confidence values come from the normalizer and already reflect
    /// how each value was obtained and its supplier data quality.
    fn field_confidence(record: &NormalizedRecord) -> f64 {
        let mut sum = 0.0;
        let mut count = 0usize;
        for comparison in &record.comparisons {
            if comparison.normalized_value.is_some() {
                sum += comparison.confidence;
                count += 1;
            }
        }
        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Normalizer;
    use crate::suppliers::{RawPayload, RawPriceBreak};
    use uuid::Uuid;

    fn full_payload() -> RawPayload {
        RawPayload {
            supplier: "DigiSupply".to_string(),
            tier: 1,
            mpn: Some("LM358DR".to_string()),
            manufacturer: Some("Texas Instruments".to_string()),
            category: Some("ICs/Amplifiers".to_string()),
            description: Some("Dual op-amp SOIC-8".to_string()),
            datasheet_url: Some("https://example.com/lm358.pdf".to_string()),
            image_url: Some("https://example.com/lm358.jpg".to_string()),
            lifecycle_code: Some("Active".to_string()),
            rohs_code: Some("Compliant".to_string()),
            reach_code: Some("Unaffected".to_string()),
            attributes: vec![("Supply Voltage".to_string(), "3V ~ 32V".to_string())],
            pricing: vec![RawPriceBreak { quantity: 1, unit_price: 0.25 }],
            vendor_notes: None,
        }
    }

    fn record_for(payload: &RawPayload) -> NormalizedRecord {
        Normalizer::new().normalize(payload, Uuid::new_v4())
    }

    #[test]
    fn test_full_record_high_confidence_reaches_production_band() {
        let record = record_for(&full_payload());
        let breakdown = QualityScorer::new().score(&record, 95.0, 1);

        assert_eq!(breakdown.completeness, 100.0);
        assert!(breakdown.score >= 95.0, "score was {}", breakdown.score);
    }

    #[test]
    fn test_tier_two_full_record_still_reaches_production_band() {
        let record = record_for(&full_payload());
        let breakdown = QualityScorer::new().score(&record, 90.0, 2);

        assert!(breakdown.score >= 95.0, "score was {}", breakdown.score);
    }

    #[test]
    fn test_adding_a_field_never_lowers_the_score() {
        let mut sparse = full_payload();
        sparse.datasheet_url = None;
        sparse.image_url = None;
        sparse.pricing.clear();

        let scorer = QualityScorer::new();
        let sparse_score = scorer.score(&record_for(&sparse), 80.0, 2).score;

        // datasheet_url is required: restoring it strictly raises the score
        let mut with_datasheet = sparse.clone();
        with_datasheet.datasheet_url = Some("https://example.com/x.pdf".to_string());
        let ds_score = scorer.score(&record_for(&with_datasheet), 80.0, 2).score;
        assert!(ds_score > sparse_score);

        let mut with_both = with_datasheet.clone();
        with_both.image_url = Some("https://example.com/x.jpg".to_string());
        let both_score = scorer.score(&record_for(&with_both), 80.0, 2).score;
        assert!(both_score >= ds_score);
    }

    #[test]
    fn test_deeper_tier_scores_lower() {
        let record = record_for(&full_payload());
        let scorer = QualityScorer::new();

        let tier1 = scorer.score(&record, 80.0, 1).score;
        let tier2 = scorer.score(&record, 80.0, 2).score;
        let tier4 = scorer.score(&record, 80.0, 4).score;

        assert!(tier1 > tier2);
        assert!(tier2 > tier4);
    }

    #[test]
    fn test_sparse_scrape_record_lands_below_review_threshold() {
        // Identity + datasheet only, low confidence, deepest tier
        let payload = RawPayload {
            supplier: "SheetScrape".to_string(),
            tier: 4,
            mpn: Some("NE555P".to_string()),
            manufacturer: Some("TI".to_string()),
            description: Some("Precision Timer".to_string()),
            datasheet_url: Some("https://example.com/ne555.pdf".to_string()),
            ..RawPayload::default()
        };

        let breakdown = QualityScorer::new().score(&record_for(&payload), 55.0, 4);
        assert!(breakdown.score < 70.0, "score was {}", breakdown.score);
    }

    #[test]
    fn test_score_stays_in_bounds() {
        let empty = record_for(&RawPayload::default());
        let scorer = QualityScorer::new();

        let low = scorer.score(&empty, 0.0, 4).score;
        assert!(low >= 0.0);

        let high = scorer.score(&record_for(&full_payload()), 200.0, 1).score;
        assert!(high <= 100.0);
    }

    #[test]
    fn test_field_confidence_feeds_the_score() {
        // Same fields present, same match confidence; one record needed
        // cleanup, so its per-field confidence is lower
        let pristine = full_payload();
        let mut messy = full_payload();
        messy.description = Some("Dual  op-amp   SOIC-8".to_string());

        let scorer = QualityScorer::new();
        let clean = scorer.score(&record_for(&pristine), 90.0, 1);
        let cleaned = scorer.score(&record_for(&messy), 90.0, 1);

        assert_eq!(clean.completeness, cleaned.completeness);
        assert_eq!(clean.match_confidence, cleaned.match_confidence);
        assert!(clean.field_confidence > cleaned.field_confidence);
        assert!(clean.score > cleaned.score);
    }

    #[test]
    fn test_invalid_fields_count_as_absent() {
        let mut payload = full_payload();
        payload.datasheet_url = Some("not-a-url".to_string());

        let with_bad_url = record_for(&payload);
        let mut without = full_payload();
        without.datasheet_url = None;
        let with_none = record_for(&without);

        let scorer = QualityScorer::new();
        assert_eq!(
            scorer.score(&with_bad_url, 90.0, 1).completeness,
            scorer.score(&with_none, 90.0, 1).completeness
        );
    }
}
