//! Normalizer: maps a raw supplier payload onto canonical fields and
//! records, per field, what changed, why, and with what confidence
//!
//! Exactly one FieldComparison is emitted per canonical field per run,
//! whatever the payload looks like. Malformed supplier values never abort
//! a run; the field is marked `invalid` and the run continues with a
//! reduced score.

use crate::models::{
    CanonicalField, ChangeType, FieldComparison, Lifecycle, PriceBreak, Specifications,
    SupplierDataQuality,
};
use crate::suppliers::RawPayload;
use uuid::Uuid;

/// Canonical field values produced by one normalization pass
///
/// A partially-filled view of CanonicalComponent; the router fills in
/// score/source/timestamp when it commits.
#[derive(Debug, Clone, Default)]
pub struct CanonicalFields {
    pub mpn: Option<String>,
    pub manufacturer: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub datasheet_url: Option<String>,
    pub image_url: Option<String>,
    pub lifecycle: Lifecycle,
    pub rohs: Option<bool>,
    pub reach: Option<bool>,
    pub specifications: Specifications,
    pub pricing: Vec<PriceBreak>,
}

/// Output of one normalization pass
#[derive(Debug)]
pub struct NormalizedRecord {
    pub fields: CanonicalFields,
    pub comparisons: Vec<FieldComparison>,
}

/// Per-field confidence assigned from how the value was obtained
fn confidence_for(change_type: ChangeType, quality: SupplierDataQuality) -> f64 {
    let base = match change_type {
        ChangeType::Unchanged => 95.0,
        ChangeType::Cleaned => 85.0,
        ChangeType::Mapped => 80.0,
        ChangeType::Extracted => 65.0,
        ChangeType::Removed => 10.0,
        ChangeType::Missing => 0.0,
    };
    match quality {
        SupplierDataQuality::Good => base,
        SupplierDataQuality::Incomplete => base * 0.7,
        SupplierDataQuality::Invalid => base.min(20.0),
        SupplierDataQuality::Missing => 0.0,
    }
}

/// Stateless normalizer over the fixed canonical field list
#[derive(Debug, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize one raw payload, emitting exactly one comparison per
    /// canonical field
    pub fn normalize(&self, payload: &RawPayload, run_id: Uuid) -> NormalizedRecord {
        let mut fields = CanonicalFields::default();
        let mut comparisons = Vec::with_capacity(CanonicalField::ALL.len());

        for field in CanonicalField::ALL {
            let comparison = match field {
                CanonicalField::Mpn => self.text_field(
                    run_id,
                    field,
                    payload.mpn.as_deref(),
                    &mut fields.mpn,
                ),
                CanonicalField::Manufacturer => self.manufacturer_field(run_id, payload, &mut fields),
                CanonicalField::Category => self.category_field(run_id, payload, &mut fields),
                CanonicalField::Description => self.description_field(run_id, payload, &mut fields),
                CanonicalField::DatasheetUrl => self.url_field(
                    run_id,
                    field,
                    payload.datasheet_url.as_deref(),
                    &mut fields.datasheet_url,
                ),
                CanonicalField::ImageUrl => self.url_field(
                    run_id,
                    field,
                    payload.image_url.as_deref(),
                    &mut fields.image_url,
                ),
                CanonicalField::Lifecycle => self.lifecycle_field(run_id, payload, &mut fields),
                CanonicalField::Compliance => self.compliance_field(run_id, payload, &mut fields),
                CanonicalField::Specifications => self.specifications_field(run_id, payload, &mut fields),
                CanonicalField::Pricing => self.pricing_field(run_id, payload, &mut fields),
            };
            comparisons.push(comparison);
        }

        debug_assert_eq!(comparisons.len(), CanonicalField::ALL.len());

        NormalizedRecord { fields, comparisons }
    }

    fn comparison(
        run_id: Uuid,
        field: CanonicalField,
        supplier_value: Option<String>,
        normalized_value: Option<String>,
        change_type: ChangeType,
        change_reason: Option<String>,
        quality: SupplierDataQuality,
    ) -> FieldComparison {
        FieldComparison {
            run_id,
            field_name: field.name().to_string(),
            field_category: field.category_name().to_string(),
            changed: supplier_value != normalized_value,
            supplier_value,
            normalized_value,
            change_type,
            change_reason,
            confidence: confidence_for(change_type, quality),
            supplier_data_quality: quality,
        }
    }

    /// Plain text field: trim + collapse internal whitespace
    fn text_field(
        &self,
        run_id: Uuid,
        field: CanonicalField,
        raw: Option<&str>,
        out: &mut Option<String>,
    ) -> FieldComparison {
        match raw {
            None => Self::comparison(
                run_id, field, None, None,
                ChangeType::Missing, None, SupplierDataQuality::Missing,
            ),
            Some(s) if s.trim().is_empty() => Self::comparison(
                run_id, field, Some(s.to_string()), None,
                ChangeType::Missing,
                Some("empty supplier value".to_string()),
                SupplierDataQuality::Missing,
            ),
            Some(s) => {
                let normalized = collapse_whitespace(s);
                let (change_type, reason) = if normalized == s {
                    (ChangeType::Unchanged, None)
                } else {
                    (ChangeType::Cleaned, Some("whitespace normalized".to_string()))
                };
                *out = Some(normalized.clone());
                Self::comparison(
                    run_id, field, Some(s.to_string()), Some(normalized),
                    change_type, reason, SupplierDataQuality::Good,
                )
            }
        }
    }

    fn manufacturer_field(
        &self,
        run_id: Uuid,
        payload: &RawPayload,
        fields: &mut CanonicalFields,
    ) -> FieldComparison {
        let field = CanonicalField::Manufacturer;
        match payload.manufacturer.as_deref() {
            None => Self::comparison(
                run_id, field, None, None,
                ChangeType::Missing, None, SupplierDataQuality::Missing,
            ),
            Some(s) if s.trim().is_empty() => Self::comparison(
                run_id, field, Some(s.to_string()), None,
                ChangeType::Missing,
                Some("empty supplier value".to_string()),
                SupplierDataQuality::Missing,
            ),
            Some(s) => {
                let normalized = strip_corporate_suffix(&collapse_whitespace(s));
                let (change_type, reason) = if normalized == s {
                    (ChangeType::Unchanged, None)
                } else {
                    (
                        ChangeType::Cleaned,
                        Some("corporate suffix/whitespace stripped".to_string()),
                    )
                };
                fields.manufacturer = Some(normalized.clone());
                Self::comparison(
                    run_id, field, Some(s.to_string()), Some(normalized),
                    change_type, reason, SupplierDataQuality::Good,
                )
            }
        }
    }

    /// Category paths like "Semiconductors/MCU" are mapped to their leaf
    fn category_field(
        &self,
        run_id: Uuid,
        payload: &RawPayload,
        fields: &mut CanonicalFields,
    ) -> FieldComparison {
        let field = CanonicalField::Category;
        match payload.category.as_deref() {
            None => Self::comparison(
                run_id, field, None, None,
                ChangeType::Missing, None, SupplierDataQuality::Missing,
            ),
            Some(s) if s.trim().is_empty() => Self::comparison(
                run_id, field, Some(s.to_string()), None,
                ChangeType::Missing,
                Some("empty supplier value".to_string()),
                SupplierDataQuality::Missing,
            ),
            Some(s) => {
                let leaf = s
                    .rsplit('/')
                    .next()
                    .map(collapse_whitespace)
                    .unwrap_or_else(|| collapse_whitespace(s));
                let (change_type, reason) = if leaf == s {
                    (ChangeType::Unchanged, None)
                } else {
                    (
                        ChangeType::Mapped,
                        Some("taxonomy path mapped to leaf category".to_string()),
                    )
                };
                fields.category = Some(leaf.clone());
                Self::comparison(
                    run_id, field, Some(s.to_string()), Some(leaf),
                    change_type, reason, SupplierDataQuality::Good,
                )
            }
        }
    }

    /// Descriptions that look like vendor marketing copy are dropped;
    /// a missing description can be extracted from vendor notes
    fn description_field(
        &self,
        run_id: Uuid,
        payload: &RawPayload,
        fields: &mut CanonicalFields,
    ) -> FieldComparison {
        let field = CanonicalField::Description;

        if let Some(s) = payload.description.as_deref() {
            if !s.trim().is_empty() {
                if looks_like_marketing(s) {
                    return Self::comparison(
                        run_id, field, Some(s.to_string()), None,
                        ChangeType::Removed,
                        Some("untrusted vendor free-text dropped".to_string()),
                        SupplierDataQuality::Invalid,
                    );
                }
                let normalized = collapse_whitespace(s);
                let (change_type, reason) = if normalized == s {
                    (ChangeType::Unchanged, None)
                } else {
                    (ChangeType::Cleaned, Some("whitespace normalized".to_string()))
                };
                fields.description = Some(normalized.clone());
                return Self::comparison(
                    run_id, field, Some(s.to_string()), Some(normalized),
                    change_type, reason, SupplierDataQuality::Good,
                );
            }
        }

        // Fall back to the first sentence of vendor notes
        if let Some(notes) = payload.vendor_notes.as_deref() {
            if let Some(sentence) = first_sentence(notes) {
                fields.description = Some(sentence.clone());
                return Self::comparison(
                    run_id, field,
                    Some(notes.to_string()), Some(sentence),
                    ChangeType::Extracted,
                    Some("derived from vendor notes".to_string()),
                    SupplierDataQuality::Incomplete,
                );
            }
        }

        Self::comparison(
            run_id, field,
            payload.description.clone(), None,
            ChangeType::Missing, None, SupplierDataQuality::Missing,
        )
    }

    /// URL fields: malformed URLs are a normalization defect, not an abort
    fn url_field(
        &self,
        run_id: Uuid,
        field: CanonicalField,
        raw: Option<&str>,
        out: &mut Option<String>,
    ) -> FieldComparison {
        match raw {
            None => Self::comparison(
                run_id, field, None, None,
                ChangeType::Missing, None, SupplierDataQuality::Missing,
            ),
            Some(s) if s.trim().is_empty() => Self::comparison(
                run_id, field, Some(s.to_string()), None,
                ChangeType::Missing,
                Some("empty supplier value".to_string()),
                SupplierDataQuality::Missing,
            ),
            Some(s) => {
                let trimmed = s.trim();
                if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
                    return Self::comparison(
                        run_id, field, Some(s.to_string()), None,
                        ChangeType::Removed,
                        Some("malformed URL dropped".to_string()),
                        SupplierDataQuality::Invalid,
                    );
                }
                let (change_type, reason) = if trimmed == s {
                    (ChangeType::Unchanged, None)
                } else {
                    (ChangeType::Cleaned, Some("whitespace trimmed".to_string()))
                };
                *out = Some(trimmed.to_string());
                Self::comparison(
                    run_id, field, Some(s.to_string()), Some(trimmed.to_string()),
                    change_type, reason, SupplierDataQuality::Good,
                )
            }
        }
    }

    /// Supplier lifecycle vocabularies are mapped to the canonical enum
    fn lifecycle_field(
        &self,
        run_id: Uuid,
        payload: &RawPayload,
        fields: &mut CanonicalFields,
    ) -> FieldComparison {
        let field = CanonicalField::Lifecycle;
        match payload.lifecycle_code.as_deref() {
            None => Self::comparison(
                run_id, field, None, None,
                ChangeType::Missing, None, SupplierDataQuality::Missing,
            ),
            Some(code) => match map_lifecycle(code) {
                Some(lifecycle) => {
                    fields.lifecycle = lifecycle;
                    Self::comparison(
                        run_id, field,
                        Some(code.to_string()), Some(lifecycle.as_str().to_string()),
                        ChangeType::Mapped,
                        Some("supplier lifecycle vocabulary mapped".to_string()),
                        SupplierDataQuality::Good,
                    )
                }
                None => Self::comparison(
                    run_id, field,
                    Some(code.to_string()), None,
                    ChangeType::Removed,
                    Some(format!("unrecognized lifecycle code: {}", code)),
                    SupplierDataQuality::Invalid,
                ),
            },
        }
    }

    /// RoHS/REACH booleans are extracted from free-form marking strings
    fn compliance_field(
        &self,
        run_id: Uuid,
        payload: &RawPayload,
        fields: &mut CanonicalFields,
    ) -> FieldComparison {
        let field = CanonicalField::Compliance;

        let rohs = payload.rohs_code.as_deref().and_then(parse_compliance_flag);
        let reach = payload.reach_code.as_deref().and_then(parse_compliance_flag);

        let supplier_value = match (&payload.rohs_code, &payload.reach_code) {
            (None, None) => None,
            (r, c) => Some(format!(
                "rohs={} reach={}",
                r.as_deref().unwrap_or("-"),
                c.as_deref().unwrap_or("-")
            )),
        };

        if rohs.is_none() && reach.is_none() {
            let quality = if supplier_value.is_some() {
                // Markings present but unparseable
                SupplierDataQuality::Invalid
            } else {
                SupplierDataQuality::Missing
            };
            let change_type = if supplier_value.is_some() {
                ChangeType::Removed
            } else {
                ChangeType::Missing
            };
            return Self::comparison(
                run_id, field, supplier_value, None, change_type,
                Some("no parseable compliance marking".to_string()).filter(|_| change_type == ChangeType::Removed),
                quality,
            );
        }

        fields.rohs = rohs;
        fields.reach = reach;

        let normalized = format!(
            "rohs={} reach={}",
            rohs.map(|b| b.to_string()).unwrap_or_else(|| "-".to_string()),
            reach.map(|b| b.to_string()).unwrap_or_else(|| "-".to_string())
        );
        let quality = if rohs.is_some() && reach.is_some() {
            SupplierDataQuality::Good
        } else {
            SupplierDataQuality::Incomplete
        };

        Self::comparison(
            run_id, field, supplier_value, Some(normalized),
            ChangeType::Extracted,
            Some("booleans extracted from compliance markings".to_string()),
            quality,
        )
    }

    /// Known spec keys map to typed fields; everything else lands in the
    /// labeled extension bag
    fn specifications_field(
        &self,
        run_id: Uuid,
        payload: &RawPayload,
        fields: &mut CanonicalFields,
    ) -> FieldComparison {
        let field = CanonicalField::Specifications;

        if payload.attributes.is_empty() {
            return Self::comparison(
                run_id, field, None, None,
                ChangeType::Missing, None, SupplierDataQuality::Missing,
            );
        }

        let mut specs = Specifications::default();
        let mut typed = 0usize;
        for (key, value) in &payload.attributes {
            let k = key.to_lowercase();
            let v = collapse_whitespace(value);
            if k.contains("package") || k.contains("case") {
                specs.package = Some(v);
                typed += 1;
            } else if k.contains("tolerance") {
                specs.tolerance = Some(v);
                typed += 1;
            } else if k.contains("voltage") {
                specs.voltage_rating = Some(v);
                typed += 1;
            } else if k.contains("temperature") || k.contains("temp range") {
                specs.temperature_range = Some(v);
                typed += 1;
            } else if k.contains("mounting") {
                specs.mounting_type = Some(v);
                typed += 1;
            } else {
                specs.extensions.insert(key.clone(), v);
            }
        }

        let extension_count = specs.extensions.len();
        let supplier_value = serde_json::to_string(
            &payload
                .attributes
                .iter()
                .cloned()
                .collect::<std::collections::BTreeMap<_, _>>(),
        )
        .ok();
        let normalized_value = serde_json::to_string(&specs).ok();

        fields.specifications = specs;

        Self::comparison(
            run_id, field, supplier_value, normalized_value,
            ChangeType::Mapped,
            Some(format!(
                "{} attributes typed, {} preserved as extensions",
                typed, extension_count
            )),
            SupplierDataQuality::Good,
        )
    }

    /// Price breaks are ordered by quantity, stamped with the supplier,
    /// and non-positive entries dropped
    fn pricing_field(
        &self,
        run_id: Uuid,
        payload: &RawPayload,
        fields: &mut CanonicalFields,
    ) -> FieldComparison {
        let field = CanonicalField::Pricing;

        if payload.pricing.is_empty() {
            return Self::comparison(
                run_id, field, None, None,
                ChangeType::Missing, None, SupplierDataQuality::Missing,
            );
        }

        let total = payload.pricing.len();
        let mut breaks: Vec<PriceBreak> = payload
            .pricing
            .iter()
            .filter(|p| p.unit_price > 0.0 && p.quantity > 0)
            .map(|p| PriceBreak {
                quantity: p.quantity,
                price: p.unit_price,
                supplier: payload.supplier.clone(),
            })
            .collect();
        breaks.sort_by_key(|p| p.quantity);

        let dropped = total - breaks.len();
        let quality = if breaks.is_empty() {
            SupplierDataQuality::Invalid
        } else if dropped > 0 {
            SupplierDataQuality::Incomplete
        } else {
            SupplierDataQuality::Good
        };

        let supplier_value = Some(format!("{} price breaks", total));
        let normalized_value = serde_json::to_string(&breaks).ok();

        if breaks.is_empty() {
            return Self::comparison(
                run_id, field, supplier_value, None,
                ChangeType::Removed,
                Some("all price breaks invalid".to_string()),
                quality,
            );
        }

        fields.pricing = breaks;

        Self::comparison(
            run_id, field, supplier_value, normalized_value,
            ChangeType::Cleaned,
            Some(format!(
                "ordered by quantity, supplier attributed, {} dropped",
                dropped
            )),
            quality,
        )
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_corporate_suffix(s: &str) -> String {
    const SUFFIXES: [&str; 6] = [", Inc.", " Inc.", ", Inc", " Corp.", " Corporation", " Ltd."];
    for suffix in SUFFIXES {
        if let Some(stripped) = s.strip_suffix(suffix) {
            return stripped.to_string();
        }
    }
    s.to_string()
}

fn looks_like_marketing(s: &str) -> bool {
    s.contains('!') || s.to_lowercase().contains("best in class")
}

fn first_sentence(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    let sentence = trimmed
        .split_terminator(['.', '!', '\n'])
        .next()
        .unwrap_or(trimmed)
        .trim();
    if sentence.is_empty() {
        None
    } else {
        Some(collapse_whitespace(sentence))
    }
}

fn map_lifecycle(code: &str) -> Option<Lifecycle> {
    let c = code.trim().to_lowercase();
    match c.as_str() {
        "active" | "production" | "in production" => Some(Lifecycle::Active),
        "nrnd" | "not recommended" | "not recommended for new designs" => Some(Lifecycle::Nrnd),
        "obsolete" | "discontinued" => Some(Lifecycle::Obsolete),
        "preview" | "preproduction" | "engineering sample" => Some(Lifecycle::Preview),
        "eol" | "end of life" | "last time buy" => Some(Lifecycle::EndOfLife),
        _ => None,
    }
}

fn parse_compliance_flag(s: &str) -> Option<bool> {
    let c = s.trim().to_lowercase();
    if c.is_empty() {
        return None;
    }
    if c.starts_with("non") || c == "no" || c == "false" {
        Some(false)
    } else if c.contains("compliant") || c == "yes" || c == "true" || c.starts_with("rohs")
        || c == "unaffected"
    {
        Some(true)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suppliers::RawPriceBreak;

    fn full_payload() -> RawPayload {
        RawPayload {
            supplier: "DigiSupply".to_string(),
            tier: 1,
            mpn: Some("GRM188R71C104KA01D".to_string()),
            manufacturer: Some("Murata Manufacturing Co., Inc.".to_string()),
            category: Some("Passives/Capacitors/Ceramic Capacitors".to_string()),
            description: Some("CAP CER 0.1UF  16V X7R 0603".to_string()),
            datasheet_url: Some("https://example.com/grm188.pdf".to_string()),
            image_url: Some(" https://example.com/grm188.jpg ".to_string()),
            lifecycle_code: Some("ACTIVE".to_string()),
            rohs_code: Some("Compliant".to_string()),
            reach_code: Some("Unaffected".to_string()),
            attributes: vec![
                ("Package / Case".to_string(), "0603 (1608 Metric)".to_string()),
                ("Tolerance".to_string(), "±10%".to_string()),
                ("Ripple Current".to_string(), "n/a".to_string()),
            ],
            pricing: vec![
                RawPriceBreak { quantity: 100, unit_price: 0.015 },
                RawPriceBreak { quantity: 1, unit_price: 0.10 },
            ],
            vendor_notes: None,
        }
    }

    #[test]
    fn test_one_comparison_per_canonical_field() {
        let record = Normalizer::new().normalize(&full_payload(), Uuid::new_v4());
        assert_eq!(record.comparisons.len(), CanonicalField::ALL.len());

        // Field names match the canonical list, in order
        for (comparison, field) in record.comparisons.iter().zip(CanonicalField::ALL) {
            assert_eq!(comparison.field_name, field.name());
            assert_eq!(comparison.field_category, field.category_name());
        }
    }

    #[test]
    fn test_one_comparison_per_field_even_for_empty_payload() {
        let record = Normalizer::new().normalize(&RawPayload::default(), Uuid::new_v4());
        assert_eq!(record.comparisons.len(), CanonicalField::ALL.len());
        for comparison in &record.comparisons {
            assert_eq!(comparison.change_type, ChangeType::Missing);
            assert_eq!(comparison.supplier_data_quality, SupplierDataQuality::Missing);
            assert_eq!(comparison.confidence, 0.0);
        }
    }

    #[test]
    fn test_lifecycle_vocabulary_mapped() {
        let record = Normalizer::new().normalize(&full_payload(), Uuid::new_v4());
        assert_eq!(record.fields.lifecycle, Lifecycle::Active);

        let lc = record
            .comparisons
            .iter()
            .find(|c| c.field_name == "lifecycle")
            .unwrap();
        assert_eq!(lc.change_type, ChangeType::Mapped);
        assert_eq!(lc.normalized_value.as_deref(), Some("active"));
    }

    #[test]
    fn test_unrecognized_lifecycle_is_invalid_not_fatal() {
        let mut payload = full_payload();
        payload.lifecycle_code = Some("WEIRD_CODE_7".to_string());

        let record = Normalizer::new().normalize(&payload, Uuid::new_v4());
        assert_eq!(record.fields.lifecycle, Lifecycle::Unknown);

        let lc = record
            .comparisons
            .iter()
            .find(|c| c.field_name == "lifecycle")
            .unwrap();
        assert_eq!(lc.supplier_data_quality, SupplierDataQuality::Invalid);
        // The other nine comparisons still exist
        assert_eq!(record.comparisons.len(), CanonicalField::ALL.len());
    }

    #[test]
    fn test_malformed_url_removed() {
        let mut payload = full_payload();
        payload.datasheet_url = Some("ftp://not-a-web-url/x.pdf".to_string());

        let record = Normalizer::new().normalize(&payload, Uuid::new_v4());
        assert!(record.fields.datasheet_url.is_none());

        let ds = record
            .comparisons
            .iter()
            .find(|c| c.field_name == "datasheet_url")
            .unwrap();
        assert_eq!(ds.change_type, ChangeType::Removed);
        assert_eq!(ds.supplier_data_quality, SupplierDataQuality::Invalid);
    }

    #[test]
    fn test_marketing_description_removed() {
        let mut payload = full_payload();
        payload.description = Some("Best caps in town!".to_string());
        payload.vendor_notes = None;

        let record = Normalizer::new().normalize(&payload, Uuid::new_v4());
        assert!(record.fields.description.is_none());

        let desc = record
            .comparisons
            .iter()
            .find(|c| c.field_name == "description")
            .unwrap();
        assert_eq!(desc.change_type, ChangeType::Removed);
    }

    #[test]
    fn test_description_extracted_from_vendor_notes() {
        let mut payload = full_payload();
        payload.description = None;
        payload.vendor_notes =
            Some("Dual op-amp in SOIC-8 package. Industry standard!".to_string());

        let record = Normalizer::new().normalize(&payload, Uuid::new_v4());
        assert_eq!(
            record.fields.description.as_deref(),
            Some("Dual op-amp in SOIC-8 package")
        );

        let desc = record
            .comparisons
            .iter()
            .find(|c| c.field_name == "description")
            .unwrap();
        assert_eq!(desc.change_type, ChangeType::Extracted);
        assert_eq!(desc.supplier_data_quality, SupplierDataQuality::Incomplete);
    }

    #[test]
    fn test_specifications_typed_plus_extension_bag() {
        let record = Normalizer::new().normalize(&full_payload(), Uuid::new_v4());
        let specs = &record.fields.specifications;

        assert_eq!(specs.package.as_deref(), Some("0603 (1608 Metric)"));
        assert_eq!(specs.tolerance.as_deref(), Some("±10%"));
        // Unknown key preserved, not silently dropped
        assert_eq!(specs.extensions.get("Ripple Current").map(String::as_str), Some("n/a"));
    }

    #[test]
    fn test_pricing_ordered_and_attributed() {
        let record = Normalizer::new().normalize(&full_payload(), Uuid::new_v4());
        let pricing = &record.fields.pricing;

        assert_eq!(pricing.len(), 2);
        assert_eq!(pricing[0].quantity, 1);
        assert_eq!(pricing[1].quantity, 100);
        assert!(pricing.iter().all(|p| p.supplier == "DigiSupply"));
    }

    #[test]
    fn test_invalid_price_breaks_dropped() {
        let mut payload = full_payload();
        payload.pricing.push(RawPriceBreak { quantity: 0, unit_price: -1.0 });

        let record = Normalizer::new().normalize(&payload, Uuid::new_v4());
        assert_eq!(record.fields.pricing.len(), 2);

        let pricing = record
            .comparisons
            .iter()
            .find(|c| c.field_name == "pricing")
            .unwrap();
        assert_eq!(pricing.supplier_data_quality, SupplierDataQuality::Incomplete);
    }

    #[test]
    fn test_manufacturer_suffix_stripped() {
        let record = Normalizer::new().normalize(&full_payload(), Uuid::new_v4());
        assert_eq!(
            record.fields.manufacturer.as_deref(),
            Some("Murata Manufacturing Co.")
        );

        let mfr = record
            .comparisons
            .iter()
            .find(|c| c.field_name == "manufacturer")
            .unwrap();
        assert_eq!(mfr.change_type, ChangeType::Cleaned);
        assert!(mfr.changed);
    }

    #[test]
    fn test_category_leaf_mapping() {
        let record = Normalizer::new().normalize(&full_payload(), Uuid::new_v4());
        assert_eq!(record.fields.category.as_deref(), Some("Ceramic Capacitors"));

        let cat = record
            .comparisons
            .iter()
            .find(|c| c.field_name == "category")
            .unwrap();
        assert_eq!(cat.change_type, ChangeType::Mapped);
    }

    #[test]
    fn test_compliance_extraction() {
        let record = Normalizer::new().normalize(&full_payload(), Uuid::new_v4());
        assert_eq!(record.fields.rohs, Some(true));
        assert_eq!(record.fields.reach, Some(true));

        let comp = record
            .comparisons
            .iter()
            .find(|c| c.field_name == "compliance")
            .unwrap();
        assert_eq!(comp.change_type, ChangeType::Extracted);
        assert_eq!(comp.supplier_data_quality, SupplierDataQuality::Good);
    }
}
