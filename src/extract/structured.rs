//! Structured-state extraction
//!
//! Results pages embed their data as a single JSON document (by default the
//! `__NEXT_DATA__` script). Listing summaries are the objects in that document
//! whose `__typename` matches the configured listing type.

use crate::config::StructuredConfig;
use crate::extract::{parse_selector, ExtractionStrategy, ParseError};
use crate::listing::{ListingRecord, RawPage, StrategyKind};
use crate::ConfigError;
use scraper::{Html, Selector};
use serde_json::Value;

const TYPENAME_KEY: &str = "__typename";

/// Decodes listings from the embedded state payload
pub struct StructuredStateExtractor {
    anchor: Selector,
    anchor_source: String,
    listing_type: String,
    listing_url_base: String,
}

impl StructuredStateExtractor {
    pub fn new(config: &StructuredConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            anchor: parse_selector(&config.anchor)?,
            anchor_source: config.anchor.clone(),
            listing_type: config.listing_type.clone(),
            listing_url_base: config.listing_url_base.trim_end_matches('/').to_string(),
        })
    }

    /// Pulls the raw payload text out of the page
    fn payload(&self, content: &str) -> Result<String, ParseError> {
        let document = Html::parse_document(content);
        let text = document
            .select(&self.anchor)
            .next()
            .map(|element| element.text().collect::<String>())
            .ok_or_else(|| ParseError::MissingAnchor {
                anchor: self.anchor_source.clone(),
            })?;

        if text.trim().is_empty() {
            return Err(ParseError::EmptyPayload {
                anchor: self.anchor_source.clone(),
            });
        }
        Ok(text)
    }

    /// Maps one listing summary to a record
    ///
    /// Returns None for entries without a VIN or without make/model names.
    fn map_entry(&self, entry: &Value) -> Option<ListingRecord> {
        let vehicle = entry.get("vehicle").unwrap_or(&Value::Null);

        let vin = text_at(vehicle, &["vin"]).or_else(|| text_at(entry, &["vin"]));
        let Some(vin) = vin else {
            tracing::trace!("Discarding listing summary without a VIN");
            return None;
        };

        let make = name_at(vehicle, "make");
        let model = name_at(vehicle, "model");
        let (Some(make), Some(model)) = (make, model) else {
            tracing::debug!("Discarding listing {} without make/model", vin);
            return None;
        };

        let mut record = ListingRecord::new(make, model, StrategyKind::StructuredState);

        record.listing_id = text_at(entry, &["id"]);
        record.year = number_at(vehicle, &["year"]).and_then(|y| u32::try_from(y).ok());
        record.price = number_at(entry, &["pricing", "listPrice"]);
        record.mileage = number_at(vehicle, &["mileage"]);
        record.location = location(entry.get("location"));
        record.trim = text_at(vehicle, &["style", "trimName"])
            .or_else(|| text_at(vehicle, &["style", "trim"]))
            .or_else(|| name_at(vehicle, "trim"));
        record.style = text_at(vehicle, &["style", "name"]);
        record.exterior_color = name_at(vehicle, "exteriorColor");
        record.interior_color = name_at(vehicle, "interiorColor");
        record.fuel_type = name_at(vehicle, "fuelType");
        record.transmission = name_at(vehicle, "transmission");
        record.engine = name_at(vehicle, "engine");
        record.condition = name_at(entry, "condition").or_else(|| name_at(vehicle, "condition"));

        let make_slug = text_at(vehicle, &["make", "slug"]);
        let model_slug = text_at(vehicle, &["model", "slug"]);
        record.url = Some(match (make_slug, model_slug) {
            (Some(make_slug), Some(model_slug)) => format!(
                "{}/{}/{}/{}/",
                self.listing_url_base, make_slug, model_slug, vin
            ),
            _ => format!("{}/{}/", self.listing_url_base, vin),
        });
        record.vin = Some(vin);

        Some(record)
    }
}

impl ExtractionStrategy for StructuredStateExtractor {
    fn kind(&self) -> StrategyKind {
        StrategyKind::StructuredState
    }

    fn extract(&self, page: &RawPage) -> Result<Vec<ListingRecord>, ParseError> {
        let payload = self.payload(&page.content)?;
        let state: Value = serde_json::from_str(&payload)?;

        let mut entries = Vec::new();
        collect_typed(&state, &self.listing_type, &mut entries);
        tracing::debug!(
            "Found {} '{}' entries in state payload",
            entries.len(),
            self.listing_type
        );

        Ok(entries
            .into_iter()
            .filter_map(|entry| self.map_entry(entry))
            .collect())
    }
}

/// Collects every object whose type discriminator equals `typename`, in document order
///
/// Matching objects are not searched further.
fn collect_typed<'a>(value: &'a Value, typename: &str, out: &mut Vec<&'a Value>) {
    match value {
        Value::Object(map) => {
            if map.get(TYPENAME_KEY).and_then(Value::as_str) == Some(typename) {
                out.push(value);
                return;
            }
            for child in map.values() {
                collect_typed(child, typename, out);
            }
        }
        Value::Array(items) => {
            for child in items {
                collect_typed(child, typename, out);
            }
        }
        _ => {}
    }
}

fn value_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

/// Non-blank string (or number rendered as a string) at `path`
fn text_at(value: &Value, path: &[&str]) -> Option<String> {
    match value_at(value, path)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A field that is either a plain string or an object with a `name`
fn name_at(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::Object(_) => text_at(value, &[key, "name"]),
        _ => text_at(value, &[key]),
    }
}

/// Non-negative integer at `path`; floats are rounded, numeric strings accepted
fn number_at(value: &Value, path: &[&str]) -> Option<u64> {
    match value_at(value, path)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// "City, ST" only when both halves are present
fn location(value: Option<&Value>) -> Option<String> {
    let value = value?;
    let city = text_at(value, &["city"])?;
    let state = text_at(value, &["state"])?;
    Some(format!("{}, {}", city, state))
}
