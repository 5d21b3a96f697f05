//! Markup extraction
//!
//! Fallback for pages without a usable state payload: each listing card in the
//! rendered markup becomes one record. Cards carry no VIN, so these records are
//! identified by their link.

use crate::config::MarkupConfig;
use crate::extract::{parse_selector, ExtractionStrategy, ParseError};
use crate::listing::{ListingRecord, RawPage, StrategyKind};
use crate::url::resolve_link;
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Compiled card selectors
struct CardSelectors {
    card: Selector,
    year: Selector,
    make: Selector,
    model: Selector,
    trim: Selector,
    price: Selector,
    mileage: Selector,
    location: Selector,
    link: Selector,
}

/// Scans listing cards in the page markup
pub struct MarkupExtractor {
    selectors: CardSelectors,
    origin: Url,
}

impl MarkupExtractor {
    pub fn new(config: &MarkupConfig, site_origin: &str) -> Result<Self, ConfigError> {
        let origin = Url::parse(site_origin)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", site_origin, e)))?;

        Ok(Self {
            selectors: CardSelectors {
                card: parse_selector(&config.card)?,
                year: parse_selector(&config.year)?,
                make: parse_selector(&config.make)?,
                model: parse_selector(&config.model)?,
                trim: parse_selector(&config.trim)?,
                price: parse_selector(&config.price)?,
                mileage: parse_selector(&config.mileage)?,
                location: parse_selector(&config.location)?,
                link: parse_selector(&config.link)?,
            },
            origin,
        })
    }

    fn map_card(&self, card: ElementRef<'_>) -> Option<ListingRecord> {
        let s = &self.selectors;

        let (Some(make), Some(model)) = (first_text(card, &s.make), first_text(card, &s.model))
        else {
            tracing::debug!("Discarding listing card without make/model");
            return None;
        };

        let mut record = ListingRecord::new(make, model, StrategyKind::Markup);
        record.year = first_text(card, &s.year).and_then(|t| leading_integer(&t));
        record.trim = first_text(card, &s.trim);
        record.price = first_text(card, &s.price).and_then(|t| digits_only(&t));
        record.mileage = first_text(card, &s.mileage).and_then(|t| digits_only(&t));
        record.location = first_text(card, &s.location);
        record.url = card
            .select(&s.link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| resolve_link(href, &self.origin));

        Some(record)
    }
}

impl ExtractionStrategy for MarkupExtractor {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Markup
    }

    fn extract(&self, page: &RawPage) -> Result<Vec<ListingRecord>, ParseError> {
        let document = Html::parse_document(&page.content);

        Ok(document
            .select(&self.selectors.card)
            .filter_map(|card| self.map_card(card))
            .collect())
    }
}

/// Trimmed, whitespace-collapsed text of the first match, if non-blank
fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    let element = scope.select(selector).next()?;
    let text = element.text().collect::<Vec<_>>().join(" ");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

fn leading_integer(text: &str) -> Option<u32> {
    let digits: String = text
        .trim_start()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

fn digits_only(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}
