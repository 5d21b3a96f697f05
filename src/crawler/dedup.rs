//! Identity-based listing deduplication
//!
//! A record's identity is, in order of preference, its VIN, its listing ID, or
//! its URL. Records with none of these are rejected outright since they cannot
//! be deduplicated. The first record seen with a key wins for the whole run.

use crate::listing::ListingRecord;
use std::collections::HashSet;
use std::fmt;

/// The value a record is deduplicated on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    Vin(String),
    ListingId(String),
    Url(String),
}

impl IdentityKey {
    /// Resolves the identity key of a record
    ///
    /// VINs are compared case-insensitively; blank values are ignored.
    pub fn for_record(record: &ListingRecord) -> Option<Self> {
        if let Some(vin) = non_blank(record.vin.as_deref()) {
            return Some(Self::Vin(vin.to_ascii_uppercase()));
        }
        if let Some(id) = non_blank(record.listing_id.as_deref()) {
            return Some(Self::ListingId(id.to_string()));
        }
        non_blank(record.url.as_deref()).map(|url| Self::Url(url.to_string()))
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vin(v) => write!(f, "vin:{}", v),
            Self::ListingId(id) => write!(f, "id:{}", id),
            Self::Url(url) => write!(f, "url:{}", url),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Outcome of offering a record to the deduplicator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// First time this key was seen; it is now recorded
    Accepted(IdentityKey),

    /// The key was already recorded
    Duplicate(IdentityKey),

    /// The record has no usable identity
    Unidentifiable,
}

/// Tracks identity keys seen during one run
///
/// Not synchronized on its own; `CrawlState` owns one behind its lock.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<IdentityKey>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers a record, recording its key if it is new
    pub fn admit(&mut self, record: &ListingRecord) -> Admission {
        match IdentityKey::for_record(record) {
            None => Admission::Unidentifiable,
            Some(key) => {
                if self.seen.insert(key.clone()) {
                    Admission::Accepted(key)
                } else {
                    Admission::Duplicate(key)
                }
            }
        }
    }

    /// Returns true if the record was not seen before (and is now recorded)
    pub fn accept(&mut self, record: &ListingRecord) -> bool {
        matches!(self.admit(record), Admission::Accepted(_))
    }

    /// Number of distinct keys seen so far
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
