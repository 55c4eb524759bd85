//! Core domain types for the secfeed collection pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Sentinel URL for locally authored content (curated snippets).
pub const URL_NOT_APPLICABLE: &str = "N/A";

// ---------------------------------------------------------------------------
// ResourceKind
// ---------------------------------------------------------------------------

/// What kind of knowledge item a [`Resource`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A code repository found via repository search.
    Repository,
    /// A web search hit (title / snippet / link).
    SearchResult,
    /// A shell command or short one-liner scraped from a page.
    Command,
    /// A multi-line code snippet (curated or collected).
    Code,
}

impl ResourceKind {
    /// Stable string form used in storage and query filters.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Repository => "repository",
            Self::SearchResult => "search_result",
            Self::Command => "command",
            Self::Code => "code",
        }
    }

    /// Whether the filter deny-list applies to this kind. Repository and
    /// search-result records are descriptive metadata; command and code
    /// records are text a reader may paste into a shell or interpreter.
    pub fn is_executable(&self) -> bool {
        matches!(self, Self::Command | Self::Code)
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "repository" => Ok(Self::Repository),
            "search_result" => Ok(Self::SearchResult),
            "command" => Ok(Self::Command),
            "code" => Ok(Self::Code),
            other => Err(format!("unknown resource kind: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// SourceTag
// ---------------------------------------------------------------------------

/// Which collector produced a [`Resource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceTag {
    #[serde(rename = "GitHub")]
    Github,
    #[serde(rename = "WebSearch")]
    WebSearch,
    #[serde(rename = "Scraper")]
    Scrape,
    #[serde(rename = "Curated")]
    Curated,
}

impl SourceTag {
    /// Stable string form used in storage, query filters, and attribution
    /// lines in delivered messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Github => "GitHub",
            Self::WebSearch => "WebSearch",
            Self::Scrape => "Scraper",
            Self::Curated => "Curated",
        }
    }
}

impl std::fmt::Display for SourceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceTag {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "GitHub" => Ok(Self::Github),
            "WebSearch" => Ok(Self::WebSearch),
            "Scraper" => Ok(Self::Scrape),
            "Curated" => Ok(Self::Curated),
            other => Err(format!("unknown source tag: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Resource
// ---------------------------------------------------------------------------

/// The common record every collected item is normalized into, regardless of
/// which upstream produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// What kind of item this is.
    pub kind: ResourceKind,
    /// Human-readable title.
    pub title: String,
    /// Description, snippet text, or code body (kind-dependent).
    pub description: String,
    /// Upstream URL, or [`URL_NOT_APPLICABLE`] for local content.
    pub url: String,
    /// Which collector produced this record.
    pub source: SourceTag,
}

impl Resource {
    /// Content fingerprint over all identity fields, hex-encoded SHA-256.
    /// Used for within-cycle deduplication and stored with the record.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.kind.as_str().as_bytes());
        hasher.update([0]);
        hasher.update(self.source.as_str().as_bytes());
        hasher.update([0]);
        hasher.update(self.title.as_bytes());
        hasher.update([0]);
        hasher.update(self.description.as_bytes());
        hasher.update([0]);
        hasher.update(self.url.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

// ---------------------------------------------------------------------------
// StoredResource
// ---------------------------------------------------------------------------

/// A [`Resource`] as persisted: storage assigns the id, fingerprint, and
/// save timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredResource {
    /// Unique record identifier (UUID v7, time-sortable).
    pub id: String,
    /// What kind of item this is.
    pub kind: ResourceKind,
    /// Human-readable title.
    pub title: String,
    /// Description, snippet text, or code body.
    pub description: String,
    /// Upstream URL, or [`URL_NOT_APPLICABLE`] for local content.
    pub url: String,
    /// Which collector produced this record.
    pub source: SourceTag,
    /// Hex-encoded SHA-256 over the identity fields.
    pub fingerprint: String,
    /// When the record was saved. Non-decreasing across inserts on one store.
    pub saved_at: DateTime<Utc>,
}

impl StoredResource {
    /// Generate a new time-sortable record identifier.
    pub fn new_id() -> String {
        Uuid::now_v7().to_string()
    }
}

// ---------------------------------------------------------------------------
// CuratedSnippet
// ---------------------------------------------------------------------------

/// A locally authored snippet injected into every collection cycle from
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuratedSnippet {
    /// Display title.
    pub title: String,
    /// The snippet body.
    pub code: String,
}

// ---------------------------------------------------------------------------
// CycleSummary
// ---------------------------------------------------------------------------

/// Outcome counters for one collection cycle. Logged at the end of the
/// cycle, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Raw resources produced by all sources before validation.
    pub collected: usize,
    /// Resources rejected by the safety filter.
    pub rejected: usize,
    /// Resources dropped as within-cycle duplicates.
    pub duplicates: usize,
    /// Resources successfully persisted.
    pub stored: usize,
    /// Resources whose save failed (logged, cycle continued).
    pub store_failures: usize,
    /// Successful sink deliveries (one per resource per sink).
    pub delivered: usize,
    /// Failed sink deliveries.
    pub delivery_failures: usize,
    /// True when the cycle was skipped because a previous one still ran.
    pub skipped: bool,
    /// Wall-clock duration of the cycle.
    pub elapsed: std::time::Duration,
}

impl CycleSummary {
    /// Summary for a trigger that found the previous cycle still running.
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    /// Resources that passed validation and dedup.
    pub fn accepted(&self) -> usize {
        self.collected - self.rejected - self.duplicates
    }
}
