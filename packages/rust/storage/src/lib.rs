//! libSQL storage layer for collected resources.
//!
//! The [`Store`] struct wraps a local libSQL database holding every resource
//! the pipeline has persisted, indexed by kind, source, and save time.
//!
//! **Access rules:**
//! - One `Store` per process, opened read-write via [`Store::open`]
//! - After [`Store::close`] every read or write fails with a storage error

mod migrations;

use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use secfeed_shared::{Resource, ResourceKind, Result, SecfeedError, SourceTag, StoredResource};

/// Result cap applied when a query does not set an explicit limit.
pub const DEFAULT_QUERY_LIMIT: u32 = 10;

// ---------------------------------------------------------------------------
// ResourceQuery
// ---------------------------------------------------------------------------

/// Filter for [`Store::query`]. Set fields are combined as a conjunction;
/// an empty query returns the most recent records.
#[derive(Debug, Clone, Default)]
pub struct ResourceQuery {
    /// Match this resource kind exactly.
    pub kind: Option<ResourceKind>,
    /// Match this source tag exactly.
    pub source: Option<SourceTag>,
    /// ASCII case-insensitive substring match on title or description.
    pub text: Option<String>,
    /// Result cap. [`DEFAULT_QUERY_LIMIT`] when unset.
    pub limit: Option<u32>,
}

impl ResourceQuery {
    /// Query for the most recent records of one kind.
    pub fn by_kind(kind: ResourceKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Primary storage handle wrapping a libSQL database.
pub struct Store {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    closed: AtomicBool,
    /// Timestamp of the most recent insert, used to keep `saved_at`
    /// non-decreasing even if the wall clock steps backwards.
    last_saved_at: Mutex<Option<DateTime<Utc>>>,
}

impl Store {
    /// Open or create a database at `path` and apply pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SecfeedError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| SecfeedError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| SecfeedError::Storage(e.to_string()))?;

        let store = Self {
            db,
            conn,
            closed: AtomicBool::new(false),
            last_saved_at: Mutex::new(None),
        };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    SecfeedError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Reject any operation after [`Store::close`].
    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SecfeedError::Storage("store is closed".into()));
        }
        Ok(())
    }

    /// Next save timestamp, clamped so it never precedes the previous one.
    fn next_timestamp(&self) -> DateTime<Utc> {
        let mut last = self
            .last_saved_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut now = Utc::now();
        if let Some(prev) = *last {
            if now < prev {
                now = prev;
            }
        }
        *last = Some(now);
        now
    }

    // -----------------------------------------------------------------------
    // Resource operations
    // -----------------------------------------------------------------------

    /// Persist a resource. The store assigns the record id, fingerprint,
    /// and save timestamp; the same resource content may be saved more than
    /// once across cycles.
    pub async fn save(&self, resource: &Resource) -> Result<StoredResource> {
        self.check_open()?;
        let id = StoredResource::new_id();
        let fingerprint = resource.fingerprint();
        let saved_at = self.next_timestamp();

        self.conn
            .execute(
                "INSERT INTO resources (id, kind, title, description, url, source, fingerprint, saved_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id.as_str(),
                    resource.kind.as_str(),
                    resource.title.as_str(),
                    resource.description.as_str(),
                    resource.url.as_str(),
                    resource.source.as_str(),
                    fingerprint.as_str(),
                    saved_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| SecfeedError::Storage(e.to_string()))?;

        Ok(StoredResource {
            id,
            kind: resource.kind,
            title: resource.title.clone(),
            description: resource.description.clone(),
            url: resource.url.clone(),
            source: resource.source,
            fingerprint,
            saved_at,
        })
    }

    /// Query stored resources, most recent first. Ties on `saved_at` break
    /// by record id, which is time-sortable.
    pub async fn query(&self, query: &ResourceQuery) -> Result<Vec<StoredResource>> {
        self.check_open()?;
        let kind = query.kind.map(|k| k.as_str());
        let source = query.source.map(|s| s.as_str());
        let text = query.text.as_deref().map(escape_like);
        let limit = query.limit.unwrap_or(DEFAULT_QUERY_LIMIT);

        let mut rows = self
            .conn
            .query(
                "SELECT id, kind, title, description, url, source, fingerprint, saved_at
                 FROM resources
                 WHERE (?1 IS NULL OR kind = ?1)
                   AND (?2 IS NULL OR source = ?2)
                   AND (?3 IS NULL OR title LIKE '%' || ?3 || '%' ESCAPE '\\'
                                   OR description LIKE '%' || ?3 || '%' ESCAPE '\\')
                 ORDER BY saved_at DESC, id DESC
                 LIMIT ?4",
                params![kind, source, text, limit],
            )
            .await
            .map_err(|e| SecfeedError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_resource(&row)?);
        }
        Ok(results)
    }

    /// Total number of stored resources.
    pub async fn count(&self) -> Result<u64> {
        self.check_open()?;
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM resources", params![])
            .await
            .map_err(|e| SecfeedError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let count: i64 = row
                    .get(0)
                    .map_err(|e| SecfeedError::Storage(e.to_string()))?;
                Ok(count as u64)
            }
            Ok(None) => Ok(0),
            Err(e) => Err(SecfeedError::Storage(e.to_string())),
        }
    }

    /// Close the store. Idempotent; later operations fail with a storage
    /// error. The underlying local database needs no explicit teardown.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!("store already closed");
            return;
        }
        tracing::info!("store closed");
    }
}

/// Escape LIKE wildcards so the text filter is a literal substring match.
fn escape_like(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Convert a database row to a [`StoredResource`].
fn row_to_resource(row: &libsql::Row) -> Result<StoredResource> {
    let kind: String = row
        .get(1)
        .map_err(|e| SecfeedError::Storage(e.to_string()))?;
    let source: String = row
        .get(5)
        .map_err(|e| SecfeedError::Storage(e.to_string()))?;
    Ok(StoredResource {
        id: row
            .get::<String>(0)
            .map_err(|e| SecfeedError::Storage(e.to_string()))?,
        kind: kind
            .parse::<ResourceKind>()
            .map_err(SecfeedError::Storage)?,
        title: row
            .get::<String>(2)
            .map_err(|e| SecfeedError::Storage(e.to_string()))?,
        description: row
            .get::<String>(3)
            .map_err(|e| SecfeedError::Storage(e.to_string()))?,
        url: row
            .get::<String>(4)
            .map_err(|e| SecfeedError::Storage(e.to_string()))?,
        source: source.parse::<SourceTag>().map_err(SecfeedError::Storage)?,
        fingerprint: row
            .get::<String>(6)
            .map_err(|e| SecfeedError::Storage(e.to_string()))?,
        saved_at: {
            let s: String = row
                .get(7)
                .map_err(|e| SecfeedError::Storage(e.to_string()))?;
            chrono::DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .map_err(|e| SecfeedError::Storage(format!("invalid date: {e}")))?
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    /// Create a temp file store for testing.
    async fn test_store() -> Store {
        let tmp = std::env::temp_dir().join(format!("secfeed_test_{}.db", Uuid::now_v7()));
        Store::open(&tmp).await.expect("open test db")
    }

    fn sample(kind: ResourceKind, source: SourceTag, title: &str, description: &str) -> Resource {
        Resource {
            kind,
            title: title.into(),
            description: description.into(),
            url: "https://example.com/item".into(),
            source,
        }
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let store = test_store().await;
        let version = store.get_schema_version().await;
        assert_eq!(version, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("secfeed_test_{}.db", Uuid::now_v7()));
        let s1 = Store::open(&tmp).await.expect("first open");
        drop(s1);
        let s2 = Store::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn save_then_query_roundtrip() {
        let store = test_store().await;
        let resource = sample(
            ResourceKind::Repository,
            SourceTag::Github,
            "nmap-scripts",
            "Collection of nmap NSE scripts",
        );

        let stored = store.save(&resource).await.expect("save");
        assert!(!stored.id.is_empty());
        assert_eq!(stored.fingerprint, resource.fingerprint());

        let found = store.query(&ResourceQuery::default()).await.expect("query");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "nmap-scripts");
        assert_eq!(found[0].kind, ResourceKind::Repository);
        assert_eq!(found[0].source, SourceTag::Github);
        assert_eq!(found[0].description, "Collection of nmap NSE scripts");
        assert_eq!(found[0].saved_at, stored.saved_at);

        assert_eq!(store.count().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn same_content_may_be_saved_twice() {
        let store = test_store().await;
        let resource = sample(
            ResourceKind::Command,
            SourceTag::Scrape,
            "Command: whoami...",
            "whoami",
        );
        let first = store.save(&resource).await.expect("first save");
        let second = store.save(&resource).await.expect("second save");
        assert_ne!(first.id, second.id);
        assert_eq!(first.fingerprint, second.fingerprint);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn kind_and_source_filters() {
        let store = test_store().await;
        store
            .save(&sample(
                ResourceKind::Repository,
                SourceTag::Github,
                "sqlmap",
                "Automatic SQL injection tool",
            ))
            .await
            .unwrap();
        store
            .save(&sample(
                ResourceKind::Command,
                SourceTag::Scrape,
                "Command: nc -lvnp 4444...",
                "nc -lvnp 4444",
            ))
            .await
            .unwrap();
        store
            .save(&sample(
                ResourceKind::SearchResult,
                SourceTag::WebSearch,
                "Top pentest tools",
                "A survey of common tools",
            ))
            .await
            .unwrap();

        let commands = store
            .query(&ResourceQuery::by_kind(ResourceKind::Command))
            .await
            .unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].description, "nc -lvnp 4444");

        let github = store
            .query(&ResourceQuery {
                source: Some(SourceTag::Github),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(github.len(), 1);
        assert_eq!(github[0].title, "sqlmap");

        // Conjunction: kind matches but source does not
        let none = store
            .query(&ResourceQuery {
                kind: Some(ResourceKind::Command),
                source: Some(SourceTag::Github),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn text_filter_is_case_insensitive() {
        let store = test_store().await;
        store
            .save(&sample(
                ResourceKind::SearchResult,
                SourceTag::WebSearch,
                "Nmap Cheat Sheet",
                "Port scanning reference",
            ))
            .await
            .unwrap();
        store
            .save(&sample(
                ResourceKind::SearchResult,
                SourceTag::WebSearch,
                "Wireshark filters",
                "Capture filter examples incl. nmap probes",
            ))
            .await
            .unwrap();

        // Matches title on one record, description on the other.
        let hits = store
            .query(&ResourceQuery {
                text: Some("NMAP".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);

        let hits = store
            .query(&ResourceQuery {
                text: Some("cheat".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Nmap Cheat Sheet");

        let hits = store
            .query(&ResourceQuery {
                text: Some("bloodhound".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn text_filter_treats_wildcards_literally() {
        let store = test_store().await;
        store
            .save(&sample(
                ResourceKind::Command,
                SourceTag::Scrape,
                "Command: wget mirror...",
                "wget -m -k -p https://target",
            ))
            .await
            .unwrap();
        store
            .save(&sample(
                ResourceKind::Code,
                SourceTag::Curated,
                "scan_ports helper",
                "def scan_ports(ip): ...",
            ))
            .await
            .unwrap();

        // `%` must not act as match-anything.
        let hits = store
            .query(&ResourceQuery {
                text: Some("%".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(hits.is_empty());

        // `_` must not act as match-one-character.
        let hits = store
            .query(&ResourceQuery {
                text: Some("scan_ports".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "scan_ports helper");

        let hits = store
            .query(&ResourceQuery {
                text: Some("scanXports".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn recency_order_and_limit() {
        let store = test_store().await;
        for i in 0..15 {
            store
                .save(&sample(
                    ResourceKind::Command,
                    SourceTag::Scrape,
                    &format!("Command: step {i}..."),
                    &format!("echo step {i}"),
                ))
                .await
                .unwrap();
        }

        // Default limit
        let page = store.query(&ResourceQuery::default()).await.unwrap();
        assert_eq!(page.len(), DEFAULT_QUERY_LIMIT as usize);
        assert_eq!(page[0].description, "echo step 14");

        // Most recent first throughout
        for pair in page.windows(2) {
            assert!(pair[0].saved_at >= pair[1].saved_at);
        }

        let page = store
            .query(&ResourceQuery {
                limit: Some(3),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 3);
        assert_eq!(page[2].description, "echo step 12");
    }

    #[tokio::test]
    async fn save_timestamps_never_decrease() {
        let store = test_store().await;
        let mut prev: Option<DateTime<Utc>> = None;
        for i in 0..20 {
            let stored = store
                .save(&sample(
                    ResourceKind::Code,
                    SourceTag::Curated,
                    &format!("snippet {i}"),
                    "print('hi')",
                ))
                .await
                .unwrap();
            if let Some(p) = prev {
                assert!(stored.saved_at >= p);
            }
            prev = Some(stored.saved_at);
        }
    }

    #[tokio::test]
    async fn close_is_idempotent_and_blocks_operations() {
        let store = test_store().await;
        store
            .save(&sample(
                ResourceKind::Repository,
                SourceTag::Github,
                "metasploit-framework",
                "Exploitation framework",
            ))
            .await
            .unwrap();

        store.close();
        store.close(); // second close is a no-op

        let result = store.query(&ResourceQuery::default()).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("closed"));

        let result = store
            .save(&sample(
                ResourceKind::Repository,
                SourceTag::Github,
                "after-close",
                "must fail",
            ))
            .await;
        assert!(result.is_err());

        assert!(store.count().await.is_err());
    }
}
