//! Read-only lookups over stored resources.
//!
//! Each lookup returns a ready-to-print reply. When nothing matches, or
//! the store errors, the reply falls back to a canned example so the
//! caller always has something to show.

use tracing::warn;

use secfeed_shared::{ResourceKind, StoredResource};
use secfeed_storage::{ResourceQuery, Store};

/// Most recent record matching the query, if any. Query failures are
/// logged and treated as no match.
async fn first_match(store: &Store, query: &ResourceQuery) -> Option<StoredResource> {
    match store.query(query).await {
        Ok(mut hits) if !hits.is_empty() => Some(hits.remove(0)),
        Ok(_) => None,
        Err(e) => {
            warn!(error = %e, "lookup query failed, using fallback reply");
            None
        }
    }
}

/// Describe a tool by name, from the most recent matching search result.
pub async fn tool(store: &Store, name: &str) -> String {
    let query = ResourceQuery {
        kind: Some(ResourceKind::SearchResult),
        text: Some(name.to_string()),
        limit: Some(1),
        ..Default::default()
    };
    match first_match(store, &query).await {
        Some(hit) => format!(
            "Tool: {name}\nDescription: {}\nSource: {}",
            hit.description, hit.source
        ),
        None => format!("No information found for tool: {name}\nExample: nmap -sS -p- target.com"),
    }
}

/// Show a collected command mentioning the given tool.
pub async fn command(store: &Store, name: &str) -> String {
    let query = ResourceQuery {
        kind: Some(ResourceKind::Command),
        text: Some(name.to_string()),
        limit: Some(1),
        ..Default::default()
    };
    match first_match(store, &query).await {
        Some(hit) => format!(
            "Command for {name}\n{}\nSource: {}",
            hit.description, hit.source
        ),
        None => format!("No commands found for {name}\nExample: msfconsole -q"),
    }
}

/// Show a stored code snippet matching the given topic.
pub async fn code(store: &Store, topic: &str) -> String {
    let query = ResourceQuery {
        kind: Some(ResourceKind::Code),
        text: Some(topic.to_string()),
        limit: Some(1),
        ..Default::default()
    };
    match first_match(store, &query).await {
        Some(hit) => format!(
            "Code: {}\n```\n{}\n```\nSource: {}",
            hit.title, hit.description, hit.source
        ),
        None => format!("No code snippets found for {topic}\nExample: import socket"),
    }
}

/// Show the most recent tabletop exercise material of any kind.
pub async fn exercise(store: &Store) -> String {
    let query = ResourceQuery {
        text: Some("tabletop".to_string()),
        limit: Some(1),
        ..Default::default()
    };
    match first_match(store, &query).await {
        Some(hit) => format!("Tabletop Exercise\n{}\nSource: {}", hit.description, hit.source),
        None => "No tabletop exercises found\nExample: Simulate a phishing attack response."
            .to_string(),
    }
}
