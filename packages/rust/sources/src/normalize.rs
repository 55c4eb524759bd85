//! Pure normalizers mapping upstream payloads into [`Resource`] records.
//!
//! Every collector funnels through these functions, so the rest of the
//! pipeline only ever sees one record shape.

use secfeed_shared::{CuratedSnippet, Resource, ResourceKind, SourceTag, URL_NOT_APPLICABLE};

/// Fallback description for repositories without one.
pub const NO_DESCRIPTION: &str = "No description";

/// Fallback description for search hits without a snippet.
pub const NO_SNIPPET: &str = "No snippet";

/// Characters of command text included in the generated title.
const COMMAND_TITLE_CHARS: usize = 30;

/// Normalize one repository search item. A missing or empty description
/// gets the fallback.
pub fn repo(name: &str, description: Option<&str>, html_url: &str) -> Resource {
    Resource {
        kind: ResourceKind::Repository,
        title: name.to_string(),
        description: description
            .filter(|d| !d.is_empty())
            .unwrap_or(NO_DESCRIPTION)
            .to_string(),
        url: html_url.to_string(),
        source: SourceTag::Github,
    }
}

/// Normalize one web-search hit. Only a missing snippet gets the fallback;
/// an empty string passes through as-is.
pub fn search_hit(title: &str, snippet: Option<&str>, link: &str) -> Resource {
    Resource {
        kind: ResourceKind::SearchResult,
        title: title.to_string(),
        description: snippet.unwrap_or(NO_SNIPPET).to_string(),
        url: link.to_string(),
        source: SourceTag::WebSearch,
    }
}

/// Normalize scraped command text. Blank text yields no resource. The
/// title carries a truncated preview of the command.
pub fn command(text: &str, page_url: &str) -> Option<Resource> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let preview: String = trimmed.chars().take(COMMAND_TITLE_CHARS).collect();
    Some(Resource {
        kind: ResourceKind::Command,
        title: format!("Command: {preview}..."),
        description: trimmed.to_string(),
        url: page_url.to_string(),
        source: SourceTag::Scrape,
    })
}

/// Normalize a locally authored snippet.
pub fn curated(snippet: &CuratedSnippet) -> Resource {
    Resource {
        kind: ResourceKind::Code,
        title: snippet.title.clone(),
        description: snippet.code.clone(),
        url: URL_NOT_APPLICABLE.into(),
        source: SourceTag::Curated,
    }
}
