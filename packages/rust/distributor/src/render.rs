//! Sink-neutral message rendering.
//!
//! Every sink receives the same [`RenderedMessage`]; only the final wire
//! format (Bot API text, webhook embed, plain JSON) is sink-specific.

use serde::Serialize;

use secfeed_shared::{Resource, ResourceKind};

/// A resource rendered down to the fields sinks deliver: title, body text,
/// source attribution, and whether the body should be fenced as code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedMessage {
    /// Display title.
    pub title: String,
    /// Body text: the resource description or snippet source.
    pub body: String,
    /// Attribution line content ("GitHub", "Scraper", ...).
    pub source: String,
    /// True when the body is snippet source and should render inside a
    /// code fence.
    pub code_block: bool,
}

impl RenderedMessage {
    /// The body, fenced when [`Self::code_block`] is set. Used by sinks
    /// whose native format is Markdown-flavored text.
    pub fn fenced_body(&self) -> String {
        if self.code_block {
            format!("```\n{}\n```", self.body)
        } else {
            self.body.clone()
        }
    }
}

/// Render a resource for delivery. Only code snippets get the fence hint;
/// command one-liners read fine inline and everything else is prose.
pub fn render(resource: &Resource) -> RenderedMessage {
    RenderedMessage {
        title: resource.title.clone(),
        body: resource.description.clone(),
        source: resource.source.to_string(),
        code_block: resource.kind == ResourceKind::Code,
    }
}
