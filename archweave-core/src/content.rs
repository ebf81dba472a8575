//! Diagram fragments embedded in assistant content
//!
//! Assistant replies mix prose with fenced ```` ```mermaid ```` blocks. The
//! architecture view can show the whole reply, only the prose, or only the
//! diagrams.

use std::str::FromStr;

const FENCE_OPEN: &str = "```mermaid\n";
const FENCE_CLOSE: &str = "```";

/// Split content into its prose and its fenced diagram blocks.
///
/// Diagram blocks keep their fences. The prose is trimmed. An unterminated
/// fence is left in the prose.
pub fn split_diagrams(content: &str) -> (String, Vec<String>) {
    let mut description = String::with_capacity(content.len());
    let mut diagrams = Vec::new();
    let mut rest = content;

    while let Some(start) = rest.find(FENCE_OPEN) {
        let body_start = start + FENCE_OPEN.len();
        let Some(close) = rest[body_start..].find(FENCE_CLOSE) else {
            break;
        };
        let end = body_start + close + FENCE_CLOSE.len();
        description.push_str(&rest[..start]);
        diagrams.push(rest[start..end].to_string());
        rest = &rest[end..];
    }
    description.push_str(rest);

    (description.trim().to_string(), diagrams)
}

/// Which part of an assistant reply to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Full,
    Description,
    Diagrams,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Full => "full",
            ViewMode::Description => "description",
            ViewMode::Diagrams => "diagrams",
        }
    }

    /// Filter `content` for this view.
    pub fn apply(&self, content: &str) -> String {
        match self {
            ViewMode::Full => content.to_string(),
            ViewMode::Description => split_diagrams(content).0,
            ViewMode::Diagrams => split_diagrams(content).1.join("\n\n"),
        }
    }
}

impl std::fmt::Display for ViewMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Ok(ViewMode::Full),
            "description" => Ok(ViewMode::Description),
            "diagrams" => Ok(ViewMode::Diagrams),
            _ => Err(format!("unknown view mode: {}", s)),
        }
    }
}
