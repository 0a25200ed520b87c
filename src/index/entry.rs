//! Symbol entries as stored in a shard.

use serde::Serialize;
use std::fmt;

/// Coarse kind of a documented symbol, inferred from where it links to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    /// A source or header file page (`rands_8h.html`).
    File,
    /// A standalone page (`index.html`, `md_README.html`).
    Page,
    /// A function or function-like macro; the container carries an argument list.
    Function,
    /// A member of a struct, class or union.
    Member,
}

impl SymbolKind {
    /// Infers the kind from an occurrence's link and container text.
    pub fn infer(anchor_url: &str, container_label: &str) -> Option<Self> {
        let (page, anchor) = match anchor_url.split_once('#') {
            Some((page, anchor)) => (page, Some(anchor)),
            None => (anchor_url, None),
        };
        let page = page.rsplit('/').next().unwrap_or(page);

        if anchor.is_none() {
            let stem = page.strip_suffix(".html").unwrap_or(page);
            // Generated file pages escape the extension dot as `_8`
            return if stem.rsplit_once("_8").is_some_and(|(_, ext)| {
                !ext.is_empty() && ext.bytes().all(|b| b.is_ascii_alphanumeric())
            }) {
                Some(Self::File)
            } else {
                Some(Self::Page)
            };
        }

        if container_label.contains('(') {
            Some(Self::Function)
        } else if ["struct", "class", "union"]
            .iter()
            .any(|prefix| page.starts_with(prefix))
        {
            Some(Self::Member)
        } else {
            None
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Page => "page",
            Self::Function => "function",
            Self::Member => "member",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One place a symbol is documented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    /// Enclosing entity (struct, file, function signature), empty for pages and files.
    pub container_label: String,
    /// Deep link, `<page>.html#<anchor>` or `<page>.html`.
    pub anchor_url: String,
    pub kind_hint: Option<SymbolKind>,
}

impl Occurrence {
    pub fn new(container_label: impl Into<String>, anchor_url: impl Into<String>) -> Self {
        let container_label = container_label.into();
        let anchor_url = anchor_url.into();
        let kind_hint = SymbolKind::infer(&anchor_url, &container_label);
        Self {
            container_label,
            anchor_url,
            kind_hint,
        }
    }
}

/// A searchable symbol and every place it is documented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolEntry {
    /// Normalized key, see [`normalize_key`](super::normalize_key).
    pub key: String,
    /// Display name.
    pub label: String,
    /// Never empty.
    pub occurrences: Vec<Occurrence>,
}
