use serde::Serialize;
use serde_json::Value;

/// One entry of the item's file listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemFile {
    pub name: String,
    pub format: Option<String>,
}

/// Normalized view of the primary catalog's metadata document.
/// Transient: fetched fresh per request, discarded after the merge.
#[derive(Debug, Clone, Default)]
pub struct ItemDocument {
    pub title: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
    pub subject: Option<String>,
    pub language: Option<String>,
    pub files: Vec<ItemFile>,
    pub server: Option<String>,
    pub dir: Option<String>,
}

impl ItemDocument {
    /// Returns `None` when the document lacks a `metadata` section entirely
    /// (hard precondition failure, not a merge ambiguity).
    pub fn from_value(value: &Value) -> Option<Self> {
        let metadata = value.get("metadata")?;

        let files = value
            .get("files")
            .and_then(|v| v.as_array())
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|f| {
                        let name = f.get("name")?.as_str()?.to_owned();
                        let format = f
                            .get("format")
                            .and_then(|v| v.as_str())
                            .map(str::to_owned);
                        Some(ItemFile { name, format })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Some(ItemDocument {
            title: text_field(metadata, "title"),
            date: text_field(metadata, "date"),
            description: text_field(metadata, "description"),
            subject: text_field(metadata, "subject"),
            language: text_field(metadata, "language"),
            files,
            server: value.get("server").and_then(|v| v.as_str()).map(str::to_owned),
            dir: value.get("dir").and_then(|v| v.as_str()).map(str::to_owned),
        })
    }
}

/// Archive metadata values arrive as a string or a list of strings
/// depending on the item; take the string or the first list element.
fn text_field(v: &Value, key: &str) -> Option<String> {
    let field = v.get(key)?;

    let text = match field {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.first().and_then(|v| v.as_str()).map(str::to_owned),
        _ => None,
    }?;

    let text = text.trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// One ranked candidate from the full-text search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub identifier: String,
    pub title: String,
    pub year: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_requires_metadata_section() {
        assert!(ItemDocument::from_value(&json!({"files": []})).is_none());
        assert!(ItemDocument::from_value(&json!({"metadata": {}})).is_some());
    }

    #[test]
    fn test_string_or_list_fields() {
        let doc = ItemDocument::from_value(&json!({
            "metadata": {
                "title": "Night of the Living Dead",
                "description": ["A public domain classic.", "dupe"],
                "subject": ["Horror", "Zombies"],
            }
        }))
        .unwrap();

        assert_eq!(doc.title.as_deref(), Some("Night of the Living Dead"));
        assert_eq!(doc.description.as_deref(), Some("A public domain classic."));
        assert_eq!(doc.subject.as_deref(), Some("Horror"));
        assert_eq!(doc.date, None);
    }

    #[test]
    fn test_blank_fields_treated_as_absent() {
        let doc = ItemDocument::from_value(&json!({
            "metadata": { "title": "  ", "date": "1968-10-01" }
        }))
        .unwrap();

        assert_eq!(doc.title, None);
        assert_eq!(doc.date.as_deref(), Some("1968-10-01"));
    }

    #[test]
    fn test_file_listing_and_location() {
        let doc = ItemDocument::from_value(&json!({
            "metadata": { "title": "t" },
            "server": "ia800300.us.archive.org",
            "dir": "/21/items/some-item",
            "files": [
                { "name": "cover.jpg", "format": "JPEG" },
                { "name": "movie.mp4" },
                { "format": "broken, no name" },
            ]
        }))
        .unwrap();

        assert_eq!(doc.server.as_deref(), Some("ia800300.us.archive.org"));
        assert_eq!(doc.dir.as_deref(), Some("/21/items/some-item"));
        assert_eq!(doc.files.len(), 2);
        assert_eq!(doc.files[0].format.as_deref(), Some("JPEG"));
        assert_eq!(doc.files[1].format, None);
    }
}
