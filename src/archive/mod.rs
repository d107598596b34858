//! Primary catalog client: per-item metadata and full-text search.

pub mod identifier;
pub mod types;

pub use types::{ItemDocument, ItemFile, SearchHit};

use crate::errors::BotError;
use serde_json::Value;

const METADATA_URL: &str = "https://archive.org/metadata/";
const SEARCH_URL: &str = "https://archive.org/advancedsearch.php";
const SEARCH_ROWS: &str = "5";

/// Primary catalog seam. The HTTP client below is the production
/// implementation; handler tests script their own documents.
pub trait CatalogSource: Send + Sync {
    /// Fetch the metadata document for an identifier. One attempt, no
    /// retries; the caller reports the failure and aborts its pipeline.
    fn metadata(&self, identifier: &str) -> Result<ItemDocument, BotError>;

    /// Ranked full-text search, possibly empty.
    fn search(&self, query: &str) -> Result<Vec<SearchHit>, BotError>;
}

pub struct ArchiveClient {
    http: reqwest::blocking::Client,
}

impl ArchiveClient {
    pub fn new(http: reqwest::blocking::Client) -> Self {
        Self { http }
    }
}

impl CatalogSource for ArchiveClient {
    fn metadata(&self, identifier: &str) -> Result<ItemDocument, BotError> {
        let url = format!("{METADATA_URL}{identifier}");
        let response = self.http.get(&url).send()?;

        if !response.status().is_success() {
            return Err(BotError::Fetch(format!(
                "metadata request for '{identifier}' returned {}",
                response.status()
            )));
        }

        let value: Value = response.json()?;
        ItemDocument::from_value(&value).ok_or(BotError::Unparseable)
    }

    /// Compound full-text query: title OR description, restricted to the
    /// movies facet, top-5 by downloads. Popularity correlates better with
    /// correct/available items than raw text relevance on this catalog.
    fn search(&self, query: &str) -> Result<Vec<SearchHit>, BotError> {
        let lucene = format!("(title:({query}) OR description:({query})) AND mediatype:(movies)");

        let response = self
            .http
            .get(SEARCH_URL)
            .query(&[
                ("q", lucene.as_str()),
                ("fl[]", "identifier"),
                ("fl[]", "title"),
                ("fl[]", "year"),
                ("rows", SEARCH_ROWS),
                ("sort[]", "downloads desc"),
                ("output", "json"),
            ])
            .send()?;

        if !response.status().is_success() {
            return Err(BotError::Fetch(format!(
                "search for '{query}' returned {}",
                response.status()
            )));
        }

        let value: Value = response.json()?;
        Ok(parse_search_response(&value))
    }
}

fn parse_search_response(value: &Value) -> Vec<SearchHit> {
    let docs = value
        .get("response")
        .and_then(|r| r.get("docs"))
        .and_then(|d| d.as_array());

    let Some(docs) = docs else {
        return Vec::new();
    };

    docs.iter()
        .filter_map(|doc| {
            let identifier = doc.get("identifier")?.as_str()?.to_owned();
            let title = doc
                .get("title")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown")
                .to_owned();
            // year arrives as a string or a number depending on the item
            let year = match doc.get("year") {
                Some(Value::String(s)) if !s.is_empty() => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => "N/A".to_string(),
            };
            Some(SearchHit {
                identifier,
                title,
                year,
            })
        })
        .collect()
}
