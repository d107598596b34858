//! Secondary catalog enricher. One search call, first candidate wins;
//! absence of a match is not an error.

use crate::errors::BotError;
use serde::Deserialize;

const SEARCH_MOVIE_URL: &str = "https://api.themoviedb.org/3/search/movie";
const POSTER_BASE_URL: &str = "https://image.tmdb.org/t/p/";
// High-resolution enough for a channel post without fetching originals
const POSTER_SIZE: &str = "w780";

/// Raw fields of the best-match record. Transient, absent when no
/// confident match exists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TmdbMovie {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
    #[serde(default)]
    pub vote_average: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<TmdbMovie>,
}

/// Secondary catalog seam, mirroring the primary's `CatalogSource`.
pub trait MovieEnricher: Send + Sync {
    /// Whether a lookup can be attempted at all (an unconfigured enricher
    /// is `Ok(None)` for every query, never an error).
    fn is_configured(&self) -> bool;

    /// Search by title with an optional year hint; first candidate wins.
    fn search_movie(
        &self,
        title: &str,
        year_hint: Option<&str>,
    ) -> Result<Option<TmdbMovie>, BotError>;
}

pub struct TmdbClient {
    http: reqwest::blocking::Client,
    api_key: String,
}

impl TmdbClient {
    pub fn new(http: reqwest::blocking::Client, api_key: &str) -> Self {
        Self {
            http,
            api_key: api_key.to_string(),
        }
    }
}

impl MovieEnricher for TmdbClient {
    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// The catalog's own ranking does the disambiguation.
    fn search_movie(
        &self,
        title: &str,
        year_hint: Option<&str>,
    ) -> Result<Option<TmdbMovie>, BotError> {
        if !self.is_configured() {
            return Ok(None);
        }

        let mut params = vec![("api_key", self.api_key.as_str()), ("query", title)];
        // only pass a hint that actually looks like a year
        let year = year_hint.filter(|y| y.len() == 4 && y.chars().all(|c| c.is_ascii_digit()));
        if let Some(y) = year {
            params.push(("year", y));
        }

        let response = self.http.get(SEARCH_MOVIE_URL).query(&params).send()?;

        if !response.status().is_success() {
            return Err(BotError::Fetch(format!(
                "tmdb search for '{title}' returned {}",
                response.status()
            )));
        }

        let parsed: SearchResponse = response.json()?;
        Ok(parsed.results.into_iter().next())
    }
}

/// Fully-qualified image URL from a bare poster path.
pub fn poster_url(poster_path: &str) -> String {
    format!("{POSTER_BASE_URL}{POSTER_SIZE}{poster_path}")
}

// Static movie genre code table; this module owns the code→name conversion.
const GENRES: &[(i64, &str)] = &[
    (28, "Action"),
    (12, "Adventure"),
    (16, "Animation"),
    (35, "Comedy"),
    (80, "Crime"),
    (99, "Documentary"),
    (18, "Drama"),
    (10751, "Family"),
    (14, "Fantasy"),
    (36, "History"),
    (27, "Horror"),
    (10402, "Music"),
    (9648, "Mystery"),
    (10749, "Romance"),
    (878, "Science Fiction"),
    (10770, "TV Movie"),
    (53, "Thriller"),
    (10752, "War"),
    (37, "Western"),
];

/// Display names for a list of genre codes; `None` when no code is known.
pub fn genre_names(ids: &[i64]) -> Option<String> {
    let names: Vec<&str> = ids
        .iter()
        .filter_map(|id| GENRES.iter().find(|(code, _)| code == id).map(|(_, n)| *n))
        .collect();

    if names.is_empty() {
        None
    } else {
        Some(names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poster_url_convention() {
        assert_eq!(
            poster_url("/abc123.jpg"),
            "https://image.tmdb.org/t/p/w780/abc123.jpg"
        );
    }

    #[test]
    fn test_genre_names_lookup() {
        assert_eq!(genre_names(&[27, 53]), Some("Horror, Thriller".to_string()));
        assert_eq!(genre_names(&[28]), Some("Action".to_string()));
    }

    #[test]
    fn test_genre_names_unknown_codes() {
        assert_eq!(genre_names(&[424242]), None);
        assert_eq!(genre_names(&[]), None);
        // known codes survive alongside unknown ones
        assert_eq!(genre_names(&[424242, 18]), Some("Drama".to_string()));
    }
}
