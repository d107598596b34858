//! The normalized record flowing from enrichment to publication, and the
//! deterministic merge that builds it.

use crate::archive::{ItemDocument, ItemFile};
use crate::tmdb::{self, TmdbMovie};
use serde::Serialize;

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_YEAR: &str = "Unknown Year";
pub const UNKNOWN_GENRE: &str = "Unknown Genre";
pub const UNKNOWN_LANGUAGE: &str = "Unknown";
pub const DEFAULT_DESCRIPTION: &str = "No description available.";

/// Constructed once per pipeline run, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ContentRecord {
    pub title: String,
    pub year: String,
    pub genre: String,
    pub language: String,
    pub description: String,
    pub poster_reference: Option<String>,
    pub rating: String,
    pub video_reference: String,
}

impl ContentRecord {
    /// Merge the primary document with an optional secondary match.
    /// Secondary overrides primary field-by-field, only where the secondary
    /// field is non-empty.
    pub fn merge(doc: &ItemDocument, enrich: Option<&TmdbMovie>, video_reference: &str) -> Self {
        let secondary_title = enrich.and_then(|m| non_empty(m.title.as_deref()));
        let secondary_year = enrich
            .and_then(|m| non_empty(m.release_date.as_deref()))
            .and_then(|d| leading_year(&d));
        let secondary_description = enrich.and_then(|m| non_empty(m.overview.as_deref()));
        let secondary_poster = enrich
            .and_then(|m| non_empty(m.poster_path.as_deref()))
            .map(|p| tmdb::poster_url(&p));
        let secondary_genre = enrich.and_then(|m| tmdb::genre_names(&m.genre_ids));
        let rating = enrich
            .and_then(|m| m.vote_average)
            .map(|v| format!("{v:.1}"))
            .unwrap_or_else(|| "N/A".to_string());

        let title = secondary_title
            .or_else(|| non_empty(doc.title.as_deref()))
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string());

        let year = secondary_year
            .or_else(|| non_empty(doc.date.as_deref()).and_then(|d| leading_year(&d)))
            .unwrap_or_else(|| UNKNOWN_YEAR.to_string());

        let description = secondary_description
            .or_else(|| non_empty(doc.description.as_deref()))
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

        // secondary posters are higher resolution, always preferred
        let poster_reference = secondary_poster.or_else(|| primary_poster_url(doc));

        let genre = secondary_genre
            .or_else(|| non_empty(doc.subject.as_deref()))
            .unwrap_or_else(|| UNKNOWN_GENRE.to_string());

        // the secondary catalog has no language field in this contract
        let language = non_empty(doc.language.as_deref())
            .unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string());

        ContentRecord {
            title,
            year,
            genre,
            language,
            description,
            poster_reference,
            rating,
            video_reference: video_reference.to_string(),
        }
    }

    /// Record for the generic-link and forwarded-video flows, where the
    /// primary catalog is absent and the base fields come from the user.
    pub fn from_manual(
        title: &str,
        year: &str,
        genre: Option<&str>,
        enrich: Option<&TmdbMovie>,
        video_reference: &str,
    ) -> Self {
        let mut record = ContentRecord {
            title: non_empty(Some(title)).unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            year: non_empty(Some(year)).unwrap_or_else(|| UNKNOWN_YEAR.to_string()),
            genre: genre
                .and_then(|g| non_empty(Some(g)))
                .unwrap_or_else(|| "Cine".to_string()),
            language: UNKNOWN_LANGUAGE.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            poster_reference: None,
            rating: "N/A".to_string(),
            video_reference: video_reference.to_string(),
        };

        if let Some(m) = enrich {
            if let Some(t) = non_empty(m.title.as_deref()) {
                record.title = t;
            }
            if let Some(y) = non_empty(m.release_date.as_deref()).and_then(|d| leading_year(&d)) {
                record.year = y;
            }
            if let Some(d) = non_empty(m.overview.as_deref()) {
                record.description = d;
            }
            if let Some(p) = non_empty(m.poster_path.as_deref()) {
                record.poster_reference = Some(tmdb::poster_url(&p));
            }
            if let Some(g) = tmdb::genre_names(&m.genre_ids) {
                record.genre = g;
            }
            if let Some(v) = m.vote_average {
                record.rating = format!("{v:.1}");
            }
        }

        record
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    let s = s?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Leading 4 characters of a date string, e.g. "1968-10-01" -> "1968".
fn leading_year(date: &str) -> Option<String> {
    let year: String = date.chars().take(4).collect();
    if year.len() == 4 {
        Some(year)
    } else {
        None
    }
}

/// Three-tier poster search over the primary file listing:
/// 1. image formats whose name does not say "thumb"
/// 2. the catalog's generic "Item Image" format
/// 3. any .jpg/.png that is not a spectrogram artifact
/// First match wins at each tier; next tier only when the previous found
/// nothing.
fn pick_poster_file(files: &[ItemFile]) -> Option<&ItemFile> {
    let tier1 = files.iter().find(|f| {
        matches!(f.format.as_deref(), Some("JPEG" | "PNG" | "Thumbnail"))
            && !f.name.to_lowercase().contains("thumb")
    });
    if tier1.is_some() {
        return tier1;
    }

    let tier2 = files
        .iter()
        .find(|f| f.format.as_deref() == Some("Item Image"));
    if tier2.is_some() {
        return tier2;
    }

    files.iter().find(|f| {
        let name = f.name.to_lowercase();
        (name.ends_with(".jpg") || name.ends_with(".png")) && !name.contains("spectrogram")
    })
}

fn primary_poster_url(doc: &ItemDocument) -> Option<String> {
    let file = pick_poster_file(&doc.files)?;
    let server = doc.server.as_deref()?;
    let dir = doc.dir.as_deref()?;
    Some(format!("https://{server}{dir}/{}", file.name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with(title: Option<&str>, date: Option<&str>) -> ItemDocument {
        ItemDocument {
            title: title.map(str::to_owned),
            date: date.map(str::to_owned),
            ..Default::default()
        }
    }

    fn movie_with_title(title: Option<&str>) -> TmdbMovie {
        TmdbMovie {
            title: title.map(str::to_owned),
            ..Default::default()
        }
    }

    #[test]
    fn test_title_precedence_secondary_wins() {
        let doc = doc_with(Some("A"), None);
        let movie = movie_with_title(Some("B"));
        let record = ContentRecord::merge(&doc, Some(&movie), "link");
        assert_eq!(record.title, "B");
    }

    #[test]
    fn test_title_precedence_empty_secondary_falls_back() {
        let doc = doc_with(Some("A"), None);
        let movie = movie_with_title(Some(""));
        let record = ContentRecord::merge(&doc, Some(&movie), "link");
        assert_eq!(record.title, "A");
    }

    #[test]
    fn test_title_precedence_both_empty() {
        let doc = doc_with(None, None);
        let movie = movie_with_title(None);
        let record = ContentRecord::merge(&doc, Some(&movie), "link");
        assert_eq!(record.title, UNKNOWN_TITLE);
    }

    #[test]
    fn test_year_from_leading_date_chars() {
        let doc = doc_with(Some("A"), Some("1968-10-01"));
        let record = ContentRecord::merge(&doc, None, "link");
        assert_eq!(record.year, "1968");

        let movie = TmdbMovie {
            release_date: Some("1972-03-15".to_string()),
            ..Default::default()
        };
        let record = ContentRecord::merge(&doc, Some(&movie), "link");
        assert_eq!(record.year, "1972");
    }

    #[test]
    fn test_year_unknown_when_dates_missing_or_short() {
        let record = ContentRecord::merge(&doc_with(Some("A"), None), None, "link");
        assert_eq!(record.year, UNKNOWN_YEAR);

        let record = ContentRecord::merge(&doc_with(Some("A"), Some("68")), None, "link");
        assert_eq!(record.year, UNKNOWN_YEAR);
    }

    #[test]
    fn test_rating_rounded_to_one_decimal() {
        let doc = doc_with(Some("A"), None);
        let movie = TmdbMovie {
            vote_average: Some(7.456),
            ..Default::default()
        };
        let record = ContentRecord::merge(&doc, Some(&movie), "link");
        assert_eq!(record.rating, "7.5");
    }

    #[test]
    fn test_rating_absent_is_na() {
        let doc = doc_with(Some("A"), None);
        let record = ContentRecord::merge(&doc, Some(&movie_with_title(Some("B"))), "link");
        assert_eq!(record.rating, "N/A");
        let record = ContentRecord::merge(&doc, None, "link");
        assert_eq!(record.rating, "N/A");
    }

    #[test]
    fn test_language_always_from_primary() {
        let mut doc = doc_with(Some("A"), None);
        doc.language = Some("Spanish".to_string());
        let record = ContentRecord::merge(&doc, None, "link");
        assert_eq!(record.language, "Spanish");

        doc.language = None;
        let record = ContentRecord::merge(&doc, None, "link");
        assert_eq!(record.language, UNKNOWN_LANGUAGE);
    }

    fn file(name: &str, format: Option<&str>) -> ItemFile {
        ItemFile {
            name: name.to_string(),
            format: format.map(str::to_owned),
        }
    }

    #[test]
    fn test_poster_tier1_excludes_thumb_names() {
        let files = vec![
            file("thumb.jpg", Some("Thumbnail")),
            file("cover.jpg", Some("JPEG")),
        ];
        assert_eq!(pick_poster_file(&files).unwrap().name, "cover.jpg");
    }

    #[test]
    fn test_poster_tier2_item_image() {
        let files = vec![
            file("movie.mp4", Some("h.264")),
            file("__ia_thumb.jpg", Some("Item Image")),
        ];
        assert_eq!(pick_poster_file(&files).unwrap().name, "__ia_thumb.jpg");
    }

    #[test]
    fn test_poster_tier3_skips_spectrograms() {
        let files = vec![
            file("audio_spectrogram.png", None),
            file("still.png", None),
        ];
        assert_eq!(pick_poster_file(&files).unwrap().name, "still.png");
    }

    #[test]
    fn test_poster_none_when_no_candidate() {
        let files = vec![file("movie.mp4", Some("h.264"))];
        assert!(pick_poster_file(&files).is_none());
    }

    #[test]
    fn test_primary_poster_url_needs_server_and_dir() {
        let mut doc = doc_with(Some("A"), None);
        doc.files = vec![file("cover.jpg", Some("JPEG"))];
        assert_eq!(primary_poster_url(&doc), None);

        doc.server = Some("ia1.us.archive.org".to_string());
        doc.dir = Some("/0/items/x".to_string());
        assert_eq!(
            primary_poster_url(&doc).as_deref(),
            Some("https://ia1.us.archive.org/0/items/x/cover.jpg")
        );
    }

    #[test]
    fn test_secondary_poster_always_preferred() {
        let mut doc = doc_with(Some("A"), None);
        doc.server = Some("ia1.us.archive.org".to_string());
        doc.dir = Some("/0/items/x".to_string());
        doc.files = vec![file("cover.jpg", Some("JPEG"))];

        let movie = TmdbMovie {
            poster_path: Some("/p.jpg".to_string()),
            ..Default::default()
        };
        let record = ContentRecord::merge(&doc, Some(&movie), "link");
        assert_eq!(
            record.poster_reference.as_deref(),
            Some("https://image.tmdb.org/t/p/w780/p.jpg")
        );
    }

    #[test]
    fn test_genre_precedence() {
        let mut doc = doc_with(Some("A"), None);
        doc.subject = Some("Horror".to_string());

        let movie = TmdbMovie {
            genre_ids: vec![18],
            ..Default::default()
        };
        let record = ContentRecord::merge(&doc, Some(&movie), "link");
        assert_eq!(record.genre, "Drama");

        let record = ContentRecord::merge(&doc, None, "link");
        assert_eq!(record.genre, "Horror");

        doc.subject = None;
        let record = ContentRecord::merge(&doc, None, "link");
        assert_eq!(record.genre, UNKNOWN_GENRE);
    }

    #[test]
    fn test_from_manual_enrichment_overrides() {
        let movie = TmdbMovie {
            title: Some("The Matrix".to_string()),
            release_date: Some("1999-03-31".to_string()),
            overview: Some("A hacker learns the truth.".to_string()),
            vote_average: Some(8.2),
            ..Default::default()
        };

        let record = ContentRecord::from_manual(
            "matrix",
            "",
            None,
            Some(&movie),
            "https://example.com/v.mp4",
        );
        assert_eq!(record.title, "The Matrix");
        assert_eq!(record.year, "1999");
        assert_eq!(record.rating, "8.2");
        assert_eq!(record.video_reference, "https://example.com/v.mp4");
    }

    #[test]
    fn test_from_manual_defaults() {
        let record = ContentRecord::from_manual("Title", "", None, None, "url");
        assert_eq!(record.year, UNKNOWN_YEAR);
        assert_eq!(record.genre, "Cine");
        assert_eq!(record.description, DEFAULT_DESCRIPTION);
        assert_eq!(record.poster_reference, None);
    }
}
