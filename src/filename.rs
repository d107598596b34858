//! Heuristic title/year extraction from forwarded-file names.
//!
//! Three-strategy cascade: anti-spam cleaning improves accuracy on typical
//! release naming but occasionally destroys legitimate title tokens, so an
//! uncleaned retry runs before the dumb raw-text fallback.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static HANDLE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@\w+").expect("Failed to compile handle regex"));

static URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:https?://|www\.)\S+").expect("Failed to compile url regex")
});

// Tokens that mark the end of the title run in release-style names.
const RELEASE_TAGS: &[&str] = &[
    "480p", "576p", "720p", "1080p", "2160p", "4k", "uhd",
    "x264", "x265", "h264", "h265", "hevc", "avc", "av1", "xvid", "divx",
    "bluray", "blu-ray", "brrip", "bdrip", "webrip", "web-dl", "webdl",
    "hdtv", "dvdrip", "dvdscr", "camrip", "hdcam", "hdrip", "remux",
    "proper", "repack", "extended", "unrated", "remastered",
    "multi", "dual", "latino", "castellano", "subbed", "vose",
    "aac", "ac3", "dts", "10bit", "hdr", "hdr10",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Guess {
    pub title: String,
    pub year: Option<String>,
}

/// Returns `None` only when even the raw-text fallback yields nothing.
pub fn parse(filename: &str) -> Option<Guess> {
    // 1. cleaned extraction
    let cleaned = clean(filename);
    let (title, year) = extract(&cleaned);
    if let Some(title) = title {
        return Some(Guess { title, year });
    }
    let cleaned_year = year;

    // 2. uncleaned retry, reusing the year the cleaned pass found
    let (title, year) = extract(filename);
    if let Some(title) = title {
        return Some(Guess {
            title,
            year: year.or(cleaned_year),
        });
    }

    // 3. raw-text fallback: extension off, separators to spaces, verbatim
    let raw = strip_extension(filename).replace(['.', '_'], " ");
    let title = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if title.is_empty() {
        None
    } else {
        Some(Guess { title, year: None })
    }
}

/// Strip `@handle` tokens and embedded URLs, replace underscores with spaces.
fn clean(name: &str) -> String {
    let name = URL_REGEX.replace_all(name, " ");
    let name = HANDLE_REGEX.replace_all(&name, " ");
    name.replace('_', " ")
}

/// Rule-based extraction: tokenize, find the first release tag or year
/// token, take the leading token run as the title.
fn extract(name: &str) -> (Option<String>, Option<String>) {
    let stem = strip_extension(name);
    let tokens: Vec<&str> = stem
        .split(['.', '_', ' '])
        .filter(|t| !t.is_empty())
        .collect();

    let mut year: Option<String> = None;
    let mut cut = tokens.len();

    for (idx, token) in tokens.iter().enumerate() {
        if let Some(y) = year_token(token) {
            if year.is_none() {
                year = Some(y);
            }
            cut = cut.min(idx);
        } else if is_release_tag(token) {
            cut = cut.min(idx);
        }
    }

    let title = tokens[..cut].join(" ");
    let title = if title.trim().is_empty() {
        None
    } else {
        Some(title.trim().to_string())
    };

    (title, year)
}

fn strip_extension(name: &str) -> &str {
    if let Some((stem, ext)) = name.rsplit_once('.') {
        let looks_like_ext = (2..=4).contains(&ext.len())
            && ext.chars().all(|c| c.is_ascii_alphanumeric())
            && ext.chars().any(|c| c.is_ascii_alphabetic());
        if looks_like_ext && !stem.is_empty() {
            return stem;
        }
    }
    name
}

/// A 4-digit token in 1900..=2099, possibly wrapped in brackets.
fn year_token(token: &str) -> Option<String> {
    let digits = token.trim_matches(|c: char| !c.is_ascii_digit());
    if digits.len() != 4 {
        return None;
    }
    match digits.parse::<u32>() {
        Ok(y) if (1900..=2099).contains(&y) => Some(digits.to_string()),
        _ => None,
    }
}

fn is_release_tag(token: &str) -> bool {
    token
        .split('-')
        .any(|part| RELEASE_TAGS.contains(&part.to_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_style_name() {
        let guess = parse("Night.of.the.Living.Dead.1968.720p.mkv").unwrap();
        assert_eq!(guess.title, "Night of the Living Dead");
        assert_eq!(guess.year.as_deref(), Some("1968"));
    }

    #[test]
    fn test_tag_before_year_still_cuts_title() {
        let guess = parse("The.Thing.1080p.BluRay.1982.x264.mkv").unwrap();
        assert_eq!(guess.title, "The Thing");
        assert_eq!(guess.year.as_deref(), Some("1982"));
    }

    #[test]
    fn test_bracketed_year() {
        let guess = parse("Nosferatu (1922) DVDRip.avi").unwrap();
        assert_eq!(guess.title, "Nosferatu");
        assert_eq!(guess.year.as_deref(), Some("1922"));
    }

    #[test]
    fn test_underscores_and_handles_cleaned() {
        let guess = parse("El_Mariachi_1992_DVDRip_@moviechannel.mp4").unwrap();
        assert_eq!(guess.title, "El Mariachi");
        assert_eq!(guess.year.as_deref(), Some("1992"));
    }

    #[test]
    fn test_embedded_url_stripped() {
        let guess = parse("Metropolis.1927.www.spam-site.com.mkv").unwrap();
        assert_eq!(guess.title, "Metropolis");
        assert_eq!(guess.year.as_deref(), Some("1927"));
    }

    #[test]
    fn test_raw_fallback_transform() {
        // no title under strategies 1-2: every token is a release tag
        let guess = parse("1080p_x264.mkv").unwrap();
        assert_eq!(guess.title, "1080p x264");
        assert_eq!(guess.year, None);
    }

    #[test]
    fn test_plain_name_without_year() {
        let guess = parse("vacation_video.mp4").unwrap();
        assert_eq!(guess.title, "vacation video");
        assert_eq!(guess.year, None);
    }

    #[test]
    fn test_unparseable_when_nothing_left() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("___"), None);
        assert_eq!(parse("..."), None);
    }

    #[test]
    fn test_year_not_confused_with_resolution() {
        let guess = parse("Dune.2021.2160p.mkv").unwrap();
        assert_eq!(guess.title, "Dune");
        assert_eq!(guess.year.as_deref(), Some("2021"));
    }

    #[test]
    fn test_extension_with_digits_not_stripped_as_year() {
        // "1968" must not be treated as an extension
        let guess = parse("Dead.1968").unwrap();
        assert_eq!(guess.title, "Dead");
        assert_eq!(guess.year.as_deref(), Some("1968"));
    }
}
