//! Two-step publication: rendered image first, captioned content second.
//! No atomicity between the steps; partial success beats total silence.

use crate::record::ContentRecord;
use crate::transport::{ChannelTransport, InlineButton, InlineKeyboard};

pub const SYNOPSIS_LIMIT: usize = 800;

/// Where the captioned step points: a link back to the original content,
/// or a forwarded file re-sent by id.
#[derive(Debug, Clone)]
pub enum ContentSource {
    Link(String),
    FileId(String),
}

pub fn format_caption(record: &ContentRecord) -> String {
    let synopsis: String = record.description.chars().take(SYNOPSIS_LIMIT).collect();

    format!(
        "🎬 *Película:* {}\n\
         📅 *Año:* {}\n\
         🌎 *Idioma:* Latino 🇨🇴🇲🇽\n\
         💿 *Calidad:* HD\n\
         ⭐ *Calificación:* {}\n\
         🎭 *Género:* {}\n\n\
         📝 *Sinopsis:*\n{}...\n\n\
         🔗 *Síguenos en Instagram:*",
        record.title, record.year, record.rating, record.genre, synopsis
    )
}

pub fn send_publication(
    transport: &dyn ChannelTransport,
    chat: &str,
    record: &ContentRecord,
    artifact: Option<&[u8]>,
    source: &ContentSource,
    cta_url: &str,
) -> anyhow::Result<()> {
    // Step 1: image, no caption. A missing or failed image never blocks
    // the captioned step.
    if let Some(bytes) = artifact {
        if let Err(e) = transport.send_photo(chat, bytes) {
            log::warn!("poster emission failed, continuing with text: {e}");
        }
    }

    // Step 2: captioned content
    let caption = format_caption(record);
    let keyboard: InlineKeyboard = vec![vec![InlineButton {
        text: "📸 Instagram".to_string(),
        url: Some(cta_url.to_string()),
        callback_data: None,
    }]];

    match source {
        ContentSource::Link(url) => transport.send_message(
            chat,
            &format!("{caption}\n\n[Ver Película]({url})"),
            Some(&keyboard),
        ),
        ContentSource::FileId(file_id) => {
            transport.send_video(chat, file_id, &caption, Some(&keyboard))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ContentRecord;

    fn record() -> ContentRecord {
        ContentRecord {
            title: "Night of the Living Dead".to_string(),
            year: "1968".to_string(),
            genre: "Horror".to_string(),
            language: "English".to_string(),
            description: "x".repeat(2000),
            poster_reference: None,
            rating: "7.5".to_string(),
            video_reference: "https://archive.org/details/night".to_string(),
        }
    }

    #[test]
    fn test_caption_truncates_synopsis() {
        let caption = format_caption(&record());
        // the 800-char cut plus the trailing ellipsis marker
        assert!(caption.contains(&format!("{}...", "x".repeat(SYNOPSIS_LIMIT))));
        assert!(!caption.contains(&"x".repeat(SYNOPSIS_LIMIT + 1)));
    }

    #[test]
    fn test_caption_contains_record_fields() {
        let caption = format_caption(&record());
        assert!(caption.contains("Night of the Living Dead"));
        assert!(caption.contains("1968"));
        assert!(caption.contains("7.5"));
        assert!(caption.contains("Horror"));
    }

    #[test]
    fn test_short_synopsis_kept_whole() {
        let mut r = record();
        r.description = "short".to_string();
        let caption = format_caption(&r);
        assert!(caption.contains("short..."));
    }
}
