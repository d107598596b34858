//! Per-event handlers and the three publication pipelines. Every gated
//! handler starts with an explicit authorization guard; denial always
//! answers with the unlock instructions.

use crate::archive::{identifier, CatalogSource};
use crate::auth::{self, ACCESS_PAYLOAD_TAG};
use crate::bot::events::{InboundEvent, Requester, SELECTION_PREFIX};
use crate::bot::BotContext;
use crate::errors::BotError;
use crate::filename;
use crate::poster;
use crate::publish::{self, ContentSource};
use crate::record::ContentRecord;
use crate::tmdb::MovieEnricher;
use crate::translate;
use crate::transport::{InlineButton, InlineKeyboard, Invoice, Update};

pub fn dispatch(ctx: &BotContext, update: Update) {
    let event = super::events::classify(&update);
    log::debug!("update {}: {event:?}", update.update_id);

    let outcome = match event {
        InboundEvent::PreCheckout { query_id, payload } => {
            handle_precheckout(ctx, &query_id, &payload)
        }
        InboundEvent::PaymentCompleted(who) => handle_payment_completed(ctx, &who),

        InboundEvent::Selection {
            who,
            callback_id,
            identifier,
        } => {
            // stop the client-side spinner regardless of authorization
            if let Err(e) = ctx.transport.answer_callback(&callback_id) {
                log::warn!("callback answer failed: {e}");
            }
            if ensure_authorized(ctx, &who) {
                publish_archive_item(ctx, &who, &identifier)
            } else {
                Ok(())
            }
        }

        InboundEvent::Start(who) => {
            if ensure_authorized(ctx, &who) {
                handle_start(ctx, &who)
            } else {
                Ok(())
            }
        }

        InboundEvent::Search { who, query } => {
            if ensure_authorized(ctx, &who) {
                handle_search(ctx, &who, &query)
            } else {
                Ok(())
            }
        }

        InboundEvent::VideoUpload {
            who,
            file_id,
            file_name,
        } => {
            if ensure_authorized(ctx, &who) {
                handle_video(ctx, &who, &file_id, &file_name)
            } else {
                Ok(())
            }
        }

        InboundEvent::ArchiveLink { who, url } => {
            if ensure_authorized(ctx, &who) {
                handle_archive_link(ctx, &who, &url)
            } else {
                Ok(())
            }
        }

        InboundEvent::ManualRecord { who, text } => {
            if ensure_authorized(ctx, &who) {
                handle_manual_record(ctx, &who, &text)
            } else {
                Ok(())
            }
        }

        // Authorized users never reach the password handler: their
        // unrecognized text gets the usage hint instead of a
        // "wrong password" reply.
        InboundEvent::Text { who, text } => {
            if ctx.gate.is_authorized(who.user_id) {
                handle_usage_hint(ctx, &who)
            } else {
                handle_password_attempt(ctx, &who, &text)
            }
        }

        InboundEvent::Ignored => Ok(()),
    };

    if let Err(e) = outcome {
        log::error!("handler failed for update {}: {e:?}", update.update_id);
    }
}

// ---- access gate ----

fn ensure_authorized(ctx: &BotContext, who: &Requester) -> bool {
    if ctx.gate.is_authorized(who.user_id) {
        return true;
    }
    if let Err(e) = send_access_denied(ctx, who) {
        log::error!("failed to deliver paywall message: {e}");
    }
    false
}

fn send_access_denied(ctx: &BotContext, who: &Requester) -> anyhow::Result<()> {
    let chat = who.chat.to_string();
    let text = format!(
        "⛔ *Acceso Denegado*\n\n\
         Hola {}, este bot es privado.\n\
         Para usarlo, necesitas desbloquear tu acceso.\n\n\
         🔓 *Opciones:*\n\
         1. 🔑 *Contraseña:* Si la tienes, escríbela tal cual en el chat.\n\
         2. ⭐ *Pagar:* Compra acceso de por vida con Estrellas.",
        who.first_name
    );
    ctx.transport.send_message(&chat, &text, None)?;

    ctx.transport.send_invoice(
        &chat,
        &Invoice {
            title: "Acceso CineCast Bot".to_string(),
            description: "Desbloquea todas las funciones del bot para siempre.".to_string(),
            payload: ACCESS_PAYLOAD_TAG.to_string(),
            currency: "XTR".to_string(),
            label: "Acceso Vitalicio".to_string(),
            amount: ctx.config.stars_price,
        },
    )
}

fn handle_password_attempt(ctx: &BotContext, who: &Requester, text: &str) -> anyhow::Result<()> {
    let chat = who.chat.to_string();
    if auth::password_matches(text, &ctx.config.access_password) {
        ctx.gate.authorize(who.user_id);
        ctx.transport.send_message(
            &chat,
            "✅ *¡Acceso Concedido!*\nBienvenido a CineCast. Usa /start para comenzar.",
            None,
        )
    } else {
        ctx.transport
            .send_message(&chat, "❌ Contraseña incorrecta.", None)
    }
}

// ---- payment plumbing ----

/// Tag mismatch is rejected before any charge is accepted.
fn handle_precheckout(ctx: &BotContext, query_id: &str, payload: &str) -> anyhow::Result<()> {
    if auth::payload_tag_valid(payload) {
        ctx.transport.answer_precheckout(query_id, true, None)
    } else {
        log::warn!("pre-checkout with unexpected payload tag: {payload}");
        ctx.transport
            .answer_precheckout(query_id, false, Some("Payload error"))
    }
}

fn handle_payment_completed(ctx: &BotContext, who: &Requester) -> anyhow::Result<()> {
    ctx.gate.authorize(who.user_id);
    ctx.transport.send_message(
        &who.chat.to_string(),
        "🌟 *¡Pago Recibido!*\n\nTu acceso ha sido desbloqueado permanentemente. ¡Disfruta CineCast!",
        None,
    )
}

// ---- simple handlers ----

fn handle_start(ctx: &BotContext, who: &Requester) -> anyhow::Result<()> {
    let text = format!(
        "👋 ¡Hola {}! *Soy CineCast Bot* 🤖\n\n\
         🎥 *¿Qué hago por ti?*\n\
         Acomodo, edito los metadatos y envío tus películas automáticamente al canal, \
         dejándolas listas con portada y calidad profesional.\n\n\
         🎯 Destino: `{}`\n\n\
         👇 *¿Cómo usarme?*\n\
         1️⃣ *Reenvía un video* de otro canal.\n\
         2️⃣ *Envía un Link* de Internet Archive o genérico.\n\
         3️⃣ *Usa* `/search Nombre` para buscar películas.\n\n\
         🚀 *¡Manos a la obra!*",
        who.first_name, ctx.config.channel_id
    );
    ctx.transport
        .send_message(&who.chat.to_string(), &text, None)
}

fn handle_usage_hint(ctx: &BotContext, who: &Requester) -> anyhow::Result<()> {
    ctx.transport.send_message(
        &who.chat.to_string(),
        "🤔 No reconozco ese formato. Envía un link de Internet Archive, \
         un video reenviado, `URL | Título | Año`, o usa `/search nombre`.",
        None,
    )
}

fn handle_search(ctx: &BotContext, who: &Requester, query: &str) -> anyhow::Result<()> {
    let chat = who.chat.to_string();
    if query.is_empty() {
        return ctx
            .transport
            .send_message(&chat, "🔎 Usage: `/search name of movie`", None);
    }

    ctx.transport
        .send_message(&chat, &format!("🔎 Searching for: *{query}*..."), None)?;

    let hits = match ctx.archive.search(query) {
        Ok(hits) => hits,
        Err(e) => {
            // transport failure is logged apart from a legitimate empty set
            log::error!("search failed for '{query}': {e}");
            return ctx
                .transport
                .send_message(&chat, "❌ Error searching Internet Archive.", None);
        }
    };

    if hits.is_empty() {
        return ctx
            .transport
            .send_message(&chat, "❌ No results found on Internet Archive.", None);
    }

    let keyboard: InlineKeyboard = hits
        .iter()
        .map(|hit| {
            let short_title: String = hit.title.chars().take(30).collect();
            vec![InlineButton {
                text: format!("🎬 {short_title} ({})", hit.year),
                url: None,
                callback_data: Some(format!("{SELECTION_PREFIX}{}", hit.identifier)),
            }]
        })
        .collect();

    ctx.transport
        .send_message(&chat, "👇 Select a movie to publish:", Some(&keyboard))
}

fn handle_archive_link(ctx: &BotContext, who: &Requester, url: &str) -> anyhow::Result<()> {
    let Some(item_id) = identifier::extract(url) else {
        return ctx.transport.send_message(
            &who.chat.to_string(),
            "❌ Could not extract identifier from URL.",
            None,
        );
    };
    publish_archive_item(ctx, who, &item_id)
}

// ---- pipelines ----

/// Direct-link / selection flow: primary fetch, seeded enrichment, merge,
/// render, publish. Aborts with a report on fetch or render failure.
pub fn publish_archive_item(ctx: &BotContext, who: &Requester, item_id: &str) -> anyhow::Result<()> {
    let chat = who.chat.to_string();
    ctx.transport
        .send_message(&chat, "🔍 Fetching metadata...", None)?;

    let doc = match ctx.archive.metadata(item_id) {
        Ok(doc) => doc,
        Err(BotError::Unparseable) => {
            return ctx
                .transport
                .send_message(&chat, "❌ Could not parse metadata.", None);
        }
        Err(e) => {
            log::error!("metadata fetch failed for '{item_id}': {e}");
            return ctx.transport.send_message(
                &chat,
                "❌ Failed to fetch data from Internet Archive.",
                None,
            );
        }
    };

    // The enrichment query is seeded from the primary document, so this
    // lookup can only start after the primary fetch completes.
    let enrich = match doc.title.as_deref() {
        Some(title) if ctx.tmdb.is_configured() => {
            ctx.transport
                .send_message(&chat, &format!("🎬 Searching TMDB for: {title}..."), None)?;
            lookup_enrichment(ctx, title, doc.date.as_deref())
        }
        _ => None,
    };

    let mut record =
        ContentRecord::merge(&doc, enrich.as_ref(), &identifier::details_url(item_id));

    let Some(poster_url) = record.poster_reference.clone() else {
        return ctx.transport.send_message(
            &chat,
            "⚠️ No cover image found to generate poster.",
            None,
        );
    };

    let Some(artifact) = render_poster(ctx, &chat, &poster_url)? else {
        return Ok(());
    };

    record.description = translate::translate_synopsis(&ctx.config.translation, &record.description);

    ctx.transport.send_message(&chat, "📤 Publishing...", None)?;
    let source = ContentSource::Link(record.video_reference.clone());
    publish::send_publication(
        ctx.transport.as_ref(),
        &ctx.config.channel_id,
        &record,
        Some(&artifact),
        &source,
        &ctx.config.cta_url,
    )
}

/// Generic-link flow: manual record, best-effort enrichment, placeholder
/// poster source when neither catalog yields an image.
fn handle_manual_record(ctx: &BotContext, who: &Requester, text: &str) -> anyhow::Result<()> {
    let chat = who.chat.to_string();
    let parts: Vec<&str> = text.split('|').map(str::trim).collect();

    if parts.len() < 2 {
        return ctx.transport.send_message(
            &chat,
            "⚠️ Format for external links:\n\
             `URL | Title | Year`\n\
             Example: `https://example.com/video.mp4 | The Matrix | 1999`",
            None,
        );
    }

    let url = parts[0];
    if url::Url::parse(url).is_err() {
        return ctx.transport.send_message(
            &chat,
            "❌ The first part is not a valid URL.",
            None,
        );
    }
    let title = parts[1];
    let year = parts.get(2).copied().unwrap_or("");
    let genre = parts.get(3).copied();

    ctx.transport
        .send_message(&chat, &format!("🔍 Processing: {title} ({year})..."), None)?;

    let enrich = lookup_enrichment(ctx, title, Some(year));
    let record = ContentRecord::from_manual(title, year, genre, enrich.as_ref(), url);

    // placeholder source instead of aborting in this flow
    let poster_url = record
        .poster_reference
        .clone()
        .unwrap_or_else(|| poster::PLACEHOLDER_POSTER_URL.to_string());

    let Some(artifact) = render_poster(ctx, &chat, &poster_url)? else {
        return Ok(());
    };

    ctx.transport.send_message(&chat, "📤 Publishing...", None)?;
    publish::send_publication(
        ctx.transport.as_ref(),
        &ctx.config.channel_id,
        &record,
        Some(&artifact),
        &ContentSource::Link(url.to_string()),
        &ctx.config.cta_url,
    )
}

/// Forwarded-video flow: filename cascade seeds the enrichment; the file
/// itself is re-sent with the caption.
fn handle_video(
    ctx: &BotContext,
    who: &Requester,
    file_id: &str,
    file_name: &str,
) -> anyhow::Result<()> {
    let chat = who.chat.to_string();

    let Some(guess) = filename::parse(file_name) else {
        return ctx.transport.send_message(
            &chat,
            "⚠️ Could not read a title from that filename. \
             Rename the file or send `URL | Title | Year` instead.",
            None,
        );
    };

    ctx.transport.send_message(
        &chat,
        &format!(
            "🔍 Processing: {} ({})...",
            guess.title,
            guess.year.as_deref().unwrap_or("¿?")
        ),
        None,
    )?;

    let enrich = lookup_enrichment(ctx, &guess.title, guess.year.as_deref());
    let record = ContentRecord::from_manual(
        &guess.title,
        guess.year.as_deref().unwrap_or(""),
        None,
        enrich.as_ref(),
        file_id,
    );

    let poster_url = record
        .poster_reference
        .clone()
        .unwrap_or_else(|| poster::PLACEHOLDER_POSTER_URL.to_string());

    let Some(artifact) = render_poster(ctx, &chat, &poster_url)? else {
        return Ok(());
    };

    ctx.transport.send_message(&chat, "📤 Publishing...", None)?;
    publish::send_publication(
        ctx.transport.as_ref(),
        &ctx.config.channel_id,
        &record,
        Some(&artifact),
        &ContentSource::FileId(file_id.to_string()),
        &ctx.config.cta_url,
    )
}

// ---- shared pieces ----

/// Enrichment absence is not an error; lookup failures are logged and the
/// pipeline continues with primary-only data.
fn lookup_enrichment(
    ctx: &BotContext,
    title: &str,
    year_hint: Option<&str>,
) -> Option<crate::tmdb::TmdbMovie> {
    let year: Option<String> = year_hint.map(|d| d.chars().take(4).collect());
    match ctx.tmdb.search_movie(title, year.as_deref()) {
        Ok(found) => found,
        Err(e) => {
            log::warn!("enrichment lookup failed for '{title}': {e}");
            None
        }
    }
}

/// Renders the poster, reporting failure to the requester. `Ok(None)`
/// means the failure was reported and the flow should abort quietly.
fn render_poster(
    ctx: &BotContext,
    chat: &str,
    poster_url: &str,
) -> anyhow::Result<Option<Vec<u8>>> {
    ctx.transport
        .send_message(chat, "🎨 Generating poster...", None)?;

    match poster::render(&ctx.http, poster_url) {
        Ok(artifact) => Ok(Some(artifact)),
        Err(e) => {
            log::error!("poster rendering failed for {poster_url}: {e}");
            ctx.transport
                .send_message(chat, "❌ Image generation failed.", None)?;
            Ok(None)
        }
    }
}
