//! Pure classification of transport updates into inbound events.
//! Order mirrors handler precedence: payment plumbing first, then the most
//! specific message shapes down to free text.

use crate::archive::identifier;
use crate::transport::Update;

pub const SELECTION_PREFIX: &str = "IA_";

#[derive(Debug, Clone, PartialEq)]
pub struct Requester {
    pub chat: i64,
    pub user_id: u64,
    pub first_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    PreCheckout {
        query_id: String,
        payload: String,
    },
    PaymentCompleted(Requester),
    Selection {
        who: Requester,
        callback_id: String,
        identifier: String,
    },
    Start(Requester),
    Search {
        who: Requester,
        query: String,
    },
    VideoUpload {
        who: Requester,
        file_id: String,
        file_name: String,
    },
    ArchiveLink {
        who: Requester,
        url: String,
    },
    ManualRecord {
        who: Requester,
        text: String,
    },
    Text {
        who: Requester,
        text: String,
    },
    Ignored,
}

pub fn classify(update: &Update) -> InboundEvent {
    if let Some(ref pcq) = update.pre_checkout_query {
        return InboundEvent::PreCheckout {
            query_id: pcq.id.clone(),
            payload: pcq.invoice_payload.clone(),
        };
    }

    if let Some(ref cq) = update.callback_query {
        let chat = match cq.message {
            Some(ref m) => m.chat.id,
            None => return InboundEvent::Ignored,
        };
        let who = Requester {
            chat,
            user_id: cq.from.id,
            first_name: cq.from.first_name.clone().unwrap_or_default(),
        };
        if let Some(identifier) = cq
            .data
            .as_deref()
            .and_then(|d| d.strip_prefix(SELECTION_PREFIX))
        {
            return InboundEvent::Selection {
                who,
                callback_id: cq.id.clone(),
                identifier: identifier.to_string(),
            };
        }
        return InboundEvent::Ignored;
    }

    let Some(ref message) = update.message else {
        return InboundEvent::Ignored;
    };
    let Some(ref from) = message.from else {
        return InboundEvent::Ignored;
    };
    let who = Requester {
        chat: message.chat.id,
        user_id: from.id,
        first_name: from.first_name.clone().unwrap_or_default(),
    };

    if message.successful_payment.is_some() {
        return InboundEvent::PaymentCompleted(who);
    }

    // forwarded video, either native or as a video document
    if let Some(ref video) = message.video {
        return InboundEvent::VideoUpload {
            who,
            file_id: video.file_id.clone(),
            file_name: video.file_name.clone().unwrap_or_default(),
        };
    }
    if let Some(ref doc) = message.document {
        let is_video = doc
            .mime_type
            .as_deref()
            .map(|m| m.starts_with("video/"))
            .unwrap_or(false);
        if is_video {
            return InboundEvent::VideoUpload {
                who,
                file_id: doc.file_id.clone(),
                file_name: doc.file_name.clone().unwrap_or_default(),
            };
        }
    }

    let Some(text) = message.text.as_deref().map(str::trim) else {
        return InboundEvent::Ignored;
    };
    if text.is_empty() {
        return InboundEvent::Ignored;
    }

    if text == "/start" || text.starts_with("/start ") {
        return InboundEvent::Start(who);
    }

    if text == "/search" || text.starts_with("/search ") {
        return InboundEvent::Search {
            who,
            query: text["/search".len()..].trim().to_string(),
        };
    }

    if identifier::is_archive_link(text) {
        return InboundEvent::ArchiveLink {
            who,
            url: text.to_string(),
        };
    }

    // generic links carry manual metadata: URL | Title | Year [| Genre]
    if text.starts_with("http://") || text.starts_with("https://") {
        return InboundEvent::ManualRecord {
            who,
            text: text.to_string(),
        };
    }

    InboundEvent::Text {
        who,
        text: text.to_string(),
    }
}
