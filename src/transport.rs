//! Chat transport boundary: inbound update payloads, the outbound emission
//! trait the rest of the crate talks to, and the thin Bot-API-shaped HTTP
//! client behind it.

use anyhow::{bail, Context};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const API_BASE: &str = "https://api.telegram.org/bot";
// long poll timeout plus slack
const HTTP_TIMEOUT: Duration = Duration::from_secs(70);

#[derive(Debug, Clone)]
pub struct InlineButton {
    pub text: String,
    pub url: Option<String>,
    pub callback_data: Option<String>,
}

pub type InlineKeyboard = Vec<Vec<InlineButton>>;

#[derive(Debug, Clone)]
pub struct Invoice {
    pub title: String,
    pub description: String,
    pub payload: String,
    pub currency: String,
    pub label: String,
    pub amount: u32,
}

/// Outbound emissions addressed by a chat/channel handle. The seam the
/// publisher and handlers are tested through.
pub trait ChannelTransport: Send + Sync {
    fn send_message(
        &self,
        chat: &str,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> anyhow::Result<()>;

    fn send_photo(&self, chat: &str, photo: &[u8]) -> anyhow::Result<()>;

    fn send_video(
        &self,
        chat: &str,
        file_id: &str,
        caption: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> anyhow::Result<()>;

    fn send_invoice(&self, chat: &str, invoice: &Invoice) -> anyhow::Result<()>;

    fn answer_precheckout(
        &self,
        query_id: &str,
        ok: bool,
        error_message: Option<&str>,
    ) -> anyhow::Result<()>;

    fn answer_callback(&self, callback_id: &str) -> anyhow::Result<()>;
}

// ---- inbound update payloads ----

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
    #[serde(default)]
    pub pre_checkout_query: Option<PreCheckoutQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub video: Option<FileAttachment>,
    #[serde(default)]
    pub document: Option<FileAttachment>,
    #[serde(default)]
    pub successful_payment: Option<SuccessfulPayment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: u64,
    #[serde(default)]
    pub first_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileAttachment {
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreCheckoutQuery {
    pub id: String,
    pub from: User,
    pub invoice_payload: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuccessfulPayment {
    pub invoice_payload: String,
}

// ---- HTTP client ----

pub struct BotApi {
    http: reqwest::blocking::Client,
    base: String,
}

impl BotApi {
    pub fn new(token: &str) -> anyhow::Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("building transport http client")?;

        Ok(Self {
            http,
            base: format!("{API_BASE}{token}"),
        })
    }

    fn call(&self, method: &str, params: &Value) -> anyhow::Result<Value> {
        let url = format!("{}/{method}", self.base);
        let response = self
            .http
            .post(&url)
            .json(params)
            .send()
            .with_context(|| format!("transport call {method} failed"))?;

        let value: Value = response
            .json()
            .with_context(|| format!("transport call {method} returned malformed body"))?;

        if value.get("ok").and_then(|v| v.as_bool()) != Some(true) {
            let description = value
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            bail!("transport call {method} rejected: {description}");
        }

        Ok(value.get("result").cloned().unwrap_or(Value::Null))
    }

    pub fn get_updates(&self, offset: i64, timeout_secs: u64) -> anyhow::Result<Vec<Update>> {
        let result = self.call(
            "getUpdates",
            &json!({ "offset": offset, "timeout": timeout_secs }),
        )?;
        serde_json::from_value(result).context("malformed update batch")
    }
}

fn keyboard_json(keyboard: &InlineKeyboard) -> Value {
    let rows: Vec<Value> = keyboard
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| {
                    let mut button = json!({ "text": b.text });
                    if let Some(ref url) = b.url {
                        button["url"] = json!(url);
                    }
                    if let Some(ref data) = b.callback_data {
                        button["callback_data"] = json!(data);
                    }
                    button
                })
                .collect::<Vec<_>>()
                .into()
        })
        .collect();

    json!({ "inline_keyboard": rows })
}

impl ChannelTransport for BotApi {
    fn send_message(
        &self,
        chat: &str,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> anyhow::Result<()> {
        let mut params = json!({
            "chat_id": chat,
            "text": text,
            "parse_mode": "Markdown",
        });
        if let Some(kb) = keyboard {
            params["reply_markup"] = keyboard_json(kb);
        }
        self.call("sendMessage", &params)?;
        Ok(())
    }

    fn send_photo(&self, chat: &str, photo: &[u8]) -> anyhow::Result<()> {
        // multipart upload, not a json call
        let url = format!("{}/sendPhoto", self.base);
        let part = reqwest::blocking::multipart::Part::bytes(photo.to_vec())
            .file_name("poster.jpg")
            .mime_str("image/jpeg")?;
        let form = reqwest::blocking::multipart::Form::new()
            .text("chat_id", chat.to_string())
            .part("photo", part);

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .context("transport call sendPhoto failed")?;

        let value: Value = response.json().context("sendPhoto returned malformed body")?;
        if value.get("ok").and_then(|v| v.as_bool()) != Some(true) {
            let description = value
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            bail!("transport call sendPhoto rejected: {description}");
        }
        Ok(())
    }

    fn send_video(
        &self,
        chat: &str,
        file_id: &str,
        caption: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> anyhow::Result<()> {
        let mut params = json!({
            "chat_id": chat,
            "video": file_id,
            "caption": caption,
            "parse_mode": "Markdown",
        });
        if let Some(kb) = keyboard {
            params["reply_markup"] = keyboard_json(kb);
        }
        self.call("sendVideo", &params)?;
        Ok(())
    }

    fn send_invoice(&self, chat: &str, invoice: &Invoice) -> anyhow::Result<()> {
        self.call(
            "sendInvoice",
            &json!({
                "chat_id": chat,
                "title": invoice.title,
                "description": invoice.description,
                "payload": invoice.payload,
                "currency": invoice.currency,
                "prices": [{ "label": invoice.label, "amount": invoice.amount }],
            }),
        )?;
        Ok(())
    }

    fn answer_precheckout(
        &self,
        query_id: &str,
        ok: bool,
        error_message: Option<&str>,
    ) -> anyhow::Result<()> {
        let mut params = json!({
            "pre_checkout_query_id": query_id,
            "ok": ok,
        });
        if let Some(msg) = error_message {
            params["error_message"] = json!(msg);
        }
        self.call("answerPreCheckoutQuery", &params)?;
        Ok(())
    }

    fn answer_callback(&self, callback_id: &str) -> anyhow::Result<()> {
        self.call(
            "answerCallbackQuery",
            &json!({ "callback_query_id": callback_id }),
        )?;
        Ok(())
    }
}
