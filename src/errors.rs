#[derive(thiserror::Error, Debug)]
pub enum BotError {
    #[error("upstream fetch failed: {0}")]
    Fetch(String),

    #[error("item has no metadata section")]
    Unparseable,

    #[error("poster rendering failed: {0}")]
    Render(String),

    #[error("reqwest error: {0:?}")]
    Reqwest(#[from] reqwest::Error),
}
