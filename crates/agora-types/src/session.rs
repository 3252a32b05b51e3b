use serde::Serialize;

use crate::models::ExtraNoteShort;

/// What the forum core needs from the request/session layer.
pub trait Session {
    fn csrf_token(&self) -> &str;

    /// Pending flash message, consumed on read.
    fn take_flash(&mut self) -> Option<String>;

    /// Authenticated user, if any.
    fn user_id(&self) -> Option<i64>;
}

/// Data every rendered page needs, bundled for the presentation layer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CommonData {
    pub csrf: String,
    pub msg: String,
    pub username: String,
    pub karma: i64,
    pub forum_name: String,
    pub extra_notes_short: Vec<ExtraNoteShort>,
}
