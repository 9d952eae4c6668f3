pub mod openai_chat2ollama;

use time::OffsetDateTime;
use uuid::Uuid;

pub fn completion_id() -> String {
    format!("chatcmpl-{}", Uuid::new_v4().simple())
}

pub(crate) fn created_seconds(created_at: Option<OffsetDateTime>) -> i64 {
    created_at
        .unwrap_or_else(OffsetDateTime::now_utc)
        .unix_timestamp()
}
