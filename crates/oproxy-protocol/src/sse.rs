use bytes::Bytes;
use serde::Serialize;

pub const DONE_EVENT: &[u8] = b"data: [DONE]\n\n";

/// Frame `payload` as one server-sent event: `data: <payload>\n\n`.
pub fn data_event(payload: &[u8]) -> Bytes {
    let mut data = Vec::with_capacity(payload.len() + 8);
    data.extend_from_slice(b"data: ");
    data.extend_from_slice(payload);
    data.extend_from_slice(b"\n\n");
    Bytes::from(data)
}

pub fn json_event<T: Serialize>(value: &T) -> Result<Bytes, serde_json::Error> {
    let payload = serde_json::to_vec(value)?;
    Ok(data_event(&payload))
}

pub fn done_event() -> Bytes {
    Bytes::from_static(DONE_EVENT)
}
