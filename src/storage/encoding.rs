use base64::{engine::general_purpose::STANDARD, DecodeError, Engine as _};

const DATA_URL_MARKER: &str = "base64,";
const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Wraps PNG bytes into a data URL, the format the relay service and the shell exchange.
pub fn to_png_data_url(bytes: &[u8]) -> String {
    let mut url = String::with_capacity(PNG_DATA_URL_PREFIX.len() + bytes.len() * 4 / 3 + 4);
    url.push_str(PNG_DATA_URL_PREFIX);
    STANDARD.encode_string(bytes, &mut url);
    url
}

/// Returns the base64 part of a payload. Anything up to and including `base64,` is dropped, plain
/// base64 is returned unchanged.
pub fn strip_data_url(payload: &str) -> &str {
    match payload.split_once(DATA_URL_MARKER) {
        Some((_, data)) => data,
        None => payload,
    }
}

/// Decodes a payload that is either plain base64 or a data URL.
pub fn decode_payload(payload: &str) -> Result<Vec<u8>, DecodeError> {
    STANDARD.decode(strip_data_url(payload).trim())
}
