//! Minimal RFC 5322 rendering for single-part HTML messages.
use super::OutboundMessage;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

const BODY_LINE_WIDTH: usize = 76;

/// Render `message` as a complete message with a base64 HTML body.
pub fn render_message(message: &OutboundMessage) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "From: {} <{}>\r\n",
        encode_header(&message.from_name),
        header_value(&message.from_address)
    ));
    out.push_str(&format!("To: {}\r\n", header_value(&message.to)));
    out.push_str(&format!("Subject: {}\r\n", encode_header(&message.subject)));
    out.push_str("MIME-Version: 1.0\r\n");
    out.push_str("Content-Type: text/html; charset=\"UTF-8\"\r\n");
    out.push_str("Content-Transfer-Encoding: base64\r\n");
    out.push_str("\r\n");
    let encoded = STANDARD.encode(message.html_body.as_bytes());
    for chunk in encoded.as_bytes().chunks(BODY_LINE_WIDTH) {
        out.push_str(&String::from_utf8_lossy(chunk));
        out.push_str("\r\n");
    }
    out
}

/// Header values never carry line breaks.
fn header_value(value: &str) -> String {
    value
        .chars()
        .filter(|ch| *ch != '\r' && *ch != '\n')
        .collect::<String>()
        .trim()
        .to_string()
}

/// RFC 2047 encoded-word for non-ASCII header text.
fn encode_header(value: &str) -> String {
    let value = header_value(value);
    if value.is_ascii() {
        return value;
    }
    format!("=?UTF-8?B?{}?=", STANDARD.encode(value.as_bytes()))
}
