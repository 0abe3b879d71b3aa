//! Phone number normalization
//!
//! Inbound webhook payloads carry sender numbers in provider-specific
//! dress: SMS-style providers prefix a channel ("whatsapp:+49170..."),
//! others send bare digits without the plus. Outbound sends and reply
//! correlation both key on the normalized form.

/// Normalize a sender phone number to `+<digits>` form.
///
/// Strips a `whatsapp:` channel prefix, spaces, dashes and parentheses.
/// A leading `00` is rewritten to `+`. Numbers without any international
/// prefix are kept digit-only (the provider is trusted to be consistent).
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_channel = trimmed.strip_prefix("whatsapp:").unwrap_or(trimmed);

    let mut digits: String = without_channel
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();

    if let Some(rest) = digits.strip_prefix("00") {
        digits = rest.to_string();
    }

    if without_channel.starts_with('+') || without_channel.starts_with("00") {
        format!("+{}", digits)
    } else {
        digits
    }
}
