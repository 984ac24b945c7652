//! Filesystem-safe names for remote display names.

/// Placeholder used when nothing usable is left after sanitizing.
pub const UNNAMED_FILE: &str = "unnamed_file";

/// Characters rejected by at least one of Windows, macOS or Linux.
const INVALID_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Maps an arbitrary display name to a name that is safe to create locally.
///
/// Non-breaking spaces become regular spaces, invalid characters become `_`,
/// surrounding whitespace is trimmed. Never fails and is idempotent.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '\u{a0}' => ' ',
            c if INVALID_CHARS.contains(&c) => '_',
            c => c,
        })
        .collect();

    let trimmed = replaced.trim();
    if trimmed.is_empty() {
        UNNAMED_FILE.to_string()
    } else {
        trimmed.to_string()
    }
}
