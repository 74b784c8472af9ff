//! Domain ID generation
//!
//! All IDs use the format: `{6-char-hex}-{kind}-{slug}`
//! Example: `019430-job-nightly-backup`

/// Generate a domain ID from kind ("job", "exec") and a human-readable name
///
/// The hex prefix is taken from the random tail of a v7 uuid, not its
/// timestamp head: the leading hex is constant for hours, and repeated
/// executions of one job share kind and slug, so the prefix is the only
/// thing keeping their ids distinct.
pub fn generate_id(kind: &str, name: &str) -> String {
    let uuid = uuid::Uuid::now_v7().simple().to_string();
    let hex_prefix = &uuid[uuid.len() - 6..];
    let slug = slugify(name);
    format!("{}-{}-{}", hex_prefix, kind, slug)
}

/// Slugify a name for use in IDs
fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        // Strip apostrophes entirely, replace other non-alphanumeric with hyphens
        .filter_map(|c| {
            if c.is_alphanumeric() {
                Some(c)
            } else if c == '\'' || c == '\u{2019}' || c == '\u{2018}' {
                None
            } else {
                Some('-')
            }
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
