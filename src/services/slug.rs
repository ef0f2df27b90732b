//! URL slugs for topics, videos and playlists

/// Characters dropped from names before spaces become hyphens.
const STRIPPED: &[char] = &[
    '?', ',', '.', ';', ':', '!', '/', '\\', '+', '=', '´', '`', '\'', '"',
];

/// Turn a display name into a slug.
///
/// The name is trimmed and lowercased, punctuation in [`STRIPPED`] is
/// removed, and every remaining whitespace character becomes `-`. Runs of
/// spaces are not collapsed, so `"a  b"` gives `"a--b"`.
pub fn slugify(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !STRIPPED.contains(c))
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect()
}
