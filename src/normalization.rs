use serde::{Deserialize, Deserializer};

/// Normalizes administrator-entered free text (titles, locations) by
/// stripping surrounding whitespace and decomposing it into Unicode
/// Normalization Form D.
///
/// ```
/// use backend::normalization::normalize_text;
/// assert_eq!(normalize_text(" hï "), "hï");
/// ```
pub fn normalize_text(text: impl AsRef<str>) -> String {
    use unicode_normalization::UnicodeNormalization;

    text.as_ref().trim().nfd().to_string()
}

/// Deserializes a `String` after running it through `normalize_text`.
pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
where D: Deserializer<'de> {
    let s: String = Deserialize::deserialize(deserializer)?;
    Ok(normalize_text(s))
}

/// Deserializes an optional `String` after running it through `normalize_text`.
pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where D: Deserializer<'de> {
    let o: Option<String> = Deserialize::deserialize(deserializer)?;
    Ok(o.map(normalize_text))
}
