//! Text normalization shared by indexing and querying

/// Reduce text to its searchable form: whitespace dropped, lowercased, and every
/// non-alphanumeric character removed.
///
/// File stems are simplified when an [`ImageRecord`](crate::models::ImageRecord) is
/// built and queries are simplified before matching, so only simplified forms are
/// ever compared.
///
/// # Examples
///
/// ```
/// use imgseek::search::simplify;
///
/// assert_eq!(simplify("  Cat Photo #2 "), "catphoto2");
/// assert_eq!(simplify("dog!!"), "dog");
/// ```
pub fn simplify(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}
