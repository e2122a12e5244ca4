/// Canonical comparable form of extracted page text: ASCII letters and digits
/// only, lower-cased, words separated by single spaces.
pub fn normalize(raw: &str) -> String {
    let filtered = raw
        .chars()
        .filter(|character| character.is_ascii_alphanumeric() || character.is_whitespace())
        .map(|character| character.to_ascii_lowercase())
        .collect::<String>();

    filtered.split_whitespace().collect::<Vec<&str>>().join(" ")
}
