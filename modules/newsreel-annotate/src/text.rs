/// Lowercase a text and split it into alphanumeric tokens. Both the
/// classifiers and the embedder consume this shape.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
