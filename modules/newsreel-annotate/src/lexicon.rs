use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::info;

use newsreel_common::{Category, Language};

/// Candidate order for language detection ties.
const LANGUAGE_ORDER: [Language; 3] = [Language::Ru, Language::En, Language::Other];

/// Weighted-lexicon language detector loaded from a plain-text model file.
///
/// One record per line: `<lang_code> <token> [<weight>]` (weight defaults
/// to 1.0). A text's language is the argmax of summed token weights;
/// `Undefined` when nothing matches.
#[derive(Debug, Default)]
pub struct LanguageLexicon {
    weights: HashMap<String, Vec<(Language, f64)>>,
}

impl LanguageLexicon {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read language lexicon: {}", path.display()))?;
        let lexicon = Self::parse(&content)
            .with_context(|| format!("Failed to parse language lexicon: {}", path.display()))?;
        info!(tokens = lexicon.weights.len(), path = %path.display(), "Language lexicon loaded");
        Ok(lexicon)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut weights: HashMap<String, Vec<(Language, f64)>> = HashMap::new();
        for (lineno, line) in model_lines(content) {
            let (tag, token, weight) = split_record(line, lineno)?;
            let language = match tag {
                "ru" => Language::Ru,
                "en" => Language::En,
                "other" => Language::Other,
                _ => bail!("line {lineno}: unknown language tag {tag:?}"),
            };
            weights
                .entry(token.to_lowercase())
                .or_default()
                .push((language, weight));
        }
        Ok(Self { weights })
    }

    pub fn detect(&self, tokens: &[String]) -> Language {
        let mut scores: HashMap<Language, f64> = HashMap::new();
        for token in tokens {
            if let Some(entries) = self.weights.get(token) {
                for (language, weight) in entries {
                    *scores.entry(*language).or_default() += weight;
                }
            }
        }
        let mut best = Language::Undefined;
        let mut best_score = 0.0;
        for language in LANGUAGE_ORDER {
            let score = scores.get(&language).copied().unwrap_or(0.0);
            if score > best_score {
                best_score = score;
                best = language;
            }
        }
        best
    }
}

/// Weighted-lexicon category classifier, same file format with category tags
/// (including `not_news`). `any` is not a classifier output.
#[derive(Debug, Default)]
pub struct CategoryLexicon {
    weights: HashMap<String, Vec<(Category, f64)>>,
}

impl CategoryLexicon {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read category lexicon: {}", path.display()))?;
        let lexicon = Self::parse(&content)
            .with_context(|| format!("Failed to parse category lexicon: {}", path.display()))?;
        info!(tokens = lexicon.weights.len(), path = %path.display(), "Category lexicon loaded");
        Ok(lexicon)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut weights: HashMap<String, Vec<(Category, f64)>> = HashMap::new();
        for (lineno, line) in model_lines(content) {
            let (tag, token, weight) = split_record(line, lineno)?;
            let category = Category::from_tag(tag)
                .with_context(|| format!("line {lineno}: unknown category tag {tag:?}"))?;
            if category == Category::Any {
                bail!("line {lineno}: 'any' is not a valid classifier output");
            }
            weights
                .entry(token.to_lowercase())
                .or_default()
                .push((category, weight));
        }
        Ok(Self { weights })
    }

    pub fn classify(&self, tokens: &[String]) -> Category {
        let mut scores: HashMap<Category, f64> = HashMap::new();
        for token in tokens {
            if let Some(entries) = self.weights.get(token) {
                for (category, weight) in entries {
                    *scores.entry(*category).or_default() += weight;
                }
            }
        }
        let mut best = Category::Undefined;
        let mut best_score = 0.0;
        for category in Category::ELECTION_ORDER
            .into_iter()
            .chain([Category::NotNews])
        {
            let score = scores.get(&category).copied().unwrap_or(0.0);
            if score > best_score {
                best_score = score;
                best = category;
            }
        }
        best
    }
}

/// Non-empty, non-comment lines with 1-based line numbers.
fn model_lines<'a>(content: &'a str) -> impl Iterator<Item = (usize, &'a str)> + 'a {
    content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

fn split_record(line: &str, lineno: usize) -> Result<(&str, &str, f64)> {
    let mut parts = line.split_whitespace();
    let tag = parts
        .next()
        .with_context(|| format!("line {lineno}: missing tag"))?;
    let token = parts
        .next()
        .with_context(|| format!("line {lineno}: missing token"))?;
    let weight = match parts.next() {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("line {lineno}: bad weight {raw:?}"))?,
        None => 1.0,
    };
    Ok((tag, token, weight))
}
