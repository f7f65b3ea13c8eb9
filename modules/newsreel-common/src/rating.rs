use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

/// Default rating for hosts absent from the table.
const DEFAULT_RATING: f64 = 1.0;

/// Per-host agency weight table, loaded from a plain-text file with one
/// `<host> <rating>` record per line. Used for title election and feed
/// ranking.
#[derive(Debug, Default)]
pub struct AgencyRating {
    ratings: HashMap<String, f64>,
}

impl AgencyRating {
    /// Load a rating table from disk. Blank lines and `#` comments are
    /// skipped; a malformed record is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rating file: {}", path.display()))?;
        let rating = Self::parse(&content)
            .with_context(|| format!("Failed to parse rating file: {}", path.display()))?;
        info!(hosts = rating.ratings.len(), path = %path.display(), "Agency ratings loaded");
        Ok(rating)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut ratings = HashMap::new();
        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            let host = parts
                .next()
                .with_context(|| format!("line {}: missing host", lineno + 1))?;
            let value: f64 = parts
                .next()
                .with_context(|| format!("line {}: missing rating for {host}", lineno + 1))?
                .parse()
                .with_context(|| format!("line {}: bad rating for {host}", lineno + 1))?;
            ratings.insert(host.to_lowercase(), value);
        }
        Ok(Self { ratings })
    }

    pub fn get(&self, host: &str) -> f64 {
        self.ratings.get(host).copied().unwrap_or(DEFAULT_RATING)
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_records_and_skips_comments() {
        let rating = AgencyRating::parse(
            "# pagerank-derived\n\
             lenta.ru 3.5\n\
             \n\
             News.Example.com 0.25\n",
        )
        .unwrap();
        assert_eq!(rating.len(), 2);
        assert!((rating.get("lenta.ru") - 3.5).abs() < f64::EPSILON);
        assert!((rating.get("news.example.com") - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_host_defaults_to_one() {
        let rating = AgencyRating::parse("lenta.ru 3.5").unwrap();
        assert!((rating.get("nosuch.example") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn malformed_record_is_an_error() {
        assert!(AgencyRating::parse("lenta.ru notanumber").is_err());
        assert!(AgencyRating::parse("onlyhost").is_err());
    }
}
