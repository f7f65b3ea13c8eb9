use scraper::{Html, Selector};

/// Fields pulled out of an article page.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPage {
    pub title: String,
    pub url: String,
    /// `article:published_time`, seconds since epoch. 0 when absent or
    /// unparseable.
    pub pub_time: u64,
    pub text: String,
}

/// Article page extractor. Selectors are compiled once and reused across
/// requests.
pub struct PageParser {
    og_title: Selector,
    og_url: Selector,
    published_time: Selector,
    title: Selector,
    h1: Selector,
    paragraph: Selector,
    body: Selector,
}

impl Default for PageParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PageParser {
    pub fn new() -> Self {
        Self {
            og_title: Selector::parse(r#"meta[property="og:title"]"#).expect("og:title selector"),
            og_url: Selector::parse(r#"meta[property="og:url"]"#).expect("og:url selector"),
            published_time: Selector::parse(r#"meta[property="article:published_time"]"#)
                .expect("published_time selector"),
            title: Selector::parse("title").expect("title selector"),
            h1: Selector::parse("h1").expect("h1 selector"),
            paragraph: Selector::parse("p").expect("p selector"),
            body: Selector::parse("body").expect("body selector"),
        }
    }

    /// Extract title, canonical URL, publication time and article text.
    /// Returns `None` when the page has no usable title.
    pub fn parse(&self, raw_html: &str) -> Option<ParsedPage> {
        let document = Html::parse_document(raw_html);

        let title = self
            .meta_content(&document, &self.og_title)
            .or_else(|| self.element_text(&document, &self.title))
            .or_else(|| self.element_text(&document, &self.h1))?;

        let url = self.meta_content(&document, &self.og_url).unwrap_or_default();

        let pub_time = self
            .meta_content(&document, &self.published_time)
            .and_then(|value| chrono::DateTime::parse_from_rfc3339(&value).ok())
            .map(|dt| dt.timestamp().max(0) as u64)
            .unwrap_or(0);

        // Paragraphs carry the article body; the whole <body> is a fallback
        // for pages without <p> markup.
        let mut text = document
            .select(&self.paragraph)
            .flat_map(|p| p.text())
            .collect::<Vec<_>>()
            .join(" ");
        if text.trim().is_empty() {
            text = document
                .select(&self.body)
                .flat_map(|b| b.text())
                .collect::<Vec<_>>()
                .join(" ");
        }
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");

        Some(ParsedPage {
            title,
            url,
            pub_time,
            text,
        })
    }

    fn meta_content(&self, document: &Html, selector: &Selector) -> Option<String> {
        document
            .select(selector)
            .next()
            .and_then(|el| el.value().attr("content"))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn element_text(&self, document: &Html, selector: &Selector) -> Option<String> {
        document
            .select(selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty())
    }
}
