use std::collections::HashMap;

use anyhow::{Context, Result};
use tracing::{debug, info};

use newsreel_common::{
    config::AnnotatorConfig, host_of, Category, Document, EmbeddingKey, Language,
};

use crate::embedder::WordVecEmbedder;
use crate::html::PageParser;
use crate::lexicon::{CategoryLexicon, LanguageLexicon};
use crate::text::tokenize;

/// Per-language classifier and embedder pair.
struct LanguageModel {
    categories: CategoryLexicon,
    embedder: WordVecEmbedder,
}

/// HTML → annotated document. Pure with respect to its inputs and the
/// models loaded at startup; returns `None` when the document should be
/// skipped (no usable page, too little text, non-target language, or
/// not-news when the deployment does not keep those).
pub struct Annotator {
    parser: PageParser,
    languages: LanguageLexicon,
    models: HashMap<Language, LanguageModel>,
    min_text_length: usize,
    save_not_news: bool,
}

impl Annotator {
    /// Load all model files named by the config.
    pub fn from_config(config: &AnnotatorConfig) -> Result<Self> {
        let languages = LanguageLexicon::load(&config.language_lexicon)?;

        let mut models = HashMap::new();
        for (language, paths) in &config.models {
            let categories = CategoryLexicon::load(&paths.category_lexicon)
                .with_context(|| format!("category model for {language}"))?;
            let embedder = WordVecEmbedder::load(&paths.word_vectors)
                .with_context(|| format!("word vectors for {language}"))?;
            models.insert(
                *language,
                LanguageModel {
                    categories,
                    embedder,
                },
            );
        }
        info!(languages = models.len(), "Annotator models loaded");

        Ok(Self {
            parser: PageParser::new(),
            languages,
            models,
            min_text_length: config.min_text_length,
            save_not_news: config.save_not_news,
        })
    }

    #[cfg(test)]
    pub(crate) fn for_tests(
        languages: LanguageLexicon,
        models: Vec<(Language, CategoryLexicon, WordVecEmbedder)>,
        min_text_length: usize,
        save_not_news: bool,
    ) -> Self {
        Self {
            parser: PageParser::new(),
            languages,
            models: models
                .into_iter()
                .map(|(language, categories, embedder)| {
                    (
                        language,
                        LanguageModel {
                            categories,
                            embedder,
                        },
                    )
                })
                .collect(),
            min_text_length,
            save_not_news,
        }
    }

    /// Annotate a raw HTML article. `fetch_time` and `ttl_secs` are left at
    /// zero; the ingest path stamps them before storing.
    pub fn annotate(&self, raw_html: &str, file_id: &str) -> Option<Document> {
        let page = self.parser.parse(raw_html)?;

        if page.text.chars().count() < self.min_text_length {
            debug!(file_id, "Skipping: text below minimum length");
            return None;
        }

        let tokens = tokenize(&format!("{} {}", page.title, page.text));

        let language = self.languages.detect(&tokens);
        let Some(model) = self.models.get(&language) else {
            debug!(file_id, language = %language, "Skipping: non-target language");
            return None;
        };

        let category = model.categories.classify(&tokens);
        let is_news = category != Category::NotNews && category != Category::Undefined;
        if !is_news && !self.save_not_news {
            debug!(file_id, category = %category, "Skipping: not news");
            return None;
        }

        let embedding = model.embedder.embed(&tokens);

        Some(Document {
            file_id: file_id.to_string(),
            host: host_of(&page.url),
            url: page.url,
            title: page.title,
            pub_time: page.pub_time,
            fetch_time: 0,
            ttl_secs: 0,
            language,
            category,
            embeddings: HashMap::from([(EmbeddingKey::Sentence, embedding)]),
        })
    }
}
