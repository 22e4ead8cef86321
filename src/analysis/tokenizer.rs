use std::collections::HashMap;

pub trait Tokenizer: Send + Sync {
    /// Word → occurrence count for a text document.
    fn word_counts(&self, text: &str) -> HashMap<String, u32>;

    fn clone_box(&self) -> Box<dyn Tokenizer>;
}

/// Whitespace tokenizer that keeps only the alphanumeric characters of each
/// piece, so "world!" and "wor-ld" both count as "world".
#[derive(Debug, Clone)]
pub struct StandardTokenizer {
    pub lowercase: bool,
    pub max_token_length: usize,
}

impl Default for StandardTokenizer {
    fn default() -> Self {
        StandardTokenizer {
            lowercase: false,
            max_token_length: 255,
        }
    }
}

impl StandardTokenizer {
    pub fn tokens<'a>(&'a self, text: &'a str) -> impl Iterator<Item = String> + 'a {
        text.split_whitespace().filter_map(move |piece| {
            let word: String = piece.chars().filter(|c| c.is_alphanumeric()).collect();
            let word = if self.lowercase { word.to_lowercase() } else { word };

            if word.is_empty() || word.chars().count() > self.max_token_length {
                None
            } else {
                Some(word)
            }
        })
    }
}

impl Tokenizer for StandardTokenizer {
    fn word_counts(&self, text: &str) -> HashMap<String, u32> {
        let mut counts = HashMap::new();
        for word in self.tokens(text) {
            *counts.entry(word).or_insert(0) += 1;
        }
        counts
    }

    fn clone_box(&self) -> Box<dyn Tokenizer> {
        Box::new(self.clone())
    }
}

/// Strip everything but alphanumerics, the normalization applied to words
/// entering the word index.
pub fn normalize_word(word: &str) -> String {
    word.chars().filter(|c| c.is_alphanumeric()).collect()
}
