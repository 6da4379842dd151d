use crate::config::FeatureConfig;
use serde::{Deserialize, Serialize};

/// Bumped whenever tokenization output changes for the same settings.
pub const TOKENIZER_VERSION: u32 = 1;

/// Sorted for binary search.
const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been",
    "before", "but", "by", "can", "could", "do", "does", "for", "from", "had", "has", "have",
    "he", "her", "his", "how", "i", "if", "in", "into", "is", "it", "its", "just", "more",
    "most", "no", "not", "of", "on", "one", "only", "or", "other", "our", "out", "over", "she",
    "so", "some", "such", "than", "that", "the", "their", "them", "then", "there", "these",
    "they", "this", "to", "up", "was", "we", "were", "what", "when", "where", "which", "while",
    "who", "will", "with", "would", "you", "your",
];

/// Splits text on non-alphanumeric boundaries and lower-cases each token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tokenizer {
    min_token_len: usize,
    remove_stop_words: bool,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self {
            min_token_len: 1,
            remove_stop_words: false,
        }
    }
}

impl Tokenizer {
    pub fn new(config: &FeatureConfig) -> Self {
        Self {
            min_token_len: config.min_token_len.max(1),
            remove_stop_words: config.remove_stop_words,
        }
    }

    pub fn tokenize<'a>(&'a self, text: &'a str) -> impl Iterator<Item = String> + 'a {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|raw| !raw.is_empty())
            .map(|raw| raw.chars().flat_map(char::to_lowercase).collect::<String>())
            .filter(move |token| token.chars().count() >= self.min_token_len)
            .filter(move |token| !(self.remove_stop_words && is_stop_word(token)))
    }
}

pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.binary_search(&token).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(tokenizer: &Tokenizer, text: &str) -> Vec<String> {
        tokenizer.tokenize(text).collect()
    }

    #[test]
    fn splits_on_non_alphanumeric() {
        let tokenizer = Tokenizer::default();
        assert_eq!(
            tokens(&tokenizer, "Sci-Fi, SPACE travel!! (2009) Amélie"),
            vec!["sci", "fi", "space", "travel", "2009", "amélie"]
        );
        assert!(tokens(&tokenizer, " -- ,, ").is_empty());
    }

    #[test]
    fn respects_min_len_and_stop_words() {
        let config = FeatureConfig {
            min_token_len: 2,
            remove_stop_words: true,
            max_features: None,
        };
        let tokenizer = Tokenizer::new(&config);
        assert_eq!(
            tokens(&tokenizer, "A man and the sea x"),
            vec!["man", "sea"]
        );
    }

    #[test]
    fn stop_word_list_is_sorted() {
        assert!(STOP_WORDS.windows(2).all(|w| w[0] < w[1]));
    }
}
