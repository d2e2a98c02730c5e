use regex::Regex;
use std::collections::HashMap;

lazy_static::lazy_static! {
    // Everything that is not a word character, whitespace or the rupee sign.
    static ref STRIP: Regex = Regex::new(r"[^\w\s₹]").expect("valid regex");
}

/// Tokens this short or shorter carry no signal in product titles.
const MIN_TOKEN_CHARS: usize = 3;

/// Text analyzer shared by indexing and querying.
///
/// The pipeline is lowercase → strip punctuation → split on whitespace →
/// drop short tokens. No stemming and no stopwords, so a term in the index is
/// always a literal lowercase substring of the source text.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tokenizer;

impl Tokenizer {
    pub fn new() -> Self {
        Self
    }

    /// Lowercase and remove punctuation, keeping `₹`.
    fn normalize(&self, text: &str) -> String {
        STRIP.replace_all(&text.to_lowercase(), "").into_owned()
    }

    /// Full analysis pipeline, order preserving.
    pub fn analyze(&self, text: &str) -> Vec<String> {
        self.normalize(text)
            .split_whitespace()
            .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS)
            .map(str::to_string)
            .collect()
    }

    /// Analyze and count term frequencies
    pub fn analyze_with_frequencies(&self, text: &str) -> HashMap<String, usize> {
        let mut frequencies = HashMap::new();
        for token in self.analyze(text) {
            *frequencies.entry(token).or_insert(0) += 1;
        }
        frequencies
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze() {
        let tokenizer = Tokenizer::new();
        let tokens = tokenizer.analyze("Wireless Headphones, with Mic!");
        assert_eq!(tokens, vec!["wireless", "headphones", "with", "mic"]);
    }

    #[test]
    fn test_short_tokens_dropped() {
        let tokenizer = Tokenizer::new();
        assert_eq!(tokenizer.analyze("a to TV set"), vec!["set"]);
        assert!(tokenizer.analyze("   ").is_empty());
        assert!(tokenizer.analyze("").is_empty());
    }

    #[test]
    fn test_punctuation_inside_words_is_removed() {
        let tokenizer = Tokenizer::new();
        assert_eq!(tokenizer.analyze("t-shirt men's"), vec!["tshirt", "mens"]);
    }

    #[test]
    fn test_rupee_sign_kept() {
        let tokenizer = Tokenizer::new();
        assert_eq!(tokenizer.analyze("under ₹2,000"), vec!["under", "₹2000"]);
    }

    #[test]
    fn test_frequencies() {
        let tokenizer = Tokenizer::new();
        let freqs = tokenizer.analyze_with_frequencies("red shoes, RED laces");
        assert_eq!(freqs.get("red"), Some(&2));
        assert_eq!(freqs.get("shoes"), Some(&1));
        assert_eq!(freqs.len(), 3);
    }

    #[test]
    fn test_deterministic() {
        let tokenizer = Tokenizer::new();
        let text = "Noise Cancelling Bluetooth Headphones";
        assert_eq!(tokenizer.analyze(text), tokenizer.analyze(text));
    }
}
