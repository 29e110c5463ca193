//! Tokenizer trait

use super::types::{TokenCount, TokenizerType};

/// Token counter for one tokenizer family
pub trait Tokenizer: Send + Sync {
    fn tokenizer_type(&self) -> TokenizerType;

    fn count(&self, text: &str) -> TokenCount;

    /// Shorthand for `count(text).total`
    fn count_tokens(&self, text: &str) -> usize {
        self.count(text).total
    }

    /// Longest prefix of `text` that fits in `max_tokens`
    fn truncate(&self, text: &str, max_tokens: usize) -> String {
        if self.count_tokens(text) <= max_tokens {
            return text.to_string();
        }

        // binary search over char boundaries
        let chars: Vec<char> = text.chars().collect();
        let mut low = 0;
        let mut high = chars.len();

        while low < high {
            let mid = (low + high + 1) / 2;
            let prefix: String = chars[..mid].iter().collect();
            if self.count_tokens(&prefix) <= max_tokens {
                low = mid;
            } else {
                high = mid - 1;
            }
        }

        chars[..low].iter().collect()
    }

    fn exceeds_limit(&self, text: &str, max_tokens: usize) -> bool {
        self.count_tokens(text) > max_tokens
    }
}
