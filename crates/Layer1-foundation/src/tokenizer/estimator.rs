//! Character-ratio token estimator

use super::traits::Tokenizer;
use super::types::{TokenCount, TokenizerType};

/// Estimates tokens from character classes and the family's ratios
#[derive(Debug, Clone, Copy)]
pub struct EstimateTokenizer {
    tokenizer_type: TokenizerType,
}

impl EstimateTokenizer {
    pub fn new(tokenizer_type: TokenizerType) -> Self {
        Self { tokenizer_type }
    }

    #[inline]
    fn estimate_tokens(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }

        let mut ascii = 0u32;
        let mut cjk = 0u32;
        let mut other = 0u32;
        for c in text.chars() {
            if c.is_ascii() {
                ascii += 1;
            } else if is_cjk(c) {
                cjk += 1;
            } else {
                other += 1;
            }
        }

        let ascii_tokens = ascii as f32 / self.tokenizer_type.chars_per_token();
        let cjk_tokens = cjk as f32 / self.tokenizer_type.cjk_chars_per_token();
        let other_tokens = other as f32 / 2.0;

        (ascii_tokens + cjk_tokens + other_tokens).ceil() as usize
    }
}

impl Tokenizer for EstimateTokenizer {
    fn tokenizer_type(&self) -> TokenizerType {
        self.tokenizer_type
    }

    fn count(&self, text: &str) -> TokenCount {
        TokenCount::estimated(self.estimate_tokens(text), self.tokenizer_type)
            .with_char_count(text.chars().count())
    }
}

/// Hangul, CJK ideographs, kana
fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x1100..=0x11FF
        | 0x3040..=0x30FF
        | 0x3130..=0x318F
        | 0x4E00..=0x9FFF
        | 0xAC00..=0xD7AF)
}
