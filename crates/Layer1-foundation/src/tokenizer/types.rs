//! Tokenizer types

use serde::{Deserialize, Serialize};

/// Tokenizer family
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerType {
    /// OpenAI cl100k_base (GPT-4, GPT-3.5)
    TiktokenCl100k,
    /// OpenAI o200k_base (GPT-4o, o1)
    TiktokenO200k,
    /// Anthropic models
    Claude,
    /// Llama / Mistral SentencePiece
    Llama,
    /// Plain character estimate
    #[default]
    Estimate,
}

impl TokenizerType {
    /// Average ASCII characters per token
    pub fn chars_per_token(&self) -> f32 {
        match self {
            Self::TiktokenCl100k | Self::TiktokenO200k => 4.0,
            Self::Claude => 3.5,
            Self::Llama => 3.8,
            Self::Estimate => 4.0,
        }
    }

    /// Average CJK characters per token
    pub fn cjk_chars_per_token(&self) -> f32 {
        match self {
            Self::TiktokenCl100k | Self::TiktokenO200k => 1.5,
            Self::Claude => 1.3,
            Self::Llama => 2.0,
            Self::Estimate => 1.5,
        }
    }
}

/// Token count for a piece of text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenCount {
    pub total: usize,
    /// false when the count is an estimate
    pub is_exact: bool,
    pub char_count: usize,
    pub tokenizer_type: TokenizerType,
}

impl TokenCount {
    pub fn estimated(total: usize, tokenizer_type: TokenizerType) -> Self {
        Self {
            total,
            is_exact: false,
            char_count: 0,
            tokenizer_type,
        }
    }

    pub fn with_char_count(mut self, count: usize) -> Self {
        self.char_count = count;
        self
    }
}
