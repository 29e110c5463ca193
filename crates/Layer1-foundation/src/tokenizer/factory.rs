//! Tokenizer Factory - pick a tokenizer from a model id

use super::estimator::EstimateTokenizer;
use super::traits::Tokenizer;
use super::types::TokenizerType;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

static TOKENIZER_FACTORY: OnceLock<TokenizerFactory> = OnceLock::new();

/// Process-wide factory
pub fn factory() -> &'static TokenizerFactory {
    TOKENIZER_FACTORY.get_or_init(TokenizerFactory::new)
}

/// Creates and caches one tokenizer per family
#[derive(Default)]
pub struct TokenizerFactory {
    cache: RwLock<HashMap<TokenizerType, Arc<dyn Tokenizer>>>,
}

impl TokenizerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_model(&self, model_id: &str) -> Arc<dyn Tokenizer> {
        self.get(Self::tokenizer_type_for(model_id))
    }

    pub fn get(&self, tokenizer_type: TokenizerType) -> Arc<dyn Tokenizer> {
        if let Some(tokenizer) = self.cache.read().get(&tokenizer_type) {
            return Arc::clone(tokenizer);
        }
        let mut cache = self.cache.write();
        Arc::clone(
            cache
                .entry(tokenizer_type)
                .or_insert_with(|| Arc::new(EstimateTokenizer::new(tokenizer_type))),
        )
    }

    /// Infer the family from a model id
    pub fn tokenizer_type_for(model_id: &str) -> TokenizerType {
        let model = model_id.to_lowercase();

        if model.contains("gpt-4o") || model.contains("o1") || model.contains("o3") {
            TokenizerType::TiktokenO200k
        } else if model.contains("gpt") {
            TokenizerType::TiktokenCl100k
        } else if model.contains("claude") {
            TokenizerType::Claude
        } else if ["llama", "mistral", "mixtral", "qwen", "deepseek"]
            .iter()
            .any(|family| model.contains(family))
        {
            TokenizerType::Llama
        } else {
            TokenizerType::Estimate
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_inference() {
        assert_eq!(
            TokenizerFactory::tokenizer_type_for("gpt-4o-mini"),
            TokenizerType::TiktokenO200k
        );
        assert_eq!(
            TokenizerFactory::tokenizer_type_for("gpt-3.5-turbo"),
            TokenizerType::TiktokenCl100k
        );
        assert_eq!(
            TokenizerFactory::tokenizer_type_for("claude-sonnet"),
            TokenizerType::Claude
        );
        assert_eq!(
            TokenizerFactory::tokenizer_type_for("mock"),
            TokenizerType::Estimate
        );
    }

    #[test]
    fn test_tokenizers_are_cached() {
        let factory = TokenizerFactory::new();
        let a = factory.for_model("gpt-4o");
        let b = factory.get(TokenizerType::TiktokenO200k);
        assert!(Arc::ptr_eq(&a, &b));
    }
}
