//! Tokenizer Module - per-model token counting
//!
//! Counts are character-ratio estimates tuned per tokenizer family. They
//! are used to keep delegated prompts under a token cap, where being off by
//! a few percent is fine.
//!
//! ```ignore
//! use crew_foundation::tokenizer::{factory, Tokenizer};
//!
//! let tokenizer = factory().for_model("gpt-4o-mini");
//! let count = tokenizer.count("Hello, world!");
//! let clipped = tokenizer.truncate("very long text...", 100);
//! ```

mod estimator;
mod factory;
mod traits;
mod types;

pub use estimator::EstimateTokenizer;
pub use factory::{factory, TokenizerFactory};
pub use traits::Tokenizer;
pub use types::{TokenCount, TokenizerType};
