//! # crew-foundation
//!
//! Foundation layer for Crew:
//! - Error: one `Error` enum for the workspace
//! - Config: `CrewSettings` (defaults, `crew.toml`, `CREW_*` env)
//! - Storage: `SharedStore` with memory and file backends
//! - Core: `Tool` / `ToolContext` traits, chat and usage types
//! - Tokenizer: per-model token estimates
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │  Team (Layer2-task)                        │
//! │   ├── shared memory ──► SharedStore        │
//! │   ├── context builder ─► Tokenizer         │
//! │   └── delegation tools ─► Tool trait       │
//! └────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod storage;
pub mod tokenizer;

// ============================================================================
// Error
// ============================================================================
pub use error::{display_duration, Error, Result};

// ============================================================================
// Core
// ============================================================================
pub use crate::core::{
    ChatMessage, ChatRole, TokenUsage, Tool, ToolContext, ToolExecutionContext, ToolMeta,
    ToolResult,
};

// ============================================================================
// Config
// ============================================================================
pub use config::{
    default_store_path, ContextSettings, CrewSettings, StoreKind, StoreSettings,
    CREW_CONFIG_FILE, DEFAULT_DELEGATION_TIMEOUT,
};

// ============================================================================
// Storage
// ============================================================================
pub use storage::{spawn_gc, store_from_settings, FileStore, MemoryStore, SharedStore};

// ============================================================================
// Tokenizer
// ============================================================================
pub use tokenizer::{EstimateTokenizer, TokenCount, Tokenizer, TokenizerFactory, TokenizerType};
