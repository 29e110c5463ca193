//! Tool System - the tools an agent may call
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │  ToolRegistry                              │
//! │  ├── register(tool)                        │
//! │  ├── get(name) / remove(name)              │
//! │  ├── select(names, cap) - curated subsets  │
//! │  └── schemas() - model-facing definitions  │
//! └────────────────────────────────────────────┘
//! ```

mod registry;

pub use registry::ToolRegistry;
