//! # layerforge-core
//!
//! Foundation crate for the layerforge orchestration engine.
//! Defines the layer/dependency model, the closed error taxonomy, the
//! content-hash used for cache keys, and the engine's configuration type.
//! `layerforge-engine` depends on this crate; this crate has no knowledge
//! of tree-sitter, tokio, or moka.

pub mod config;
pub mod error;
pub mod hash;
pub mod layer;

pub use config::EngineConfig;
pub use error::{EngineError, EngineErrorCode};
pub use hash::{hash_code, CodeHash};
pub use error::{ErrorCategory, RecoveryStrategy, Severity};
pub use layer::{dependency_closure, LayerId, LayerSpec, Strategy, ALL_LAYERS};
