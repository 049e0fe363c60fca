//! Engine facade for Tripwire.
//!
//! An [`Engine`] owns a node registry and the currently installed rule
//! graph. It loads revisions from a [`ConfigProvider`](tripwire_config::ConfigProvider),
//! swaps the graph on reload and executes rule sets against native inputs.

pub mod builder;
pub mod engine;
pub mod error;

pub use builder::EngineBuilder;
pub use engine::Engine;
pub use error::EngineError;
