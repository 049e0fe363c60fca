pub mod document;
pub mod error;
pub mod parser;
pub mod provider;
pub mod testing;

pub use document::{
    ConfigDocument, ConfigFormat, Revision, RuleConfig, RuleSetConfig, StageConfig,
    StageInputConfig,
};
pub use error::ConfigError;
pub use parser::ConfigParser;
pub use provider::ConfigProvider;
