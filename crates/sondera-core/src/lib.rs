pub mod config;
pub mod error;
pub mod policy;
pub mod traits;
pub mod types;

pub use config::{AppConfig, ModelConfig, RunOverrides};
pub use error::{Result, SonderaError};
pub use policy::PolicyStore;
pub use types::*;
