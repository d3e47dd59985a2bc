pub mod bundling;
pub mod catalog;
pub mod classifier;
pub mod error;
pub mod evaluator;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod status_machine;
pub mod types;

pub use bundling::*;
pub use catalog::*;
pub use classifier::*;
pub use error::*;
pub use handlers::*;
pub use models::*;
pub use repository::*;
pub use service::*;
pub use status_machine::*;
pub use types::*;
