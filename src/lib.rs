pub mod adapters;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod keys;
pub mod logging;
pub mod models;
pub mod providers;
pub mod server;
pub mod suggestions;

pub use config::ProxyConfig;
pub use dispatch::{analyze, AnalyzeRequest};
pub use error::{ProxyError, Result};
pub use logging::SharedLogger;
pub use server::{build_router, AppState};
