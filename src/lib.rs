pub mod api;
pub mod app;
pub mod auth;
pub mod clock;
pub mod config;
pub mod errors;
pub mod format;
pub mod handlers;
pub mod models;
pub mod notifications;
pub mod record_store;
pub mod state;
pub mod stats;
pub mod storage;
pub mod ui;

pub use api::ApiClient;
pub use app::router;
pub use config::Config;
pub use state::AppState;
pub use storage::{FileStorage, KeyValueStore, MemoryStorage, resolve_data_path};
