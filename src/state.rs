use crate::api::ApiClient;
use crate::clock::Clock;
use crate::models::Toast;
use crate::storage::KeyValueStore;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct AppData {
    pub storage: Box<dyn KeyValueStore>,
    /// Shown and cleared by the next dashboard render.
    pub toast: Option<Toast>,
}

#[derive(Clone)]
pub struct AppState {
    pub data: Arc<Mutex<AppData>>,
    pub clock: Arc<dyn Clock>,
    pub api: Option<ApiClient>,
}

impl AppState {
    pub fn new(storage: Box<dyn KeyValueStore>, clock: Arc<dyn Clock>, api: Option<ApiClient>) -> Self {
        Self {
            data: Arc::new(Mutex::new(AppData {
                storage,
                toast: None,
            })),
            clock,
            api,
        }
    }
}
