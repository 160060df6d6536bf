use std::sync::Arc;

use libpostdeck::PostdeckService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PostdeckService>,
}

impl AppState {
    pub fn new(service: PostdeckService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}
