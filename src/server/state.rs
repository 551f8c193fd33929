use crate::chat::LlmClients;
use crate::coordinator::ConversionCoordinator;
use crate::queue::ConversionQueue;
use crate::status::StatusQuery;
use std::sync::Arc;

/// Everything a handler needs, built once in `main`.
pub struct AppState {
    pub queue: Arc<ConversionQueue>,
    pub status: StatusQuery,
    pub chat: Arc<LlmClients>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(queue: Arc<ConversionQueue>, chat: Arc<LlmClients>, max_upload_bytes: usize) -> Self {
        let status = StatusQuery::new(
            Arc::clone(queue.coordinator().catalog()),
            queue.in_flight(),
        );
        Self {
            queue,
            status,
            chat,
            max_upload_bytes,
        }
    }

    pub fn coordinator(&self) -> &Arc<ConversionCoordinator> {
        self.queue.coordinator()
    }
}
