//! HTTP surface (feature `server`).
//!
//! | Route | Handler |
//! |-------|---------|
//! | `GET /api/` | health check |
//! | `POST /api/convert`, `POST /api/convert-pdf-to-image/` | upload, dedup, schedule |
//! | `GET /api/task/{id}/status` | poll a conversion |
//! | `GET /api/task/{id}/pages` | stored page array of a completed conversion |
//! | `POST /api/chat-with-llm/` | single-turn LLM chat |

pub mod error;
pub mod handlers;
mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
