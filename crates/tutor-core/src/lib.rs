pub mod config;
pub mod gateway;
pub mod state;
pub mod store;

// Re-export main types for convenience
pub use config::Config;
pub use gateway::{CompletionGateway, GatewayError, HealthStatus, HttpGateway};
pub use state::{ChatMessage, ChatRole, ConversationState, StaleReplyPolicy};
pub use store::{ConversationStore, SessionConfig};
