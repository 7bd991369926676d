//! Client modules for external API interactions

pub mod llm_client;
pub mod store;
pub mod supabase_client;

pub use llm_client::{ChatModel, LlmClient};
pub use store::{Query, Store};
pub use supabase_client::SupabaseClient;
