use std::sync::Arc;

use practice_portal::api::{AppState, handler};

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    practice_portal::setup_logging();
    let state = Arc::new(AppState::from_env()?);
    lambda_runtime::run(lambda_runtime::service_fn(|event| {
        let state = Arc::clone(&state);
        async move { handler(&state, event).await }
    }))
    .await
}
