mod coordinator_tests;
mod evaluator_tests;
mod repository_tests;

use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[ctor::ctor]
fn init_tests() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// One selection per item.
pub fn selections(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
