use channon_core::{PlanStore, PlanStoreBuilder};
use tempfile::TempDir;

/// Helper function to create a store rooted in a fresh temp dir
pub async fn create_test_store() -> (TempDir, PlanStore) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = PlanStoreBuilder::new()
        .with_root(Some(temp_dir.path().join("plans")))
        .build()
        .await
        .expect("Failed to create store");
    (temp_dir, store)
}
