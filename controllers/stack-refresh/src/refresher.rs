//! Stack catalog refresh orchestration.
//!
//! Makes the remote catalog match the desired set: delete everything the
//! catalog currently has, fetch the replacement definitions from the
//! source URL, strip the agents list the target server cannot ingest, and
//! re-create each entry. Per-item HTTP failures are logged and skipped;
//! only list/fetch failures abort (those are retried by the controller).
//! There is no rollback; partial application is accepted and log-visible.

use catalog_client::{CatalogError, StackCatalogApi};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Nested field stripped from every stack definition before re-upload.
/// The agents list under the default dev-machine is not compatible with
/// the target server and is regenerated there.
pub const AGENTS_PATH: [&str; 6] = [
    "workspaceConfig",
    "environments",
    "default",
    "machines",
    "dev-machine",
    "agents",
];

/// Remove the value at `path` from a JSON object tree.
///
/// Walks object keys only; returns true if a value was removed. Arrays or
/// scalars along the way simply mean the path does not apply. Siblings of
/// the removed field are left untouched.
pub fn remove_json_path(value: &mut Value, path: &[&str]) -> bool {
    let Some((leaf, parents)) = path.split_last() else {
        return false;
    };

    let mut current = value;
    for segment in parents {
        match current.get_mut(segment) {
            Some(next) => current = next,
            None => return false,
        }
    }

    match current.as_object_mut() {
        Some(map) => map.remove(*leaf).is_some(),
        None => false,
    }
}

/// Replaces the catalog's stack set with the one served by the source URL.
pub struct StackRefresher {
    catalog: Arc<dyn StackCatalogApi>,
}

impl StackRefresher {
    /// Create a refresher backed by the given catalog client.
    pub fn new(catalog: Arc<dyn StackCatalogApi>) -> Self {
        Self { catalog }
    }

    /// Run one full refresh against `endpoint`, sourcing definitions from
    /// `source_url`.
    pub async fn refresh(&self, endpoint: &str, source_url: &str) -> Result<(), CatalogError> {
        info!("Refreshing stacks, catalog endpoint: {}", endpoint);

        let existing = self.catalog.list_stacks(endpoint).await?;
        let old_count = existing.len();

        if old_count == 0 {
            info!("No old stacks exist");
        } else {
            info!("{} old stacks will be deleted", old_count);
        }

        for stack in &existing {
            match self.catalog.delete_stack(endpoint, &stack.id).await {
                Ok(204) => info!("Deleted old stack: {}", stack.name),
                Ok(status) => warn!(
                    "Unexpected status {} deleting stack {} ({})",
                    status, stack.name, stack.id
                ),
                Err(e) => error!("Failed to delete stack {} ({}): {}", stack.name, stack.id, e),
            }
        }

        let remaining = self.catalog.list_stacks(endpoint).await?;
        if old_count > 0 && remaining.len() == old_count {
            warn!("Old stacks still exist after the delete pass");
        }

        let new_stacks = self.catalog.fetch_source_stacks(source_url).await?;
        info!("Fetched {} stacks from {}", new_stacks.len(), source_url);

        for mut stack in new_stacks {
            remove_json_path(&mut stack, &AGENTS_PATH);

            let name = stack
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("<unnamed>")
                .to_string();

            match self.catalog.create_stack(endpoint, &stack).await {
                Ok(201) => info!("Successfully added new stack: {}", name),
                Ok(status) => warn!("Unexpected status {} creating stack {}", status, name),
                Err(e) => error!("Failed to create stack {}: {}", name, e),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_client::MockCatalog;
    use serde_json::json;

    fn source_stack(name: &str) -> Value {
        json!({
            "name": name,
            "scope": "general",
            "workspaceConfig": {
                "defaultEnv": "default",
                "environments": {
                    "default": {
                        "machines": {
                            "dev-machine": {
                                "agents": ["org.eclipse.che.ws-agent"],
                                "attributes": { "memoryLimitBytes": "2147483648" }
                            }
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn test_remove_json_path_strips_agents_only() {
        let mut stack = source_stack("java");
        assert!(remove_json_path(&mut stack, &AGENTS_PATH));

        let machine = &stack["workspaceConfig"]["environments"]["default"]["machines"]["dev-machine"];
        assert!(machine.get("agents").is_none());
        // Siblings preserved
        assert_eq!(
            machine["attributes"]["memoryLimitBytes"],
            json!("2147483648")
        );
        assert_eq!(stack["name"], json!("java"));
        assert_eq!(stack["workspaceConfig"]["defaultEnv"], json!("default"));
    }

    #[test]
    fn test_remove_json_path_absent_is_noop() {
        let mut stack = json!({ "name": "bare", "workspaceConfig": {} });
        assert!(!remove_json_path(&mut stack, &AGENTS_PATH));
        assert_eq!(stack, json!({ "name": "bare", "workspaceConfig": {} }));
    }

    #[tokio::test]
    async fn test_refresh_deletes_all_then_creates_stripped() {
        let catalog = MockCatalog::new();
        catalog.add_stack("1", "java");
        catalog.add_stack("2", "python");
        catalog.set_source_stacks(vec![source_stack("java-new")]);

        let refresher = StackRefresher::new(Arc::new(catalog.clone()));
        refresher
            .refresh("http://localhost:8080", "http://source/stacks.json")
            .await
            .unwrap();

        assert_eq!(catalog.deleted_ids(), vec!["1", "2"]);

        let created = catalog.created_stacks();
        assert_eq!(created.len(), 1);
        let machine =
            &created[0]["workspaceConfig"]["environments"]["default"]["machines"]["dev-machine"];
        assert!(machine.get("agents").is_none());
        assert_eq!(created[0]["name"], json!("java-new"));
    }

    #[tokio::test]
    async fn test_refresh_attempts_every_delete_despite_errors() {
        let catalog = MockCatalog::new();
        catalog.add_stack("1", "java");
        catalog.add_stack("2", "python");
        catalog.add_stack("3", "node");
        catalog.fail_delete("2");
        catalog.set_source_stacks(Vec::new());

        let refresher = StackRefresher::new(Arc::new(catalog.clone()));
        refresher
            .refresh("http://localhost:8080", "http://source/stacks.json")
            .await
            .unwrap();

        // All three attempted, even though the middle one errored
        assert_eq!(catalog.deleted_ids(), vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_refresh_empty_catalog_and_empty_source() {
        let catalog = MockCatalog::new();
        catalog.set_source_stacks(Vec::new());

        let refresher = StackRefresher::new(Arc::new(catalog.clone()));
        refresher
            .refresh("http://localhost:8080", "http://source/stacks.json")
            .await
            .unwrap();

        assert!(catalog.deleted_ids().is_empty());
        assert!(catalog.created_stacks().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_proceeds_when_deletes_stick() {
        let catalog = MockCatalog::new();
        catalog.add_stack("1", "java");
        catalog.make_sticky("1");
        catalog.set_source_stacks(vec![source_stack("fresh")]);

        let refresher = StackRefresher::new(Arc::new(catalog.clone()));
        refresher
            .refresh("http://localhost:8080", "http://source/stacks.json")
            .await
            .unwrap();

        // Warned but still created the replacement set
        assert_eq!(catalog.created_stacks().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_propagates_list_failure() {
        let catalog = MockCatalog::new();
        catalog.fail_list();

        let refresher = StackRefresher::new(Arc::new(catalog.clone()));
        let result = refresher
            .refresh("http://localhost:8080", "http://source/stacks.json")
            .await;

        assert!(result.is_err());
        assert!(catalog.created_stacks().is_empty());
    }
}
