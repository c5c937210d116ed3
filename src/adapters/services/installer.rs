//! Module installer service

use crate::adapters::target::TargetStore;
use crate::domain::{Result, TargetId, TargetRow};
use async_trait::async_trait;

/// Registers a provisioning module in the target system
#[async_trait]
pub trait ModuleInstaller: Send + Sync {
    /// Install `class` for `company_id`, returning the module id
    async fn install(&self, target: &dyn TargetStore, class: &str, company_id: i64)
        -> Result<TargetId>;
}

/// Writes the module registration row directly, reusing an existing one
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryInstaller;

#[async_trait]
impl ModuleInstaller for RegistryInstaller {
    async fn install(
        &self,
        target: &dyn TargetStore,
        class: &str,
        company_id: i64,
    ) -> Result<TargetId> {
        let key = TargetRow::new()
            .with("class", class)
            .with("company_id", company_id);

        if let Some(id) = target.select("modules", &key).await?.first().and_then(|m| m.id()) {
            tracing::debug!(class, module_id = %id, "Module already installed");
            return Ok(id);
        }

        let id = target
            .insert(
                "modules",
                &key.with("name", display_name(class)).with("version", "1.0.0"),
            )
            .await?;
        tracing::info!(class, module_id = %id, "Installed module");
        Ok(id)
    }
}

/// `universal_module` -> `Universal Module`
fn display_name(class: &str) -> String {
    class
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryTargetStore;

    #[tokio::test]
    async fn test_install_is_idempotent() {
        let store = MemoryTargetStore::new();
        let first = RegistryInstaller.install(&store, "cpanel", 1).await.unwrap();
        let second = RegistryInstaller.install(&store, "cpanel", 1).await.unwrap();
        assert_eq!(first, second);

        let modules = store.rows("modules");
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].text("name"), "Cpanel");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("universal_module"), "Universal Module");
        assert_eq!(display_name("none"), "None");
    }
}
