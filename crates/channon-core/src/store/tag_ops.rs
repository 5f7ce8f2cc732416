//! Tag registry operations for the PlanStore.

use log::{debug, info, warn};

use super::{PlanStore, Shared};
use crate::{
    error::{ChannonError, Result},
    models::Tag,
};

impl Shared {
    pub(crate) fn add_tag(&self, tag: Tag) -> Result<bool> {
        if tag.as_str().is_empty() {
            return Err(ChannonError::invalid_input("tag").with_reason("must not be empty"));
        }
        let mut registry = self.registry()?;
        let added = registry.tags.insert(tag);
        Ok(added)
    }

    pub(crate) fn delete_tag(&self, tag: &Tag) -> Result<()> {
        let mut registry = self.registry()?;

        if !registry.tags.remove(tag) {
            debug!("Tag {tag} was not registered");
        }

        for entry in registry.plans.values_mut() {
            if entry.plan.tags.remove(tag) {
                info!("Removed tag {tag} from plan {}", entry.plan.name);
                if let Err(e) = self.disk.save_plan(&entry.plan) {
                    warn!("Cannot save plan {} after removing tag {tag}: {e}", entry.plan.name);
                }
            }
        }
        Ok(())
    }

    pub(crate) fn list_tags(&self) -> Result<Vec<Tag>> {
        let registry = self.registry()?;
        Ok(registry.tags.iter().cloned().collect())
    }
}

impl PlanStore {
    /// Adds a tag to the registry. Returns `false` if it was already there.
    pub async fn add_tag(&self, tag: impl Into<Tag>) -> Result<bool> {
        let tag = tag.into();
        self.with_shared(move |shared| shared.add_tag(tag)).await
    }

    /// Removes a tag from the registry and from every plan carrying it.
    ///
    /// Deleting a tag that was never registered is a no-op.
    pub async fn delete_tag(&self, tag: impl Into<Tag>) -> Result<()> {
        let tag = tag.into();
        self.with_shared(move |shared| shared.delete_tag(&tag)).await
    }

    /// Lists registered tags in order.
    pub async fn list_tags(&self) -> Result<Vec<Tag>> {
        self.with_shared(|shared| shared.list_tags()).await
    }
}
