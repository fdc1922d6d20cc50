//! Wardrobe persistence abstraction
//!
//! Equipping is a full replacement: the items delivered with an acknowledged
//! job become the pet's entire outfit, and anything previously equipped but
//! absent from the delivery is unequipped. The store behind this trait is
//! expected to apply that replacement atomically.

use crate::{
    error::{PawdrobeError, Result},
    types::{AssetBundle, ItemDescriptor},
};
use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Trait for wardrobe stores
#[async_trait]
pub trait WardrobeStore: Send + Sync {
    /// Replace the pet's equipped outfit with exactly these items.
    ///
    /// `assets` carries the content-addressed references to the finished
    /// frames rendered for this outfit, so the store can record which sprites
    /// to display alongside the item list.
    ///
    /// # Errors
    /// - Storage failures; callers treat the replacement as not applied
    async fn replace_equipped(
        &self,
        pet_id: &str,
        items: &[ItemDescriptor],
        assets: &AssetBundle,
    ) -> Result<()>;

    /// Items currently equipped on a pet; empty when nothing is equipped
    async fn equipped(&self, pet_id: &str) -> Result<Vec<ItemDescriptor>>;
}

/// In-memory wardrobe store
///
/// Backs tests and the CLI. Clones share state, matching how a single store
/// handle is passed around a running queue.
#[derive(Debug, Clone)]
pub struct MemoryWardrobe {
    outfits: Arc<Mutex<HashMap<String, Vec<ItemDescriptor>>>>,
    assets: Arc<Mutex<HashMap<String, AssetBundle>>>,
    /// Call history for verification in tests
    call_history: Arc<Mutex<Vec<String>>>,
    /// Whether to simulate storage failures on replacement
    should_fail_replacements: bool,
}

impl MemoryWardrobe {
    /// Create an empty in-memory wardrobe
    #[must_use]
    pub fn new() -> Self {
        Self {
            outfits: Arc::new(Mutex::new(HashMap::new())),
            assets: Arc::new(Mutex::new(HashMap::new())),
            call_history: Arc::new(Mutex::new(Vec::new())),
            should_fail_replacements: false,
        }
    }

    /// Create a wardrobe whose replacements always fail
    #[must_use]
    pub fn new_failing() -> Self {
        let mut wardrobe = Self::new();
        wardrobe.should_fail_replacements = true;
        wardrobe
    }

    /// Get the call history for verification in tests
    pub fn get_call_history(&self) -> Vec<String> {
        self.call_history.lock().unwrap().clone()
    }

    /// Asset references delivered with the pet's current outfit
    pub fn equipped_assets(&self, pet_id: &str) -> Option<AssetBundle> {
        self.assets.lock().unwrap().get(pet_id).cloned()
    }

    fn record_call(&self, entry: String) {
        if let Ok(mut history) = self.call_history.lock() {
            history.push(entry);
        }
    }
}

impl Default for MemoryWardrobe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WardrobeStore for MemoryWardrobe {
    async fn replace_equipped(
        &self,
        pet_id: &str,
        items: &[ItemDescriptor],
        assets: &AssetBundle,
    ) -> Result<()> {
        self.record_call(format!(
            "replace_equipped {pet_id} ({} items, {} assets)",
            items.len(),
            assets.len()
        ));

        if self.should_fail_replacements {
            return Err(PawdrobeError::storage(
                "wardrobe store configured to fail replacements",
            ));
        }

        let mut outfits = self
            .outfits
            .lock()
            .map_err(|_| PawdrobeError::storage("wardrobe state poisoned"))?;
        let mut stored_assets = self
            .assets
            .lock()
            .map_err(|_| PawdrobeError::storage("wardrobe state poisoned"))?;
        outfits.insert(pet_id.to_string(), items.to_vec());
        stored_assets.insert(pet_id.to_string(), assets.clone());
        debug!("Equipped {} items on pet '{pet_id}'", items.len());
        Ok(())
    }

    async fn equipped(&self, pet_id: &str) -> Result<Vec<ItemDescriptor>> {
        let outfits = self
            .outfits
            .lock()
            .map_err(|_| PawdrobeError::storage("wardrobe state poisoned"))?;
        Ok(outfits.get(pet_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AssetRef, FrameKind};

    fn hat() -> ItemDescriptor {
        ItemDescriptor::new("hat1", "hat", "items/hat1.png", "Top Hat")
    }

    fn scarf() -> ItemDescriptor {
        ItemDescriptor::new("scarf1", "neck", "items/scarf1.png", "Wool Scarf")
    }

    fn bundle() -> AssetBundle {
        AssetBundle {
            assets: vec![AssetRef {
                kind: FrameKind::Normal,
                asset_id: "a".repeat(64),
                width: 16,
                height: 16,
            }],
        }
    }

    #[tokio::test]
    async fn test_replacement_is_not_a_merge() {
        let wardrobe = MemoryWardrobe::new();

        wardrobe
            .replace_equipped("pet-1", &[hat(), scarf()], &bundle())
            .await
            .unwrap();
        assert_eq!(wardrobe.equipped("pet-1").await.unwrap().len(), 2);

        // Equipping just the scarf drops the hat
        wardrobe
            .replace_equipped("pet-1", &[scarf()], &bundle())
            .await
            .unwrap();
        let equipped = wardrobe.equipped("pet-1").await.unwrap();
        assert_eq!(equipped, vec![scarf()]);
    }

    #[tokio::test]
    async fn test_assets_are_recorded_with_the_outfit() {
        let wardrobe = MemoryWardrobe::new();
        wardrobe
            .replace_equipped("pet-1", &[hat()], &bundle())
            .await
            .unwrap();

        let stored = wardrobe.equipped_assets("pet-1").unwrap();
        assert_eq!(stored, bundle());
        assert!(wardrobe.equipped_assets("nobody").is_none());
    }

    #[tokio::test]
    async fn test_unknown_pet_has_empty_outfit() {
        let wardrobe = MemoryWardrobe::new();
        assert!(wardrobe.equipped("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failing_store_leaves_state_unchanged() {
        let wardrobe = MemoryWardrobe::new_failing();
        let result = wardrobe
            .replace_equipped("pet-1", &[hat()], &bundle())
            .await;

        assert!(matches!(result, Err(PawdrobeError::Storage(_))));
        assert!(wardrobe.equipped("pet-1").await.unwrap().is_empty());
        assert_eq!(wardrobe.get_call_history().len(), 1);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let wardrobe = MemoryWardrobe::new();
        let clone = wardrobe.clone();

        wardrobe
            .replace_equipped("pet-1", &[hat()], &bundle())
            .await
            .unwrap();
        assert_eq!(clone.equipped("pet-1").await.unwrap().len(), 1);
    }
}
