//! Feature activation lookup.
//!
//! The ledger owns feature state; the reward engine only reads it through
//! [`FeatureOracle`].

use crate::errors::{Result, RewardError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use waves_types::{Feature, FeatureId, FeatureStatus, Height};

/// Read-only view of feature activation state.
pub trait FeatureOracle {
    fn feature(&self, id: FeatureId) -> Option<&Feature>;

    fn activation_height(&self, id: FeatureId) -> Option<Height> {
        self.feature(id)
            .filter(|f| f.status == FeatureStatus::Activated)
            .and_then(|f| f.activation_height)
    }

    fn is_active_at_height(&self, id: FeatureId, height: Height) -> bool {
        self.feature(id).is_some_and(|f| f.is_active_at(height))
    }
}

/// A feature activation entry as it appears in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureActivation {
    pub id: u16,
    pub height: Height,
}

/// Feature state keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRegistry {
    features: BTreeMap<FeatureId, Feature>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_activations(activations: &[FeatureActivation]) -> Result<Self> {
        let mut registry = Self::new();
        for activation in activations {
            registry.activate(FeatureId(activation.id), activation.height)?;
        }
        Ok(registry)
    }

    /// Activate `id` at `height`. Activated features are immutable.
    pub fn activate(&mut self, id: FeatureId, height: Height) -> Result<()> {
        if let Some(existing) = self.activation_height(id) {
            if existing != height {
                return Err(RewardError::FeatureConflict {
                    id,
                    existing,
                    requested: height,
                });
            }
            return Ok(());
        }

        self.features.insert(id, Feature::activated(id, height));
        Ok(())
    }

    /// Record a pre-activation status (voting, approved).
    pub fn set_status(&mut self, id: FeatureId, status: FeatureStatus) -> Result<()> {
        if let Some(existing) = self.activation_height(id) {
            return Err(RewardError::FeatureConflict {
                id,
                existing,
                requested: existing,
            });
        }

        self.features
            .entry(id)
            .or_insert_with(|| Feature::new(id))
            .status = status;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.values()
    }
}

impl FeatureOracle for FeatureRegistry {
    fn feature(&self, id: FeatureId) -> Option<&Feature> {
        self.features.get(&id)
    }
}
