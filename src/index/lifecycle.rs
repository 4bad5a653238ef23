use log::{ debug, error, info };
use std::collections::HashMap;
use std::sync::atomic::{ AtomicBool, Ordering };
use std::sync::Arc;

use super::{ CreateIndexOutcome, IndexAdmin };
use crate::error::{ Error, Result };
use crate::resources;
use crate::schema::{ self, IndexDescriptor };

/// Creates managed indices on first use and upgrades their mappings when the
/// bundled schema version moves ahead of the stored one.
///
/// One flag per catalog entry records that the mapping was confirmed current.
/// A set flag answers without touching the cluster. The flags only skip
/// redundant work; two concurrent first calls may both check the version,
/// which is harmless because put-mapping is idempotent, and a lost create
/// race falls back to the version check.
pub struct IndexLifecycleManager {
    admin: Arc<dyn IndexAdmin>,
    mapping_current: HashMap<&'static str, AtomicBool>,
}

impl IndexLifecycleManager {
    pub fn new(admin: Arc<dyn IndexAdmin>) -> Self {
        Self::with_catalog(admin, schema::CATALOG)
    }

    pub fn with_catalog(admin: Arc<dyn IndexAdmin>, catalog: &[IndexDescriptor]) -> Self {
        let mapping_current = catalog
            .iter()
            .map(|d| (d.index_name, AtomicBool::new(false)))
            .collect();
        Self { admin, mapping_current }
    }

    pub fn is_mapping_current(&self, index_name: &str) -> bool {
        self.mapping_current.get(index_name).is_some_and(|flag| flag.load(Ordering::Acquire))
    }

    /// Makes sure `descriptor`'s index exists with a mapping at least at its
    /// schema version. Returns whether the cluster acknowledged every change made.
    pub async fn ensure_index(&self, descriptor: &IndexDescriptor) -> Result<bool> {
        let index = descriptor.index_name;
        let flag = self.mapping_current
            .get(index)
            .ok_or_else(|| Error::Configuration(format!("index '{}' is not managed", index)))?;

        if flag.load(Ordering::Acquire) {
            debug!("Mapping for '{}' already confirmed current", index);
            return Ok(true);
        }

        if !self.admin.index_exists(index).await? {
            if let Some(acknowledged) = self.create(descriptor, flag).await? {
                return Ok(acknowledged);
            }
        }

        let stored = match self.admin.get_mapping(index).await? {
            Some(mapping) => schema::stored_schema_version(&mapping),
            None => None,
        };

        if stored >= Some(descriptor.schema_version) {
            debug!(
                "Index '{}' at schema version {:?}, catalog version {}",
                index,
                stored,
                descriptor.schema_version
            );
            let _ = flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire);
            return Ok(true);
        }

        info!(
            "Upgrading mapping of '{}' from schema version {:?} to {}",
            index,
            stored,
            descriptor.schema_version
        );
        let mapping = resources::load(descriptor.mapping_template)?;
        // Flag stays unset: the next call re-reads the version to confirm the upgrade landed.
        let acknowledged = self.admin.put_mapping(index, &mapping).await.map_err(|e| {
            error!("Mapping update for '{}' failed: {}", index, e);
            e
        })?;
        if !acknowledged {
            error!("Mapping update for '{}' was not acknowledged", index);
        }
        Ok(acknowledged)
    }

    /// `None` when a concurrent caller created the index first.
    async fn create(&self, descriptor: &IndexDescriptor, flag: &AtomicBool) -> Result<Option<bool>> {
        let index = descriptor.index_name;
        let settings = resources::load(descriptor.settings_template)?;
        let mapping = resources::load(descriptor.mapping_template)?;

        let outcome = self.admin.create_index(index, &settings, &mapping).await.map_err(|e| {
            error!("Creating index '{}' failed: {}", index, e);
            e
        })?;

        match outcome {
            CreateIndexOutcome::Acknowledged => {
                info!("Created index '{}' at schema version {}", index, descriptor.schema_version);
                flag.store(true, Ordering::Release);
                Ok(Some(true))
            }
            CreateIndexOutcome::NotAcknowledged => {
                error!("Creation of index '{}' was not acknowledged", index);
                Ok(Some(false))
            }
            CreateIndexOutcome::AlreadyExists => {
                debug!("Index '{}' was created concurrently, checking its version", index);
                Ok(None)
            }
        }
    }
}
