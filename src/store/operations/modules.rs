use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::Transactional;

use crate::store::keys;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseModule {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub description: Option<String>,
    pub order_index: u32,
    pub created_at: DateTime<Utc>,
}

impl Store {
    pub fn create_module(&self, module: &CourseModule) -> Result<(), StoreError> {
        let key = keys::module_key(&module.id)?;
        let index_key =
            keys::module_course_index_key(&module.course_id, module.order_index, &module.id)?;
        let bytes = Self::serialize(module)?;

        (&self.modules, &self.module_course_index)
            .transaction(|(tx_modules, tx_index)| {
                tx_modules.insert(key.as_bytes(), bytes.as_slice())?;
                tx_index.insert(index_key.as_bytes(), &[] as &[u8])?;
                Ok(())
            })
            .map_err(map_txn_error)?;
        Ok(())
    }

    pub fn get_module(&self, module_id: &str) -> Result<Option<CourseModule>, StoreError> {
        let key = keys::module_key(module_id)?;
        match self.modules.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// Update a module; an `order_index` change moves the course index entry
    /// in the same transaction.
    pub fn update_module(&self, module: &CourseModule) -> Result<(), StoreError> {
        let existing = self
            .get_module(&module.id)?
            .ok_or_else(|| StoreError::NotFound {
                entity: "module".to_string(),
                key: module.id.clone(),
            })?;

        let key = keys::module_key(&module.id)?;
        let old_index_key =
            keys::module_course_index_key(&existing.course_id, existing.order_index, &existing.id)?;
        let new_index_key =
            keys::module_course_index_key(&module.course_id, module.order_index, &module.id)?;
        let bytes = Self::serialize(module)?;

        (&self.modules, &self.module_course_index)
            .transaction(|(tx_modules, tx_index)| {
                tx_modules.insert(key.as_bytes(), bytes.as_slice())?;
                if old_index_key != new_index_key {
                    tx_index.remove(old_index_key.as_bytes())?;
                    tx_index.insert(new_index_key.as_bytes(), &[] as &[u8])?;
                }
                Ok(())
            })
            .map_err(map_txn_error)?;
        Ok(())
    }

    /// Delete a module and cascade through its lessons.
    pub fn delete_module(&self, module_id: &str) -> Result<(), StoreError> {
        let Some(module) = self.get_module(module_id)? else {
            return Ok(());
        };

        for lesson in self.list_module_lessons(module_id)? {
            self.delete_lesson(&lesson.id)?;
        }

        let key = keys::module_key(module_id)?;
        let index_key =
            keys::module_course_index_key(&module.course_id, module.order_index, &module.id)?;

        (&self.modules, &self.module_course_index)
            .transaction(|(tx_modules, tx_index)| {
                tx_modules.remove(key.as_bytes())?;
                tx_index.remove(index_key.as_bytes())?;
                Ok(())
            })
            .map_err(map_txn_error)?;
        Ok(())
    }

    /// Modules of a course ordered by `order_index`.
    pub fn list_course_modules(&self, course_id: &str) -> Result<Vec<CourseModule>, StoreError> {
        let prefix = keys::module_course_index_prefix(course_id)?;
        let mut modules = Vec::new();
        for item in self.module_course_index.scan_prefix(prefix.as_bytes()) {
            let (index_key, _) = item?;
            let key_str = String::from_utf8_lossy(&index_key);
            let Some(module_id) = key_str.rsplit(':').next() else {
                continue;
            };
            if let Some(module) = self.get_module(module_id)? {
                modules.push(module);
            }
        }
        Ok(modules)
    }
}

pub(crate) fn map_txn_error(error: sled::transaction::TransactionError<StoreError>) -> StoreError {
    match error {
        sled::transaction::TransactionError::Abort(store_error) => store_error,
        sled::transaction::TransactionError::Storage(storage_error) => {
            StoreError::Sled(storage_error)
        }
    }
}
