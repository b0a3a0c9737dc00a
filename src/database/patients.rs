use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};

use super::{escape_regex, MongoDB, PATIENTS};
use crate::models::Patient;
use crate::utils::{AppError, AppResult};

#[async_trait]
pub trait PatientRepository: Send + Sync {
    async fn insert(&self, patient: &Patient) -> AppResult<ObjectId>;
    async fn find_by_aadhar(&self, aadhar: &str) -> AppResult<Option<Patient>>;
    /// Looks a patient up only within `owner`'s records.
    async fn find_owned(&self, id: &ObjectId, owner: &ObjectId) -> AppResult<Option<Patient>>;
    async fn list_owned(
        &self,
        owner: &ObjectId,
        search: Option<&str>,
        skip: u64,
        limit: i64,
    ) -> AppResult<Vec<Patient>>;
    async fn count_owned(&self, owner: &ObjectId, search: Option<&str>) -> AppResult<u64>;
    async fn replace(&self, patient: &Patient) -> AppResult<()>;
    async fn delete_owned(&self, id: &ObjectId, owner: &ObjectId) -> AppResult<bool>;
}

fn owned_filter(owner: &ObjectId, search: Option<&str>) -> Document {
    let mut filter = doc! { "registered_by": *owner };
    if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = escape_regex(term);
        filter.insert(
            "$or",
            vec![
                doc! { "name": { "$regex": pattern.as_str(), "$options": "i" } },
                doc! { "village": { "$regex": pattern.as_str(), "$options": "i" } },
                doc! { "aadhar_number": { "$regex": pattern.as_str() } },
            ],
        );
    }
    filter
}

/// Newest first, with `_id` breaking ties between same-millisecond inserts
/// so pages never overlap.
fn newest_first() -> Document {
    doc! { "created_at": -1, "_id": -1 }
}

#[async_trait]
impl PatientRepository for MongoDB {
    async fn insert(&self, patient: &Patient) -> AppResult<ObjectId> {
        let result = self.collection::<Patient>(PATIENTS).insert_one(patient).await?;
        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| AppError::Internal("patients insert returned a non-ObjectId id".into()))
    }

    async fn find_by_aadhar(&self, aadhar: &str) -> AppResult<Option<Patient>> {
        Ok(self
            .collection::<Patient>(PATIENTS)
            .find_one(doc! { "aadhar_number": aadhar })
            .await?)
    }

    async fn find_owned(&self, id: &ObjectId, owner: &ObjectId) -> AppResult<Option<Patient>> {
        Ok(self
            .collection::<Patient>(PATIENTS)
            .find_one(doc! { "_id": *id, "registered_by": *owner })
            .await?)
    }

    async fn list_owned(
        &self,
        owner: &ObjectId,
        search: Option<&str>,
        skip: u64,
        limit: i64,
    ) -> AppResult<Vec<Patient>> {
        let cursor = self
            .collection::<Patient>(PATIENTS)
            .find(owned_filter(owner, search))
            .sort(newest_first())
            .skip(skip)
            .limit(limit)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn count_owned(&self, owner: &ObjectId, search: Option<&str>) -> AppResult<u64> {
        Ok(self
            .collection::<Patient>(PATIENTS)
            .count_documents(owned_filter(owner, search))
            .await?)
    }

    async fn replace(&self, patient: &Patient) -> AppResult<()> {
        let id = patient
            .id
            .ok_or_else(|| AppError::Internal("cannot replace a patient without _id".into()))?;
        let result = self
            .collection::<Patient>(PATIENTS)
            .replace_one(doc! { "_id": id, "registered_by": patient.registered_by }, patient)
            .await?;
        if result.matched_count == 0 {
            return Err(AppError::not_found("Patient not found"));
        }
        Ok(())
    }

    async fn delete_owned(&self, id: &ObjectId, owner: &ObjectId) -> AppResult<bool> {
        let result = self
            .collection::<Patient>(PATIENTS)
            .delete_one(doc! { "_id": *id, "registered_by": *owner })
            .await?;
        Ok(result.deleted_count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_filter_without_search_is_tenant_only() {
        let owner = ObjectId::new();
        let filter = owned_filter(&owner, None);
        assert_eq!(filter, doc! { "registered_by": owner });
        assert_eq!(owned_filter(&owner, Some("   ")), doc! { "registered_by": owner });
    }

    #[test]
    fn owner_filter_with_search_keeps_tenant_clause() {
        let owner = ObjectId::new();
        let filter = owned_filter(&owner, Some("Ram.a"));
        assert_eq!(filter.get_object_id("registered_by").unwrap(), owner);
        let clauses = filter.get_array("$or").unwrap();
        assert_eq!(clauses.len(), 3);
        let first = clauses[0].as_document().unwrap();
        assert_eq!(
            first.get_document("name").unwrap().get_str("$regex").unwrap(),
            "Ram\\.a"
        );
    }

    #[test]
    fn listing_order_has_a_unique_tiebreaker() {
        let order = newest_first();
        let keys: Vec<&str> = order.keys().map(String::as_str).collect();
        assert_eq!(keys, ["created_at", "_id"]);
        assert_eq!(newest_first().get_i32("_id").unwrap(), -1);
    }
}
