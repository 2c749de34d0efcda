use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use bson::{oid::ObjectId, Bson, Document};
use tokio::sync::RwLock;

use super::{Collection, RecordStore, StoreError};

/// A process-local record store.
///
/// Each collection is a vector kept in insertion order, which is the order
/// unsorted finds return records in.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert(
        &self,
        collection: Collection,
        mut record: Document,
    ) -> Result<ObjectId, StoreError> {
        let mut collections = self.collections.write().await;
        let records = collections.entry(collection).or_default();

        for key in collection.unique_keys() {
            let Some(value) = record.get(*key) else {
                continue;
            };
            if records.iter().any(|existing| existing.get(*key) == Some(value)) {
                return Err(StoreError::DuplicateKey {
                    collection: collection.name(),
                    key: key.to_string(),
                    value: value.to_string(),
                });
            }
        }

        let id = ObjectId::new();
        record.insert("_id", id);
        records.push(record);
        Ok(id)
    }

    async fn find(
        &self,
        collection: Collection,
        filter: Document,
        sort: Option<Document>,
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        let mut found: Vec<Document> = collections
            .get(&collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|record| matches_filter(record, &filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some((field, direction)) = sort.as_ref().and_then(|sort| sort.iter().next()) {
            let descending = matches!(direction, Bson::Int32(d) if *d < 0)
                || matches!(direction, Bson::Int64(d) if *d < 0);
            found.sort_by(|a, b| {
                let ordering = compare(a.get(field), b.get(field));
                if descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        Ok(found)
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: Document,
    ) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|records| records.iter().find(|record| matches_filter(record, &filter)))
            .cloned())
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: Document,
        changes: Document,
    ) -> Result<u64, StoreError> {
        let mut collections = self.collections.write().await;
        let target = collections
            .get_mut(&collection)
            .and_then(|records| records.iter_mut().find(|record| matches_filter(record, &filter)));

        match target {
            Some(record) => {
                for (key, value) in changes {
                    record.insert(key, value);
                }
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

fn matches_filter(record: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, expected)| match (key.as_str(), expected) {
        ("$or", Bson::Array(alternatives)) => alternatives.iter().any(|alternative| {
            matches!(alternative, Bson::Document(sub) if matches_filter(record, sub))
        }),
        _ => record.get(key).unwrap_or(&Bson::Null) == expected,
    })
}

// Missing and null sort below everything else, then numbers, strings,
// ObjectIds and dates, mirroring the BSON comparison order.
fn compare(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    fn rank(value: Option<&Bson>) -> u8 {
        match value {
            None | Some(Bson::Null) => 0,
            Some(Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)) => 1,
            Some(Bson::String(_)) => 2,
            Some(Bson::ObjectId(_)) => 3,
            Some(Bson::DateTime(_)) => 4,
            Some(_) => 5,
        }
    }

    fn number(value: &Bson) -> f64 {
        match value {
            Bson::Int32(n) => f64::from(*n),
            Bson::Int64(n) => *n as f64,
            Bson::Double(n) => *n,
            _ => 0.0,
        }
    }

    match (a, b) {
        (Some(Bson::String(a)), Some(Bson::String(b))) => a.cmp(b),
        (Some(Bson::ObjectId(a)), Some(Bson::ObjectId(b))) => a.bytes().cmp(&b.bytes()),
        (Some(Bson::DateTime(a)), Some(Bson::DateTime(b))) => {
            a.timestamp_millis().cmp(&b.timestamp_millis())
        }
        (Some(a), Some(b)) if rank(Some(a)) == 1 && rank(Some(b)) == 1 => {
            number(a).total_cmp(&number(b))
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    async fn store_with(collection: Collection, records: Vec<Document>) -> MemoryStore {
        let store = MemoryStore::new();
        for record in records {
            store.insert(collection, record).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn insert_assigns_increasing_ids() {
        let store = MemoryStore::new();
        let first = store
            .insert(Collection::Groups, doc! { "id": "a" })
            .await
            .unwrap();
        let second = store
            .insert(Collection::Groups, doc! { "id": "b" })
            .await
            .unwrap();
        assert!(second.bytes() > first.bytes());
    }

    #[tokio::test]
    async fn unique_keys_are_enforced() {
        let store = store_with(
            Collection::Users,
            vec![doc! { "username": "asha", "email": "asha@x" }],
        )
        .await;

        let err = store
            .insert(
                Collection::Users,
                doc! { "username": "ravi", "email": "asha@x" },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { ref key, .. } if key == "email"));

        // Other collections have no unique keys.
        store
            .insert(Collection::GroupExpenses, doc! { "groupId": "g" })
            .await
            .unwrap();
        store
            .insert(Collection::GroupExpenses, doc! { "groupId": "g" })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn or_filters_match_any_alternative() {
        let store = store_with(
            Collection::Users,
            vec![
                doc! { "username": "asha", "email": "asha@x" },
                doc! { "username": "ravi", "email": "ravi@x" },
            ],
        )
        .await;

        let found = store
            .find_one(
                Collection::Users,
                doc! { "$or": [ { "username": "nobody" }, { "email": "ravi@x" } ] },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.get_str("username").unwrap(), "ravi");

        let missing = store
            .find_one(
                Collection::Users,
                doc! { "username": "asha", "email": "ravi@x" },
            )
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn sort_descending_puts_missing_values_last() {
        let day = |d: i64| bson::DateTime::from_millis(d * 86_400_000);
        let store = store_with(
            Collection::RoommateTxs,
            vec![
                doc! { "amount": 1, "date": day(2) },
                doc! { "amount": 2 },
                doc! { "amount": 3, "date": day(5) },
            ],
        )
        .await;

        let found = store
            .find(Collection::RoommateTxs, doc! {}, Some(doc! { "date": -1 }))
            .await
            .unwrap();
        let amounts: Vec<i32> = found.iter().map(|d| d.get_i32("amount").unwrap()).collect();
        assert_eq!(amounts, vec![3, 1, 2]);

        let ascending = store
            .find(Collection::RoommateTxs, doc! {}, Some(doc! { "date": 1 }))
            .await
            .unwrap();
        assert_eq!(ascending[0].get_i32("amount").unwrap(), 2);
    }

    #[tokio::test]
    async fn update_one_touches_only_the_first_match() {
        let store = store_with(
            Collection::Groups,
            vec![doc! { "id": "g1", "name": "Flat" }, doc! { "id": "g2", "name": "Trip" }],
        )
        .await;

        let matched = store
            .update_one(
                Collection::Groups,
                doc! { "id": "g2" },
                doc! { "lastMsg": "hello" },
            )
            .await
            .unwrap();
        assert_eq!(matched, 1);

        let missed = store
            .update_one(
                Collection::Groups,
                doc! { "id": "nope" },
                doc! { "lastMsg": "hello" },
            )
            .await
            .unwrap();
        assert_eq!(missed, 0);

        let g1 = store
            .find_one(Collection::Groups, doc! { "id": "g1" })
            .await
            .unwrap()
            .unwrap();
        assert!(g1.get("lastMsg").is_none());
    }
}
