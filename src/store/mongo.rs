use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use futures::TryStreamExt;
use mongodb::{
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{FindOptions, IndexOptions},
    Client, Database, IndexModel,
};

use super::{Collection, RecordStore, StoreError};

const DUPLICATE_KEY: i32 = 11000;

pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    /// Connects, checks the server answers and makes sure the unique
    /// indexes exist.
    pub async fn connect(uri: &str, database: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await?;
        let store = Self::new(client.database(database));
        store.ping().await?;
        store.ensure_indexes().await?;
        Ok(store)
    }

    pub fn new(database: Database) -> Self {
        Self { database }
    }

    fn collection(&self, collection: Collection) -> mongodb::Collection<Document> {
        self.database.collection(collection.name())
    }

    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        for collection in Collection::ALL {
            for key in collection.unique_keys() {
                let mut keys = Document::new();
                keys.insert(*key, 1);
                let index = IndexModel::builder()
                    .keys(keys)
                    .options(IndexOptions::builder().unique(true).build())
                    .build();
                self.collection(collection).create_index(index, None).await?;
                tracing::debug!("unique index on {}.{} ready", collection.name(), key);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MongoStore {
    async fn insert(
        &self,
        collection: Collection,
        mut record: Document,
    ) -> Result<ObjectId, StoreError> {
        let id = ObjectId::new();
        record.insert("_id", id);
        self.collection(collection)
            .insert_one(record, None)
            .await
            .map_err(|err| duplicate_key_or_mongo(err, collection))?;
        Ok(id)
    }

    async fn find(
        &self,
        collection: Collection,
        filter: Document,
        sort: Option<Document>,
    ) -> Result<Vec<Document>, StoreError> {
        let options = FindOptions::builder().sort(sort).build();
        let cursor = self.collection(collection).find(filter, options).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: Document,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self.collection(collection).find_one(filter, None).await?)
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: Document,
        changes: Document,
    ) -> Result<u64, StoreError> {
        let result = self
            .collection(collection)
            .update_one(filter, doc! { "$set": changes }, None)
            .await
            .map_err(|err| duplicate_key_or_mongo(err, collection))?;
        Ok(result.matched_count)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.database.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }
}

fn duplicate_key_or_mongo(err: MongoError, collection: Collection) -> StoreError {
    if let ErrorKind::Write(WriteFailure::WriteError(write_error)) = err.kind.as_ref() {
        if write_error.code == DUPLICATE_KEY {
            let (key, value) = parse_dup_key(&write_error.message);
            return StoreError::DuplicateKey {
                collection: collection.name(),
                key,
                value,
            };
        }
    }
    StoreError::Mongo(err)
}

// Server messages end with `dup key: { email: "asha@x" }`.
fn parse_dup_key(message: &str) -> (String, String) {
    let entry = message
        .split_once("dup key: {")
        .map(|(_, rest)| rest.trim_end().trim_end_matches('}').trim());
    match entry.and_then(|entry| entry.split_once(':')) {
        Some((key, value)) => (key.trim().to_string(), value.trim().to_string()),
        None => ("unique key".to_string(), message.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dup_key_message_is_split_into_key_and_value() {
        let message = "E11000 duplicate key error collection: tracker.users index: \
                       email_1 dup key: { email: \"asha@x\" }";
        assert_eq!(
            parse_dup_key(message),
            ("email".to_string(), "\"asha@x\"".to_string())
        );
    }

    #[test]
    fn unparsable_dup_key_message_is_kept_whole() {
        let (key, value) = parse_dup_key("something odd");
        assert_eq!(key, "unique key");
        assert_eq!(value, "something odd");
    }
}
