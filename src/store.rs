//! The record store: the document persistence every access module talks to.
//!
//! [`RecordStore`] is deliberately shaped like a document collection API
//! (insert, find by filter with optional sort, single-record update) so that
//! the MongoDB backend is a thin pass-through. [`MemoryStore`] implements the
//! subset of filter and sort semantics the access layer relies on.
use async_trait::async_trait;
use bson::{oid::ObjectId, Document};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// The collections of the expense tracker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    PersonalExpenses,
    Groups,
    GroupExpenses,
    RoommateTxs,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Users,
        Collection::PersonalExpenses,
        Collection::Groups,
        Collection::GroupExpenses,
        Collection::RoommateTxs,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::PersonalExpenses => "personalexpenses",
            Collection::Groups => "groups",
            Collection::GroupExpenses => "groupexpenses",
            Collection::RoommateTxs => "roommatetxes",
        }
    }

    /// Fields whose values may appear at most once in the collection.
    pub fn unique_keys(self) -> &'static [&'static str] {
        match self {
            Collection::Users => &["username", "email"],
            Collection::Groups => &["id"],
            _ => &[],
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("E11000 duplicate key error collection: {collection} dup key: {{ {key}: {value} }}")]
    DuplicateKey {
        collection: &'static str,
        key: String,
        value: String,
    },
    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),
    #[error(transparent)]
    Encode(#[from] bson::ser::Error),
    #[error(transparent)]
    Decode(#[from] bson::de::Error),
}

/// Document persistence, one operation per call.
///
/// Filters are MongoDB-style documents: top-level equality on each key, plus
/// `$or` over a list of sub-filters. Sort documents name a single field with
/// `1` (ascending) or `-1` (descending).
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Stores `record`, assigning it a fresh `_id` which is returned.
    async fn insert(&self, collection: Collection, record: Document)
        -> Result<ObjectId, StoreError>;

    async fn find(
        &self,
        collection: Collection,
        filter: Document,
        sort: Option<Document>,
    ) -> Result<Vec<Document>, StoreError>;

    async fn find_one(
        &self,
        collection: Collection,
        filter: Document,
    ) -> Result<Option<Document>, StoreError>;

    /// Overwrites the fields in `changes` on the first record matching
    /// `filter`. Returns the number of matched records (0 or 1).
    async fn update_one(
        &self,
        collection: Collection,
        filter: Document,
        changes: Document,
    ) -> Result<u64, StoreError>;

    /// Checks the store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Turns a record into the document the store keeps.
///
/// Goes through BSON bytes so serializers see a non human-readable format:
/// ids stay ObjectIds and dates stay BSON datetimes.
pub fn encode<T: Serialize>(record: &T) -> Result<Document, StoreError> {
    let bytes = bson::to_vec(record)?;
    Ok(Document::from_reader(bytes.as_slice())?)
}

pub fn decode<T: DeserializeOwned>(document: Document) -> Result<T, StoreError> {
    let bytes = bson::to_vec(&document)?;
    Ok(bson::from_slice(&bytes)?)
}

pub fn decode_all<T: DeserializeOwned>(documents: Vec<Document>) -> Result<Vec<T>, StoreError> {
    documents.into_iter().map(decode).collect()
}
