use bson::doc;

use crate::error::ApiError;
use crate::schemas::RoommateTx;
use crate::store::{decode_all, encode, Collection, RecordStore};

/// All roommate transactions, latest date first.
pub async fn list_all(store: &dyn RecordStore) -> Result<Vec<RoommateTx>, ApiError> {
    let documents = store
        .find(Collection::RoommateTxs, doc! {}, Some(doc! { "date": -1 }))
        .await?;
    Ok(decode_all(documents)?)
}

/// Stores the transaction; `splitAmong` is kept in the order given and
/// not checked against known users.
pub async fn add(store: &dyn RecordStore, tx: RoommateTx) -> Result<(), ApiError> {
    let tx = RoommateTx {
        record_id: None,
        ..tx
    };
    store.insert(Collection::RoommateTxs, encode(&tx)?).await?;
    Ok(())
}
