use bson::doc;

use crate::error::ApiError;
use crate::schemas::PersonalExpense;
use crate::store::{decode_all, encode, Collection, RecordStore};

/// Every personal entry recorded for `email`, in the order they were added.
pub async fn list_for_user(
    store: &dyn RecordStore,
    email: &str,
) -> Result<Vec<PersonalExpense>, ApiError> {
    let documents = store
        .find(Collection::PersonalExpenses, doc! { "userEmail": email }, None)
        .await?;
    Ok(decode_all(documents)?)
}

pub async fn add(store: &dyn RecordStore, expense: PersonalExpense) -> Result<(), ApiError> {
    let expense = PersonalExpense {
        record_id: None,
        ..expense
    };
    store
        .insert(Collection::PersonalExpenses, encode(&expense)?)
        .await?;
    Ok(())
}
