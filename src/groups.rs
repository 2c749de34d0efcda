//! Shared groups and the expenses recorded against them.
use bson::doc;

use crate::error::ApiError;
use crate::schemas::{Group, GroupExpense};
use crate::store::{decode_all, encode, Collection, RecordStore};

/// Shown in a group's `time` right after an expense lands.
pub const JUST_NOW: &str = "Just now";

/// All groups, most recently created first.
pub async fn list_all(store: &dyn RecordStore) -> Result<Vec<Group>, ApiError> {
    let documents = store
        .find(Collection::Groups, doc! {}, Some(doc! { "_id": -1 }))
        .await?;
    Ok(decode_all(documents)?)
}

/// Fails with a conflict when a group with the same `id` exists.
pub async fn create(store: &dyn RecordStore, group: Group) -> Result<(), ApiError> {
    let group = Group {
        record_id: None,
        ..group
    };
    store.insert(Collection::Groups, encode(&group)?).await?;
    tracing::info!("created group {}", group.id);
    Ok(())
}

pub async fn list_expenses(
    store: &dyn RecordStore,
    group_id: &str,
) -> Result<Vec<GroupExpense>, ApiError> {
    let documents = store
        .find(
            Collection::GroupExpenses,
            doc! { "groupId": group_id },
            Some(doc! { "date": -1 }),
        )
        .await?;
    Ok(decode_all(documents)?)
}

/// Records the expense and refreshes the owning group's summary.
///
/// Two independent writes: the expense is stored first, then the group
/// whose `id` equals `groupId` gets a new `lastMsg` and `time`. No group
/// matching is fine. A failure between the writes leaves the summary stale.
pub async fn add_expense(store: &dyn RecordStore, expense: GroupExpense) -> Result<(), ApiError> {
    let expense = GroupExpense {
        record_id: None,
        ..expense
    };
    store
        .insert(Collection::GroupExpenses, encode(&expense)?)
        .await?;

    let matched = store
        .update_one(
            Collection::Groups,
            doc! { "id": expense.group_id.as_str() },
            doc! {
                "lastMsg": summary(expense.paid_by.as_deref(), expense.amount),
                "time": JUST_NOW,
            },
        )
        .await?;
    if matched == 0 {
        tracing::debug!("expense added for unknown group {}", expense.group_id);
    }
    Ok(())
}

pub fn summary(paid_by: Option<&str>, amount: f64) -> String {
    format!("{} added ₹{}", paid_by.unwrap_or("Someone"), amount)
}
