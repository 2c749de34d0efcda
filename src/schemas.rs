use bson::{oid::ObjectId, Bson};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

pub type UserEmail = String;
pub type GroupId = String;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct User {
    pub username: String,
    pub email: UserEmail,
    pub password: String,
}

/// What the API reveals about a user. Never carries the password.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct PublicUser {
    pub username: String,
    pub email: UserEmail,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        PublicUser {
            username: user.username,
            email: user.email,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Expense,
    Income,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalExpense {
    #[serde(
        rename = "_id",
        default,
        skip_serializing_if = "Option::is_none",
        with = "record_id"
    )]
    pub record_id: Option<ObjectId>,
    pub user_email: UserEmail,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(deserialize_with = "record_amount::deserialize")]
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "record_date")]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(
        rename = "_id",
        default,
        skip_serializing_if = "Option::is_none",
        with = "record_id"
    )]
    pub record_id: Option<ObjectId>,
    pub id: GroupId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_msg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<UserEmail>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupExpense {
    #[serde(
        rename = "_id",
        default,
        skip_serializing_if = "Option::is_none",
        with = "record_id"
    )]
    pub record_id: Option<ObjectId>,
    // Soft reference: the group may not exist.
    pub group_id: GroupId,
    #[serde(deserialize_with = "record_amount::deserialize")]
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "record_date")]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoommateTx {
    #[serde(
        rename = "_id",
        default,
        skip_serializing_if = "Option::is_none",
        with = "record_id"
    )]
    pub record_id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<UserEmail>,
    #[serde(deserialize_with = "record_amount::deserialize")]
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_by: Option<String>,
    #[serde(default)]
    pub split_among: Vec<UserEmail>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "record_date")]
    pub date: Option<DateTime<Utc>>,
}

/// Store-assigned identity: an ObjectId inside BSON, a hex string in JSON.
mod record_id {
    use bson::{oid::ObjectId, Bson};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(id: &Option<ObjectId>, s: S) -> Result<S::Ok, S::Error> {
        match id {
            Some(id) if s.is_human_readable() => s.serialize_some(&id.to_hex()),
            Some(id) => s.serialize_some(id),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<ObjectId>, D::Error> {
        match Option::<Bson>::deserialize(d)? {
            None | Some(Bson::Null) => Ok(None),
            Some(Bson::ObjectId(id)) => Ok(Some(id)),
            Some(Bson::String(hex)) => ObjectId::parse_str(&hex).map(Some).map_err(D::Error::custom),
            Some(other) => Err(D::Error::custom(format!("invalid record id: {other}"))),
        }
    }
}

/// Amounts arrive as JSON numbers or as numeric strings such as `"250"`.
mod record_amount {
    use bson::Bson;
    use serde::{de::Error, Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        let value = Bson::deserialize(d)?;
        super::amount_from_bson(&value).map_err(D::Error::custom)
    }
}

pub fn amount_from_bson(value: &Bson) -> Result<f64, String> {
    let amount = match value {
        Bson::Double(amount) => Some(*amount),
        Bson::Int32(amount) => Some(f64::from(*amount)),
        Bson::Int64(amount) => Some(*amount as f64),
        Bson::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    amount
        .filter(|amount| amount.is_finite())
        .ok_or_else(|| format!("Cast to Number failed for value {value} at path \"amount\""))
}

/// Record dates: a BSON datetime inside the store, RFC 3339 in JSON.
mod record_date {
    use bson::Bson;
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) if s.is_human_readable() => {
                s.serialize_some(&date.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Some(date) => s.serialize_some(&bson::DateTime::from_chrono(*date)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        let value = match Option::<Bson>::deserialize(d)? {
            None => return Ok(None),
            Some(value) => value,
        };
        super::date_from_bson(&value).map_err(D::Error::custom)
    }
}

/// Accepts the date shapes clients send: RFC 3339, a bare `YYYY-MM-DD`,
/// a zone-less timestamp (read as UTC) or epoch milliseconds.
pub fn date_from_bson(value: &Bson) -> Result<Option<DateTime<Utc>>, String> {
    match value {
        Bson::Null => Ok(None),
        Bson::DateTime(date) => Ok(Some(date.to_chrono())),
        Bson::String(text) => parse_date(text).map(Some),
        Bson::Int64(millis) => from_millis(*millis).map(Some),
        Bson::Int32(millis) => from_millis(i64::from(*millis)).map(Some),
        Bson::Double(millis) if millis.is_finite() => from_millis(*millis as i64).map(Some),
        other => Err(format!("Cast to date failed for value {other}")),
    }
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>, String> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| format!("Cast to date failed for value {millis}"))
}

pub fn parse_date(text: &str) -> Result<DateTime<Utc>, String> {
    let text = text.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Ok(date.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(date.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| format!("Cast to date failed for value \"{text}\""))
}

pub fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}
