use bson::doc;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::ApiError;
use crate::schemas::{Credentials, PublicUser, User};
use crate::store::{decode, encode, Collection, RecordStore, StoreError};

type HmacSha256 = Hmac<Sha256>;

/// How passwords are turned into the value kept in the store.
#[derive(Clone, Debug, PartialEq)]
pub enum PasswordScheme {
    /// Kept exactly as sent.
    Plaintext,
    /// Lowercase hex HMAC-SHA256 keyed by SHA-256 of a server-side pepper.
    Peppered(String),
}

impl PasswordScheme {
    pub fn from_pepper(pepper: Option<String>) -> Self {
        match pepper {
            Some(pepper) if !pepper.is_empty() => PasswordScheme::Peppered(pepper),
            _ => PasswordScheme::Plaintext,
        }
    }

    pub fn stored_form(&self, password: &str) -> String {
        match self {
            PasswordScheme::Plaintext => password.to_string(),
            PasswordScheme::Peppered(pepper) => keyed_digest(pepper, password),
        }
    }
}

fn keyed_digest(pepper: &str, password: &str) -> String {
    let mut sha256_hasher = Sha256::new();
    sha256_hasher.update(pepper.as_bytes());
    let key = sha256_hasher.finalize();

    let mut hmac_hasher =
        HmacSha256::new_from_slice(&key).expect("HMAC accepts keys of any length");
    hmac_hasher.update(password.as_bytes());
    hmac_hasher
        .finalize()
        .into_bytes()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// Creates a user unless the username or the email is already taken.
pub async fn register(
    store: &dyn RecordStore,
    scheme: &PasswordScheme,
    user: User,
) -> Result<(), ApiError> {
    let existing = store
        .find_one(
            Collection::Users,
            doc! { "$or": [ { "username": user.username.as_str() }, { "email": user.email.as_str() } ] },
        )
        .await?;
    if existing.is_some() {
        return Err(ApiError::Conflict("User exists".to_string()));
    }

    let user = User {
        password: scheme.stored_form(&user.password),
        ..user
    };
    match store.insert(Collection::Users, encode(&user)?).await {
        Ok(_) => {
            tracing::info!("registered user {}", user.username);
            Ok(())
        }
        // Lost a race with a concurrent registration.
        Err(StoreError::DuplicateKey { .. }) => Err(ApiError::Conflict("User exists".to_string())),
        Err(err) => Err(err.into()),
    }
}

/// Looks the user up by username and password together.
pub async fn login(
    store: &dyn RecordStore,
    scheme: &PasswordScheme,
    credentials: Credentials,
) -> Result<PublicUser, ApiError> {
    let found = store
        .find_one(
            Collection::Users,
            doc! {
                "username": credentials.username.as_str(),
                "password": scheme.stored_form(&credentials.password),
            },
        )
        .await?;

    match found {
        Some(document) => Ok(decode::<User>(document)?.into()),
        None => {
            tracing::debug!("failed login for {}", credentials.username);
            Err(ApiError::Unauthorized("Invalid credentials".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn user(username: &str, email: &str, password: &str) -> User {
        User {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    fn credentials(username: &str, password: &str) -> Credentials {
        Credentials {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn plaintext_is_kept_as_given() {
        assert_eq!(PasswordScheme::Plaintext.stored_form("hunter2"), "hunter2");
        assert_eq!(
            PasswordScheme::from_pepper(Some(String::new())),
            PasswordScheme::Plaintext
        );
    }

    #[test]
    fn peppered_digest_is_deterministic_hex() {
        let scheme = PasswordScheme::from_pepper(Some("pepper".to_string()));
        let first = scheme.stored_form("hunter2");
        assert_eq!(first, scheme.stored_form("hunter2"));
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, scheme.stored_form("hunter3"));

        let other = PasswordScheme::from_pepper(Some("salt".to_string()));
        assert_ne!(first, other.stored_form("hunter2"));
    }

    #[tokio::test]
    async fn duplicate_username_or_email_conflicts() {
        let store = MemoryStore::new();
        let scheme = PasswordScheme::Plaintext;
        register(&store, &scheme, user("asha", "asha@x", "pw"))
            .await
            .unwrap();

        let same_name = register(&store, &scheme, user("asha", "other@x", "pw")).await;
        assert_eq!(same_name, Err(ApiError::Conflict("User exists".to_string())));

        let same_email = register(&store, &scheme, user("ravi", "asha@x", "pw")).await;
        assert_eq!(same_email, Err(ApiError::Conflict("User exists".to_string())));
    }

    #[tokio::test]
    async fn login_checks_password_and_hides_it() {
        let store = MemoryStore::new();
        let scheme = PasswordScheme::from_pepper(Some("pepper".to_string()));
        register(&store, &scheme, user("asha", "asha@x", "pw"))
            .await
            .unwrap();

        let wrong = login(&store, &scheme, credentials("asha", "nope")).await;
        assert_eq!(
            wrong,
            Err(ApiError::Unauthorized("Invalid credentials".to_string()))
        );

        let found = login(&store, &scheme, credentials("asha", "pw"))
            .await
            .unwrap();
        assert_eq!(
            found,
            PublicUser {
                username: "asha".to_string(),
                email: "asha@x".to_string(),
            }
        );

        let stored = store
            .find_one(Collection::Users, doc! { "username": "asha" })
            .await
            .unwrap()
            .unwrap();
        assert_ne!(stored.get_str("password").unwrap(), "pw");
    }
}
