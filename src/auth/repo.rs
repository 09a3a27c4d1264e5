use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Merchant account record.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Merchant {
    pub id: Uuid,
    pub email: String,
    // Argon2 hash, never exposed in JSON
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub business_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Merchant {
    /// Find a merchant by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<Merchant>> {
        let merchant = sqlx::query_as::<_, Merchant>(
            r#"
            SELECT id, email, password_hash, business_name, created_at
            FROM merchants
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(merchant)
    }

    /// Create a new merchant with a hashed password.
    pub async fn create(
        db: &PgPool,
        email: &str,
        password_hash: &str,
        business_name: &str,
    ) -> anyhow::Result<Merchant> {
        let merchant = sqlx::query_as::<_, Merchant>(
            r#"
            INSERT INTO merchants (email, password_hash, business_name)
            VALUES ($1, $2, $3)
            RETURNING id, email, password_hash, business_name, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(business_name)
        .fetch_one(db)
        .await?;
        Ok(merchant)
    }
}

/// True when the error is a unique constraint firing, e.g. two concurrent
/// registrations racing on the same email.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::fmt;

    #[derive(Debug)]
    struct DuplicateKey;

    impl fmt::Display for DuplicateKey {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("duplicate key value violates unique constraint")
        }
    }

    impl std::error::Error for DuplicateKey {}

    impl DatabaseError for DuplicateKey {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }
        fn code(&self) -> Option<Cow<'_, str>> {
            Some("23505".into())
        }
        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }
        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }
        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }
    }

    #[test]
    fn unique_violation_is_detected_through_anyhow() {
        let err = anyhow::Error::from(sqlx::Error::Database(Box::new(DuplicateKey)));
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn other_errors_are_not_unique_violations() {
        assert!(!is_unique_violation(&anyhow::anyhow!("connection reset")));
        assert!(!is_unique_violation(&anyhow::Error::from(
            sqlx::Error::RowNotFound
        )));
    }

    #[test]
    fn merchant_json_never_leaks_password_hash() {
        let merchant = Merchant {
            id: Uuid::new_v4(),
            email: "owner@coffee.example".into(),
            password_hash: "$argon2id$v=19$secret".into(),
            business_name: "Corner Coffee".into(),
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&merchant).unwrap();
        assert!(json.contains("owner@coffee.example"));
        assert!(json.contains("businessName"));
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2id"));
    }
}
