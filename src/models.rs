//! The two persisted record types: users and products.

use crate::auth::hash_password;
use crate::entity::{merge_patch, Entity, Patch, Record};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_status() -> String {
    "active".to_string()
}

/// A registered account.
///
/// `password` holds an Argon2 PHC string and is never serialized, neither on
/// the wire nor into the cache.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default = "default_status")]
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Registration and full-update payload for [`User`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UserDraft {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default = "default_status")]
    pub status: String,
}

impl Entity for User {
    type Id = i64;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn table_name() -> &'static str {
        "users"
    }
}

impl Record for User {
    type Draft = UserDraft;

    const COLUMNS: &'static [&'static str] = &[
        "username",
        "password",
        "email",
        "first_name",
        "last_name",
        "phone",
        "status",
    ];

    fn from_draft(id: i64, draft: UserDraft, now: DateTime<Utc>) -> Self {
        User {
            id,
            username: draft.username,
            password: draft.password,
            email: draft.email,
            first_name: draft.first_name,
            last_name: draft.last_name,
            phone: draft.phone,
            status: draft.status,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn apply_draft(&mut self, draft: UserDraft) {
        self.username = draft.username;
        self.password = draft.password;
        self.email = draft.email;
        self.first_name = draft.first_name;
        self.last_name = draft.last_name;
        self.phone = draft.phone;
        self.status = draft.status;
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    fn set_deleted_at(&mut self, at: Option<DateTime<Utc>>) {
        self.deleted_at = at;
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }

    fn prepare_draft(draft: &mut UserDraft) -> Result<()> {
        if draft.username.trim().is_empty()
            || draft.password.is_empty()
            || draft.email.trim().is_empty()
        {
            return Err(Error::InvalidInput(
                "username, password and email are required".to_string(),
            ));
        }
        draft.password = hash_password(&draft.password)?;
        Ok(())
    }

    fn prepare_patch(patch: &mut Patch) -> Result<()> {
        for column in ["username", "password", "email"] {
            match patch.get(column) {
                None => {}
                Some(Value::String(s)) if !s.trim().is_empty() => {}
                Some(_) => {
                    return Err(Error::InvalidInput(format!(
                        "{} must be a non-empty string",
                        column
                    )))
                }
            }
        }

        if let Some(Value::String(plain)) = patch.get("password") {
            let hashed = hash_password(plain)?;
            patch.insert("password".to_string(), Value::String(hashed));
        }
        Ok(())
    }

    // The JSON form drops `password`; carry it over unless the patch sets it.
    fn apply_patch(&mut self, patch: &Patch) -> Result<()> {
        let mut merged: User = merge_patch(self, patch)?;
        if !patch.contains_key("password") {
            merged.password = std::mem::take(&mut self.password);
        }
        *self = merged;
        Ok(())
    }
}

/// A catalogue item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub stock: i64,
    #[serde(default = "default_status")]
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Create and full-update payload for [`Product`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub stock: i64,
    #[serde(default = "default_status")]
    pub status: String,
}

impl Entity for Product {
    type Id = i64;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn table_name() -> &'static str {
        "products"
    }
}

impl Record for Product {
    type Draft = ProductDraft;

    const COLUMNS: &'static [&'static str] = &["name", "description", "price", "stock", "status"];

    fn from_draft(id: i64, draft: ProductDraft, now: DateTime<Utc>) -> Self {
        Product {
            id,
            name: draft.name,
            description: draft.description,
            price: draft.price,
            stock: draft.stock,
            status: draft.status,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn apply_draft(&mut self, draft: ProductDraft) {
        self.name = draft.name;
        self.description = draft.description;
        self.price = draft.price;
        self.stock = draft.stock;
        self.status = draft.status;
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    fn set_deleted_at(&mut self, at: Option<DateTime<Utc>>) {
        self.deleted_at = at;
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}
