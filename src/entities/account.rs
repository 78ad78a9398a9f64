// 👤 Account Entity - Who is allowed to post, and in which reviewer class
//
// Identity is the UUID assigned on creation; the username is a unique,
// separately indexed value. The credential is opaque here: hashing and
// checking it belongs to the auth layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::review::ReviewerClass;
use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Admin,
    Regular,
    Business,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Admin => "admin",
            AccountType::Regular => "regular",
            AccountType::Business => "business",
        }
    }

    /// Admins review as regular users
    pub fn reviewer_class(&self) -> ReviewerClass {
        match self {
            AccountType::Admin | AccountType::Regular => ReviewerClass::User,
            AccountType::Business => ReviewerClass::Business,
        }
    }
}

impl FromStr for AccountType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(AccountType::Admin),
            "regular" => Ok(AccountType::Regular),
            "business" => Ok(AccountType::Business),
            _ => Err(ValidationError::UnknownAccountClass(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,

    pub username: String,

    /// Pre-hashed credential, never exposed through `public()`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub credential: String,

    #[serde(rename = "typeOfAccount")]
    pub account_type: AccountType,

    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(
        username: impl Into<String>,
        credential: impl Into<String>,
        account_type: AccountType,
    ) -> Self {
        Account {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.into(),
            credential: credential.into(),
            account_type,
            created_at: Utc::now(),
        }
    }

    pub fn reviewer_class(&self) -> ReviewerClass {
        self.account_type.reviewer_class()
    }

    /// Copy safe to hand to sessions and responses
    pub fn public(&self) -> Account {
        Account {
            credential: String::new(),
            ..self.clone()
        }
    }
}
