// 👥 Account Registry - Unique usernames mapped to stable account ids
//
// Two buckets written in the same transaction:
//   usernames: username → account id
//   accounts:  account id → Account
// so a username can never point at a missing account.

use crate::codec;
use crate::entities::{Account, AccountType};
use crate::error::{ConflictError, Error, Result, ValidationError};
use crate::store::{Bucket, RecordStore};

#[derive(Debug, Clone)]
pub struct AccountRegistry {
    store: RecordStore,
}

impl AccountRegistry {
    pub fn new(store: RecordStore) -> Self {
        AccountRegistry { store }
    }

    /// Register a new account; `credential` must already be hashed
    pub fn create_account(
        &self,
        username: &str,
        credential: &str,
        account_type: AccountType,
    ) -> Result<Account> {
        let username = check_username(username)?;
        let account = Account::new(username.clone(), credential, account_type);

        self.store.update(|txn| {
            if txn.get(Bucket::Usernames, &username)?.is_some() {
                return Err(Error::from(ConflictError::UsernameTaken(username.clone())));
            }
            txn.put(Bucket::Usernames, &username, &codec::encode(&account.id)?)?;
            txn.put(Bucket::Accounts, &account.id, &codec::encode(&account)?)?;
            Ok(())
        })?;

        Ok(account)
    }

    /// Look an account up by username; unknown names are `NotFound`
    pub fn account(&self, username: &str) -> Result<Account> {
        let username = check_username(username)?;

        self.store.view(|snap| {
            let id: String = match snap.get(Bucket::Usernames, &username)? {
                Some(bytes) => codec::decode(Bucket::Usernames.as_str(), &username, &bytes)?,
                None => return Err(Error::not_found("account", username.clone())),
            };

            match snap.get(Bucket::Accounts, &id)? {
                Some(bytes) => Ok(codec::decode(Bucket::Accounts.as_str(), &id, &bytes)?),
                None => Err(Error::not_found("account", id)),
            }
        })
    }

    pub fn account_by_id(&self, id: &str) -> Result<Option<Account>> {
        self.store.view(|snap| match snap.get(Bucket::Accounts, id)? {
            Some(bytes) => Ok(Some(codec::decode(Bucket::Accounts.as_str(), id, &bytes)?)),
            None => Ok(None),
        })
    }
}

fn check_username(username: &str) -> std::result::Result<String, ValidationError> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::InvalidUsername("empty".to_string()));
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidUsername(format!(
            "{:?} contains whitespace",
            trimmed
        )));
    }
    Ok(trimmed.to_string())
}
