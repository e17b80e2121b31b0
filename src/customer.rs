use std::borrow::Borrow;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;

use crate::account::{Account, AccountNumber};

/// The unique identifier of a customer, supplied by the caller
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CustomerId(String);

impl CustomerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CustomerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A postal address
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Gender {
    Male,
    Female,
}

/// A picture of the customer
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Image {
    pub src: String,
    pub alt: String,
}

/// Descriptive customer attributes
///
/// None of these take part in any ledger decision.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub address: Address,
    pub phone: String,
    pub email: Option<String>,
    pub birth_date: NaiveDate,
    pub images: Vec<Image>,
}

/// A bank customer and the registry of their accounts
///
/// Customers are equal when their ids are equal.
pub struct Customer {
    id: CustomerId,
    profile: Profile,
    joined: DateTime<Utc>,
    accounts: Mutex<HashMap<AccountNumber, Arc<Account>>>,
}

impl Customer {
    pub fn new(id: CustomerId, profile: Profile) -> Self {
        Self {
            id,
            profile,
            joined: Utc::now(),
            accounts: Mutex::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> &CustomerId {
        &self.id
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// When the customer was constructed
    pub fn joined(&self) -> DateTime<Utc> {
        self.joined
    }

    /// Adds an account to the registry
    ///
    /// Returns `false` if an account with the same number is already registered.
    pub fn add_account(&self, account: Arc<Account>) -> bool {
        match self.accounts.lock().entry(account.number()) {
            Entry::Vacant(v) => {
                v.insert(account);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Removes an account from the registry
    ///
    /// Returns `false` if no account with the same number is registered.
    pub fn delete_account(&self, account: &Account) -> bool {
        self.accounts.lock()
            .remove(&account.number())
            .is_some()
    }

    pub fn find_account(&self, number: AccountNumber) -> Option<Arc<Account>> {
        self.accounts.lock()
            .get(&number)
            .cloned()
    }

    /// A copy of all registered accounts, ordered by number
    pub fn accounts(&self) -> Vec<Arc<Account>> {
        let mut accounts = self.accounts.lock()
            .values()
            .cloned()
            .collect::<Vec<_>>();
        accounts.sort_by_key(|account| account.number());
        accounts
    }

    pub fn has_accounts(&self) -> bool {
        !self.accounts.lock().is_empty()
    }
}

impl fmt::Debug for Customer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // accounts are left out, formatting must not take account locks
        f.debug_struct("Customer")
            .field("id", &self.id)
            .field("profile", &self.profile)
            .field("joined", &self.joined)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Customer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Customer {}

impl Hash for Customer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Customer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.profile.first_name, self.profile.last_name, self.id)
    }
}
