use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use fixed::types::I51F13;
use parking_lot::{Mutex, MutexGuard};

use crate::customer::{Customer, CustomerId};

/// A monetary amount
///
/// Signed, so that zero and negative request amounts can be represented and
/// rejected. Balances never go below zero.
pub type Amount = I51F13;

/// Possible errors to occur during account operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccountError {
    #[error("The amount must be greater than zero")]
    InvalidAmount,
    #[error("The operation would lead to an overdrawn account")]
    Overdraft,
    #[error("The operation would exceed the maximum representable balance")]
    Overflow,
    #[error("An account cannot be opened with a negative balance")]
    NegativeBalance,
    #[error("The account is closed")]
    Closed,
}

/// The unique identifier of an account
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountNumber(u32);

impl AccountNumber {
    pub fn new(number: u32) -> Self {
        Self(number)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The kind of an account
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountType {
    Checking,
    Savings,
}

/// The state guarded by an account's lock
#[derive(Debug)]
struct Funds {
    balance: Amount,
    version: u64,
    closed: bool,
}

/// A customer account
///
/// The balance and its version live behind the account's own lock. They are
/// only ever changed through [`Account::credit`] and [`Account::debit`], or the
/// same operations on a held lock guard. Each change bumps the version by
/// exactly one.
///
/// Two accounts are equal when their numbers are equal. Equality says nothing
/// about the balance or version; use a transfer token to detect changes.
#[derive(Debug)]
pub struct Account {
    number: AccountNumber,
    account_type: AccountType,
    owner: Weak<Customer>,
    owner_id: CustomerId,
    funds: Mutex<Funds>,
}

impl Account {
    /// Creates a new empty account for `owner`
    pub fn new(number: AccountNumber, account_type: AccountType, owner: &Arc<Customer>) -> Self {
        Self {
            number,
            account_type,
            owner: Arc::downgrade(owner),
            owner_id: owner.id().clone(),
            funds: Mutex::new(Funds {
                balance: Amount::ZERO,
                version: 0,
                closed: false,
            }),
        }
    }

    /// Creates a new account for `owner` holding an initial balance
    pub fn with_balance(
        number: AccountNumber,
        account_type: AccountType,
        owner: &Arc<Customer>,
        balance: Amount,
    ) -> Result<Self, AccountError> {
        if balance < Amount::ZERO {
            return Err(AccountError::NegativeBalance);
        }

        let account = Self::new(number, account_type, owner);
        account.funds.lock().balance = balance;

        Ok(account)
    }

    pub fn number(&self) -> AccountNumber {
        self.number
    }

    pub fn account_type(&self) -> AccountType {
        self.account_type
    }

    /// The id of the owning customer
    pub fn owner(&self) -> &CustomerId {
        &self.owner_id
    }

    /// The owning customer, unless it has been dropped
    pub fn customer(&self) -> Option<Arc<Customer>> {
        self.owner.upgrade()
    }

    pub fn balance(&self) -> Amount {
        self.funds.lock().balance
    }

    pub fn version(&self) -> u64 {
        self.funds.lock().version
    }

    /// Whether the account was deleted from its owner
    ///
    /// A closed account rejects every credit and debit.
    pub fn is_closed(&self) -> bool {
        self.funds.lock().closed
    }

    /// A consistent copy of the account, taken under its lock
    pub fn snapshot(&self) -> AccountSnapshot {
        self.lock().snapshot()
    }

    /// Credits the specified amount to the account
    pub fn credit(&self, amount: Amount) -> Result<(), AccountError> {
        self.lock().credit(amount)
    }

    /// Debits the specified amount from the account
    pub fn debit(&self, amount: Amount) -> Result<(), AccountError> {
        self.lock().debit(amount)
    }

    /// Acquires the account's exclusive-access lock
    ///
    /// Blocks until the lock is free. Only the transfer service takes this
    /// lock directly, and it always does so in ascending account number order.
    pub(crate) fn lock(&self) -> AccountGuard<'_> {
        AccountGuard {
            account: self,
            funds: self.funds.lock(),
        }
    }
}

impl PartialEq for Account {
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number
    }
}

impl Eq for Account {}

impl Hash for Account {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.number.hash(state);
    }
}

impl serde::Serialize for Account {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where S: serde::Serializer
    {
        serde::Serialize::serialize(&self.snapshot(), serializer)
    }
}

/// Exclusive access to an account's funds
///
/// Dropping the guard releases the lock.
pub(crate) struct AccountGuard<'a> {
    account: &'a Account,
    funds: MutexGuard<'a, Funds>,
}

impl AccountGuard<'_> {
    pub(crate) fn balance(&self) -> Amount {
        self.funds.balance
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.funds.closed
    }

    /// Marks the account as closed for good
    pub(crate) fn close(&mut self) {
        self.funds.closed = true;
    }

    /// The balance after crediting `amount`, without applying it
    pub(crate) fn checked_credit(&self, amount: Amount) -> Result<Amount, AccountError> {
        if self.funds.closed {
            return Err(AccountError::Closed);
        }
        if amount <= Amount::ZERO {
            return Err(AccountError::InvalidAmount);
        }

        self.funds.balance
            .checked_add(amount)
            .ok_or(AccountError::Overflow)
    }

    /// The balance after debiting `amount`, without applying it
    pub(crate) fn checked_debit(&self, amount: Amount) -> Result<Amount, AccountError> {
        if self.funds.closed {
            return Err(AccountError::Closed);
        }
        if amount <= Amount::ZERO {
            return Err(AccountError::InvalidAmount);
        }

        self.funds.balance
            .checked_sub(amount)
            .filter(|balance| *balance >= Amount::ZERO)
            .ok_or(AccountError::Overdraft)
    }

    pub(crate) fn credit(&mut self, amount: Amount) -> Result<(), AccountError> {
        let balance = self.checked_credit(amount)?;
        self.commit(balance);

        Ok(())
    }

    pub(crate) fn debit(&mut self, amount: Amount) -> Result<(), AccountError> {
        let balance = self.checked_debit(amount)?;
        self.commit(balance);

        Ok(())
    }

    /// Stores a balance previously computed by [`AccountGuard::checked_credit`]
    /// or [`AccountGuard::checked_debit`] on this same guard
    pub(crate) fn commit(&mut self, balance: Amount) {
        debug_assert!(balance >= Amount::ZERO);
        self.funds.balance = balance;
        self.funds.version += 1;
    }

    pub(crate) fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            number: self.account.number,
            account_type: self.account.account_type,
            owner: self.account.owner_id.clone(),
            balance: self.funds.balance,
            version: self.funds.version,
        }
    }
}

/// An immutable copy of an account at one point in time
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct AccountSnapshot {
    pub number: AccountNumber,
    #[serde(rename = "type")]
    pub account_type: AccountType,
    pub owner: CustomerId,
    pub balance: Amount,
    pub version: u64,
}
