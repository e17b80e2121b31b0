use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::account::AccountGuard;
use crate::{
    Account, AccountError, AccountNumber, AccountSnapshot, AccountType, Amount, Bank, Customer,
    CustomerId,
};

/// The broad class of a failure, for callers that map failures onto their own
/// status codes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself is malformed
    Validation,
    /// The request is well formed but conflicts with the current ledger state
    StateConflict,
    /// A referenced entity does not exist
    NotFound,
    /// The caller acted on an outdated view of the accounts
    StaleVersion,
}

/// Possible errors to occur during ledger operations
///
/// No failing operation leaves any account or registry changed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    #[error("The source and target account must differ")]
    SameAccount,
    #[error("The amount must be greater than zero")]
    InvalidAmount,
    #[error("An account cannot be opened with a negative balance")]
    NegativeBalance,
    #[error("Account #{account} does not belong to customer {customer}")]
    NotOwned {
        account: AccountNumber,
        customer: CustomerId,
    },
    #[error("The source account does not hold enough funds")]
    InsufficientFunds,
    #[error("The transfer would lead to an overdrawn account")]
    Overdraft,
    #[error("The transfer would exceed the maximum representable balance")]
    Overflow,
    #[error("The account is closed")]
    AccountClosed,
    #[error("No account numbers are left")]
    AccountNumbersExhausted,
    #[error("Account #{0} still holds funds")]
    NonZeroBalance(AccountNumber),
    #[error("Customer {0} still owns accounts")]
    HasAccounts(CustomerId),
    #[error("Customer {0} not found")]
    UnknownCustomer(CustomerId),
}

impl TransferError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransferError::SameAccount
            | TransferError::InvalidAmount
            | TransferError::NegativeBalance
            | TransferError::NotOwned { .. } => ErrorKind::Validation,
            TransferError::InsufficientFunds
            | TransferError::Overdraft
            | TransferError::Overflow
            | TransferError::AccountClosed
            | TransferError::AccountNumbersExhausted
            | TransferError::NonZeroBalance(_)
            | TransferError::HasAccounts(_) => ErrorKind::StateConflict,
            TransferError::UnknownCustomer(_) => ErrorKind::NotFound,
        }
    }
}

impl From<AccountError> for TransferError {
    fn from(error: AccountError) -> Self {
        match error {
            AccountError::InvalidAmount => TransferError::InvalidAmount,
            AccountError::Overdraft => TransferError::Overdraft,
            AccountError::Overflow => TransferError::Overflow,
            AccountError::NegativeBalance => TransferError::NegativeBalance,
            AccountError::Closed => TransferError::AccountClosed,
        }
    }
}

/// The outcome of a successful transfer
#[derive(Clone, Debug, serde::Serialize)]
pub struct TransferResult {
    pub timestamp: DateTime<Utc>,
    /// The source account right after the transfer
    pub source: AccountSnapshot,
    /// The target account right after the transfer
    pub target: AccountSnapshot,
}

impl TransferResult {
    /// The transfer token a caller must present to transfer between the same
    /// two accounts again
    pub fn token(&self) -> String {
        format_token(&self.source, &self.target)
    }
}

/// Computes the optimistic-concurrency token of an ordered account pair
///
/// The token changes whenever either account is credited or debited. Callers
/// compare a previously observed token against a fresh one before issuing a
/// transfer; the ledger itself never does.
pub fn compute_transfer_token(a: &Account, b: &Account) -> String {
    format_token(&a.snapshot(), &b.snapshot())
}

fn format_token(a: &AccountSnapshot, b: &AccountSnapshot) -> String {
    format!("{}-{}-{}-{}", a.number, a.version, b.number, b.version)
}

/// Returns two account numbers in the order their locks must be acquired
///
/// Every transfer locks the lower number first, whatever its direction, so
/// concurrent transfers can never wait on each other in a cycle.
pub fn lock_order(a: AccountNumber, b: AccountNumber) -> (AccountNumber, AccountNumber) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// The entry point to the ledger
///
/// All operations are synchronous and may be called from any number of threads.
/// The only blocking points are account locks taken during [`TransferService::transfer`].
#[derive(Debug)]
pub struct TransferService {
    bank: Bank,
}

impl TransferService {
    pub fn new(bank: Bank) -> Self {
        Self { bank }
    }

    pub fn bank(&self) -> &Bank {
        &self.bank
    }

    pub fn customers(&self) -> Vec<Arc<Customer>> {
        self.bank.customers()
    }

    /// Registers a customer
    ///
    /// Returns `false` if a customer with the same id already exists.
    pub fn add_customer(&self, customer: Arc<Customer>) -> bool {
        let id = customer.id().clone();
        let added = self.bank.add_customer(customer);
        if added {
            info!(customer = %id, "added customer");
        }

        added
    }

    pub fn find_customer(&self, id: &str) -> Option<Arc<Customer>> {
        self.bank.find_customer(id)
    }

    pub fn is_customer(&self, customer: &Customer) -> bool {
        self.bank.is_customer(customer)
    }

    /// Removes a customer that no longer owns any accounts
    pub fn delete_customer(&self, customer: &Customer) -> Result<bool, TransferError> {
        if customer.has_accounts() {
            return Err(TransferError::HasAccounts(customer.id().clone()));
        }

        let deleted = self.bank.delete_customer(customer);
        if deleted {
            info!(customer = %customer.id(), "deleted customer");
        }

        Ok(deleted)
    }

    /// Creates a new account for `owner` with a freshly allocated number
    ///
    /// The account is not registered yet, see [`TransferService::add_account`].
    pub fn open_account(
        &self,
        owner: &Arc<Customer>,
        account_type: AccountType,
        balance: Amount,
    ) -> Result<Arc<Account>, TransferError> {
        let number = self.bank
            .next_account_number()
            .ok_or(TransferError::AccountNumbersExhausted)?;
        let account = Account::with_balance(number, account_type, owner, balance)?;

        Ok(Arc::new(account))
    }

    /// Registers an account with its owner
    ///
    /// Returns `false` if the owner already has an account with the same number,
    /// if the owner no longer exists or if the account was closed.
    pub fn add_account(&self, account: Arc<Account>) -> bool {
        let owner = match account.customer() {
            Some(owner) if !account.is_closed() => owner,
            _ => return false,
        };
        let number = account.number();
        let added = owner.add_account(account);
        if added {
            info!(customer = %owner.id(), account = %number, "added account");
        }

        added
    }

    pub fn find_account(&self, owner: &Customer, number: AccountNumber) -> Option<Arc<Account>> {
        owner.find_account(number)
    }

    /// Removes an account whose balance is zero from its owner and closes it
    ///
    /// The account stays locked from the balance check until it is closed, so
    /// no transfer can slip funds into it. Returns `false` if the account is not
    /// registered.
    pub fn delete_account(&self, account: &Account) -> Result<bool, TransferError> {
        let mut funds = account.lock();
        if funds.balance() != Amount::ZERO {
            return Err(TransferError::NonZeroBalance(account.number()));
        }
        if funds.is_closed() {
            return Ok(false);
        }

        let owner = match account.customer() {
            Some(owner) => owner,
            None => return Ok(false),
        };
        let deleted = owner.delete_account(account);
        if deleted {
            funds.close();
            info!(customer = %owner.id(), account = %account.number(), "deleted account");
        }

        Ok(deleted)
    }

    /// Moves `amount` from `source` to `target`, both owned by `owner`
    ///
    /// Either both accounts are changed, and each version grows by one, or
    /// neither is touched.
    pub fn transfer(
        &self,
        owner: &Customer,
        source: &Account,
        target: &Account,
        amount: Amount,
    ) -> Result<TransferResult, TransferError> {
        if source.number() == target.number() {
            return Err(TransferError::SameAccount);
        }
        if amount <= Amount::ZERO {
            return Err(TransferError::InvalidAmount);
        }
        for account in [source, target] {
            if account.owner() != owner.id() {
                return Err(TransferError::NotOwned {
                    account: account.number(),
                    customer: owner.id().clone(),
                });
            }
        }
        // checked again under lock
        if amount > source.balance() {
            return Err(TransferError::InsufficientFunds);
        }

        let (first, second) = lock_order(source.number(), target.number());
        debug!(first = %first, second = %second, "acquiring account locks");
        let (mut source_funds, mut target_funds) = if first == source.number() {
            let source_funds = source.lock();
            (source_funds, target.lock())
        } else {
            let target_funds = target.lock();
            (source.lock(), target_funds)
        };

        let result = settle(&mut source_funds, &mut target_funds, amount)?;
        drop(target_funds);
        drop(source_funds);

        info!(
            customer = %owner.id(),
            source = %source.number(),
            target = %target.number(),
            amount = %amount,
            "transferred funds"
        );

        Ok(result)
    }

}

/// Debits `source` and credits `target` while both locks are held
///
/// Both new balances are computed before either is stored, so a failure on
/// either side leaves both accounts as they were.
fn settle(
    source: &mut AccountGuard<'_>,
    target: &mut AccountGuard<'_>,
    amount: Amount,
) -> Result<TransferResult, TransferError> {
    let debited = source.checked_debit(amount)?;
    let credited = target.checked_credit(amount)?;
    source.commit(debited);
    target.commit(credited);

    Ok(TransferResult {
        timestamp: Utc::now(),
        source: source.snapshot(),
        target: target.snapshot(),
    })
}
