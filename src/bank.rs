use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::account::AccountNumber;
use crate::customer::{Customer, CustomerId};

/// A banking institution and the registry of its customers
///
/// The bank also hands out account numbers. Numbers are unique per bank, so
/// independent banks (e.g. in tests) never interfere with each other.
#[derive(Debug)]
pub struct Bank {
    id: u32,
    name: String,
    customers: Mutex<HashMap<CustomerId, Arc<Customer>>>,
    last_account_number: AtomicU32,
}

impl Bank {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            customers: Mutex::new(HashMap::new()),
            last_account_number: AtomicU32::new(0),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Allocates the next unused account number, starting at 1
    ///
    /// Returns `None` once every number has been handed out. Numbers are never
    /// reused.
    pub fn next_account_number(&self) -> Option<AccountNumber> {
        self.last_account_number
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |last| last.checked_add(1))
            .ok()
            .map(|last| AccountNumber::new(last + 1))
    }

    /// Adds a customer to the registry
    ///
    /// Returns `false` if a customer with the same id is already registered.
    pub fn add_customer(&self, customer: Arc<Customer>) -> bool {
        match self.customers.lock().entry(customer.id().clone()) {
            Entry::Vacant(v) => {
                v.insert(customer);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Removes a customer from the registry
    ///
    /// Returns `false` if no customer with the same id is registered.
    pub fn delete_customer(&self, customer: &Customer) -> bool {
        self.customers.lock()
            .remove(customer.id())
            .is_some()
    }

    pub fn is_customer(&self, customer: &Customer) -> bool {
        self.customers.lock().contains_key(customer.id())
    }

    pub fn find_customer(&self, id: &str) -> Option<Arc<Customer>> {
        self.customers.lock()
            .get(id)
            .cloned()
    }

    /// A copy of all registered customers, ordered by id
    pub fn customers(&self) -> Vec<Arc<Customer>> {
        let mut customers = self.customers.lock()
            .values()
            .cloned()
            .collect::<Vec<_>>();
        customers.sort_by(|a, b| a.id().cmp(b.id()));
        customers
    }
}

#[cfg(test)]
impl Bank {
    pub(crate) fn skip_account_numbers_to(&self, last: u32) {
        self.last_account_number.store(last, Ordering::Relaxed);
    }
}

impl fmt::Display for Bank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{})", self.name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customer::tests::bob_wire;

    #[test]
    fn add_customer() {
        let bank = Bank::new(1, "Test Bank");

        assert!(bank.add_customer(Arc::new(bob_wire("123"))));
        assert!(!bank.add_customer(Arc::new(bob_wire("123"))));
        assert!(bank.add_customer(Arc::new(bob_wire("456"))));
        assert_eq!(bank.customers().len(), 2);
    }

    #[test]
    fn find_customer() {
        let bank = Bank::new(1, "Test Bank");
        bank.add_customer(Arc::new(bob_wire("123")));

        assert_eq!(bank.find_customer("123").unwrap().id().as_str(), "123");
        assert!(bank.find_customer("456").is_none());
    }

    #[test]
    fn delete_customer() {
        let bank = Bank::new(1, "Test Bank");
        let customer = bob_wire("123");
        bank.add_customer(Arc::new(bob_wire("123")));

        assert!(bank.is_customer(&customer));
        assert!(bank.delete_customer(&customer));
        assert!(!bank.delete_customer(&customer));
        assert!(!bank.is_customer(&customer));
    }

    #[test]
    fn customers_is_a_sorted_copy() {
        let bank = Bank::new(1, "Test Bank");
        bank.add_customer(Arc::new(bob_wire("b")));
        bank.add_customer(Arc::new(bob_wire("a")));

        let mut customers = bank.customers();
        let ids = customers.iter().map(|c| c.id().as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["a", "b"]);

        customers.clear();
        assert_eq!(bank.customers().len(), 2);
    }

    #[test]
    fn account_numbers_are_scoped_to_the_bank() {
        let first = Bank::new(1, "First");
        let second = Bank::new(2, "Second");

        assert_eq!(first.next_account_number(), Some(AccountNumber::new(1)));
        assert_eq!(first.next_account_number(), Some(AccountNumber::new(2)));
        assert_eq!(second.next_account_number(), Some(AccountNumber::new(1)));
    }

    #[test]
    fn account_numbers_run_out() {
        let bank = Bank::new(1, "Test Bank");
        bank.skip_account_numbers_to(u32::MAX - 1);

        assert_eq!(bank.next_account_number(), Some(AccountNumber::new(u32::MAX)));
        assert_eq!(bank.next_account_number(), None);
        assert_eq!(bank.next_account_number(), None);
    }
}
