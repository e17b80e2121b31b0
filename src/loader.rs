//! Bulk loading of customers and accounts from CSV fixtures

use std::io;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::{
    AccountType, Address, Amount, Customer, CustomerId, Gender, Image, Profile, TransferError,
    TransferService,
};

/// Possible errors to occur while loading fixtures
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Transfer(#[from] TransferError),
}

#[derive(Debug, serde::Deserialize)]
struct CustomerRecord {
    id: CustomerId,
    first_name: String,
    last_name: String,
    gender: Gender,
    street: String,
    city: String,
    state: String,
    zip: String,
    phone: String,
    email: Option<String>,
    birth_date: NaiveDate,
    image_src: Option<String>,
    image_alt: Option<String>,
}

impl From<CustomerRecord> for Customer {
    fn from(record: CustomerRecord) -> Self {
        let images = match record.image_src {
            Some(src) => vec![Image { src, alt: record.image_alt.unwrap_or_default() }],
            None => Vec::new(),
        };

        Customer::new(
            record.id,
            Profile {
                first_name: record.first_name,
                last_name: record.last_name,
                gender: record.gender,
                address: Address {
                    street: record.street,
                    city: record.city,
                    state: record.state,
                    zip: record.zip,
                },
                phone: record.phone,
                email: record.email,
                birth_date: record.birth_date,
                images,
            },
        )
    }
}

#[derive(Debug, serde::Deserialize)]
struct AccountRecord {
    customer: CustomerId,
    #[serde(rename = "type")]
    account_type: AccountType,
    balance: Option<Amount>,
}

fn csv_reader<R: io::Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

/// Registers every customer listed in `reader`
///
/// Customers whose id is already taken are skipped. Returns the number of
/// customers added.
pub fn load_customers<R: io::Read>(service: &TransferService, reader: R) -> Result<usize, LoadError> {
    let mut loaded = 0;
    for record in csv_reader(reader).deserialize::<CustomerRecord>() {
        let customer = Customer::from(record?);
        let id = customer.id().clone();
        match service.add_customer(Arc::new(customer)) {
            true => loaded += 1,
            false => warn!(customer = %id, "skipped duplicate customer"),
        }
    }
    info!(loaded, "loaded customers");

    Ok(loaded)
}

/// Opens and registers every account listed in `reader`
///
/// Each account gets a new number from the bank. A missing balance means an
/// empty account. Returns the number of accounts added.
pub fn load_accounts<R: io::Read>(service: &TransferService, reader: R) -> Result<usize, LoadError> {
    let mut loaded = 0;
    for record in csv_reader(reader).deserialize::<AccountRecord>() {
        let record = record?;
        let owner = service
            .find_customer(record.customer.as_str())
            .ok_or(TransferError::UnknownCustomer(record.customer))?;
        let account = service.open_account(
            &owner,
            record.account_type,
            record.balance.unwrap_or(Amount::ZERO),
        )?;
        if service.add_account(account) {
            loaded += 1;
        }
    }
    info!(loaded, "loaded accounts");

    Ok(loaded)
}
