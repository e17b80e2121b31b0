pub use self::{
    account::{Account, AccountError, AccountNumber, AccountSnapshot, AccountType, Amount},
    bank::Bank,
    customer::{Address, Customer, CustomerId, Gender, Image, Profile},
    loader::{load_accounts, load_customers, LoadError},
    request::{process_transfer, RequestError, TransferRequest},
    service::{
        compute_transfer_token, lock_order, ErrorKind, TransferError, TransferResult,
        TransferService,
    },
};

mod account;
mod bank;
mod customer;
mod loader;
mod request;
mod service;
