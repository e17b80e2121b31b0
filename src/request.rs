use tracing::warn;

use crate::{
    compute_transfer_token, AccountNumber, Amount, CustomerId, ErrorKind, TransferError,
    TransferResult, TransferService,
};

/// Possible errors to occur while processing a transfer request
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("Customer {0} not found")]
    CustomerNotFound(CustomerId),
    #[error("Account #{number} of customer {customer} not found")]
    AccountNotFound {
        customer: CustomerId,
        number: AccountNumber,
    },
    #[error("Transfer token {presented} is outdated, the current token is {current}")]
    StaleVersion {
        presented: String,
        current: String,
    },
    #[error(transparent)]
    Transfer(#[from] TransferError),
}

impl RequestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RequestError::CustomerNotFound(_) | RequestError::AccountNotFound { .. } => ErrorKind::NotFound,
            RequestError::StaleVersion { .. } => ErrorKind::StaleVersion,
            RequestError::Transfer(error) => error.kind(),
        }
    }
}

/// A request to move funds between two accounts of one customer
///
/// When `token` is present, the transfer only goes ahead if neither account
/// changed since the caller computed it.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
pub struct TransferRequest {
    pub customer: CustomerId,
    pub source: AccountNumber,
    pub target: AccountNumber,
    pub amount: Amount,
    #[serde(default)]
    pub token: Option<String>,
}

/// Resolves the request's entities and executes it as a conditional transfer
pub fn process_transfer(
    service: &TransferService,
    request: &TransferRequest,
) -> Result<TransferResult, RequestError> {
    let result = try_transfer(service, request);
    if let Err(error) = &result {
        warn!(
            customer = %request.customer,
            source = %request.source,
            target = %request.target,
            amount = %request.amount,
            %error,
            "rejected transfer"
        );
    }

    result
}

fn try_transfer(
    service: &TransferService,
    request: &TransferRequest,
) -> Result<TransferResult, RequestError> {
    let owner = service
        .find_customer(request.customer.as_str())
        .ok_or_else(|| RequestError::CustomerNotFound(request.customer.clone()))?;
    let find_account = |number| {
        service
            .find_account(&owner, number)
            .ok_or_else(|| RequestError::AccountNotFound {
                customer: request.customer.clone(),
                number,
            })
    };
    let source = find_account(request.source)?;
    let target = find_account(request.target)?;

    if let Some(presented) = &request.token {
        let current = compute_transfer_token(&source, &target);
        if *presented != current {
            return Err(RequestError::StaleVersion {
                presented: presented.clone(),
                current,
            });
        }
    }

    Ok(service.transfer(&owner, &source, &target, request.amount)?)
}
