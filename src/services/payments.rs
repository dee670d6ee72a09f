use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

/// What the provider hands back when asked for a payable transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Opaque token the storefront uses to drive the provider's pay sheet.
    pub transaction_token: String,
    /// Set when the provider reports the order as already settled.
    pub already_settled: bool,
}

/// Returned to the caller of `OrderService::request_payment`.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentHandle {
    pub order_number: String,
    pub transaction_token: String,
}

/// External payment collaborator. Settlement confirmation arrives
/// out-of-band through `OrderService::apply_payment`.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_payment(
        &self,
        order_number: &str,
        amount: Decimal,
        description: &str,
        payer_identity: &str,
    ) -> Result<PaymentIntent, ServiceError>;
}

/// Placeholder provider for deployments where payment is wired up
/// elsewhere; refuses to create transactions.
#[derive(Debug, Default)]
pub struct DisabledPaymentProvider;

#[async_trait]
impl PaymentProvider for DisabledPaymentProvider {
    async fn create_payment(
        &self,
        order_number: &str,
        _amount: Decimal,
        _description: &str,
        _payer_identity: &str,
    ) -> Result<PaymentIntent, ServiceError> {
        Err(ServiceError::PaymentFailed(format!(
            "no payment provider configured (order {})",
            order_number
        )))
    }
}
