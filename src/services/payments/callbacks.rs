use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

use crate::{
    config::{MoMoConfig, VnpayConfig},
    errors::ServiceError,
    events::{Event, EventSender},
    models::order::{Order, PaymentStatus},
    repositories::OrderRepository,
};

use super::{
    correlation::{parse_correlation_id, PaymentProvider},
    signing::{canonical_signing_string, constant_time_eq, hmac_sha256_hex, hmac_sha512_hex},
};

/// MoMo result code for a completed payment.
const MOMO_CODE_SUCCESS: &str = "0";
/// MoMo result code for a payment the user cancelled on the wallet page.
const MOMO_CODE_USER_CANCELLED: &str = "1006";
/// VNPay response/transaction code for success.
const VNPAY_CODE_SUCCESS: &str = "00";
/// VNPay response code for a payment the customer abandoned.
const VNPAY_CODE_USER_CANCELLED: &str = "24";

/// Acknowledgment body MoMo expects; `status: "ok"` stops its retry loop.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MoMoAck {
    pub status: String,
    pub message: String,
}

impl MoMoAck {
    fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            message: "Callback processed successfully".to_string(),
        }
    }

    fn error() -> Self {
        // Deliberately vague: callbacks are unauthenticated input.
        Self {
            status: "error".to_string(),
            message: "Callback could not be processed".to_string(),
        }
    }
}

/// Acknowledgment body VNPay expects. `RspCode: "00"` signals "acknowledged"
/// regardless of whether the underlying payment succeeded.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VnpayAck {
    #[serde(rename = "RspCode")]
    pub rsp_code: String,
    #[serde(rename = "Message")]
    pub message: String,
}

impl VnpayAck {
    fn confirmed() -> Self {
        Self {
            rsp_code: "00".to_string(),
            message: "Confirm Success".to_string(),
        }
    }

    fn order_not_found() -> Self {
        Self {
            rsp_code: "01".to_string(),
            message: "Order not found".to_string(),
        }
    }

    fn invalid_signature() -> Self {
        Self {
            rsp_code: "97".to_string(),
            message: "Invalid signature".to_string(),
        }
    }

    fn internal_error() -> Self {
        Self {
            rsp_code: "99".to_string(),
            message: "Unknown error".to_string(),
        }
    }
}

enum CallbackOutcome {
    Success { transaction_id: Option<String> },
    UserCancelled,
    Failure { detail: String },
}

/// Validates inbound provider notifications and applies the resulting
/// payment-status transition exactly once.
pub struct CallbackVerifier {
    orders: Arc<dyn OrderRepository>,
    momo: MoMoConfig,
    vnpay: VnpayConfig,
    events: EventSender,
}

impl CallbackVerifier {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        momo: MoMoConfig,
        vnpay: VnpayConfig,
        events: EventSender,
    ) -> Self {
        Self {
            orders,
            momo,
            vnpay,
            events,
        }
    }

    /// Handles a MoMo IPN (form-encoded POST). Always returns an
    /// acknowledgment; retried duplicates re-receive the success body.
    #[instrument(skip(self, params))]
    pub async fn handle_momo_ipn(&self, params: &HashMap<String, String>) -> MoMoAck {
        let Some(raw_ref) = params.get("orderId") else {
            warn!("MoMo callback missing orderId");
            return MoMoAck::error();
        };

        let order = match self.load_order(PaymentProvider::MoMo, raw_ref).await {
            Ok(order) => order,
            Err(_) => return MoMoAck::error(),
        };

        if let Err(err) = self.verify_momo_signature(params) {
            warn!(order_id = order.id, "MoMo callback rejected: {}", err);
            return MoMoAck::error();
        }

        // Idempotency gate: settled orders are re-acked, never re-applied.
        if order.payment_status.is_terminal() {
            info!(order_id = order.id, status = %order.payment_status, "duplicate MoMo callback ignored");
            return MoMoAck::ok();
        }

        let result_code = params.get("resultCode").map(String::as_str).unwrap_or("");
        let outcome = match result_code {
            MOMO_CODE_SUCCESS => CallbackOutcome::Success {
                transaction_id: params.get("transId").cloned(),
            },
            MOMO_CODE_USER_CANCELLED => CallbackOutcome::UserCancelled,
            other => CallbackOutcome::Failure {
                detail: format!(
                    "resultCode={} message={}",
                    other,
                    params.get("message").map(String::as_str).unwrap_or("")
                ),
            },
        };

        match self.apply(order, outcome, params).await {
            Ok(()) => MoMoAck::ok(),
            Err(err) => {
                error!("failed to apply MoMo callback: {}", err);
                MoMoAck::error()
            }
        }
    }

    /// Handles a VNPay notification. The user-facing return redirect and the
    /// server-to-server IPN carry the same field shapes and share this path.
    #[instrument(skip(self, params))]
    pub async fn handle_vnpay_callback(&self, params: &HashMap<String, String>) -> VnpayAck {
        let Some(raw_ref) = params.get("vnp_TxnRef") else {
            warn!("VNPay callback missing vnp_TxnRef");
            return VnpayAck::order_not_found();
        };

        let order = match self.load_order(PaymentProvider::VnPay, raw_ref).await {
            Ok(order) => order,
            Err(_) => return VnpayAck::order_not_found(),
        };

        if let Err(err) = self.verify_vnpay_signature(params) {
            warn!(order_id = order.id, "VNPay callback rejected: {}", err);
            return VnpayAck::invalid_signature();
        }

        if order.payment_status.is_terminal() {
            info!(order_id = order.id, status = %order.payment_status, "duplicate VNPay callback ignored");
            return VnpayAck::confirmed();
        }

        let response_code = params
            .get("vnp_ResponseCode")
            .map(String::as_str)
            .unwrap_or("");
        let txn_status = params
            .get("vnp_TransactionStatus")
            .map(String::as_str)
            .unwrap_or("");
        let outcome = if response_code == VNPAY_CODE_SUCCESS && txn_status == VNPAY_CODE_SUCCESS {
            CallbackOutcome::Success {
                transaction_id: params.get("vnp_TransactionNo").cloned(),
            }
        } else if response_code == VNPAY_CODE_USER_CANCELLED {
            CallbackOutcome::UserCancelled
        } else {
            CallbackOutcome::Failure {
                detail: format!("ResponseCode={} Status={}", response_code, txn_status),
            }
        };

        match self.apply(order, outcome, params).await {
            Ok(()) => VnpayAck::confirmed(),
            Err(err) => {
                error!("failed to apply VNPay callback: {}", err);
                VnpayAck::internal_error()
            }
        }
    }

    /// Parses the correlation reference, loads the order, and checks the echo
    /// against the reference we handed the provider.
    async fn load_order(
        &self,
        provider: PaymentProvider,
        raw_ref: &str,
    ) -> Result<Order, ServiceError> {
        let order_id = parse_correlation_id(provider, raw_ref).map_err(|err| {
            warn!("callback carried an unparsable correlation reference: {}", err);
            err
        })?;

        let order = match self.orders.get(order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                warn!(order_id, "callback for unknown order");
                return Err(ServiceError::NotFound(format!("Order {} not found", order_id)));
            }
            Err(err) => {
                error!(order_id, "failed to load order: {}", err);
                return Err(err);
            }
        };

        if order.payment_reference.as_deref() != Some(raw_ref) {
            warn!(
                order_id,
                "correlation reference mismatch, expected {:?}", order.payment_reference
            );
            return Err(ServiceError::InvalidInput(
                "correlation reference mismatch".to_string(),
            ));
        }
        Ok(order)
    }

    /// Applies the transition and persists it as one version-checked write.
    /// Losing a race against a concurrent duplicate is not an error: the
    /// winner already settled the order, so the loser re-checks the gate.
    async fn apply(
        &self,
        mut order: Order,
        outcome: CallbackOutcome,
        params: &HashMap<String, String>,
    ) -> Result<(), ServiceError> {
        let audit = serde_json::to_string(&sorted(params))
            .unwrap_or_else(|_| "unserializable callback parameters".to_string());
        let order_id = order.id;

        let event = match outcome {
            CallbackOutcome::Success { transaction_id } => {
                order.transition(PaymentStatus::Approved)?;
                order.transaction_id = transaction_id.clone();
                order.payment_response = Some(audit);
                Event::PaymentApproved {
                    order_id,
                    transaction_id,
                }
            }
            CallbackOutcome::UserCancelled => {
                order.transition(PaymentStatus::Rejected)?;
                order.payment_response = Some(format!("Payment cancelled by user; {}", audit));
                Event::PaymentRejected {
                    order_id,
                    reason: "cancelled by user".to_string(),
                }
            }
            CallbackOutcome::Failure { detail } => {
                order.transition(PaymentStatus::Rejected)?;
                order.payment_response = Some(format!("Payment failed: {}; {}", detail, audit));
                Event::PaymentRejected {
                    order_id,
                    reason: detail,
                }
            }
        };

        match self.orders.update(order).await {
            Ok(_) => {
                self.events.send(event).await;
                Ok(())
            }
            Err(ServiceError::ConcurrentModification(id)) => {
                match self.orders.get(id).await? {
                    Some(current) if current.payment_status.is_terminal() => {
                        info!(order_id = id, "concurrent duplicate already settled the order");
                        Ok(())
                    }
                    _ => Err(ServiceError::ConcurrentModification(id)),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Recomputes the MoMo digest over every inbound parameter except the
    /// signature itself. The check runs even against sandbox credentials.
    fn verify_momo_signature(&self, params: &HashMap<String, String>) -> Result<(), ServiceError> {
        let Some(provided) = params.get("signature") else {
            return Err(ServiceError::SignatureVerificationFailed(
                "missing signature".to_string(),
            ));
        };
        let canonical: BTreeMap<String, String> = params
            .iter()
            .filter(|(k, _)| k.as_str() != "signature")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let expected =
            hmac_sha256_hex(&self.momo.secret_key, &canonical_signing_string(&canonical));
        if constant_time_eq(&expected, provided) {
            Ok(())
        } else {
            Err(ServiceError::SignatureVerificationFailed(
                "digest mismatch".to_string(),
            ))
        }
    }

    /// Recomputes the VNPay digest over the `vnp_`-prefixed parameters,
    /// excluding the hash fields themselves.
    fn verify_vnpay_signature(&self, params: &HashMap<String, String>) -> Result<(), ServiceError> {
        let Some(provided) = params.get("vnp_SecureHash") else {
            return Err(ServiceError::SignatureVerificationFailed(
                "missing vnp_SecureHash".to_string(),
            ));
        };
        let canonical: BTreeMap<String, String> = params
            .iter()
            .filter(|(k, _)| {
                k.starts_with("vnp_")
                    && k.as_str() != "vnp_SecureHash"
                    && k.as_str() != "vnp_SecureHashType"
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let expected =
            hmac_sha512_hex(&self.vnpay.hash_secret, &canonical_signing_string(&canonical));
        if constant_time_eq(&expected, provided) {
            Ok(())
        } else {
            Err(ServiceError::SignatureVerificationFailed(
                "digest mismatch".to_string(),
            ))
        }
    }
}

fn sorted(params: &HashMap<String, String>) -> BTreeMap<&str, &str> {
    params
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect()
}
