use chrono::Utc;

use crate::errors::ServiceError;

/// The two redirect/IPN providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentProvider {
    MoMo,
    VnPay,
}

const MOMO_TAG: &str = "ORD";

fn now_ticks() -> i64 {
    Utc::now().timestamp_micros()
}

/// Builds a fresh correlation reference for the order. The two providers use
/// different segment orders; both embed the local order id.
pub fn generate_reference(provider: PaymentProvider, order_id: i64) -> String {
    match provider {
        PaymentProvider::MoMo => format!("{}_{}_{}", MOMO_TAG, order_id, now_ticks()),
        PaymentProvider::VnPay => format!("{}_{}", now_ticks(), order_id),
    }
}

/// Recovers the local order id from a reference echoed back in a callback.
///
/// The rules are deliberately kept per-provider instead of unified: MoMo puts
/// the order id in the second segment (`ORD_<id>_<ticks>`), VNPay in the last
/// (`<ticks>_<id>`).
pub fn parse_correlation_id(provider: PaymentProvider, raw: &str) -> Result<i64, ServiceError> {
    let segments: Vec<&str> = raw.split('_').collect();
    let segment = match provider {
        PaymentProvider::MoMo if segments.len() >= 2 => segments.get(1).copied(),
        PaymentProvider::VnPay if segments.len() >= 2 => segments.last().copied(),
        _ => None,
    };
    segment
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| {
            ServiceError::InvalidInput(format!("unrecognized correlation reference: {}", raw))
        })
}
