//! Verification scan classifier
//!
//! Pure decision table: a scanned tracking number is classified by its
//! membership in the two loaded sheets. Pre-alerta rows are keyed by
//! tracking number, pre-ruteo rows by codigo de pedido; both are matched
//! against the same scanned code.

use crate::models::ScanStatus;

/// Normalize a scanned code before lookup
///
/// Scanner input arrives with stray whitespace and newlines from keyboard
/// wedge devices. Only surrounding whitespace is stripped; case and interior
/// characters are preserved because carrier codes are case-significant.
pub fn normalize_scan(raw: &str) -> &str {
    raw.trim()
}

/// Classify a scan by sheet membership
pub fn classify(in_pre_alerta: bool, in_pre_ruteo: bool) -> ScanStatus {
    match (in_pre_alerta, in_pre_ruteo) {
        (true, true) => ScanStatus::Ok,
        (true, false) => ScanStatus::FueraCobertura,
        (false, true) => ScanStatus::Previo,
        (false, false) => ScanStatus::Sobrante,
    }
}
