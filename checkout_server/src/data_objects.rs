use std::fmt::Display;

use checkout_engine::db_types::LedgerId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// The reply to a client payment confirmation. A confirmation for an order that was already settled is still `ok`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationResponse {
    pub ok: bool,
    pub ledger_id: LedgerId,
}

impl ConfirmationResponse {
    pub fn ok(ledger_id: LedgerId) -> Self {
        Self { ok: true, ledger_id }
    }
}

/// Optional body for the back-office status actions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminNote {
    #[serde(default)]
    pub note: Option<String>,
}
