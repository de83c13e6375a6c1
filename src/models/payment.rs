use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

/// A payment attempt as recorded in the ledger. Rows are append-only except
/// for the single pending -> completed/failed transition.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct Payment {
    pub id: i64,
    pub user_id: i64,
    /// Robokassa InvId; unique, assigned at link-creation time.
    pub transaction_id: i64,
    /// Exact decimal string used in the signature, e.g. "500.00".
    pub amount: String,
    pub status: PaymentStatus,
    pub created_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}

/// Outcome of a ledger completion, to be applied to the subscription by the
/// caller. `newly_completed` is false on a redelivered notification, in which
/// case the subscription must not be touched again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentDelta {
    pub user_id: i64,
    pub amount: String,
    pub newly_completed: bool,
}

/// A Robokassa result notification, parsed and validated before any field
/// reaches a signature computation or storage write.
#[derive(Debug, Clone)]
pub struct ResultNotification {
    pub merchant_login: String,
    /// Kept as the exact wire string; re-formatting would break the digest.
    pub out_sum: String,
    pub inv_id: i64,
    pub signature: String,
    /// Shp_* parameters, sorted by key.
    pub custom_params: BTreeMap<String, String>,
}

impl ResultNotification {
    pub fn from_form(form: &HashMap<String, String>) -> AppResult<Self> {
        let merchant_login = form
            .get("MerchantLogin")
            .cloned()
            .ok_or_else(|| AppError::ValidationError("Missing MerchantLogin".to_string()))?;

        let out_sum = form
            .get("OutSum")
            .cloned()
            .ok_or_else(|| AppError::ValidationError("Missing OutSum".to_string()))?;
        if out_sum.parse::<f64>().is_err() {
            return Err(AppError::ValidationError(format!(
                "OutSum is not a decimal: {out_sum}"
            )));
        }

        let inv_id = form
            .get("InvId")
            .ok_or_else(|| AppError::ValidationError("Missing InvId".to_string()))?
            .parse::<i64>()
            .map_err(|_| AppError::ValidationError("InvId is not an integer".to_string()))?;

        let signature = form
            .get("SignatureValue")
            .cloned()
            .ok_or_else(|| AppError::ValidationError("Missing SignatureValue".to_string()))?;

        let custom_params = form
            .iter()
            .filter(|(key, _)| key.starts_with("Shp_"))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(Self {
            merchant_login,
            out_sum,
            inv_id,
            signature,
            custom_params,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePaymentLinkRequest {
    pub user_id: i64,
    /// Defaults to the configured subscription price.
    pub amount: Option<String>,
    pub description: Option<String>,
    /// Shp_*-prefixed parameters echoed back by the gateway.
    #[serde(default)]
    pub custom_params: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentLinkResponse {
    pub url: String,
    pub inv_id: i64,
    pub out_sum: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_form() -> HashMap<String, String> {
        let mut form = HashMap::new();
        form.insert("MerchantLogin".to_string(), "demo_shop".to_string());
        form.insert("OutSum".to_string(), "500.00".to_string());
        form.insert("InvId".to_string(), "123456789".to_string());
        form.insert("SignatureValue".to_string(), "abc123".to_string());
        form
    }

    #[test]
    fn parses_a_well_formed_notification() {
        let mut form = base_form();
        form.insert("Shp_user".to_string(), "11".to_string());
        form.insert("Shp_plan".to_string(), "monthly".to_string());

        let n = ResultNotification::from_form(&form).unwrap();
        assert_eq!(n.merchant_login, "demo_shop");
        assert_eq!(n.out_sum, "500.00");
        assert_eq!(n.inv_id, 123456789);
        assert_eq!(n.signature, "abc123");

        let keys: Vec<&str> = n.custom_params.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["Shp_plan", "Shp_user"]);
    }

    #[test]
    fn missing_signature_is_rejected() {
        let mut form = base_form();
        form.remove("SignatureValue");
        assert!(ResultNotification::from_form(&form).is_err());
    }

    #[test]
    fn non_numeric_fields_are_rejected() {
        let mut form = base_form();
        form.insert("InvId".to_string(), "not-a-number".to_string());
        assert!(ResultNotification::from_form(&form).is_err());

        let mut form = base_form();
        form.insert("OutSum".to_string(), "five hundred".to_string());
        assert!(ResultNotification::from_form(&form).is_err());
    }

    #[test]
    fn non_shp_extras_are_ignored() {
        let mut form = base_form();
        form.insert("Fee".to_string(), "1.00".to_string());
        let n = ResultNotification::from_form(&form).unwrap();
        assert!(n.custom_params.is_empty());
    }
}
