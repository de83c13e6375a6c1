use std::collections::BTreeMap;

use crate::config::RobokassaConfig;
use crate::error::{AppError, AppResult};

/// Robokassa merchant payment form endpoint.
pub const PAYMENT_URL: &str = "https://auth.robokassa.ru/Merchant/Index.aspx";

#[derive(Clone)]
pub struct RobokassaService {
    config: RobokassaConfig,
}

impl RobokassaService {
    pub fn new(config: RobokassaConfig) -> Self {
        Self { config }
    }

    pub fn merchant_login(&self) -> &str {
        &self.config.merchant_login
    }

    /// Digest for outbound payment links:
    /// MD5(MerchantLogin:OutSum:InvId:Password#1).
    fn outbound_signature(&self, out_sum: &str, inv_id: i64) -> String {
        let payload = format!(
            "{}:{}:{}:{}",
            self.config.merchant_login, out_sum, inv_id, self.config.password1
        );
        format!("{:x}", md5::compute(payload.as_bytes()))
    }

    /// Digest for inbound result notifications:
    /// MD5(OutSum:InvId:Password#2[:Shp_key=value ...]), custom parameters
    /// appended in ascending key order regardless of wire order.
    fn inbound_signature(
        &self,
        out_sum: &str,
        inv_id: i64,
        custom_params: &BTreeMap<String, String>,
    ) -> String {
        let mut payload = format!("{}:{}:{}", out_sum, inv_id, self.config.password2);
        for (key, value) in custom_params {
            payload.push(':');
            payload.push_str(key);
            payload.push('=');
            payload.push_str(value);
        }
        format!("{:x}", md5::compute(payload.as_bytes()))
    }

    /// Check the signature of a result notification. Pure; a `false` carries
    /// no side effects and the caller decides the consequence. OutSum must be
    /// the exact string from the wire, since re-formatting changes the digest.
    pub fn verify_result(
        &self,
        out_sum: &str,
        inv_id: i64,
        custom_params: &BTreeMap<String, String>,
        provided: &str,
    ) -> bool {
        let expected = self.inbound_signature(out_sum, inv_id, custom_params);
        expected.eq_ignore_ascii_case(provided)
    }

    /// Assemble the signed redirect URL for the payment form. Custom params
    /// go into the URL verbatim; the inbound verifier reconstructs the same
    /// key=value pairs after form decoding.
    pub fn build_payment_url(
        &self,
        out_sum: &str,
        inv_id: i64,
        description: &str,
        custom_params: &BTreeMap<String, String>,
    ) -> AppResult<String> {
        let signature = self.outbound_signature(out_sum, inv_id);

        let mut params: Vec<(&str, String)> = vec![
            ("MerchantLogin", self.config.merchant_login.clone()),
            ("OutSum", out_sum.to_string()),
            ("InvId", inv_id.to_string()),
            ("Description", description.to_string()),
            ("SignatureValue", signature),
        ];
        for (key, value) in custom_params {
            params.push((key.as_str(), value.clone()));
        }
        if self.config.test_mode {
            params.push(("IsTest", "1".to_string()));
        }

        let query = serde_urlencoded::to_string(&params)
            .map_err(|e| AppError::InternalError(format!("Failed to encode payment URL: {e}")))?;
        Ok(format!("{PAYMENT_URL}?{query}"))
    }

    /// Body Robokassa expects on a successfully processed notification.
    pub fn result_response(inv_id: i64) -> String {
        format!("OK{inv_id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> RobokassaService {
        RobokassaService::new(RobokassaConfig {
            merchant_login: "demo_shop".to_string(),
            password1: "pwd1".to_string(),
            password2: "pwd2".to_string(),
            test_mode: false,
        })
    }

    #[test]
    fn inbound_signature_matches_documented_format() {
        let service = test_service();
        let expected = format!("{:x}", md5::compute("500.00:123456789:pwd2"));
        assert!(service.verify_result("500.00", 123456789, &BTreeMap::new(), &expected));
    }

    #[test]
    fn inbound_signature_is_case_insensitive() {
        let service = test_service();
        let digest = format!("{:x}", md5::compute("500.00:123456789:pwd2")).to_uppercase();
        assert!(service.verify_result("500.00", 123456789, &BTreeMap::new(), &digest));
    }

    #[test]
    fn forged_signature_is_rejected() {
        let service = test_service();
        assert!(!service.verify_result(
            "500.00",
            123456789,
            &BTreeMap::new(),
            "deadbeefdeadbeefdeadbeefdeadbeef"
        ));
        assert!(!service.verify_result("500.00", 123456789, &BTreeMap::new(), ""));
    }

    #[test]
    fn reformatted_amount_breaks_signature() {
        let service = test_service();
        let digest = format!("{:x}", md5::compute("500.00:42:pwd2"));
        assert!(service.verify_result("500.00", 42, &BTreeMap::new(), &digest));
        assert!(!service.verify_result("500.0", 42, &BTreeMap::new(), &digest));
        assert!(!service.verify_result("500", 42, &BTreeMap::new(), &digest));
    }

    #[test]
    fn custom_params_are_canonicalized_by_key_order() {
        let service = test_service();
        let digest = format!(
            "{:x}",
            md5::compute("99.90:7:pwd2:Shp_plan=monthly:Shp_user=11")
        );

        // Insertion order on the wire must not matter.
        let mut forward = BTreeMap::new();
        forward.insert("Shp_plan".to_string(), "monthly".to_string());
        forward.insert("Shp_user".to_string(), "11".to_string());

        let mut reversed = BTreeMap::new();
        reversed.insert("Shp_user".to_string(), "11".to_string());
        reversed.insert("Shp_plan".to_string(), "monthly".to_string());

        assert!(service.verify_result("99.90", 7, &forward, &digest));
        assert!(service.verify_result("99.90", 7, &reversed, &digest));
    }

    #[test]
    fn outbound_and_inbound_modes_differ() {
        let service = test_service();
        let outbound = service.outbound_signature("500.00", 1);
        let inbound = service.inbound_signature("500.00", 1, &BTreeMap::new());
        assert_ne!(outbound, inbound);
        assert_eq!(
            outbound,
            format!("{:x}", md5::compute("demo_shop:500.00:1:pwd1"))
        );
    }

    #[test]
    fn payment_url_carries_all_signed_parameters() {
        let service = test_service();
        let mut custom = BTreeMap::new();
        custom.insert("Shp_user".to_string(), "11".to_string());

        let url = service
            .build_payment_url("500.00", 123456789, "Monthly subscription", &custom)
            .unwrap();

        assert!(url.starts_with(PAYMENT_URL));
        assert!(url.contains("MerchantLogin=demo_shop"));
        assert!(url.contains("OutSum=500.00"));
        assert!(url.contains("InvId=123456789"));
        assert!(url.contains("Shp_user=11"));
        assert!(url.contains(&format!(
            "SignatureValue={}",
            service.outbound_signature("500.00", 123456789)
        )));
        assert!(!url.contains("IsTest"));
    }

    #[test]
    fn test_mode_adds_is_test_flag() {
        let service = RobokassaService::new(RobokassaConfig {
            merchant_login: "demo_shop".to_string(),
            password1: "pwd1".to_string(),
            password2: "pwd2".to_string(),
            test_mode: true,
        });
        let url = service
            .build_payment_url("500.00", 1, "Test", &BTreeMap::new())
            .unwrap();
        assert!(url.contains("IsTest=1"));
    }

    #[test]
    fn result_response_echoes_invoice_id() {
        assert_eq!(RobokassaService::result_response(123456789), "OK123456789");
    }
}
