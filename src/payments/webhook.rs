use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha512;
use subtle::ConstantTimeEq;

type HmacSha512 = Hmac<Sha512>;

/// Paystack signs the raw body with HMAC-SHA512 keyed by the secret key and
/// sends the hex digest in `x-paystack-signature`.
pub fn verify_paystack_signature(secret_key: &str, payload: &[u8], signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha512::new_from_slice(secret_key.as_bytes()) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

/// Flutterwave echoes a shared secret in the `verif-hash` header.
pub fn verify_flutterwave_hash(expected_hash: &str, received: &str) -> bool {
    expected_hash.as_bytes().ct_eq(received.as_bytes()).into()
}

#[derive(Debug, Deserialize)]
pub struct PaystackEvent {
    pub event: String,
    pub data: PaystackEventData,
}

#[derive(Debug, Deserialize)]
pub struct PaystackEventData {
    pub reference: String,
}

#[derive(Debug, Deserialize)]
pub struct FlutterwaveEvent {
    #[serde(default)]
    pub event: String,
    pub data: FlutterwaveEventData,
}

#[derive(Debug, Deserialize)]
pub struct FlutterwaveEventData {
    pub tx_ref: String,
    #[serde(default)]
    pub status: String,
}

impl PaystackEvent {
    pub fn is_successful_charge(&self) -> bool {
        self.event == "charge.success"
    }
}

impl FlutterwaveEvent {
    pub fn is_successful_charge(&self) -> bool {
        self.event == "charge.completed" && self.data.status == "successful"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, payload: &[u8]) -> String {
        let mut mac = HmacSha512::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_paystack_signature() {
        let payload = br#"{"event":"charge.success","data":{"reference":"SM_1"}}"#;
        let signature = sign("sk_test_secret", payload);

        assert!(verify_paystack_signature("sk_test_secret", payload, &signature));
        assert!(!verify_paystack_signature("sk_test_other", payload, &signature));
        assert!(!verify_paystack_signature("sk_test_secret", b"{}", &signature));
        assert!(!verify_paystack_signature("sk_test_secret", payload, "not-hex"));
    }

    #[test]
    fn test_flutterwave_hash() {
        assert!(verify_flutterwave_hash("my-hash", "my-hash"));
        assert!(!verify_flutterwave_hash("my-hash", "my-has"));
        assert!(!verify_flutterwave_hash("my-hash", ""));
    }

    #[test]
    fn test_event_parsing() {
        let event: PaystackEvent = serde_json::from_str(
            r#"{"event":"charge.success","data":{"reference":"SM_1","amount":100}}"#,
        )
        .unwrap();
        assert!(event.is_successful_charge());
        assert_eq!(event.data.reference, "SM_1");

        let event: FlutterwaveEvent = serde_json::from_str(
            r#"{"event":"charge.completed","data":{"tx_ref":"SMF_1","status":"failed"}}"#,
        )
        .unwrap();
        assert!(!event.is_successful_charge());
    }
}
