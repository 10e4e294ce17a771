use super::payment::PaymentProof;
use crate::error::{RegistrationError, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_LEN: usize = 32;

/// Proof that passed signature verification. Only [`PaymentVerifier`] builds one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedPayment {
    order_id: String,
    payment_id: String,
}

impl VerifiedPayment {
    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    pub fn payment_id(&self) -> &str {
        &self.payment_id
    }
}

/// Checks gateway payment signatures: `hex(HMAC-SHA256(secret, order_id|payment_id))`.
#[derive(Clone)]
pub struct PaymentVerifier {
    secret: Vec<u8>,
}

impl fmt::Debug for PaymentVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentVerifier")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl PaymentVerifier {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn mac(&self, order_id: &str, payment_id: &str) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| RegistrationError::InternalError(e.to_string().into()))?;
        mac.update(order_id.as_bytes());
        mac.update(b"|");
        mac.update(payment_id.as_bytes());
        Ok(mac)
    }

    /// Signature the gateway would issue for this pair.
    pub fn sign(&self, order_id: &str, payment_id: &str) -> Result<String> {
        let mac = self.mac(order_id, payment_id)?;
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    pub fn verify(&self, proof: &PaymentProof) -> Result<VerifiedPayment> {
        let order_id = proof.order_id.trim();
        let payment_id = proof.payment_id.trim();
        if order_id.is_empty() {
            return Err(RegistrationError::VerificationError(
                "missing order id".to_string(),
            ));
        }
        if payment_id.is_empty() {
            return Err(RegistrationError::VerificationError(
                "missing payment id".to_string(),
            ));
        }

        let provided = hex::decode(proof.signature.trim()).map_err(|_| {
            RegistrationError::VerificationError("signature is not valid hex".to_string())
        })?;
        if provided.len() != SIGNATURE_LEN {
            return Err(RegistrationError::VerificationError(
                "signature has the wrong length".to_string(),
            ));
        }

        // verify_slice compares in constant time
        self.mac(order_id, payment_id)?
            .verify_slice(&provided)
            .map_err(|_| RegistrationError::VerificationError("signature mismatch".to_string()))?;

        Ok(VerifiedPayment {
            order_id: order_id.to_string(),
            payment_id: payment_id.to_string(),
        })
    }

    #[cfg(test)]
    fn check(&self, proof: &PaymentProof) -> bool {
        self.verify(proof).is_ok()
    }
}
