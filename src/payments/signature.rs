use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Lowercase hex HMAC-SHA256 over `order_id|payment_id`, the string Razorpay
/// signs after a successful checkout.
pub fn expected_signature(secret: &str, order_id: &str, payment_id: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time comparison of the client-supplied signature against the
/// expected one. Only the exact expected string passes: no trimming, no case
/// folding.
pub fn verify_signature(secret: &str, order_id: &str, payment_id: &str, signature: &str) -> bool {
    let expected = expected_signature(secret, order_id, payment_id);
    bool::from(expected.as_bytes().ct_eq(signature.as_bytes()))
}
