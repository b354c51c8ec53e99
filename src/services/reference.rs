//! Reference numbers and signed QR verification payloads for issued
//! documents. A reference is `PREFIX-YYYYMMDD-XXXXXXXX`; the QR payload is a
//! pipe-joined claims blob with an HMAC-SHA256 tag so the public verify
//! endpoint can reject forgeries without a database hit.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// `PREFIX-YYYYMMDD-` followed by 8 random uppercase alphanumerics.
pub fn generate_reference(prefix: &str) -> String {
    let tail: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(|b| (b as char).to_ascii_uppercase())
        .collect();
    format!("{}-{}-{}", prefix, Utc::now().format("%Y%m%d"), tail)
}

pub fn verification_url(base_url: &str, reference: &str) -> String {
    format!("{}/verify/{}", base_url.trim_end_matches('/'), reference)
}

/// Claims carried inside a QR payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrClaims {
    pub reference: String,
    pub workspace: String,
    pub recipient: String,
    pub issued_at: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum QrError {
    #[error("malformed verification payload")]
    Invalid,
    #[error("verification signature mismatch")]
    Signature,
}

/// `base64(ref|workspace|recipient|unix_ts) . base64(hmac_sha256(claims))`.
pub fn sign_qr_payload(key: &[u8], claims: &QrClaims) -> Result<String, QrError> {
    let body = format!(
        "{}|{}|{}|{}",
        claims.reference, claims.workspace, claims.recipient, claims.issued_at
    );
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| QrError::Invalid)?;
    mac.update(body.as_bytes());
    let sig = mac.finalize().into_bytes();
    Ok(format!(
        "{}.{}",
        STANDARD.encode(body.as_bytes()),
        STANDARD.encode(sig)
    ))
}

pub fn verify_qr_payload(key: &[u8], payload: &str) -> Result<QrClaims, QrError> {
    let (body_b64, sig_b64) = payload.split_once('.').ok_or(QrError::Invalid)?;
    let body = STANDARD.decode(body_b64).map_err(|_| QrError::Invalid)?;
    let sig = STANDARD.decode(sig_b64).map_err(|_| QrError::Invalid)?;

    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| QrError::Invalid)?;
    mac.update(&body);
    mac.verify_slice(&sig).map_err(|_| QrError::Signature)?;

    let body = String::from_utf8(body).map_err(|_| QrError::Invalid)?;
    let mut pieces = body.split('|');
    let reference = pieces.next().ok_or(QrError::Invalid)?.to_string();
    let workspace = pieces.next().ok_or(QrError::Invalid)?.to_string();
    let recipient = pieces.next().ok_or(QrError::Invalid)?.to_string();
    let issued_at = pieces
        .next()
        .ok_or(QrError::Invalid)?
        .parse()
        .map_err(|_| QrError::Invalid)?;
    if pieces.next().is_some() {
        return Err(QrError::Invalid);
    }
    Ok(QrClaims {
        reference,
        workspace,
        recipient,
        issued_at,
    })
}
