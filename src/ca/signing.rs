//! Client-side credentials for the CA protocol.
//!
//! Enrollment keys are generated here and never leave the process except
//! through the identity store: the CA only ever sees a certificate signing
//! request. Registrar calls carry a token signed with the registrar's key.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use p256::pkcs8::DecodePrivateKey;
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};

use crate::domain::{Identity, PrivateKeyPem};
use crate::infra::CaError;

/// A fresh P-256 key and the PEM CSR for `enrollment_id`.
pub struct CertificateRequest {
    pub csr_pem: String,
    pub private_key: PrivateKeyPem,
}

/// Generate a key pair and a CSR whose common name is `enrollment_id`.
pub fn certificate_request(enrollment_id: &str) -> Result<CertificateRequest, CaError> {
    let key_pair = KeyPair::generate().map_err(credential)?;

    let mut params = CertificateParams::new(Vec::<String>::new()).map_err(credential)?;
    let mut subject = DistinguishedName::new();
    subject.push(DnType::CommonName, enrollment_id);
    params.distinguished_name = subject;

    let csr_pem = params
        .serialize_request(&key_pair)
        .and_then(|csr| csr.pem())
        .map_err(credential)?;

    Ok(CertificateRequest {
        csr_pem,
        private_key: PrivateKeyPem::new(key_pair.serialize_pem()),
    })
}

/// `Authorization` value for a registrar request:
/// `<b64 cert>.<b64 DER signature>` over
/// `<method>.<b64 path>.<b64 body>.<b64 cert>`.
pub fn auth_token(
    registrar: &Identity,
    method: &str,
    path: &str,
    body: &[u8],
) -> Result<String, CaError> {
    let key = SigningKey::from_pkcs8_pem(registrar.private_key.expose())
        .map_err(|e| CaError::Credential(format!("registrar key is not PKCS#8 P-256: {e}")))?;

    let cert = STANDARD.encode(registrar.certificate.as_bytes());
    let payload = signed_payload(method, path, body, &cert);

    let signature: Signature = key.sign(payload.as_bytes());
    let signature = signature.normalize_s().unwrap_or(signature);

    Ok(format!("{cert}.{}", STANDARD.encode(signature.to_der().as_bytes())))
}

fn signed_payload(method: &str, path: &str, body: &[u8], cert_b64: &str) -> String {
    format!(
        "{method}.{}.{}.{cert_b64}",
        STANDARD.encode(path.as_bytes()),
        STANDARD.encode(body)
    )
}

fn credential(e: rcgen::Error) -> CaError {
    CaError::Credential(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IdentityType;
    use p256::ecdsa::signature::Verifier;
    use p256::ecdsa::VerifyingKey;

    fn registrar(private_key: PrivateKeyPem) -> Identity {
        Identity {
            label: "admin".into(),
            identity_type: IdentityType::Admin,
            certificate: "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n".into(),
            private_key,
            organization_id: "Org1MSP".into(),
        }
    }

    #[test]
    fn test_certificate_request_is_pem_with_local_key() {
        let request = certificate_request("appUser").unwrap();
        assert!(request
            .csr_pem
            .starts_with("-----BEGIN CERTIFICATE REQUEST-----"));
        assert!(request.private_key.expose().contains("BEGIN PRIVATE KEY"));
        assert!(SigningKey::from_pkcs8_pem(request.private_key.expose()).is_ok());
    }

    #[test]
    fn test_auth_token_verifies_against_registrar_key() {
        let request = certificate_request("admin").unwrap();
        let key = SigningKey::from_pkcs8_pem(request.private_key.expose()).unwrap();
        let registrar = registrar(request.private_key);
        let body = br#"{"id":"appUser"}"#;

        let token = auth_token(&registrar, "POST", "/api/v1/register", body).unwrap();

        let (cert, signature) = token.split_once('.').unwrap();
        assert_eq!(cert, STANDARD.encode(registrar.certificate.as_bytes()));

        let signature = Signature::from_der(&STANDARD.decode(signature).unwrap()).unwrap();
        let payload = signed_payload("POST", "/api/v1/register", body, cert);
        let verifying = VerifyingKey::from(&key);
        assert!(verifying.verify(payload.as_bytes(), &signature).is_ok());

        let tampered = signed_payload("POST", "/api/v1/register", b"{}", cert);
        assert!(verifying.verify(tampered.as_bytes(), &signature).is_err());
    }

    #[test]
    fn test_auth_token_rejects_non_pkcs8_key() {
        let registrar = registrar(PrivateKeyPem::new("not a key"));
        let err = auth_token(&registrar, "POST", "/api/v1/register", b"{}").unwrap_err();
        assert!(matches!(err, CaError::Credential(_)));
    }
}
