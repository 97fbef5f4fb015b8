//! Loading of PEM material for mutual TLS towards BBS.

use std::path::Path;

use crate::error::{ClientError, Result};

/// Reads a PEM file, rejecting files without any PEM block.
pub fn read_pem(path: &Path) -> Result<Vec<u8>> {
    let bytes = std::fs::read(path).map_err(|e| ClientError::Tls {
        reason: format!("failed to read {}: {}", path.display(), e),
    })?;
    if !bytes.windows(11).any(|w| w == b"-----BEGIN ") {
        return Err(ClientError::Tls {
            reason: format!("{} does not contain PEM data", path.display()),
        });
    }
    Ok(bytes)
}

/// Builds a client identity from a certificate chain and a private key.
pub fn identity(cert_path: &Path, key_path: &Path) -> Result<reqwest::Identity> {
    let mut pem = read_pem(cert_path)?;
    if !pem.ends_with(b"\n") {
        pem.push(b'\n');
    }
    pem.extend_from_slice(&read_pem(key_path)?);
    reqwest::Identity::from_pem(&pem).map_err(|e| ClientError::Tls {
        reason: format!("invalid client certificate or key: {}", e),
    })
}

/// Loads a CA certificate used to verify the server.
pub fn root_certificate(ca_path: &Path) -> Result<reqwest::Certificate> {
    let pem = read_pem(ca_path)?;
    reqwest::Certificate::from_pem(&pem).map_err(|e| ClientError::Tls {
        reason: format!("invalid CA certificate {}: {}", ca_path.display(), e),
    })
}
