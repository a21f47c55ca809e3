//! TLS configuration and certificate loading.

use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tonic::transport::{Identity, ServerTlsConfig};

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("{kind} file not found: {path:?}")]
    NotFound { kind: &'static str, path: PathBuf },

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no certificates found in {0:?}")]
    NoCertificates(PathBuf),

    #[error("no private key found in {0:?}")]
    NoPrivateKey(PathBuf),
}

fn read_pem(kind: &'static str, path: &Path) -> Result<Vec<u8>, TlsError> {
    if !path.exists() {
        return Err(TlsError::NotFound {
            kind,
            path: path.to_path_buf(),
        });
    }
    fs::read(path).map_err(|source| TlsError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a certificate chain and private key into a tonic identity.
///
/// Both files are parsed up front so a bad pair fails here rather than at
/// handshake time.
pub fn load_identity(cert_path: &Path, key_path: &Path) -> Result<Identity, TlsError> {
    let cert = read_pem("Certificate", cert_path)?;
    let key = read_pem("Private key", key_path)?;

    let mut reader = BufReader::new(cert.as_slice());
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TlsError::Io {
            path: cert_path.to_path_buf(),
            source,
        })?;
    if certs.is_empty() {
        return Err(TlsError::NoCertificates(cert_path.to_path_buf()));
    }

    let mut reader = BufReader::new(key.as_slice());
    let private_key = rustls_pemfile::private_key(&mut reader).map_err(|source| TlsError::Io {
        path: key_path.to_path_buf(),
        source,
    })?;
    if private_key.is_none() {
        return Err(TlsError::NoPrivateKey(key_path.to_path_buf()));
    }

    Ok(Identity::from_pem(cert, key))
}

/// Server-side TLS for serve mode.
pub fn load_server_tls(cert_path: &Path, key_path: &Path) -> Result<ServerTlsConfig, TlsError> {
    let identity = load_identity(cert_path, key_path)?;
    Ok(ServerTlsConfig::new().identity(identity))
}
