//! TLS material loading.
//!
//! The daemon builds a [`TlsAcceptor`] from a PEM certificate chain and private key;
//! clients build a [`TlsConnector`] that trusts a PEM CA (or the server's self-signed
//! certificate).

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls_pemfile::Item;
use tokio_rustls::rustls::{self, Certificate, PrivateKey};
use tokio_rustls::{TlsAcceptor, TlsConnector};

use crate::{Error, Result};

fn open(path: &Path, what: &str) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| Error::InvalidConfig(format!("cannot open {} {}: {}", what, path.display(), e)))
}

pub fn load_certs(path: &Path) -> Result<Vec<Certificate>> {
    let mut reader = open(path, "certificate")?;
    let certs = rustls_pemfile::certs(&mut reader)?;
    if certs.is_empty() {
        return Err(Error::InvalidConfig(format!("no certificates found in {}", path.display())));
    }
    Ok(certs.into_iter().map(Certificate).collect())
}

/// Returns the first PKCS#8, RSA or EC private key in the file.
pub fn load_private_key(path: &Path) -> Result<PrivateKey> {
    let mut reader = open(path, "private key")?;
    while let Some(item) = rustls_pemfile::read_one(&mut reader)? {
        match item {
            Item::PKCS8Key(key) | Item::RSAKey(key) | Item::ECKey(key) => return Ok(PrivateKey(key)),
            _ => continue,
        }
    }
    Err(Error::InvalidConfig(format!("no private key found in {}", path.display())))
}

pub fn acceptor(cert_path: &Path, key_path: &Path) -> Result<TlsAcceptor> {
    let certs = load_certs(cert_path)?;
    let key = load_private_key(key_path)?;
    let config = rustls::ServerConfig::builder()
        .with_safe_defaults()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| Error::Tls(e.to_string()))?;
    Ok(TlsAcceptor::from(Arc::new(config)))
}

pub fn connector(ca_path: &Path) -> Result<TlsConnector> {
    let mut roots = rustls::RootCertStore::empty();
    for cert in load_certs(ca_path)? {
        roots
            .add(&cert)
            .map_err(|e| Error::Tls(format!("rejected trust anchor: {:?}", e)))?;
    }
    let config = rustls::ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(TlsConnector::from(Arc::new(config)))
}
