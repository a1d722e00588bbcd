//! Client certificate material presented during mutual TLS.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
// self
use crate::{_prelude::*, error::CredentialError};

/// Owned certificate chain plus the matching private key.
///
/// Values are loaded fresh on each query, so a rotated certificate on disk is picked up by the
/// next TLS handshake.
pub struct ClientCertificate {
	chain: Vec<CertificateDer<'static>>,
	key: PrivateKeyDer<'static>,
}
impl ClientCertificate {
	/// Builds a certificate from an already parsed chain and key.
	pub fn new(chain: Vec<CertificateDer<'static>>, key: PrivateKeyDer<'static>) -> Self {
		Self { chain, key }
	}

	/// Parses PEM-encoded chain and key material.
	///
	/// `cert_source` and `key_source` only label error messages.
	pub fn from_pem(
		cert_pem: &[u8],
		key_pem: &[u8],
		cert_source: &str,
		key_source: &str,
	) -> Result<Self, CredentialError> {
		let chain = rustls_pemfile::certs(&mut &cert_pem[..])
			.collect::<Result<Vec<_>, _>>()
			.map_err(|source| CredentialError::Pem { source_name: cert_source.into(), source })?;

		if chain.is_empty() {
			return Err(CredentialError::NoCertificates { source_name: cert_source.into() });
		}

		let key = rustls_pemfile::private_key(&mut &key_pem[..])
			.map_err(|source| CredentialError::Pem { source_name: key_source.into(), source })?
			.ok_or_else(|| CredentialError::NoPrivateKey { source_name: key_source.into() })?;

		Ok(Self { chain, key })
	}

	/// Certificate chain, leaf first.
	pub fn chain(&self) -> &[CertificateDer<'static>] {
		&self.chain
	}

	/// Private key matching the leaf certificate.
	pub fn key(&self) -> &PrivateKeyDer<'static> {
		&self.key
	}

	/// Splits the value into chain and key, e.g. for `rustls::ClientConfig::with_client_auth_cert`.
	pub fn into_parts(self) -> (Vec<CertificateDer<'static>>, PrivateKeyDer<'static>) {
		(self.chain, self.key)
	}

	/// Re-encodes key and chain as a single PEM bundle (key first).
	pub fn to_pem(&self) -> Vec<u8> {
		let mut pem = String::new();
		let label = match &self.key {
			PrivateKeyDer::Pkcs1(_) => "RSA PRIVATE KEY",
			PrivateKeyDer::Sec1(_) => "EC PRIVATE KEY",
			_ => "PRIVATE KEY",
		};

		push_pem_block(&mut pem, label, self.key.secret_der());

		for cert in &self.chain {
			push_pem_block(&mut pem, "CERTIFICATE", cert.as_ref());
		}

		pem.into_bytes()
	}
}
impl Clone for ClientCertificate {
	fn clone(&self) -> Self {
		Self { chain: self.chain.clone(), key: self.key.clone_key() }
	}
}
impl Debug for ClientCertificate {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientCertificate")
			.field("chain_len", &self.chain.len())
			.field("key", &"<redacted>")
			.finish()
	}
}

fn push_pem_block(pem: &mut String, label: &str, der: &[u8]) {
	let encoded = STANDARD.encode(der);

	pem.push_str("-----BEGIN ");
	pem.push_str(label);
	pem.push_str("-----\n");

	for (idx, ch) in encoded.chars().enumerate() {
		if idx > 0 && idx % 64 == 0 {
			pem.push('\n');
		}
		pem.push(ch);
	}

	pem.push_str("\n-----END ");
	pem.push_str(label);
	pem.push_str("-----\n");
}
