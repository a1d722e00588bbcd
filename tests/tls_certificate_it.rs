// std
use std::path::PathBuf;
// crates.io
use pulsar_auth::{error::Error, new_provider};

struct Fixture {
	_dir: tempfile::TempDir,
	cert: PathBuf,
	key: PathBuf,
}
impl Fixture {
	fn new() -> Self {
		let generated = rcgen::generate_simple_self_signed(vec!["client.pulsar.test".to_string()])
			.expect("Failed to generate test certificate.");
		let dir = tempfile::tempdir().expect("Temp dir should be created.");
		let cert = dir.path().join("cert.pem");
		let key = dir.path().join("key.pem");

		std::fs::write(&cert, generated.cert.pem()).expect("Certificate should be writable.");
		std::fs::write(&key, generated.key_pair.serialize_pem()).expect("Key should be writable.");

		Self { _dir: dir, cert, key }
	}

	fn params(&self) -> String {
		serde_json::json!({
			"tlsCertFile": format!("file://{}", self.cert.display()),
			"tlsKeyFile": self.key.display().to_string(),
		})
		.to_string()
	}
}

#[cfg(feature = "reqwest")]
#[tokio::test]
async fn init_installs_a_certificate_presenting_default_transport() {
	let fixture = Fixture::new();
	let provider = new_provider("tls", &fixture.params()).expect("TLS provider should construct.");

	assert!(provider.transport().is_none());

	provider.init().await.expect("TLS provider should initialize.");

	assert!(provider.transport().is_some());
	assert!(provider.data().await.expect("Data should be available.").is_empty());

	let certificate = provider
		.tls_certificate()
		.expect("Certificate should load.")
		.expect("TLS provider should return a certificate.");

	assert_eq!(certificate.chain().len(), 1);
	assert!(String::from_utf8(certificate.to_pem()).expect("PEM should be UTF-8.").contains("BEGIN CERTIFICATE"));
}

#[test]
fn certificates_are_unavailable_before_init() {
	let fixture = Fixture::new();
	let provider = new_provider(
		"org.apache.pulsar.client.impl.auth.AuthenticationTls",
		&fixture.params(),
	)
	.expect("TLS provider should construct.");

	assert!(matches!(provider.tls_certificate(), Err(Error::InvalidState { .. })));
}

#[cfg(feature = "reqwest")]
#[tokio::test]
async fn deleted_key_files_fail_the_next_query() {
	let fixture = Fixture::new();
	let provider = new_provider("tls", &fixture.params()).expect("TLS provider should construct.");

	provider.init().await.expect("TLS provider should initialize.");

	std::fs::remove_file(&fixture.key).expect("Key file should be removable.");

	assert!(matches!(provider.tls_certificate(), Err(Error::CredentialUnavailable(_))));
}
