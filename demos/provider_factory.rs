//! Demonstrates selecting providers by name at runtime: an OAuth2 provider fetches its access
//! token from a mocked issuer, and a token provider signs an admin request with the default
//! reqwest transport.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use pulsar_auth::{Scheme, http, new_provider};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	for scheme in Scheme::ALL {
		println!("{scheme}: {:?}", scheme.names());
	}

	let server = MockServer::start_async().await;
	let token_endpoint = server.url("/oauth/token");
	let discovery_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/.well-known/openid-configuration");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(serde_json::json!({ "token_endpoint": token_endpoint }));
		})
		.await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"bearer\",\"expires_in\":900}",
			);
		})
		.await;
	let admin_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/admin/v2/tenants").header("authorization", "Bearer demo-access");
			then.status(200).header("content-type", "application/json").body("[\"public\"]");
		})
		.await;
	let params = serde_json::json!({
		"issuerUrl": server.base_url(),
		"privateKey": r#"data:application/json,{"client_id":"demo-client","client_secret":"super-secret"}"#,
		"audience": "urn:pulsar:demo",
	});
	let provider = new_provider("oauth2", &params.to_string())?;

	provider.init().await?;

	println!(
		"{} handshake payload: {}.",
		provider.name(),
		String::from_utf8_lossy(&provider.data().await?)
	);

	let request = http::Request::builder().uri(server.url("/admin/v2/tenants")).body(Vec::new())?;
	let response = provider.round_trip(request).await?;

	println!("Admin call returned {}: {}.", response.status(), String::from_utf8_lossy(response.body()));

	provider.close()?;

	discovery_mock.assert_async().await;
	token_mock.assert_async().await;
	admin_mock.assert_async().await;

	Ok(())
}
