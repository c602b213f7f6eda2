//! Runs a complete QQ login against a local mock of the QQ Connect endpoints.
//!
//! The mock answers the way QQ does: the token endpoint only accepts GET and replies with a
//! form-encoded body, and the identity endpoint wraps its JSON in a `callback( ... );`
//! envelope.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use oauth2_qq::{
	auth::{ScopeSet, TokenSecret},
	error::BoxError,
	flows::{AuthOutcome, AuthenticationStrategy, CallbackParams, Profile, StrategyRegistry},
	http::ReqwestHttpClient,
	oauth::ReqwestTransportErrorMapper,
	qq::{QqOptions, QqStrategy, ReqwestQqStrategy},
	reqwest::Client,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/oauth2.0/token").query_param("code", "demo-code");
			then.status(200).body("access_token=demo-access&expires_in=7776000&refresh_token=demo-refresh");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/oauth2.0/me").query_param("access_token", "demo-access");
			then.status(200).body("callback( {\"client_id\":\"101\",\"openid\":\"DEMO-OPENID\"} );");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/user/get_user_info").query_param("openid", "DEMO-OPENID");
			then.status(200).body("{\"ret\":0,\"msg\":\"\",\"nickname\":\"Demo User\"}");
		})
		.await;

	let options = QqOptions::new("101", "demo-app-key")
		.callback_url(Url::parse("https://app.example.com/auth/qq/callback")?)
		.authorization_url(Url::parse(&server.url("/oauth2.0/authorize"))?)
		.token_url(Url::parse(&server.url("/oauth2.0/token"))?)
		.identity_url(Url::parse(&server.url("/oauth2.0/me"))?)
		.user_info_url(Url::parse(&server.url("/user/get_user_info"))?);
	// The mock server presents a self-signed certificate.
	let http_client = ReqwestHttpClient::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	);
	let strategy: ReqwestQqStrategy<_> = QqStrategy::with_http_client(
		options,
		|_access: TokenSecret, _refresh: Option<TokenSecret>, profile: Profile| async move {
			Ok::<_, BoxError>(Some(format!(
				"{} ({})",
				profile.nickname.unwrap_or_else(|| "anonymous".into()),
				profile.id
			)))
		},
		http_client,
		ReqwestTransportErrorMapper,
	)?;
	let mut registry = StrategyRegistry::<String>::new();

	registry.register(Arc::new(strategy))?;

	let Some(qq) = registry.get("qq") else {
		eprintln!("The qq strategy was not registered.");

		return Ok(());
	};
	let session = qq.start_authorization(&ScopeSet::new(["get_user_info"])?)?;

	println!("Send your user to {}.", session.authorize_url);

	// Simulate QQ redirecting back to the callback URL.
	let callback = CallbackParams::from_query(&format!("code=demo-code&state={}", session.state));

	match qq.authenticate(&session, callback).await? {
		AuthOutcome::Success { user } => println!("Signed in as {user}."),
		AuthOutcome::Rejected { reason } =>
			println!("Login rejected: {}.", reason.unwrap_or_else(|| "no reason given".into())),
	}

	Ok(())
}
