// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Facebook Login as the identity provider.
//!
//! Handles:
//! - Building the OAuth dialog URL
//! - Exchanging the authorization code for a user access token
//! - Fetching the profile fields the app stores
//! - Publishing auth-state changes to the session manager

use super::identity::{AuthError, IdentityProvider};
use crate::config::Config;
use crate::models::{AdditionalProfileInfo, AuthResult, Identity};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde::Deserialize;
use tokio::sync::watch;

const GRAPH_API_VERSION: &str = "v19.0";
const PROFILE_FIELDS: &str = "id,name,first_name,last_name,email,picture.type(large)";
const OAUTH_SCOPES: &str = "public_profile,email";

/// URL of the Facebook login dialog.
pub fn authorize_url(app_id: &str, redirect_uri: &str, state: &str) -> String {
    format!(
        "https://www.facebook.com/{}/dialog/oauth?\
         client_id={}&\
         redirect_uri={}&\
         response_type=code&\
         scope={}&\
         state={}",
        GRAPH_API_VERSION,
        urlencoding::encode(app_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(OAUTH_SCOPES),
        urlencoding::encode(state)
    )
}

/// Facebook identity provider.
pub struct FacebookProvider {
    http: reqwest::Client,
    graph_url: String,
    app_id: String,
    app_secret: String,
    redirect_uri: String,
    state: watch::Sender<Option<Identity>>,
}

impl FacebookProvider {
    pub fn new(config: &Config) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            http: reqwest::Client::new(),
            graph_url: format!("https://graph.facebook.com/{}", GRAPH_API_VERSION),
            app_id: config.facebook_app_id.clone(),
            app_secret: config.facebook_app_secret.clone(),
            redirect_uri: config.facebook_redirect_uri.clone(),
            state,
        }
    }

    /// Exchange an authorization code for a user access token.
    async fn exchange_code(&self, code: &str) -> Result<String, AuthError> {
        let url = format!("{}/oauth/access_token", self.graph_url);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("client_id", self.app_id.as_str()),
                ("client_secret", self.app_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("code", code),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Provider(format!("Token exchange request failed: {}", e)))?;

        let token: TokenResponse = check_response_json(response).await?;
        Ok(token.access_token)
    }

    /// Fetch the signed-in user's profile.
    async fn get_me(&self, access_token: &str) -> Result<GraphUser, AuthError> {
        let url = format!("{}/me", self.graph_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[("fields", PROFILE_FIELDS)])
            .send()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        check_response_json(response).await
    }

    async fn complete_sign_in(&self, code: &str) -> Result<AuthResult, AuthError> {
        let access_token = self.exchange_code(code).await?;
        let user = self.get_me(&access_token).await?;
        let result = user.into_auth_result();

        tracing::info!(uid = %result.identity.uid, "Facebook sign-in complete");
        self.state.send_replace(Some(result.identity.clone()));
        Ok(result)
    }
}

impl IdentityProvider for FacebookProvider {
    fn sign_in<'a>(&'a self, credential: &'a str) -> BoxFuture<'a, Result<AuthResult, AuthError>> {
        self.complete_sign_in(credential).boxed()
    }

    fn sign_out(&self) -> BoxFuture<'_, Result<(), AuthError>> {
        async move {
            // Facebook user tokens are not retained, so there is nothing to revoke.
            self.state.send_replace(None);
            Ok(())
        }
        .boxed()
    }

    fn auth_state(&self) -> watch::Receiver<Option<Identity>> {
        self.state.subscribe()
    }
}

/// Check response status and parse JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AuthError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if let Ok(graph) = serde_json::from_str::<GraphErrorResponse>(&body) {
            return Err(AuthError::Provider(format!(
                "HTTP {}: {} ({})",
                status, graph.error.message, graph.error.kind
            )));
        }
        return Err(AuthError::Provider(format!("HTTP {}: {}", status, body)));
    }

    response
        .json()
        .await
        .map_err(|e| AuthError::InvalidResponse(e.to_string()))
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GraphErrorResponse {
    error: GraphError,
}

#[derive(Debug, Deserialize)]
struct GraphError {
    message: String,
    #[serde(rename = "type", default)]
    kind: String,
}

/// `/me` response.
#[derive(Debug, Deserialize)]
struct GraphUser {
    id: String,
    name: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    picture: Option<GraphPicture>,
}

#[derive(Debug, Deserialize)]
struct GraphPicture {
    data: GraphPictureData,
}

#[derive(Debug, Deserialize)]
struct GraphPictureData {
    url: Option<String>,
}

impl GraphUser {
    fn into_auth_result(self) -> AuthResult {
        let photo_url = self.picture.and_then(|p| p.data.url);
        AuthResult {
            identity: Identity {
                uid: self.id.clone(),
                display_name: self.name.clone(),
                photo_url,
                email: self.email,
            },
            info: AdditionalProfileInfo {
                id: self.id,
                name: self.name,
                first_name: self.first_name,
                last_name: self.last_name,
            },
        }
    }
}
