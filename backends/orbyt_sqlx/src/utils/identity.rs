use async_trait::async_trait;
use jsonwebtoken::{Algorithm, Validation};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::jwt::{self, JwkCache};
use crate::error::{AppError, AppResult};

const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const FIREBASE_SIGN_IN_URL: &str =
    "https://identitytoolkit.googleapis.com/v1/accounts:signInWithPassword";

/// Who an ID token says the caller is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInTokens {
    pub id_token: String,
    pub refresh_token: String,
    pub expires_in: String,
}

/// The external identity provider. The backend never stores credentials; it
/// only verifies tokens the provider issued and forwards password sign-ins.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify_id_token(&self, id_token: &str) -> AppResult<VerifiedIdentity>;

    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> AppResult<SignInTokens>;
}

pub struct FirebaseIdentity {
    api_key: String,
    http: reqwest::Client,
    keys: JwkCache,
    validation: Validation,
}

impl FirebaseIdentity {
    pub fn new(project_id: &str, api_key: impl Into<String>) -> Self {
        let http = reqwest::Client::new();

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[project_id]);
        validation.set_issuer(&[format!("https://securetoken.google.com/{project_id}")]);

        Self {
            api_key: api_key.into(),
            keys: JwkCache::new(FIREBASE_JWKS_URL, http.clone()),
            http,
            validation,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordSignIn<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn verify_id_token(&self, id_token: &str) -> AppResult<VerifiedIdentity> {
        let header = jsonwebtoken::decode_header(id_token)?;
        if header.alg != Algorithm::RS256 {
            return Err(AppError::Unauthorized("Invalid token"));
        }
        let Some(kid) = header.kid else {
            return Err(AppError::Unauthorized("Invalid token"));
        };

        let key = self.keys.key_for(&kid).await?;
        let claims = jwt::verify_jwt(id_token, &key, &self.validation)?;

        Ok(VerifiedIdentity {
            uid: claims.sub,
            email: claims.email,
        })
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> AppResult<SignInTokens> {
        let response = self
            .http
            .post(FIREBASE_SIGN_IN_URL)
            .query(&[("key", self.api_key.as_str())])
            .json(&PasswordSignIn {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await?;

        // wrong password, unknown email and disabled accounts all come back as 400
        if response.status() == StatusCode::BAD_REQUEST {
            return Err(AppError::Unauthorized("Invalid credentials"));
        }

        let tokens = response.error_for_status()?.json::<SignInTokens>().await?;
        Ok(tokens)
    }
}
