// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Tokens are treated as expired this long before they actually expire.
pub const TOKEN_REFRESH_WINDOW_SECS: i64 = 60;

/// An OAuth 2.0 token response as printed by `gcloud auth print-access-token`.
///
/// `issued` is not taken from the tool's output. It is stamped locally
/// when the token is requested, so expiry is measured on the host's clock.
///
/// # Example
///
/// ```
/// # use serde_json::json;
/// # use libgcloudwrapper::TokenResponse;
///
/// let token: TokenResponse = serde_json::from_value(json!({
///     "access_token": "ya29.NOTAREALTOKEN",
///     "token_type": "Bearer",
///     "expires_in": 3599
/// }))
/// .unwrap();
/// assert_eq!(token.access_token.as_deref(), Some("ya29.NOTAREALTOKEN"));
/// ```
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime of the access token, in seconds from `issued`.
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default = "Utc::now")]
    pub issued: DateTime<Utc>,
}

impl core::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Secrets are reduced to whether they are present
        f.debug_struct("TokenResponse")
            .field("access_token", &self.access_token.is_some())
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("refresh_token", &self.refresh_token.is_some())
            .field("scope", &self.scope)
            .field("id_token", &self.id_token.is_some())
            .field("issued", &self.issued)
            .finish()
    }
}

impl TokenResponse {
    /// When the access token stops being valid, if the tool reported a lifetime.
    ///
    /// Returns `None` when `expires_in` is absent or too large to be
    /// represented as a date.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let lifetime = TimeDelta::try_seconds(self.expires_in?)?;
        self.issued.checked_add_signed(lifetime)
    }

    /// Whether the token should no longer be used at `now`.
    ///
    /// A missing or empty access token is always expired. A token without
    /// `expires_in` never expires on its own.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.access_token.as_deref() {
            None | Some("") => return true,
            Some(_) => {}
        }

        let Some(expires_in) = self.expires_in else {
            return false;
        };

        match self.expires_at() {
            Some(expires_at) => expires_at
                .checked_sub_signed(TimeDelta::seconds(TOKEN_REFRESH_WINDOW_SECS))
                .map_or(true, |refresh_at| now >= refresh_at),
            // Out of range: either far in the past or far in the future
            None => expires_in < 0,
        }
    }
}
