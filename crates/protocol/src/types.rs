use serde::{Deserialize, Serialize};

use crate::constants::{PRIMARY_TOKEN_PARAM, SECONDARY_TOKEN_PARAM};

/// Authentication material attached to every remote call.
///
/// `secondary_token` is optional: it is sent when known and omitted
/// otherwise. The service accepts requests either way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub primary_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_token: Option<String>,
    pub session_cookie: String,
}

impl Credentials {
    /// Creates credentials from the minimum auth pair.
    pub fn new(primary_token: impl Into<String>, session_cookie: impl Into<String>) -> Self {
        Self {
            primary_token: primary_token.into(),
            secondary_token: None,
            session_cookie: session_cookie.into(),
        }
    }

    /// Sets the secondary token.
    pub fn with_secondary(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.secondary_token = (!token.is_empty()).then_some(token);
        self
    }

    /// Returns `true` when the minimum auth pair is present.
    pub fn is_complete(&self) -> bool {
        !self.primary_token.is_empty() && !self.session_cookie.is_empty()
    }

    /// Query parameters carrying the tokens.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![(PRIMARY_TOKEN_PARAM, self.primary_token.clone())];
        if let Some(ref token) = self.secondary_token {
            params.push((SECONDARY_TOKEN_PARAM, token.clone()));
        }
        params
    }
}
