//! Authenticator backed by a fixed token table.
//!
//! Tokens are issued elsewhere and handed to the gateway through configuration
//! as `token:user_id:username` grants.

use std::{collections::HashMap, str::FromStr};

use async_trait::async_trait;

use crate::domain::{AuthError, Authenticator, Identity};

/// One configured credential and the identity it stands for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub token: String,
    pub identity: Identity,
}

impl FromStr for TokenGrant {
    type Err = String;

    /// Parse `token:user_id:username`. The username may itself contain `:`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(token), Some(user_id), Some(username))
                if !token.is_empty() && !user_id.is_empty() && !username.is_empty() =>
            {
                Ok(Self {
                    token: token.to_string(),
                    identity: Identity::new(user_id, username),
                })
            }
            _ => Err(format!(
                "invalid token grant '{s}', expected 'token:user_id:username'"
            )),
        }
    }
}

pub struct StaticTokenAuthenticator {
    grants: HashMap<String, Identity>,
}

impl StaticTokenAuthenticator {
    pub fn new(grants: impl IntoIterator<Item = TokenGrant>) -> Self {
        Self {
            grants: grants
                .into_iter()
                .map(|grant| (grant.token, grant.identity))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

#[async_trait]
impl Authenticator for StaticTokenAuthenticator {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingCredential);
        }
        self.grants
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidCredential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_grant_parsing() {
        // テスト項目: token:user_id:username 形式の文字列がパースされる
        // given (前提条件):
        let raw = "secret:u-1:Dr. Who:Tardis";

        // when (操作):
        let grant: TokenGrant = raw.parse().unwrap();

        // then (期待する結果):
        assert_eq!(grant.token, "secret");
        assert_eq!(grant.identity, Identity::new("u-1", "Dr. Who:Tardis"));
    }

    #[test]
    fn test_token_grant_rejects_incomplete_input() {
        // テスト項目: 要素が欠けた文字列はエラーになる
        assert!("secret:u-1".parse::<TokenGrant>().is_err());
        assert!("::".parse::<TokenGrant>().is_err());
        assert!("".parse::<TokenGrant>().is_err());
    }

    #[tokio::test]
    async fn test_verify_known_and_unknown_tokens() {
        // テスト項目: 登録済みトークンは ID に解決され、未知のトークンは拒否される
        // given (前提条件):
        let authenticator =
            StaticTokenAuthenticator::new(vec!["secret:u-1:alice".parse::<TokenGrant>().unwrap()]);

        // when (操作):
        let known = authenticator.verify("secret").await;
        let unknown = authenticator.verify("guess").await;
        let empty = authenticator.verify("").await;

        // then (期待する結果):
        assert_eq!(known, Ok(Identity::new("u-1", "alice")));
        assert_eq!(unknown, Err(AuthError::InvalidCredential));
        assert_eq!(empty, Err(AuthError::MissingCredential));
    }
}
