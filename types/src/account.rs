//! Chain account names and `@author/permlink` identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TypesError;

/// A chain account name (lowercase, 3-16 characters on the live network).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountName(String);

impl AccountName {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Parse and validate an account name.
    pub fn parse(raw: &str) -> Result<Self, TypesError> {
        let name = raw.trim().trim_start_matches('@').to_lowercase();
        let valid = !name.is_empty()
            && name.len() <= 16
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.');
        if !valid {
            return Err(TypesError::InvalidAccount(raw.to_string()));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AccountName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Identifies a post or comment as `@author/permlink`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Authorperm {
    pub author: AccountName,
    pub permlink: String,
}

impl Authorperm {
    pub fn new(author: impl Into<AccountName>, permlink: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            permlink: permlink.into(),
        }
    }

    /// Parse `@author/permlink` (the leading `@` is optional).
    pub fn parse(raw: &str) -> Result<Self, TypesError> {
        let trimmed = raw.trim().trim_start_matches('@');
        let (author, permlink) = trimmed
            .split_once('/')
            .ok_or_else(|| TypesError::InvalidAuthorperm(raw.to_string()))?;
        if permlink.is_empty() {
            return Err(TypesError::InvalidAuthorperm(raw.to_string()));
        }
        Ok(Self {
            author: AccountName::parse(author)?,
            permlink: permlink.to_string(),
        })
    }
}

impl fmt::Display for Authorperm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}/{}", self.author, self.permlink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_authorperm_with_and_without_at() {
        let a = Authorperm::parse("@alice/my-post").unwrap();
        assert_eq!(a.author.as_str(), "alice");
        assert_eq!(a.permlink, "my-post");
        assert_eq!(a.to_string(), "@alice/my-post");
        assert_eq!(Authorperm::parse("alice/my-post").unwrap(), a);
    }

    #[test]
    fn rejects_malformed_identifiers() {
        assert!(Authorperm::parse("alice").is_err());
        assert!(Authorperm::parse("@alice/").is_err());
        assert!(AccountName::parse("Not Valid!").is_err());
        assert!(AccountName::parse("").is_err());
    }

    #[test]
    fn account_parse_normalises_case_and_prefix() {
        assert_eq!(AccountName::parse("@Bob").unwrap().as_str(), "bob");
    }
}
