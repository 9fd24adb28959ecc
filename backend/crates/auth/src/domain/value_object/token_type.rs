use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which credential a token is. Carried in the `typ` claim and in the
/// `token_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "access" => Ok(TokenType::Access),
            "refresh" => Ok(TokenType::Refresh),
            other => Err(format!("unknown token type: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_str_roundtrip() {
        for t in [TokenType::Access, TokenType::Refresh] {
            assert_eq!(t.as_str().parse::<TokenType>().unwrap(), t);
        }
        assert!("bearer".parse::<TokenType>().is_err());
    }

    #[test]
    fn test_serde_tag() {
        assert_eq!(serde_json::to_string(&TokenType::Refresh).unwrap(), "\"refresh\"");
    }
}
