//! EKS bearer token encoding.
//!
//! A token is `k8s-aws-v1.` followed by the unpadded base64url encoding of a
//! presigned STS URL. The API server decodes it and replays the request.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use url::Url;

use crate::{Error, Result};

pub const TOKEN_PREFIX: &str = "k8s-aws-v1.";

pub fn encode_token(presigned_url: &Url) -> String {
    format!(
        "{}{}",
        TOKEN_PREFIX,
        URL_SAFE_NO_PAD.encode(presigned_url.as_str())
    )
}

/// Recover the presigned URL from a token.
pub fn decode_token(token: &str) -> Result<Url> {
    let encoded = token
        .strip_prefix(TOKEN_PREFIX)
        .ok_or_else(|| Error::auth(format!("Token does not start with '{}'", TOKEN_PREFIX)))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| Error::auth_with("Token payload is not base64url", e))?;
    let url = String::from_utf8(bytes)
        .map_err(|e| Error::auth_with("Token payload is not UTF-8", e))?;

    Url::parse(&url).map_err(|e| Error::auth_with("Token payload is not a URL", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        let url = Url::parse("https://sts.us-east-1.amazonaws.com/?Action=GetCallerIdentity")
            .unwrap();
        let token = encode_token(&url);

        assert!(token.starts_with("k8s-aws-v1."));
        let payload = &token[TOKEN_PREFIX.len()..];
        assert!(!payload.contains('='));
        assert!(!payload.contains('+'));
        assert!(!payload.contains('/'));
        assert_eq!(decode_token(&token).unwrap(), url);
    }

    #[test]
    fn test_known_encoding() {
        let url = Url::parse("https://sts.amazonaws.com/?a=b").unwrap();
        assert_eq!(
            encode_token(&url),
            "k8s-aws-v1.aHR0cHM6Ly9zdHMuYW1hem9uYXdzLmNvbS8_YT1i"
        );
    }

    #[test]
    fn test_decode_rejects_bad_prefix() {
        assert!(decode_token("k8s-aws-v2.aGVsbG8").is_err());
        assert!(decode_token("aHR0cHM6Ly9zdHM").is_err());
    }

    #[test]
    fn test_decode_rejects_padding_and_garbage() {
        assert!(decode_token("k8s-aws-v1.aGVsbG8=").is_err());
        assert!(decode_token("k8s-aws-v1.!!!").is_err());
        // "hello" is valid base64url but not a URL
        assert!(decode_token("k8s-aws-v1.aGVsbG8").is_err());
    }
}
