//! Presigned STS `GetCallerIdentity` requests.
//!
//! The EKS API server authenticates a client by replaying this request against
//! STS. The cluster name travels in the signed `x-k8s-aws-id` header, so a token
//! minted for one cluster cannot be presented to another.

use std::time::{Duration, SystemTime};

use aws_credential_types::Credentials;
use aws_sigv4::http_request::{
    SignableBody, SignableRequest, SignatureLocation, SigningSettings, sign,
};
use aws_sigv4::sign::v4::SigningParams;
use aws_smithy_runtime_api::client::identity::Identity;
use url::Url;

use crate::{Error, Result};

/// Header carrying the target cluster name.
pub const CLUSTER_ID_HEADER: &str = "x-k8s-aws-id";

/// Lifetime of the presigned URL (`X-Amz-Expires`).
pub const PRESIGN_EXPIRY: Duration = Duration::from_secs(60);

const STS_SERVICE: &str = "sts";
const STS_ACTION: &str = "GetCallerIdentity";
const STS_API_VERSION: &str = "2011-06-15";

/// A presigned request: the URL plus the headers that were signed with it.
#[derive(Debug, Clone)]
pub struct PresignedRequest {
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub signed_at: SystemTime,
}

impl PresignedRequest {
    /// When the presigned URL stops being accepted.
    pub fn expires_at(&self) -> SystemTime {
        self.signed_at + PRESIGN_EXPIRY
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Regional STS endpoint.
pub fn sts_endpoint(region: &str) -> String {
    let domain = if region.starts_with("cn-") {
        "amazonaws.com.cn"
    } else {
        "amazonaws.com"
    };
    format!("https://sts.{}.{}/", region, domain)
}

pub(crate) fn caller_identity_url(region: &str) -> Result<Url> {
    let mut url = Url::parse(&sts_endpoint(region))
        .map_err(|e| Error::config(format!("Invalid AWS region '{}': {}", region, e)))?;
    url.query_pairs_mut()
        .append_pair("Action", STS_ACTION)
        .append_pair("Version", STS_API_VERSION);
    Ok(url)
}

/// Sign a `GetCallerIdentity` request for `cluster_name` with query-string authentication.
pub fn presign_caller_identity(
    credentials: &Credentials,
    region: &str,
    cluster_name: &str,
    time: SystemTime,
) -> Result<PresignedRequest> {
    let mut url = caller_identity_url(region)?;

    let identity = Identity::new(credentials.clone(), credentials.expiry());

    let mut settings = SigningSettings::default();
    settings.signature_location = SignatureLocation::QueryParams;
    settings.expires_in = Some(PRESIGN_EXPIRY);

    let signing_params = SigningParams::builder()
        .identity(&identity)
        .region(region)
        .name(STS_SERVICE)
        .time(time)
        .settings(settings)
        .build()
        .map_err(|e| Error::auth_with("Failed to build SigV4 signing parameters", e))?;

    let headers = [(CLUSTER_ID_HEADER, cluster_name)];
    let signable_request = SignableRequest::new(
        "GET",
        url.as_str(),
        headers.iter().copied(),
        SignableBody::Bytes(&[]),
    )
    .map_err(|e| Error::auth_with("Failed to prepare STS request for signing", e))?;

    let (signing_instructions, _signature) = sign(signable_request, &signing_params.into())
        .map_err(|e| Error::auth_with("Failed to sign STS request", e))?
        .into_parts();

    {
        let mut query = url.query_pairs_mut();
        for (name, value) in signing_instructions.params() {
            query.append_pair(name, value);
        }
    }

    Ok(PresignedRequest {
        url,
        headers: vec![(CLUSTER_ID_HEADER.to_string(), cluster_name.to_string())],
        signed_at: time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(session_token: Option<&str>) -> Credentials {
        Credentials::new(
            "AKIDEXAMPLE",
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            session_token.map(str::to_string),
            None,
            "test",
        )
    }

    fn fixed_time() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    fn query_value(url: &Url, key: &str) -> Option<String> {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn test_sts_endpoint() {
        assert_eq!(sts_endpoint("us-east-1"), "https://sts.us-east-1.amazonaws.com/");
        assert_eq!(
            sts_endpoint("cn-north-1"),
            "https://sts.cn-north-1.amazonaws.com.cn/"
        );
    }

    #[test]
    fn test_presigned_url_shape() {
        let request =
            presign_caller_identity(&credentials(None), "eu-west-1", "prod", fixed_time())
                .unwrap();
        let url = &request.url;

        assert_eq!(url.host_str(), Some("sts.eu-west-1.amazonaws.com"));
        assert_eq!(query_value(url, "Action").as_deref(), Some("GetCallerIdentity"));
        assert_eq!(query_value(url, "Version").as_deref(), Some("2011-06-15"));
        assert_eq!(
            query_value(url, "X-Amz-Algorithm").as_deref(),
            Some("AWS4-HMAC-SHA256")
        );
        assert_eq!(query_value(url, "X-Amz-Expires").as_deref(), Some("60"));
        assert_eq!(
            query_value(url, "X-Amz-Date").as_deref(),
            Some("20231114T221320Z")
        );
        assert_eq!(
            query_value(url, "X-Amz-Credential").as_deref(),
            Some("AKIDEXAMPLE/20231114/eu-west-1/sts/aws4_request")
        );

        let signed_headers = query_value(url, "X-Amz-SignedHeaders").unwrap();
        assert!(signed_headers.split(';').any(|h| h == CLUSTER_ID_HEADER));
        assert!(signed_headers.split(';').any(|h| h == "host"));

        let signature = query_value(url, "X-Amz-Signature").unwrap();
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));

        assert_eq!(request.header(CLUSTER_ID_HEADER), Some("prod"));
    }

    #[test]
    fn test_session_token_included() {
        let request = presign_caller_identity(
            &credentials(Some("FwoGZXIvYXdzEBY+session/token=")),
            "us-east-1",
            "prod",
            fixed_time(),
        )
        .unwrap();

        assert_eq!(
            query_value(&request.url, "X-Amz-Security-Token").as_deref(),
            Some("FwoGZXIvYXdzEBY+session/token=")
        );
    }

    #[test]
    fn test_signing_is_deterministic() {
        let creds = credentials(None);
        let a = presign_caller_identity(&creds, "us-east-1", "prod", fixed_time()).unwrap();
        let b = presign_caller_identity(&creds, "us-east-1", "prod", fixed_time()).unwrap();
        assert_eq!(a.url, b.url);
    }

    #[test]
    fn test_cluster_name_is_signed() {
        let creds = credentials(None);
        let prod = presign_caller_identity(&creds, "us-east-1", "prod", fixed_time()).unwrap();
        let dev = presign_caller_identity(&creds, "us-east-1", "dev", fixed_time()).unwrap();

        assert_ne!(
            query_value(&prod.url, "X-Amz-Signature"),
            query_value(&dev.url, "X-Amz-Signature")
        );
    }

    #[test]
    fn test_expiry() {
        let request =
            presign_caller_identity(&credentials(None), "us-east-1", "prod", fixed_time())
                .unwrap();
        assert_eq!(request.expires_at(), fixed_time() + Duration::from_secs(60));
    }

    #[test]
    fn test_invalid_region() {
        let err = presign_caller_identity(&credentials(None), "bad region", "prod", fixed_time())
            .unwrap_err();
        assert!(err.is_configuration_error());
    }
}
