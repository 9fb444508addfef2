//! Azure Blob Storage over its REST API.
//!
//! Accepts the same connection strings as the Azure SDKs: either an account
//! key (requests are signed with Shared Key) or a SAS token.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, RequestBuilder};
use sha2::Sha256;
use tracing::debug;
use url::Url;

use ny_core::{Error, ObjectStorage, Result};

type HmacSha256 = Hmac<Sha256>;

const API_VERSION: &str = "2021-08-06";

#[derive(Clone, PartialEq)]
enum Credentials {
    SharedKey { account: String, key: Vec<u8> },
    Sas(String),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::SharedKey { account, .. } => f
                .debug_struct("SharedKey")
                .field("account", account)
                .field("key", &"<redacted>")
                .finish(),
            Credentials::Sas(_) => f.write_str("Sas(<redacted>)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AzureConfig {
    blob_endpoint: Url,
    credentials: Credentials,
}

impl AzureConfig {
    pub fn from_connection_string(connection_string: &str) -> Result<Self> {
        let parts: BTreeMap<&str, &str> = connection_string
            .split(';')
            .filter_map(|part| part.trim().split_once('='))
            .collect();

        let account = parts.get("AccountName").copied();

        let blob_endpoint = match (parts.get("BlobEndpoint"), account) {
            (Some(endpoint), _) => endpoint.to_string(),
            (None, Some(account)) => format!(
                "{}://{}.blob.{}",
                parts.get("DefaultEndpointsProtocol").copied().unwrap_or("https"),
                account,
                parts.get("EndpointSuffix").copied().unwrap_or("core.windows.net")
            ),
            (None, None) => {
                return Err(Error::Config(
                    "Connection string needs BlobEndpoint or AccountName".to_string(),
                ))
            }
        };
        let blob_endpoint = Url::parse(&blob_endpoint)
            .map_err(|e| Error::Config(format!("Invalid blob endpoint {}: {}", blob_endpoint, e)))?;

        let credentials = match (parts.get("SharedAccessSignature"), account, parts.get("AccountKey")) {
            (Some(sas), _, _) => Credentials::Sas(sas.trim_start_matches('?').to_string()),
            (None, Some(account), Some(key)) => Credentials::SharedKey {
                account: account.to_string(),
                key: BASE64
                    .decode(key)
                    .map_err(|e| Error::Config(format!("AccountKey is not valid base64: {}", e)))?,
            },
            _ => {
                return Err(Error::Config(
                    "Connection string needs SharedAccessSignature or AccountName and AccountKey"
                        .to_string(),
                ))
            }
        };

        Ok(Self {
            blob_endpoint,
            credentials,
        })
    }

    fn object_url(&self, container: &str, key: Option<&str>) -> Result<Url> {
        let mut url = self.blob_endpoint.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::Config("Blob endpoint cannot be a base URL".to_string()))?;
            segments.pop_if_empty().push(container);
            if let Some(key) = key {
                segments.extend(key.split('/'));
            }
        }
        Ok(url)
    }
}

pub struct AzureBlobStorage {
    client: Client,
    config: AzureConfig,
}

impl fmt::Debug for AzureBlobStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureBlobStorage")
            .field("client", &"<reqwest::Client>")
            .field("config", &self.config)
            .finish()
    }
}

impl AzureBlobStorage {
    pub fn new(config: AzureConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn from_connection_string(connection_string: &str) -> Result<Self> {
        Ok(Self::new(AzureConfig::from_connection_string(connection_string)?))
    }

    /// Build a request with version/date headers and credentials applied.
    fn request(
        &self,
        method: Method,
        mut url: Url,
        headers: &[(&str, String)],
        content_length: usize,
        content_type: &str,
    ) -> Result<RequestBuilder> {
        let date = chrono::Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();

        let mut ms_headers: BTreeMap<String, String> = headers
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
            .collect();
        ms_headers.insert("x-ms-date".to_string(), date);
        ms_headers.insert("x-ms-version".to_string(), API_VERSION.to_string());

        let authorization = match &self.config.credentials {
            Credentials::Sas(token) => {
                let query = match url.query() {
                    Some(q) if !q.is_empty() => format!("{}&{}", q, token),
                    _ => token.clone(),
                };
                url.set_query(Some(&query));
                None
            }
            Credentials::SharedKey { account, key } => {
                let to_sign = string_to_sign(
                    method.as_str(),
                    &url,
                    account,
                    &ms_headers,
                    content_length,
                    content_type,
                );
                Some(format!("SharedKey {}:{}", account, sign(key, &to_sign)?))
            }
        };

        let mut request = self.client.request(method, url);
        for (name, value) in &ms_headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if !content_type.is_empty() {
            request = request.header(reqwest::header::CONTENT_TYPE, content_type);
        }
        if let Some(authorization) = authorization {
            request = request.header(reqwest::header::AUTHORIZATION, authorization);
        }
        Ok(request)
    }

    async fn execute(&self, request: RequestBuilder, action: &str) -> Result<()> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::Transport(format!(
            "Azure Blob Storage {} failed ({}): {}",
            action,
            status,
            body.trim()
        )))
    }
}

/// Shared Key string-to-sign for the Blob service.
fn string_to_sign(
    method: &str,
    url: &Url,
    account: &str,
    ms_headers: &BTreeMap<String, String>,
    content_length: usize,
    content_type: &str,
) -> String {
    let content_length = if content_length == 0 {
        String::new()
    } else {
        content_length.to_string()
    };

    let mut canonical_headers = String::new();
    for (name, value) in ms_headers {
        canonical_headers.push_str(&format!("{}:{}\n", name, value.trim()));
    }

    let mut canonical_resource = format!("/{}{}", account, url.path());
    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in url.query_pairs() {
        params
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into_owned());
    }
    for (name, mut values) in params {
        values.sort();
        canonical_resource.push_str(&format!("\n{}:{}", name, values.join(",")));
    }

    format!(
        "{method}\n\n\n{content_length}\n\n{content_type}\n\n\n\n\n\n\n{canonical_headers}{canonical_resource}"
    )
}

fn sign(key: &[u8], to_sign: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| Error::Config(format!("Invalid storage account key: {}", e)))?;
    mac.update(to_sign.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

#[async_trait]
impl ObjectStorage for AzureBlobStorage {
    fn name(&self) -> &str {
        "azure"
    }

    async fn set_public_read_policy(&self, container: &str) -> Result<()> {
        let mut url = self.config.object_url(container, None)?;
        url.set_query(Some("restype=container&comp=acl"));

        debug!(container, "Setting blob-level public read access");
        let request = self.request(
            Method::PUT,
            url,
            &[("x-ms-blob-public-access", "blob".to_string())],
            0,
            "",
        )?;
        self.execute(request.body(Vec::new()), "set container ACL").await
    }

    async fn upload(&self, container: &str, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let url = self.config.object_url(container, Some(key))?;

        debug!(container, key, size = bytes.len(), "Uploading block blob");
        let request = self.request(
            Method::PUT,
            url,
            &[("x-ms-blob-type", "BlockBlob".to_string())],
            bytes.len(),
            content_type,
        )?;
        self.execute(request.body(bytes), "upload").await
    }

    fn public_url(&self, container: &str, key: &str) -> Result<Url> {
        self.config.object_url(container, Some(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_CONNECTION: &str = "DefaultEndpointsProtocol=https;AccountName=nyheterstore;AccountKey=c2VjcmV0LWtleQ==;EndpointSuffix=core.windows.net";
    const SAS_CONNECTION: &str =
        "BlobEndpoint=https://nyheterstore.blob.core.windows.net/;SharedAccessSignature=sv=2022-11-02&ss=b&sig=abc%3D";

    #[test]
    fn test_account_key_connection_string() {
        let config = AzureConfig::from_connection_string(KEY_CONNECTION).unwrap();
        assert_eq!(config.blob_endpoint.as_str(), "https://nyheterstore.blob.core.windows.net/");
        assert_eq!(
            config.credentials,
            Credentials::SharedKey {
                account: "nyheterstore".to_string(),
                key: b"secret-key".to_vec(),
            }
        );
    }

    #[test]
    fn test_sas_connection_string() {
        let config = AzureConfig::from_connection_string(SAS_CONNECTION).unwrap();
        assert_eq!(
            config.credentials,
            Credentials::Sas("sv=2022-11-02&ss=b&sig=abc%3D".to_string())
        );
    }

    #[test]
    fn test_invalid_connection_strings() {
        assert!(AzureConfig::from_connection_string("").is_err());
        assert!(AzureConfig::from_connection_string("AccountName=x").is_err());
        assert!(AzureConfig::from_connection_string("AccountName=x;AccountKey=%%%").is_err());
    }

    #[test]
    fn test_public_url_encodes_key() {
        let storage = AzureBlobStorage::from_connection_string(SAS_CONNECTION).unwrap();
        let url = storage.public_url("nyheter", "2024/storm i skåne.webp").unwrap();
        assert_eq!(
            url.as_str(),
            "https://nyheterstore.blob.core.windows.net/nyheter/2024/storm%20i%20sk%C3%A5ne.webp"
        );
    }

    #[test]
    fn test_string_to_sign_layout() {
        let url = Url::parse("https://acc.blob.core.windows.net/nyheter?restype=container&comp=acl").unwrap();
        let headers: BTreeMap<String, String> = [
            ("x-ms-blob-public-access".to_string(), "blob".to_string()),
            ("x-ms-date".to_string(), "Mon, 01 Jan 2024 00:00:00 GMT".to_string()),
            ("x-ms-version".to_string(), API_VERSION.to_string()),
        ]
        .into_iter()
        .collect();

        let to_sign = string_to_sign("PUT", &url, "acc", &headers, 0, "");
        assert_eq!(
            to_sign,
            "PUT\n\n\n\n\n\n\n\n\n\n\n\n\
x-ms-blob-public-access:blob\n\
x-ms-date:Mon, 01 Jan 2024 00:00:00 GMT\n\
x-ms-version:2021-08-06\n\
/acc/nyheter\ncomp:acl\nrestype:container"
        );
    }

    #[test]
    fn test_sign_is_deterministic() {
        let a = sign(b"secret-key", "payload").unwrap();
        assert_eq!(a, sign(b"secret-key", "payload").unwrap());
        assert_ne!(a, sign(b"other-key", "payload").unwrap());
    }
}
