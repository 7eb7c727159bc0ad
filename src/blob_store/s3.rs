use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;

use super::{BlobStore, BlobStoreError};
use crate::aws::{self, AwsCredentials, AwsSigner};

/// Amazon S3 blob store backend.
///
/// Requests are signed with SigV4 against the regional REST endpoint;
/// public urls use the bucket-hosted form the uploads were ACL'd for.
pub struct S3Store {
    bucket: String,
    host: String,
    client: Client,
    signer: AwsSigner,
}

impl S3Store {
    pub fn new(
        bucket: &str,
        region: &str,
        credentials: AwsCredentials,
    ) -> Result<Self, anyhow::Error> {
        let client = Client::builder().build()?;
        Ok(Self {
            bucket: bucket.to_string(),
            host: format!("{bucket}.s3.{region}.amazonaws.com"),
            client,
            signer: AwsSigner::new(credentials, region, "s3"),
        })
    }

    fn object_uri(&self, key: &str) -> String {
        format!("/{}", aws::uri_encode(key, false))
    }

    /// Signed request headers for one S3 call. The payload hash is also
    /// sent as `x-amz-content-sha256`, which S3 requires.
    fn signed_headers(
        &self,
        method: &str,
        uri: &str,
        query: &str,
        payload_hash: &str,
        extra: &[(&str, &str)],
    ) -> Vec<(String, String)> {
        let amz_date = aws::amz_timestamp(chrono::Utc::now());

        let mut to_sign = BTreeMap::new();
        to_sign.insert("host".to_string(), self.host.clone());
        to_sign.insert("x-amz-content-sha256".to_string(), payload_hash.to_string());
        to_sign.insert("x-amz-date".to_string(), amz_date.clone());
        for (name, value) in extra {
            to_sign.insert((*name).to_string(), (*value).to_string());
        }

        let authorization = self
            .signer
            .authorization(method, uri, query, &to_sign, payload_hash, &amz_date);

        let mut headers: Vec<(String, String)> = to_sign
            .into_iter()
            .filter(|(name, _)| name != "host")
            .collect();
        headers.push(("authorization".to_string(), authorization));
        headers
    }

    async fn send(
        &self,
        mut request: reqwest::RequestBuilder,
        headers: Vec<(String, String)>,
    ) -> Result<reqwest::Response, BlobStoreError> {
        for (name, value) in headers {
            request = request.header(name, value);
        }
        request
            .send()
            .await
            .map_err(|e| BlobStoreError::Backend(e.to_string()))
    }
}

#[async_trait]
impl BlobStore for S3Store {
    async fn put(&self, key: &str, content_type: &str, data: Bytes) -> Result<(), BlobStoreError> {
        let uri = self.object_uri(key);
        let payload_hash = aws::sha256_hex(&data);
        let headers = self.signed_headers(
            "PUT",
            &uri,
            "",
            &payload_hash,
            &[
                ("content-type", content_type),
                // Objects are served straight from the bucket
                ("x-amz-acl", "public-read"),
            ],
        );

        let url = format!("https://{}{uri}", self.host);
        let resp = self.send(self.client.put(url).body(data), headers).await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(BlobStoreError::Backend(format!(
                "S3 upload failed ({status}): {body}"
            )));
        }

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, BlobStoreError> {
        let uri = self.object_uri(key);
        let payload_hash = aws::sha256_hex(b"");
        let headers = self.signed_headers("GET", &uri, "", &payload_hash, &[]);

        let url = format!("https://{}{uri}", self.host);
        let resp = self.send(self.client.get(url), headers).await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(BlobStoreError::NotFound(key.to_string()));
        }

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(BlobStoreError::Backend(format!(
                "S3 download failed ({status}): {body}"
            )));
        }

        resp.bytes()
            .await
            .map_err(|e| BlobStoreError::Backend(e.to_string()))
    }

    async fn list_keys(&self) -> Result<Vec<String>, BlobStoreError> {
        let payload_hash = aws::sha256_hex(b"");
        let headers = self.signed_headers("GET", "/", "list-type=2", &payload_hash, &[]);

        let url = format!("https://{}/?list-type=2", self.host);
        let resp = self.send(self.client.get(url), headers).await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(BlobStoreError::Backend(format!(
                "S3 list failed ({status}): {body}"
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| BlobStoreError::Backend(e.to_string()))?;

        Ok(extract_keys(&body))
    }

    fn url(&self, key: &str) -> String {
        format!("https://{}.s3.amazonaws.com/{key}", self.bucket)
    }
}

/// Pull every `<Key>` element out of a ListObjectsV2 response. The response
/// schema is flat and stable, so a scanner beats carrying an XML parser.
fn extract_keys(xml: &str) -> Vec<String> {
    let mut keys = Vec::new();
    let mut rest = xml;
    while let Some(start) = rest.find("<Key>") {
        rest = &rest[start + "<Key>".len()..];
        match rest.find("</Key>") {
            Some(end) => {
                keys.push(xml_unescape(&rest[..end]));
                rest = &rest[end + "</Key>".len()..];
            }
            None => break,
        }
    }
    keys
}

fn xml_unescape(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
