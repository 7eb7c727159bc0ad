use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::models::{ImageMetadata, UserRecord};
use super::{MetadataStore, MetadataStoreError};
use crate::aws::{self, AwsCredentials, AwsSigner};

const CONTENT_TYPE: &str = "application/x-amz-json-1.0";

/// Amazon DynamoDB metadata store backend, speaking the JSON wire protocol
/// directly.
///
/// Image rows: partition key `s3Key`, string attributes `Title`,
/// `Description`, `UploadTime` and a string-set attribute `Tags`. User
/// rows: partition key `username`, string attribute `password`.
pub struct DynamoStore {
    client: Client,
    signer: AwsSigner,
    host: String,
    image_table: String,
    user_table: String,
}

impl DynamoStore {
    pub fn new(
        region: &str,
        credentials: AwsCredentials,
        image_table: &str,
        user_table: &str,
    ) -> Result<Self, anyhow::Error> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            signer: AwsSigner::new(credentials, region, "dynamodb"),
            host: format!("dynamodb.{region}.amazonaws.com"),
            image_table: image_table.to_string(),
            user_table: user_table.to_string(),
        })
    }

    async fn call(&self, operation: &str, body: Value) -> Result<Value, MetadataStoreError> {
        let payload = body.to_string();
        let payload_hash = aws::sha256_hex(payload.as_bytes());
        let amz_date = aws::amz_timestamp(chrono::Utc::now());
        let target = format!("DynamoDB_20120810.{operation}");

        let mut to_sign = BTreeMap::new();
        to_sign.insert("content-type".to_string(), CONTENT_TYPE.to_string());
        to_sign.insert("host".to_string(), self.host.clone());
        to_sign.insert("x-amz-date".to_string(), amz_date.clone());
        to_sign.insert("x-amz-target".to_string(), target.clone());

        let authorization =
            self.signer
                .authorization("POST", "/", "", &to_sign, &payload_hash, &amz_date);

        let resp = self
            .client
            .post(format!("https://{}/", self.host))
            .header("content-type", CONTENT_TYPE)
            .header("x-amz-date", amz_date)
            .header("x-amz-target", target)
            .header("authorization", authorization)
            .body(payload)
            .send()
            .await
            .map_err(|e| MetadataStoreError::Backend(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| MetadataStoreError::Backend(e.to_string()))?;

        if !status.is_success() {
            if text.contains("ConditionalCheckFailedException") {
                return Err(MetadataStoreError::AlreadyExists(format!(
                    "{operation} condition failed"
                )));
            }
            return Err(MetadataStoreError::Backend(format!(
                "DynamoDB {operation} failed ({status}): {text}"
            )));
        }

        serde_json::from_str(&text).map_err(|e| {
            MetadataStoreError::Backend(format!("DynamoDB {operation} returned invalid JSON: {e}"))
        })
    }
}

#[async_trait]
impl MetadataStore for DynamoStore {
    async fn put_image(&self, record: &ImageMetadata) -> Result<(), MetadataStoreError> {
        let body = json!({
            "TableName": self.image_table,
            "Item": image_to_item(record),
        });
        self.call("PutItem", body).await.map(|_| ())
    }

    async fn get_image(&self, key: &str) -> Result<Option<ImageMetadata>, MetadataStoreError> {
        let body = json!({
            "TableName": self.image_table,
            "Key": { "s3Key": { "S": key } },
        });
        let resp = self.call("GetItem", body).await?;
        Ok(resp.get("Item").map(item_to_image))
    }

    async fn scan_images(&self) -> Result<Vec<ImageMetadata>, MetadataStoreError> {
        let body = json!({ "TableName": self.image_table });
        let resp = self.call("Scan", body).await?;

        let records = resp
            .get("Items")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(item_to_image).collect())
            .unwrap_or_default();

        Ok(records)
    }

    async fn create_user(&self, user: &UserRecord) -> Result<(), MetadataStoreError> {
        let body = json!({
            "TableName": self.user_table,
            "Item": {
                "username": { "S": user.username },
                "password": { "S": user.password_hash },
            },
            "ConditionExpression": "attribute_not_exists(username)",
        });
        match self.call("PutItem", body).await {
            Ok(_) => Ok(()),
            Err(MetadataStoreError::AlreadyExists(_)) => {
                Err(MetadataStoreError::AlreadyExists(user.username.clone()))
            }
            Err(e) => Err(e),
        }
    }

    async fn get_user(&self, username: &str) -> Result<Option<UserRecord>, MetadataStoreError> {
        let body = json!({
            "TableName": self.user_table,
            "Key": { "username": { "S": username } },
        });
        let resp = self.call("GetItem", body).await?;

        Ok(resp.get("Item").map(|item| UserRecord {
            username: attr_s(item, "username"),
            password_hash: attr_s(item, "password"),
        }))
    }
}

fn image_to_item(record: &ImageMetadata) -> Value {
    let mut item = serde_json::Map::new();
    item.insert("s3Key".to_string(), json!({ "S": record.key }));
    item.insert("Title".to_string(), json!({ "S": record.title }));
    item.insert("Description".to_string(), json!({ "S": record.description }));
    item.insert("UploadTime".to_string(), json!({ "S": record.upload_time }));
    // DynamoDB rejects empty string sets; an absent attribute reads back
    // as the empty set.
    if !record.tags.is_empty() {
        item.insert("Tags".to_string(), json!({ "SS": record.tags }));
    }
    Value::Object(item)
}

fn item_to_image(item: &Value) -> ImageMetadata {
    ImageMetadata {
        key: attr_s(item, "s3Key"),
        title: attr_s(item, "Title"),
        description: attr_s(item, "Description"),
        tags: attr_ss(item, "Tags"),
        upload_time: attr_s(item, "UploadTime"),
    }
}

fn attr_s(item: &Value, name: &str) -> String {
    item.get(name)
        .and_then(|attr| attr.get("S"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn attr_ss(item: &Value, name: &str) -> BTreeSet<String> {
    item.get(name)
        .and_then(|attr| attr.get("SS"))
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> ImageMetadata {
        ImageMetadata {
            key: "1712000000000-cat.png".to_string(),
            title: "Cat".to_string(),
            description: "A cat".to_string(),
            tags: ["pet", "cute"].iter().map(|s| s.to_string()).collect(),
            upload_time: "2024-04-01T12:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn test_item_round_trip() {
        let record = sample_record();
        let item = image_to_item(&record);
        assert_eq!(item_to_image(&item), record);
    }

    #[test]
    fn test_empty_tags_attribute_is_omitted() {
        let record = ImageMetadata::missing("k");
        let item = image_to_item(&record);

        assert!(item.get("Tags").is_none());
        assert_eq!(item["Title"]["S"], "");

        // And the absent attribute reads back as the empty set
        assert!(item_to_image(&item).tags.is_empty());
    }

    #[test]
    fn test_partial_item_reads_with_defaults() {
        let item = json!({ "s3Key": { "S": "only-key" } });
        let record = item_to_image(&item);

        assert_eq!(record.key, "only-key");
        assert_eq!(record.title, "");
        assert_eq!(record.description, "");
        assert!(record.tags.is_empty());
        assert_eq!(record.upload_time, "");
    }

    #[test]
    fn test_tags_serialize_as_string_set() {
        let item = image_to_item(&sample_record());
        let tags = item["Tags"]["SS"].as_array().unwrap();
        assert_eq!(tags.len(), 2);
        assert!(tags.contains(&json!("pet")));
        assert!(tags.contains(&json!("cute")));
    }
}
