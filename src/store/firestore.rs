use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use gcp_auth::{CustomServiceAccount, TokenProvider};
use serde_json::{Map, Value, json};
use std::fmt;
use tracing::debug;

use super::{Store, StoreError};
use crate::models::{Entry, StoredEntry};

const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

// Where bearer tokens come from
pub enum FirestoreAuth {
    // fixed token, for the emulator ("owner") or a short-lived override
    Static(String),
    // signs its own token requests, caches and refreshes the access token
    ServiceAccount(CustomServiceAccount),
}

impl fmt::Debug for FirestoreAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FirestoreAuth::Static(_) => f.write_str("Static(..)"),
            FirestoreAuth::ServiceAccount(_) => f.write_str("ServiceAccount(..)"),
        }
    }
}

impl FirestoreAuth {
    pub async fn bearer(&self) -> Result<String, StoreError> {
        match self {
            FirestoreAuth::Static(token) => Ok(token.clone()),
            FirestoreAuth::ServiceAccount(sa) => {
                let token = sa.token(&[DATASTORE_SCOPE]).await?;
                Ok(token.as_str().to_string())
            }
        }
    }
}

// Firestore over its REST API (v1). Works against the emulator too when
// `base_url` points at it.
pub struct FirestoreStore {
    client: reqwest::Client,
    documents_url: String,
    collection: String,
    auth: FirestoreAuth,
}

impl FirestoreStore {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        project_id: &str,
        collection: &str,
        auth: FirestoreAuth,
    ) -> Self {
        let documents_url = format!(
            "{}/projects/{}/databases/(default)/documents",
            base_url.trim_end_matches('/'),
            project_id
        );
        Self {
            client,
            documents_url,
            collection: collection.to_string(),
            auth,
        }
    }

    fn latest_query(&self) -> Value {
        json!({
            "structuredQuery": {
                "from": [{ "collectionId": self.collection }],
                "orderBy": [{
                    "field": { "fieldPath": "timestamp" },
                    "direction": "DESCENDING"
                }],
                "limit": 1
            }
        })
    }

    // fetches a token per request, the service account hands back its cached
    // one until it is close to expiry
    async fn post(&self, url: String, body: &Value) -> Result<reqwest::Response, StoreError> {
        let token = self.auth.bearer().await?;
        let res = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(res)
    }
}

#[async_trait]
impl Store for FirestoreStore {
    async fn latest(&self) -> Result<Option<StoredEntry>, StoreError> {
        let url = format!("{}:runQuery", self.documents_url);
        let rows: Vec<Value> = self.post(url, &self.latest_query()).await?.json().await?;

        // an empty result is a single row holding only `readTime`
        match rows.iter().find_map(|row| row.get("document")) {
            Some(document) => decode_document(document).map(Some),
            None => Ok(None),
        }
    }

    async fn append(&self, entry: StoredEntry) -> Result<(), StoreError> {
        let url = format!("{}/{}", self.documents_url, self.collection);
        let res = self.post(url, &encode_document(&entry)).await?;
        debug!(status = %res.status(), collection = %self.collection, "document created");
        Ok(())
    }
}

fn string_value(value: &Option<String>) -> Value {
    match value {
        Some(s) => json!({ "stringValue": s }),
        None => json!({ "nullValue": null }),
    }
}

pub(crate) fn encode_document(stored: &StoredEntry) -> Value {
    let e = &stored.entry;
    json!({
        "fields": {
            "timestamp": {
                "timestampValue": stored.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
            },
            "text": { "stringValue": e.text },
            "ip": string_value(&e.ip),
            "country": string_value(&e.country),
            "region": string_value(&e.region),
            "city": string_value(&e.city),
            "location": string_value(&e.location),
            "os": string_value(&e.os),
        }
    })
}

// `nullValue` and missing fields both read as None
fn field_string(fields: &Map<String, Value>, name: &str) -> Option<String> {
    fields
        .get(name)
        .and_then(|v| v.get("stringValue"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

pub(crate) fn decode_document(document: &Value) -> Result<StoredEntry, StoreError> {
    let fields = document
        .get("fields")
        .and_then(Value::as_object)
        .ok_or_else(|| StoreError::Decode("document has no fields".to_string()))?;

    let raw_ts = fields
        .get("timestamp")
        .and_then(|v| v.get("timestampValue"))
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::Decode("document has no timestamp".to_string()))?;
    let timestamp = DateTime::parse_from_rfc3339(raw_ts)
        .map_err(|e| StoreError::Decode(format!("bad timestamp {raw_ts:?}: {e}")))?
        .with_timezone(&Utc);

    let text = field_string(fields, "text")
        .ok_or_else(|| StoreError::Decode("document has no text".to_string()))?;

    Ok(StoredEntry::new(
        Entry {
            text,
            ip: field_string(fields, "ip"),
            country: field_string(fields, "country"),
            region: field_string(fields, "region"),
            city: field_string(fields, "city"),
            location: field_string(fields, "location"),
            os: field_string(fields, "os"),
        },
        timestamp,
    ))
}
