//! Profile documents in Cloud Firestore, over its REST API

use std::collections::BTreeMap;

use async_trait::async_trait;
use gamescout_core::{GameId, ProfileField, ProfileStore, ProfileUpdate, StoreError, UserProfile};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Number};
use tracing::instrument;

use super::FirebaseSession;

const USERS_COLLECTION: &str = "users";

/// Document fields stored as Firestore timestamps rather than strings
const TIMESTAMP_FIELDS: &[&str] = &["createdAt"];

/// Firestore's typed value encoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    IntegerValue(String),
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    fields: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

impl Value {
    /// Encode a JSON value; `timestamp` marks strings that hold RFC 3339 times
    pub fn from_json(value: serde_json::Value, timestamp: bool) -> Self {
        match value {
            serde_json::Value::Null => Value::NullValue(()),
            serde_json::Value::Bool(b) => Value::BooleanValue(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::IntegerValue(i.to_string()),
                None => match n.as_u64() {
                    Some(u) => Value::IntegerValue(u.to_string()),
                    None => Value::DoubleValue(n.as_f64().unwrap_or_default()),
                },
            },
            serde_json::Value::String(s) if timestamp => Value::TimestampValue(s),
            serde_json::Value::String(s) => Value::StringValue(s),
            serde_json::Value::Array(items) => Value::ArrayValue(ArrayValue {
                values: items.into_iter().map(|v| Value::from_json(v, false)).collect(),
            }),
            serde_json::Value::Object(map) => Value::MapValue(MapValue {
                fields: encode_fields(map),
            }),
        }
    }

    /// Decode into plain JSON; whole doubles become integers
    pub fn into_json(self) -> Result<serde_json::Value, StoreError> {
        Ok(match self {
            Value::NullValue(()) => serde_json::Value::Null,
            Value::BooleanValue(b) => serde_json::Value::Bool(b),
            Value::IntegerValue(s) => {
                let n: i64 = s
                    .parse()
                    .map_err(|_| StoreError::Backend(format!("invalid integer value {s:?}")))?;
                serde_json::Value::from(n)
            }
            Value::DoubleValue(d) if d.fract() == 0.0 && d.abs() < i64::MAX as f64 => {
                serde_json::Value::from(d as i64)
            }
            Value::DoubleValue(d) => Number::from_f64(d)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::TimestampValue(s) | Value::StringValue(s) => serde_json::Value::String(s),
            Value::ArrayValue(array) => serde_json::Value::Array(
                array
                    .values
                    .into_iter()
                    .map(Value::into_json)
                    .collect::<Result<_, _>>()?,
            ),
            Value::MapValue(map) => serde_json::Value::Object(decode_fields(map.fields)?),
        })
    }
}

fn encode_fields(map: Map<String, serde_json::Value>) -> BTreeMap<String, Value> {
    map.into_iter()
        .map(|(key, value)| {
            let timestamp = TIMESTAMP_FIELDS.contains(&key.as_str());
            (key, Value::from_json(value, timestamp))
        })
        .collect()
}

fn decode_fields(
    fields: BTreeMap<String, Value>,
) -> Result<Map<String, serde_json::Value>, StoreError> {
    fields
        .into_iter()
        .map(|(key, value)| Ok((key, value.into_json()?)))
        .collect()
}

fn to_fields(value: &impl Serialize) -> Result<BTreeMap<String, Value>, StoreError> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::Object(map)) => Ok(encode_fields(map)),
        Ok(other) => Err(StoreError::Backend(format!("expected an object, got {other}"))),
        Err(e) => Err(StoreError::Backend(e.to_string())),
    }
}

/// Profile from a document's fields
pub fn decode_profile(fields: BTreeMap<String, Value>) -> Result<UserProfile, StoreError> {
    let object = decode_fields(fields)?;
    serde_json::from_value(serde_json::Value::Object(object))
        .map_err(|e| StoreError::Backend(format!("malformed profile document: {e}")))
}

/// Profile documents under `users/{uid}`.
///
/// Requests carry the ID token of the shared [`FirebaseSession`] when one is present.
pub struct FirestoreProfiles {
    client: reqwest::Client,
    base_url: String,
    database: String,
    session: FirebaseSession,
}

impl FirestoreProfiles {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        project_id: &str,
        session: FirebaseSession,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            database: format!("projects/{}/databases/(default)", project_id),
            session,
        }
    }

    /// Resource name of a user's document
    fn document_name(&self, uid: &str) -> String {
        format!("{}/documents/{}/{}", self.database, USERS_COLLECTION, uid)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match self.session.id_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send and decode; `Ok(None)` when the document does not exist
    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<Option<T>, StoreError> {
        let response = builder
            .send()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let envelope = serde_json::from_str::<ErrorEnvelope>(&text).ok();
            return match envelope {
                Some(envelope) if envelope.error.status == "NOT_FOUND" => Ok(None),
                Some(envelope) if !envelope.error.message.is_empty() => {
                    Err(StoreError::Backend(envelope.error.message))
                }
                _ => Err(StoreError::Backend(format!("HTTP {}", status.as_u16()))),
            };
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn transform(
        &self,
        uid: &str,
        field: ProfileField,
        operation: &str,
        game_id: GameId,
    ) -> Result<(), StoreError> {
        let name = self.document_name(uid);
        let body = json!({
            "writes": [{
                "transform": {
                    "document": name,
                    "fieldTransforms": [{
                        "fieldPath": field.as_str(),
                        operation: {"values": [Value::IntegerValue(game_id.to_string())]},
                    }],
                },
                "currentDocument": {"exists": true},
            }],
        });
        let builder = self
            .request(Method::POST, &format!("{}/documents:commit", self.database))
            .json(&body);
        match self.send::<serde_json::Value>(builder).await? {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(name)),
        }
    }
}

#[async_trait]
impl ProfileStore for FirestoreProfiles {
    #[instrument(skip(self))]
    async fn get(&self, uid: &str) -> Result<Option<UserProfile>, StoreError> {
        let builder = self.request(Method::GET, &self.document_name(uid));
        match self.send::<Document>(builder).await? {
            Some(document) => decode_profile(document.fields).map(Some),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, profile), fields(uid = %profile.uid))]
    async fn set(&self, profile: &UserProfile) -> Result<(), StoreError> {
        let document = Document {
            fields: to_fields(profile)?,
        };
        let builder = self
            .request(Method::PATCH, &self.document_name(&profile.uid))
            .json(&document);
        self.send::<Document>(builder)
            .await?
            .map(|_| ())
            .ok_or_else(|| StoreError::Backend("document write was rejected".to_string()))
    }

    #[instrument(skip(self, update))]
    async fn update(&self, uid: &str, update: &ProfileUpdate) -> Result<(), StoreError> {
        let name = self.document_name(uid);
        // An empty mask would overwrite the whole document
        if update.is_empty() {
            return match self.get(uid).await? {
                Some(_) => Ok(()),
                None => Err(StoreError::NotFound(name)),
            };
        }

        let mut query: Vec<(&str, &str)> = update
            .field_paths()
            .into_iter()
            .map(|path| ("updateMask.fieldPaths", path))
            .collect();
        query.push(("currentDocument.exists", "true"));

        let document = Document {
            fields: to_fields(update)?,
        };
        let builder = self
            .request(Method::PATCH, &name)
            .query(&query)
            .json(&document);
        match self.send::<Document>(builder).await? {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(name)),
        }
    }

    async fn array_union(
        &self,
        uid: &str,
        field: ProfileField,
        game_id: GameId,
    ) -> Result<(), StoreError> {
        self.transform(uid, field, "appendMissingElements", game_id).await
    }

    async fn array_remove(
        &self,
        uid: &str,
        field: ProfileField,
        game_id: GameId,
    ) -> Result<(), StoreError> {
        self.transform(uid, field, "removeAllFromArray", game_id).await
    }
}
