//! # Scheme
//!
//! A [`Scheme`] knows every schema version of one kind and how to move between the
//! tagged wire form and the hub.
//!
//! ```text
//!  {"apiVersion": "…/v1alpha1", …} ──decode──▶ spoke ──convert_to──▶ hub
//!  hub ──convert_from──▶ spoke ──encode──▶ {"apiVersion": "…/v1alpha1", …}
//! ```
//!
//! Every path goes through the hub. A document is never converted directly from one
//! spoke to another, so registering a new version never requires touching an
//! existing one.

use crate::error::FrameworkError;
use crate::object::{Convertible, Hub, Versioned};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

type DecodeFn<H> = Box<dyn Fn(Value) -> Result<H, FrameworkError> + Send + Sync>;
type EncodeFn<H> = Box<dyn Fn(&H) -> Result<Value, FrameworkError> + Send + Sync>;

struct VersionCodec<H> {
    decode: DecodeFn<H>,
    encode: EncodeFn<H>,
}

/// Registry of the schema versions of the kind whose hub is `H`.
pub struct Scheme<H: Hub> {
    versions: BTreeMap<&'static str, VersionCodec<H>>,
}

impl<H> Default for Scheme<H>
where
    H: Hub + Serialize + DeserializeOwned,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<H> Scheme<H>
where
    H: Hub + Serialize + DeserializeOwned,
{
    /// Creates a scheme that knows only the hub version.
    pub fn new() -> Self {
        Self {
            versions: BTreeMap::new(),
        }
        .register::<H>()
    }
}

impl<H: Hub> Scheme<H> {
    /// Adds a spoke version. Re-registering a version replaces it.
    pub fn register<V>(mut self) -> Self
    where
        V: Versioned + Convertible<H> + Serialize + DeserializeOwned + 'static,
    {
        let decode: DecodeFn<H> = Box::new(|value| {
            let spoke: V = serde_json::from_value(value)?;
            Ok(spoke.convert_to())
        });
        let encode: EncodeFn<H> = Box::new(|hub| {
            let spoke = V::convert_from(hub);
            tag(serde_json::to_value(&spoke)?, V::API_VERSION, V::KIND)
        });
        self.versions
            .insert(V::API_VERSION, VersionCodec { decode, encode });
        self
    }

    /// All registered API versions, in sorted order.
    pub fn versions(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.versions.keys().copied()
    }

    pub fn recognizes(&self, api_version: &str) -> bool {
        self.versions.contains_key(api_version)
    }

    /// Decodes a tagged document of any registered version into the hub.
    pub fn decode(&self, value: Value) -> Result<H, FrameworkError> {
        let object = value
            .as_object()
            .ok_or_else(|| FrameworkError::Codec("document is not an object".to_string()))?;

        match object.get("kind").and_then(Value::as_str) {
            Some(kind) if kind == H::KIND => {}
            Some(kind) => {
                return Err(FrameworkError::Codec(format!(
                    "expected kind {}, found {kind}",
                    H::KIND
                )))
            }
            None => return Err(FrameworkError::Codec("missing kind".to_string())),
        }

        let api_version = object
            .get("apiVersion")
            .and_then(Value::as_str)
            .ok_or_else(|| FrameworkError::Codec("missing apiVersion".to_string()))?;
        let codec = self
            .versions
            .get(api_version)
            .ok_or_else(|| FrameworkError::UnknownVersion(api_version.to_string()))?;

        (codec.decode)(value)
    }

    /// Encodes the hub in the requested version.
    pub fn encode(&self, hub: &H, api_version: &str) -> Result<Value, FrameworkError> {
        let codec = self
            .versions
            .get(api_version)
            .ok_or_else(|| FrameworkError::UnknownVersion(api_version.to_string()))?;
        (codec.encode)(hub)
    }

    /// Rewrites a document into another version, through the hub.
    pub fn convert(&self, value: Value, api_version: &str) -> Result<Value, FrameworkError> {
        let hub = self.decode(value)?;
        self.encode(&hub, api_version)
    }
}

fn tag(value: Value, api_version: &str, kind: &str) -> Result<Value, FrameworkError> {
    let Value::Object(fields) = value else {
        return Err(FrameworkError::Codec(format!(
            "{api_version} does not serialize to an object"
        )));
    };
    let mut tagged = Map::with_capacity(fields.len() + 2);
    tagged.insert("apiVersion".to_string(), Value::String(api_version.to_string()));
    tagged.insert("kind".to_string(), Value::String(kind.to_string()));
    tagged.extend(fields);
    Ok(Value::Object(tagged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectMeta;
    use serde::Deserialize;
    use serde_json::json;

    // Hub stores a temperature in tenths of a degree; the spoke only has whole degrees.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Probe {
        metadata: ObjectMeta,
        tenths: i64,
        #[serde(default)]
        status: String,
    }

    impl Versioned for Probe {
        const API_VERSION: &'static str = "test/v2";
        const KIND: &'static str = "Probe";
    }

    impl Hub for Probe {
        type Status = String;
        fn meta(&self) -> &ObjectMeta {
            &self.metadata
        }
        fn meta_mut(&mut self) -> &mut ObjectMeta {
            &mut self.metadata
        }
        fn status(&self) -> &String {
            &self.status
        }
        fn set_status(&mut self, status: String) {
            self.status = status;
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct ProbeV1 {
        metadata: ObjectMeta,
        degrees: i64,
    }

    impl Versioned for ProbeV1 {
        const API_VERSION: &'static str = "test/v1";
        const KIND: &'static str = "Probe";
    }

    impl Convertible<Probe> for ProbeV1 {
        fn convert_to(&self) -> Probe {
            Probe {
                metadata: self.metadata.clone(),
                tenths: self.degrees * 10,
                status: String::new(),
            }
        }
        fn convert_from(hub: &Probe) -> Self {
            Self {
                metadata: hub.metadata.clone(),
                degrees: hub.tenths / 10,
            }
        }
    }

    fn scheme() -> Scheme<Probe> {
        Scheme::new().register::<ProbeV1>()
    }

    #[test]
    fn test_decode_spoke_lands_in_hub() {
        let hub = scheme()
            .decode(json!({
                "apiVersion": "test/v1",
                "kind": "Probe",
                "metadata": { "name": "p" },
                "degrees": 4
            }))
            .unwrap();
        assert_eq!(hub.tenths, 40);
        assert_eq!(hub.metadata.name, "p");
    }

    #[test]
    fn test_encode_tags_document() {
        let hub = Probe {
            metadata: ObjectMeta::new("p"),
            tenths: 47,
            status: "ok".to_string(),
        };
        let doc = scheme().encode(&hub, "test/v1").unwrap();
        assert_eq!(doc["apiVersion"], "test/v1");
        assert_eq!(doc["kind"], "Probe");
        assert_eq!(doc["degrees"], 4);
    }

    #[test]
    fn test_convert_between_versions() {
        let doc = scheme()
            .convert(
                json!({
                    "apiVersion": "test/v1",
                    "kind": "Probe",
                    "metadata": { "name": "p", "resourceVersion": 3 },
                    "degrees": 2
                }),
                "test/v2",
            )
            .unwrap();
        assert_eq!(doc["tenths"], 20);
        assert_eq!(doc["metadata"]["resourceVersion"], 3);
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let err = scheme()
            .decode(json!({ "apiVersion": "test/v9", "kind": "Probe" }))
            .unwrap_err();
        assert!(matches!(err, FrameworkError::UnknownVersion(v) if v == "test/v9"));
    }

    #[test]
    fn test_wrong_kind_is_rejected() {
        let err = scheme()
            .decode(json!({ "apiVersion": "test/v1", "kind": "Other" }))
            .unwrap_err();
        assert!(matches!(err, FrameworkError::Codec(_)));
    }

    #[test]
    fn test_versions_lists_hub_and_spokes() {
        let versions: Vec<_> = scheme().versions().collect();
        assert_eq!(versions, vec!["test/v1", "test/v2"]);
    }
}
