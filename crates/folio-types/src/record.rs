//! The entry-file codec.
//!
//! One entry file is a JSON object. Reserved keys prefixed with `_` carry
//! the meta header (id, type, ordering key, seed marker); everything else is
//! opaque field data interpreted against the schema. Phase and slug live in
//! the file name, never in the body.

use serde_json::{Map, Value};

use crate::error::{TypeError, TypeResult};
use crate::fracindex::FracKey;
use crate::hasher::ContentHasher;
use crate::id::EntryId;
use crate::sha::Sha;

const KEY_ID: &str = "_id";
const KEY_TYPE: &str = "_type";
const KEY_INDEX: &str = "_index";
const KEY_SEEDED: &str = "_seeded";

/// Meta header of one entry file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryMeta {
    /// Stable id shared by all phase and locale variants.
    pub id: EntryId,
    /// Schema type name.
    pub type_name: String,
    /// Fractional sibling ordering key.
    pub index: FracKey,
    /// Seed path when this entry originates from configuration.
    pub seeded: Option<String>,
}

/// A parsed entry file: meta header plus opaque field data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryRecord {
    pub meta: EntryMeta,
    /// Typed field values, interpreted against the schema elsewhere.
    pub data: Map<String, Value>,
}

impl EntryRecord {
    /// Create a record from a meta header and field data.
    pub fn new(meta: EntryMeta, data: Map<String, Value>) -> Self {
        Self { meta, data }
    }

    /// Decode an entry file body.
    pub fn decode(bytes: &[u8]) -> TypeResult<Self> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| TypeError::InvalidRecord(e.to_string()))?;
        let Value::Object(mut fields) = value else {
            return Err(TypeError::InvalidRecord("body is not an object".to_string()));
        };

        let id = match fields.remove(KEY_ID) {
            Some(Value::String(s)) => EntryId::parse(s)?,
            _ => return Err(TypeError::InvalidRecord(format!("missing {KEY_ID}"))),
        };
        let type_name = match fields.remove(KEY_TYPE) {
            Some(Value::String(s)) if !s.is_empty() => s,
            _ => return Err(TypeError::InvalidRecord(format!("missing {KEY_TYPE}"))),
        };
        let index = match fields.remove(KEY_INDEX) {
            Some(Value::String(s)) => FracKey::parse(s)?,
            _ => return Err(TypeError::InvalidRecord(format!("missing {KEY_INDEX}"))),
        };
        let seeded = match fields.remove(KEY_SEEDED) {
            Some(Value::String(s)) => Some(s),
            Some(_) => {
                return Err(TypeError::InvalidRecord(format!("{KEY_SEEDED} is not a string")))
            }
            None => None,
        };

        // Any remaining underscore key is from a future format revision.
        if let Some(key) = fields.keys().find(|k| k.starts_with('_')) {
            return Err(TypeError::InvalidRecord(format!("unknown meta key {key}")));
        }

        Ok(Self {
            meta: EntryMeta {
                id,
                type_name,
                index,
                seeded,
            },
            data: fields,
        })
    }

    /// Encode the record as a deterministic JSON file body.
    ///
    /// Keys are emitted in sorted order, so the same record always produces
    /// the same bytes and therefore the same content hash.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Map::new();
        out.insert(KEY_ID.to_string(), Value::String(self.meta.id.to_string()));
        out.insert(KEY_INDEX.to_string(), Value::String(self.meta.index.to_string()));
        if let Some(seeded) = &self.meta.seeded {
            out.insert(KEY_SEEDED.to_string(), Value::String(seeded.clone()));
        }
        out.insert(KEY_TYPE.to_string(), Value::String(self.meta.type_name.clone()));
        for (k, v) in &self.data {
            out.insert(k.clone(), v.clone());
        }
        let mut bytes = serde_json::to_vec_pretty(&Value::Object(out))
            .unwrap_or_default();
        bytes.push(b'\n');
        bytes
    }

    /// Content hash of the parsed row, independent of file formatting.
    pub fn row_hash(&self) -> Sha {
        ContentHasher::ROW.hash(&self.encode())
    }

    /// The entry title, when present.
    pub fn title(&self) -> Option<&str> {
        self.data.get("title").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EntryRecord {
        let mut data = Map::new();
        data.insert("title".to_string(), Value::String("Welcome".to_string()));
        data.insert("body".to_string(), Value::String("Hello there".to_string()));
        EntryRecord::new(
            EntryMeta {
                id: EntryId::parse("entry-1").unwrap(),
                type_name: "Page".to_string(),
                index: FracKey::initial(),
                seeded: None,
            },
            data,
        )
    }

    #[test]
    fn encode_decode_roundtrip() {
        let record = sample();
        let decoded = EntryRecord::decode(&record.encode()).unwrap();
        assert_eq!(record, decoded);
    }

    #[test]
    fn encode_is_deterministic() {
        let record = sample();
        assert_eq!(record.encode(), record.encode());
        assert_eq!(record.row_hash(), record.row_hash());
    }

    #[test]
    fn decode_rejects_missing_meta() {
        let err = EntryRecord::decode(br#"{"title": "No meta"}"#).unwrap_err();
        assert!(matches!(err, TypeError::InvalidRecord(_)));
    }

    #[test]
    fn decode_rejects_non_object() {
        assert!(EntryRecord::decode(b"[1, 2]").is_err());
        assert!(EntryRecord::decode(b"not json").is_err());
    }

    #[test]
    fn decode_rejects_unknown_meta_keys() {
        let body = br#"{"_id": "x", "_type": "Page", "_index": "n", "_future": true}"#;
        let err = EntryRecord::decode(body).unwrap_err();
        assert!(matches!(err, TypeError::InvalidRecord(_)));
    }

    #[test]
    fn seeded_marker_survives_roundtrip() {
        let mut record = sample();
        record.meta.seeded = Some("pages/welcome".to_string());
        let decoded = EntryRecord::decode(&record.encode()).unwrap();
        assert_eq!(decoded.meta.seeded.as_deref(), Some("pages/welcome"));
    }

    #[test]
    fn title_accessor() {
        assert_eq!(sample().title(), Some("Welcome"));
    }

    #[test]
    fn row_hash_ignores_formatting() {
        let record = sample();
        let reformatted = serde_json::to_vec(
            &serde_json::from_slice::<Value>(&record.encode()).unwrap(),
        )
        .unwrap();
        let decoded = EntryRecord::decode(&reformatted).unwrap();
        assert_eq!(record.row_hash(), decoded.row_hash());
    }
}
