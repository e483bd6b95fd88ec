// Copyright 2026 The Config DAG Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Generic map<->struct projection and deep merge (spec.md §4.2).
//!
//! `jj-lib` prefers generated/derive-style (de)serialization and falls back
//! to a plain JSON map for schema-less content (§9's "reflection-based
//! struct<->map conversion" design note); we follow the same split here —
//! `to_map`/`from_map` are thin `serde_json::Value` round-trips rather than
//! reflection, and callers that truly have no fixed shape just work with
//! `RecordContents` directly.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::ConfigError;
use crate::model::RecordContents;

/// Projects a typed value into an untyped JSON map.
pub fn to_map<T: Serialize>(value: &T) -> Result<RecordContents, ConfigError> {
    let json = serde_json::to_value(value).map_err(|e| ConfigError::ConfigDataObjectEncodingFailed {
        source: Box::new(e),
    })?;
    match json {
        Value::Object(map) => Ok(map),
        other => Err(ConfigError::InvalidConfigRecordType(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

/// Inverse of [`to_map`]; fails with `InvalidConfigRecordType` on mismatch.
pub fn from_map<T: DeserializeOwned>(map: &RecordContents) -> Result<T, ConfigError> {
    serde_json::from_value(Value::Object(map.clone()))
        .map_err(|e| ConfigError::InvalidConfigRecordType(e.to_string()))
}

/// Deep override merge: `src` wins on leaf conflicts, maps merge
/// recursively, arrays and scalars replace wholesale (spec.md §4.2).
pub fn merge(dest: &mut RecordContents, src: &RecordContents) {
    for (key, src_value) in src {
        match dest.get_mut(key) {
            Some(Value::Object(dest_map)) => {
                if let Value::Object(src_map) = src_value {
                    merge(dest_map, src_map);
                    continue;
                }
                dest.insert(key.clone(), src_value.clone());
            }
            _ => {
                dest.insert(key.clone(), src_value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Widget {
        name: String,
        count: u32,
    }

    #[test]
    fn round_trips() {
        let widget = Widget { name: "gizmo".into(), count: 3 };
        let map = to_map(&widget).unwrap();
        let back: Widget = from_map(&map).unwrap();
        assert_eq!(widget, back);
    }

    #[test]
    fn rejects_non_object_json() {
        let err = to_map(&42).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfigRecordType(_)));
    }

    #[test]
    fn deep_merge_overrides_leaves_and_recurses_into_maps() {
        let mut dest = json!({"title": "Hello", "meta": {"tag": "v0", "kept": true}})
            .as_object()
            .unwrap()
            .clone();
        let src = json!({"meta": {"tag": "v1"}}).as_object().unwrap().clone();
        merge(&mut dest, &src);
        assert_eq!(
            Value::Object(dest),
            json!({"title": "Hello", "meta": {"tag": "v1", "kept": true}})
        );
    }

    #[test]
    fn deep_merge_replaces_arrays_and_scalars_wholesale() {
        let mut dest = json!({"tags": ["a", "b"], "n": 1}).as_object().unwrap().clone();
        let src = json!({"tags": ["c"], "n": "two"}).as_object().unwrap().clone();
        merge(&mut dest, &src);
        assert_eq!(Value::Object(dest), json!({"tags": ["c"], "n": "two"}));
    }
}
