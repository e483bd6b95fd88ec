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

//! Content-identity and opaque-identity wrapper types.
//!
//! Grounded on `jj-lib`'s `object_id::id_type!` macro: a byte vector wrapped
//! in a newtype with hex (de)serialization, `Display`, and `Ord`. We keep the
//! same shape but drop the "reverse hex" flavor jj uses for change ids, since
//! nothing here needs it.

use std::fmt;

pub trait ObjectId {
    fn as_bytes(&self) -> &[u8];
    fn hex(&self) -> String;
}

macro_rules! id_type {
    ($(#[$attr:meta])* $vis:vis $name:ident) => {
        $(#[$attr])*
        #[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Default)]
        $vis struct $name(Vec<u8>);

        impl $name {
            pub fn new(bytes: Vec<u8>) -> Self {
                Self(bytes)
            }

            pub fn from_hex(hex: &str) -> Option<Self> {
                hex::decode(hex).ok().map(Self)
            }
        }

        impl $crate::object_id::ObjectId for $name {
            fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            fn hex(&self) -> String {
                hex::encode(&self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.hex()).finish()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.hex())
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                self.hex().serialize(serializer)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let hex = String::deserialize(deserializer)?;
                Self::from_hex(&hex).ok_or_else(|| serde::de::Error::custom("invalid hex id"))
            }
        }
    };
}

id_type!(
    /// SHA-256 of a node's canonical-JSON contents (hash field zeroed).
    pub VersionHash
);
id_type!(
    /// Stable identity of a logical record across its version chain.
    pub RecordId
);

impl VersionHash {
    /// SHA-256 of the empty JSON object `{}`, reserved as the zeroed-hash
    /// sentinel and as the hash of the canonical empty root node.
    pub const EMPTY_HEX: &'static str =
        "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a";

    pub fn empty() -> Self {
        Self::from_hex(Self::EMPTY_HEX).unwrap()
    }

    pub fn is_empty(&self) -> bool {
        self.hex() == Self::EMPTY_HEX
    }
}

impl RecordId {
    pub fn new_random() -> Self {
        Self::new(uuid::Uuid::new_v4().as_bytes().to_vec())
    }
}
