use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::{FeatureId, RenderedFeature};

/// Properties that usually identify a feature when the source has no explicit id.
const COMMON_ID_PROPERTIES: &[&str] = &["name", "osm_id", "code", "gid", "objectid", "OBJECTID"];
const ID_PROPERTIES: &[&str] = &["id", "fid"];

/// Best effort stable identity of a feature, used to recognise one logical feature reported by
/// several engine layers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "kebab-case")]
pub enum FeatureIdentity {
    /// Id assigned by the engine or promoted from a property.
    Id(FeatureId),
    /// Value of an identifying property.
    Property {
        /// Property name.
        name: String,
        /// Property value.
        value: String,
    },
    /// Hash of the geometry. Distinct features with identical geometry collapse into one.
    GeometryHash(u64),
}

impl Display for FeatureIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureIdentity::Id(id) => write!(f, "{id}"),
            FeatureIdentity::Property { name, value } => write!(f, "{name}={value}"),
            FeatureIdentity::GeometryHash(hash) => write!(f, "#{hash:016x}"),
        }
    }
}

fn property_identity(feature: &RenderedFeature, name: &str) -> Option<FeatureIdentity> {
    let value = match feature.properties.get(name)? {
        Value::String(value) if !value.is_empty() => value.clone(),
        Value::Number(value) => value.to_string(),
        _ => return None,
    };

    Some(FeatureIdentity::Property {
        name: name.to_string(),
        value,
    })
}

fn geometry_hash(feature: &RenderedFeature) -> u64 {
    let hasher = ahash::RandomState::with_seeds(
        0x243f_6a88_85a3_08d3,
        0x1319_8a2e_0370_7344,
        0xa409_3822_299f_31d0,
        0x082e_fa98_ec4e_6c89,
    );

    let hashed = match &feature.geometry {
        Some(geometry) => geometry.to_string(),
        None => Value::Object(feature.properties.clone()).to_string(),
    };

    hasher.hash_one(hashed)
}

impl FeatureIdentity {
    /// Derives the identity of a feature: the engine id, then the configured id property, then
    /// `id` or `fid`, then one of the common identifying properties and finally the geometry
    /// hash.
    pub fn of(feature: &RenderedFeature, id_field: Option<&str>) -> Self {
        if let Some(id) = &feature.id {
            return FeatureIdentity::Id(id.clone());
        }

        id_field
            .into_iter()
            .chain(ID_PROPERTIES.iter().copied())
            .chain(COMMON_ID_PROPERTIES.iter().copied())
            .find_map(|name| property_identity(feature, name))
            .unwrap_or_else(|| FeatureIdentity::GeometryHash(geometry_hash(feature)))
    }
}
