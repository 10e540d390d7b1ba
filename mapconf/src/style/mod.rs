//! Style classification and default styles.
//!
//! Configuration documents describe the style of a group with one flat property bag. The engine
//! needs the properties split into paint and layout families per layer kind, and merged with the
//! default styles of the group type. This module does both.

mod classifier;
mod defaults;
mod expression;
mod properties;

pub use classifier::{classify, has_properties_of, ClassifiedStyle};
pub use defaults::{
    resolve_defaults, KindDefaults, KindDefaultsPartial, StyleDefaults, StyleDefaultsPartial,
};
pub use expression::{combine_with_default, is_zoom_expression, operator};
pub use properties::{prefix_owner, StylePropertyMap, VISIBILITY};
