//! Merging of configuration maps and ordered property-source lists.
//!
//! The resolution engine returns property sources pre-ordered, most
//! specific first, and never merges them itself. Front ends that want a
//! single effective map use [`merge_by_precedence`].

use crate::config::{ConfigMap, ConfigValue, PropertySource};

/// Merges `overlay` into `base` recursively.
///
/// 1. Keys only in `overlay` are added to `base`.
/// 2. When both sides hold objects, they are merged recursively.
/// 3. Otherwise the overlay value wins. Arrays are replaced, never
///    concatenated.
pub fn deep_merge(base: &mut ConfigMap, overlay: &ConfigMap) {
    for (key, overlay_val) in overlay.as_inner() {
        match base.as_inner_mut().get_mut(key) {
            Some(base_val) => merge_values(base_val, overlay_val),
            None => base.insert(key.clone(), overlay_val.clone()),
        }
    }
}

fn merge_values(base: &mut ConfigValue, overlay: &ConfigValue) {
    match (base, overlay) {
        (ConfigValue::Object(base_map), ConfigValue::Object(overlay_map)) => {
            for (key, overlay_inner) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_inner) => merge_values(base_inner, overlay_inner),
                    None => {
                        base_map.insert(key.clone(), overlay_inner.clone());
                    },
                }
            }
        },
        (base_val, overlay_val) => {
            *base_val = overlay_val.clone();
        },
    }
}

/// Merges sources ordered most specific first into one effective map.
///
/// The last source is applied first, so earlier sources override later
/// ones.
///
/// ```
/// use tessera_core::{ConfigMap, PropertySource};
/// use tessera_core::merge::merge_by_precedence;
///
/// let specific = PropertySource::new("svc1-dev.yml", ConfigMap::from_yaml("port: 81").unwrap());
/// let shared = PropertySource::new("application.yml", ConfigMap::from_yaml("port: 80\nhost: a").unwrap());
///
/// let merged = merge_by_precedence(&[specific, shared]);
/// assert_eq!(merged.get("port").unwrap().as_i64(), Some(81));
/// assert_eq!(merged.get("host").unwrap().as_str(), Some("a"));
/// ```
pub fn merge_by_precedence(sources: &[PropertySource]) -> ConfigMap {
    let mut result = ConfigMap::new();
    for source in sources.iter().rev() {
        deep_merge(&mut result, &source.config);
    }
    result
}
