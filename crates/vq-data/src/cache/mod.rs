//! Parsed GeoJSON caching
//!
//! A geography resource is parsed once and shared by every map that uses it.

use std::sync::Arc;

use ahash::AHashMap;
use geojson::{FeatureCollection, GeoJson};
use parking_lot::RwLock;
use serde_json::Value;

use crate::DataError;

/// Cache of feature collections keyed by geography resource
pub struct GeoCache {
    /// Cached collections indexed by resource reference
    entries: Arc<RwLock<AHashMap<String, Arc<FeatureCollection>>>>,
    /// Insertion order, oldest first
    order: Arc<RwLock<Vec<String>>>,
    /// Maximum number of collections to cache
    max_entries: usize,
}

impl GeoCache {
    /// Create a new cache
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(AHashMap::new())),
            order: Arc::new(RwLock::new(Vec::new())),
            max_entries: max_entries.max(1),
        }
    }

    /// Get a collection from cache
    pub fn get(&self, resource: &str) -> Option<Arc<FeatureCollection>> {
        self.entries.read().get(resource).cloned()
    }

    /// Parse `raw` and cache it, unless the resource is already cached
    pub fn get_or_parse(&self, resource: &str, raw: &Value) -> Result<Arc<FeatureCollection>, DataError> {
        if let Some(hit) = self.get(resource) {
            tracing::trace!("GeoJSON cache hit for {}", resource);
            return Ok(hit);
        }

        let collection = Arc::new(parse_feature_collection(raw)?);
        self.put(resource, collection.clone());
        Ok(collection)
    }

    /// Put a collection in cache
    pub fn put(&self, resource: &str, collection: Arc<FeatureCollection>) {
        let mut entries = self.entries.write();
        let mut order = self.order.write();

        if !entries.contains_key(resource) {
            // Evict the oldest entry when at capacity
            if entries.len() >= self.max_entries && !order.is_empty() {
                let oldest = order.remove(0);
                entries.remove(&oldest);
                tracing::debug!("Evicted GeoJSON for {}", oldest);
            }
            order.push(resource.to_string());
        }

        entries.insert(resource.to_string(), collection);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear the cache
    pub fn clear(&self) {
        self.entries.write().clear();
        self.order.write().clear();
    }
}

impl Default for GeoCache {
    fn default() -> Self {
        Self::new(16)
    }
}

/// Parse a GeoJSON document into a feature collection
///
/// The endpoint may send the document as a JSON string. A lone feature is
/// wrapped into a one-element collection.
pub fn parse_feature_collection(raw: &Value) -> Result<FeatureCollection, DataError> {
    let geojson = match raw {
        Value::String(text) => text.parse::<GeoJson>()?,
        other => GeoJson::from_json_value(other.clone())?,
    };

    match geojson {
        GeoJson::FeatureCollection(collection) => Ok(collection),
        GeoJson::Feature(feature) => Ok(FeatureCollection {
            bbox: None,
            features: vec![feature],
            foreign_members: None,
        }),
        GeoJson::Geometry(_) => Err(DataError::GeoJson(
            "expected a feature collection, got a bare geometry".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn collection(code: &str) -> Value {
        json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"iso": code},
                "geometry": {"type": "Point", "coordinates": [36.8, -1.3]}
            }]
        })
    }

    #[test]
    fn test_parse_once() {
        let cache = GeoCache::new(4);
        let first = cache.get_or_parse("geo-1", &collection("KE")).unwrap();
        let second = cache.get_or_parse("geo-1", &collection("UG")).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_evicts_oldest() {
        let cache = GeoCache::new(2);
        cache.get_or_parse("a", &collection("A")).unwrap();
        cache.get_or_parse("b", &collection("B")).unwrap();
        cache.get_or_parse("c", &collection("C")).unwrap();

        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_parse_string_and_feature() {
        let text = Value::String(collection("KE").to_string());
        assert_eq!(parse_feature_collection(&text).unwrap().features.len(), 1);

        let feature = json!({
            "type": "Feature",
            "properties": {},
            "geometry": {"type": "Point", "coordinates": [0.0, 0.0]}
        });
        assert_eq!(parse_feature_collection(&feature).unwrap().features.len(), 1);

        let geometry = json!({"type": "Point", "coordinates": [0.0, 0.0]});
        assert!(parse_feature_collection(&geometry).is_err());
    }
}
