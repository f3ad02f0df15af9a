//! Validated kernel parameter sets.

use crate::config::Shape;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Raw `name -> literal` fields, kept in insertion order.
pub type ParamMap = Map<String, Value>;

/// Field name under which the measured throughput is stored.
pub const PERF_FIELD: &str = "perf";

/// Field name under which the algorithm is written to parameter files.
pub const ALGORITHM_FIELD: &str = "algorithm";

/// Parameters of one kernel, checked against its algorithm's schema.
///
/// Serializes as a flat object with `algorithm` first, followed by the
/// schema fields in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelParameterSet {
    algorithm: String,
    fields: ParamMap,
}

impl KernelParameterSet {
    /// Wraps fields that a schema has already validated.
    pub fn new(algorithm: impl Into<String>, fields: ParamMap) -> Self {
        Self {
            algorithm: algorithm.into(),
            fields,
        }
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn fields(&self) -> &ParamMap {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn perf(&self) -> Option<f64> {
        self.fields.get(PERF_FIELD).and_then(Value::as_f64)
    }

    /// The `(m, n, k)` fields, if the schema carries all three.
    pub fn shape(&self) -> Option<Shape> {
        let dim = |name| {
            self.fields
                .get(name)
                .and_then(Value::as_u64)
                .map(|v| v as usize)
        };
        Some(Shape::new(dim("m")?, dim("n")?, dim("k")?))
    }

    /// Fields without the injected throughput, as they appear in a descriptor.
    pub fn kernel_fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter().filter(|(name, _)| name.as_str() != PERF_FIELD)
    }
}

impl Serialize for KernelParameterSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry(ALGORITHM_FIELD, &self.algorithm)?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> KernelParameterSet {
        let Value::Object(fields) = json!({"m": 4, "n": 5, "k": 6, "tile_m": 2, "perf": 50.0}) else {
            unreachable!()
        };
        KernelParameterSet::new("medium", fields)
    }

    #[test]
    fn test_accessors() {
        let set = sample();
        assert_eq!(set.algorithm(), "medium");
        assert_eq!(set.perf(), Some(50.0));
        assert_eq!(set.shape(), Some(Shape::new(4, 5, 6)));
        assert!(set.kernel_fields().all(|(name, _)| name != PERF_FIELD));
        assert_eq!(set.kernel_fields().count(), 4);
    }

    #[test]
    fn test_serializes_algorithm_first() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(json.starts_with(r#"{"algorithm":"medium","m":4"#));
        assert!(json.ends_with(r#""perf":50.0}"#));
    }
}
