//! Algorithm registry mapping tuner algorithm names to parameter schemas.

use crate::config::{AlgorithmKind, LargeParams, ParameterSchema, TiledParams, TinyParams};
use crate::error::SchemaError;
use crate::params::{KernelParameterSet, ParamMap};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

/// Builds a validated [`KernelParameterSet`] for one algorithm.
pub trait KernelSchema: Send + Sync {
    fn name(&self) -> &str;

    fn construct(&self, fields: ParamMap) -> Result<KernelParameterSet, SchemaError>;
}

pub type DynKernelSchema = Arc<dyn KernelSchema>;

/// Schema backed by a serde parameter struct.
pub struct TypedSchema<T> {
    name: String,
    _params: PhantomData<fn() -> T>,
}

impl<T> TypedSchema<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            _params: PhantomData,
        }
    }
}

impl<T: ParameterSchema> KernelSchema for TypedSchema<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn construct(&self, fields: ParamMap) -> Result<KernelParameterSet, SchemaError> {
        let invalid = |reason: String| SchemaError::InvalidFields {
            algorithm: self.name.clone(),
            reason,
        };

        let params: T =
            serde_json::from_value(Value::Object(fields)).map_err(|e| invalid(e.to_string()))?;
        params.validate().map_err(|reason| SchemaError::Constraint {
            algorithm: self.name.clone(),
            reason,
        })?;

        // Re-serialize so the stored fields follow the struct's order and types.
        match serde_json::to_value(&params).map_err(|e| invalid(e.to_string()))? {
            Value::Object(canonical) => Ok(KernelParameterSet::new(self.name.clone(), canonical)),
            other => Err(invalid(format!("schema serialized to non-object {}", other))),
        }
    }
}

#[derive(Default, Clone)]
pub struct KernelRegistry {
    schemas: Vec<DynKernelSchema>,
}

impl KernelRegistry {
    pub fn new() -> Self {
        Self {
            schemas: Vec::new(),
        }
    }

    pub fn with_default_algorithms() -> Self {
        let mut registry = Self::new();
        for kind in AlgorithmKind::ALL {
            match kind {
                AlgorithmKind::Tiny => registry.register(TypedSchema::<TinyParams>::new(kind.name())),
                AlgorithmKind::Small | AlgorithmKind::Medium => {
                    registry.register(TypedSchema::<TiledParams>::new(kind.name()))
                }
                AlgorithmKind::LargeDb1 | AlgorithmKind::LargeDb2 => {
                    registry.register(TypedSchema::<LargeParams>::new(kind.name()))
                }
            }
        }
        registry
    }

    /// Adds a schema, replacing any schema already registered under its name.
    pub fn register<S>(&mut self, schema: S)
    where
        S: KernelSchema + 'static,
    {
        let schema: DynKernelSchema = Arc::new(schema);
        match self.schemas.iter().position(|s| s.name() == schema.name()) {
            Some(index) => self.schemas[index] = schema,
            None => self.schemas.push(schema),
        }
    }

    pub fn schemas(&self) -> &[DynKernelSchema] {
        &self.schemas
    }

    pub fn names(&self) -> Vec<&str> {
        self.schemas.iter().map(|schema| schema.name()).collect()
    }

    pub fn find(&self, name: &str) -> Option<DynKernelSchema> {
        self.schemas
            .iter()
            .find(|schema| schema.name() == name)
            .map(Arc::clone)
    }

    pub fn construct(&self, name: &str, fields: ParamMap) -> Result<KernelParameterSet, SchemaError> {
        let schema = self
            .find(name)
            .ok_or_else(|| SchemaError::UnknownAlgorithm(name.to_string()))?;
        schema.construct(fields)
    }
}
