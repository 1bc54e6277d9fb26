//! Tuple descriptor schemas and the type registry.
//!
//! Descriptors are registered from a JSON document enumerating tuple types,
//! each with an ordered list of typed properties:
//!
//! ```json
//! [
//!   {
//!     "name": "n1",
//!     "properties": [
//!       {"name": "name", "type": "string", "key": true},
//!       {"name": "age", "type": "int"}
//!     ]
//!   }
//! ]
//! ```
//!
//! Properties marked `"key": true` form the tuple's stable identity, in
//! declaration order. A descriptor with no key properties keys on every
//! property.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Deserialize;

use retenet_foundation::{Error, ErrorKind, Result, Type};

/// Schema for one property of a tuple type.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct PropertyDescriptor {
    /// Property name.
    pub name: String,
    /// Declared property type.
    #[serde(rename = "type")]
    pub prop_type: Type,
    /// Whether this property is part of the tuple key.
    #[serde(default)]
    pub key: bool,
}

/// Schema for one tuple type: a name and an ordered list of properties.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TupleDescriptor {
    /// Tuple type name.
    pub name: String,
    /// Ordered property definitions.
    pub properties: Vec<PropertyDescriptor>,
}

impl TupleDescriptor {
    /// Returns the property schema by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Returns the key properties in declaration order.
    ///
    /// If no property is marked as a key, every property is a key property.
    #[must_use]
    pub fn key_properties(&self) -> Vec<&PropertyDescriptor> {
        let marked: Vec<&PropertyDescriptor> =
            self.properties.iter().filter(|p| p.key).collect();
        if marked.is_empty() {
            self.properties.iter().collect()
        } else {
            marked
        }
    }

    fn validate(&self) -> Result<()> {
        if self.properties.is_empty() {
            return Err(ErrorKind::EmptyDescriptor(self.name.clone()).into());
        }
        let mut seen = HashSet::new();
        for prop in &self.properties {
            if !seen.insert(prop.name.as_str()) {
                return Err(ErrorKind::DuplicateProperty {
                    tuple_type: self.name.clone(),
                    property: prop.name.clone(),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Registry of tuple descriptors for one rule session.
///
/// Unlike the usual process-global schema registry, each session owns its
/// own registry so that independent sessions cannot observe each other's
/// types.
#[derive(Clone, Debug, Default)]
pub struct TypeRegistry {
    descriptors: HashMap<Arc<str>, Arc<TupleDescriptor>>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and registers a JSON descriptor document.
    ///
    /// # Errors
    /// Returns a parse error for malformed JSON or an unrecognized property
    /// type spelling, and a validation error for duplicate tuple types,
    /// duplicate properties, or a descriptor with no properties.
    pub fn from_json(document: &str) -> Result<Self> {
        let mut registry = Self::new();
        registry.register_json(document)?;
        Ok(registry)
    }

    /// Parses a JSON descriptor document and registers its tuple types into
    /// this registry.
    ///
    /// # Errors
    /// Same failure modes as [`TypeRegistry::from_json`]; on error the
    /// registry is left unmodified.
    pub fn register_json(&mut self, document: &str) -> Result<()> {
        let descriptors: Vec<TupleDescriptor> = serde_json::from_str(document)
            .map_err(|e| Error::new(ErrorKind::DescriptorParse(e.to_string())))?;

        // Validate the whole batch before committing any of it.
        let mut names = HashSet::new();
        for desc in &descriptors {
            desc.validate()?;
            if !names.insert(desc.name.as_str()) || self.descriptors.contains_key(desc.name.as_str())
            {
                return Err(ErrorKind::DuplicateTupleType(desc.name.clone()).into());
            }
        }
        for desc in descriptors {
            let name: Arc<str> = desc.name.as_str().into();
            self.descriptors.insert(name, Arc::new(desc));
        }
        Ok(())
    }

    /// Registers a single descriptor built in code.
    ///
    /// # Errors
    /// Returns a validation error for a duplicate tuple type, duplicate
    /// properties, or a descriptor with no properties.
    pub fn register(&mut self, descriptor: TupleDescriptor) -> Result<()> {
        descriptor.validate()?;
        if self.descriptors.contains_key(descriptor.name.as_str()) {
            return Err(ErrorKind::DuplicateTupleType(descriptor.name).into());
        }
        let name: Arc<str> = descriptor.name.as_str().into();
        self.descriptors.insert(name, Arc::new(descriptor));
        Ok(())
    }

    /// Looks up a descriptor by tuple type name.
    #[must_use]
    pub fn descriptor(&self, name: &str) -> Option<&Arc<TupleDescriptor>> {
        self.descriptors.get(name)
    }

    /// Returns true if a tuple type with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.descriptors.contains_key(name)
    }

    /// Number of registered tuple types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns true if no tuple types are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
