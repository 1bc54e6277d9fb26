//! Tuples: schema-validated record instances with stable identity.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use retenet_foundation::{Error, ErrorKind, Result, Type, Value};

use crate::descriptor::{TupleDescriptor, TypeRegistry};

/// Stable identity of a tuple within a network.
///
/// The key is derived from the tuple type name and the key property values
/// at construction time, and never changes afterwards; non-key field
/// mutation does not affect identity.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TupleKey {
    tuple_type: Arc<str>,
    repr: Arc<str>,
}

impl TupleKey {
    fn new(tuple_type: Arc<str>, key_values: &[Value]) -> Self {
        let mut repr = String::new();
        for (i, v) in key_values.iter().enumerate() {
            if i > 0 {
                repr.push(',');
            }
            repr.push_str(&v.to_string());
        }
        Self {
            tuple_type,
            repr: repr.into(),
        }
    }

    /// The tuple type this key belongs to.
    #[must_use]
    pub fn tuple_type(&self) -> &Arc<str> {
        &self.tuple_type
    }
}

impl fmt::Display for TupleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tuple_type, self.repr)
    }
}

impl fmt::Debug for TupleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TupleKey({self})")
    }
}

/// A schema-validated record instance.
///
/// Fields are set and read by name against the declared property types;
/// misuse fails with a type-mismatch error and leaves the tuple unmodified.
/// Key properties are fixed at construction.
#[derive(Clone, Debug)]
pub struct Tuple {
    descriptor: Arc<TupleDescriptor>,
    key: TupleKey,
    values: HashMap<String, Value>,
}

impl Tuple {
    /// Creates a tuple of the given registered type from its key values,
    /// supplied in key-property declaration order.
    ///
    /// # Errors
    /// Fails if the type is not registered, the number of key values does
    /// not match the declared key properties, or a key value's type does
    /// not match its property type.
    pub fn new(registry: &TypeRegistry, tuple_type: &str, key_values: &[Value]) -> Result<Self> {
        let descriptor = registry
            .descriptor(tuple_type)
            .ok_or_else(|| Error::unknown_tuple_type(tuple_type))?
            .clone();

        let key_props = descriptor.key_properties();
        if key_props.len() != key_values.len() {
            return Err(ErrorKind::KeyArityMismatch {
                tuple_type: tuple_type.to_string(),
                expected: key_props.len(),
                actual: key_values.len(),
            }
            .into());
        }

        let mut values = HashMap::new();
        for (prop, value) in key_props.iter().zip(key_values) {
            if value.value_type() != prop.prop_type {
                return Err(Error::type_mismatch(prop.prop_type, value.value_type())
                    .with_context(format!("key property {} of {tuple_type}", prop.name)));
            }
            values.insert(prop.name.clone(), value.clone());
        }

        let type_name: Arc<str> = descriptor.name.as_str().into();
        let key = TupleKey::new(type_name, key_values);
        Ok(Self {
            descriptor,
            key,
            values,
        })
    }

    /// The tuple type name.
    #[must_use]
    pub fn tuple_type(&self) -> &Arc<str> {
        self.key.tuple_type()
    }

    /// The stable key of this tuple.
    #[must_use]
    pub fn key(&self) -> &TupleKey {
        &self.key
    }

    /// The descriptor this tuple was validated against.
    #[must_use]
    pub fn descriptor(&self) -> &Arc<TupleDescriptor> {
        &self.descriptor
    }

    fn set_value(&mut self, name: &str, value: Value) -> Result<()> {
        let prop = self
            .descriptor
            .property(name)
            .ok_or_else(|| Error::unknown_property(self.descriptor.name.clone(), name))?;
        if self.descriptor.key_properties().iter().any(|p| p.name == name) {
            return Err(ErrorKind::KeyPropertyImmutable {
                tuple_type: self.descriptor.name.clone(),
                property: name.to_string(),
            }
            .into());
        }
        if value.value_type() != prop.prop_type {
            return Err(Error::type_mismatch(prop.prop_type, value.value_type()));
        }
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    fn get_value(&self, name: &str, requested: Type) -> Result<&Value> {
        let prop = self
            .descriptor
            .property(name)
            .ok_or_else(|| Error::unknown_property(self.descriptor.name.clone(), name))?;
        if prop.prop_type != requested {
            return Err(Error::type_mismatch(requested, prop.prop_type));
        }
        self.values.get(name).ok_or_else(|| {
            Error::new(ErrorKind::PropertyUnset {
                tuple_type: self.descriptor.name.clone(),
                property: name.to_string(),
            })
        })
    }

    /// Sets a string property.
    ///
    /// # Errors
    /// Fails for an unknown property, a non-string property, or a key
    /// property.
    pub fn set_string(&mut self, name: &str, value: impl Into<Arc<str>>) -> Result<()> {
        self.set_value(name, Value::String(value.into()))
    }

    /// Sets an integer property.
    ///
    /// # Errors
    /// Fails for an unknown property, a non-int property, or a key property.
    pub fn set_int(&mut self, name: &str, value: i64) -> Result<()> {
        self.set_value(name, Value::Int(value))
    }

    /// Sets a float property.
    ///
    /// # Errors
    /// Fails for an unknown property, a non-double property, or a key
    /// property.
    pub fn set_float(&mut self, name: &str, value: f64) -> Result<()> {
        self.set_value(name, Value::Float(value))
    }

    /// Sets a boolean property.
    ///
    /// # Errors
    /// Fails for an unknown property, a non-bool property, or a key
    /// property.
    pub fn set_bool(&mut self, name: &str, value: bool) -> Result<()> {
        self.set_value(name, Value::Bool(value))
    }

    /// Reads a string property.
    ///
    /// # Errors
    /// Fails for an unknown property, a non-string property, or an unset
    /// property.
    pub fn get_string(&self, name: &str) -> Result<&str> {
        match self.get_value(name, Type::String)? {
            Value::String(s) => Ok(s),
            other => Err(Error::type_mismatch(Type::String, other.value_type())),
        }
    }

    /// Reads an integer property.
    ///
    /// # Errors
    /// Fails for an unknown property, a non-int property, or an unset
    /// property.
    pub fn get_int(&self, name: &str) -> Result<i64> {
        match self.get_value(name, Type::Int)? {
            Value::Int(n) => Ok(*n),
            other => Err(Error::type_mismatch(Type::Int, other.value_type())),
        }
    }

    /// Reads a float property.
    ///
    /// # Errors
    /// Fails for an unknown property, a non-double property, or an unset
    /// property.
    pub fn get_float(&self, name: &str) -> Result<f64> {
        match self.get_value(name, Type::Float)? {
            Value::Float(n) => Ok(*n),
            other => Err(Error::type_mismatch(Type::Float, other.value_type())),
        }
    }

    /// Reads a boolean property.
    ///
    /// # Errors
    /// Fails for an unknown property, a non-bool property, or an unset
    /// property.
    pub fn get_bool(&self, name: &str) -> Result<bool> {
        match self.get_value(name, Type::Bool)? {
            Value::Bool(b) => Ok(*b),
            other => Err(Error::type_mismatch(Type::Bool, other.value_type())),
        }
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.descriptor.name)?;
        let mut first = true;
        for prop in &self.descriptor.properties {
            if let Some(v) = self.values.get(&prop.name) {
                if !first {
                    write!(f, ", ")?;
                }
                write!(f, "{}={v}", prop.name)?;
                first = false;
            }
        }
        write!(f, "]")
    }
}
