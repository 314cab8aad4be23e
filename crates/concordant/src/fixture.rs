//! Fixtures: the object graph a specification is evaluated against.
//!
//! A fixture exposes named methods and properties to the expression
//! evaluator. Instead of reflection, members are looked up by name through
//! the [`Fixture`] trait; [`MethodFixture`] is an explicit registration table
//! of closures and [`DataFixture`] serves read-only data loaded from YAML or
//! JSON.

use crate::extension::Extension;
use crate::result::ConcordantResult;
use crate::value::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::rc::Rc;
use thiserror::Error;

/// Errors raised by fixture members.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FixtureError {
    /// The fixture has no member with this name
    #[error("no member named '{member}'")]
    MemberNotFound {
        /// Requested member
        member: String,
    },

    /// The member ran and failed
    #[error("{message}")]
    Failed {
        /// Failure message
        message: String,
        /// Captured call frames, innermost first
        stack: Vec<String>,
    },
}

impl FixtureError {
    /// Create a member-not-found error
    #[must_use]
    pub fn member_not_found(member: impl Into<String>) -> Self {
        Self::MemberNotFound {
            member: member.into(),
        }
    }

    /// Create a failure raised by fixture code
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
            stack: Vec::new(),
        }
    }

    /// Push a stack frame onto a failure
    #[must_use]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        if let Self::Failed { stack, .. } = &mut self {
            stack.push(frame.into());
        }
        self
    }
}

/// The object graph a specification runs against.
///
/// # Example
///
/// ```ignore
/// struct Greeter;
///
/// impl Fixture for Greeter {
///     fn call(&mut self, method: &str, args: &[Value]) -> Result<Value, FixtureError> {
///         match method {
///             "greet" => Ok(Value::from(format!("Hello {}!", args[0].as_str().unwrap_or("")))),
///             other => Err(FixtureError::member_not_found(other)),
///         }
///     }
/// }
/// ```
pub trait Fixture {
    /// Fixture name for logging and nested runs
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Invoke a method by name.
    fn call(&mut self, method: &str, args: &[Value]) -> Result<Value, FixtureError>;

    /// Read a property by name.
    fn property(&self, name: &str) -> Result<Value, FixtureError> {
        Err(FixtureError::member_not_found(name))
    }

    /// Write a property by name.
    fn set_property(&mut self, name: &str, _value: Value) -> Result<(), FixtureError> {
        Err(FixtureError::member_not_found(name))
    }

    /// Extensions this fixture declares, applied after configured ones.
    fn extensions(&self) -> Vec<Rc<dyn Extension>> {
        Vec::new()
    }
}

type MethodFn = Box<dyn FnMut(&[Value]) -> Result<Value, FixtureError>>;

/// Fixture built from an explicit table of named closures and properties.
pub struct MethodFixture {
    name: String,
    methods: HashMap<String, MethodFn>,
    properties: BTreeMap<String, Value>,
    extensions: Vec<Rc<dyn Extension>>,
}

impl fmt::Debug for MethodFixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<&String> = self.methods.keys().collect();
        methods.sort();
        f.debug_struct("MethodFixture")
            .field("name", &self.name)
            .field("methods", &methods)
            .field("properties", &self.properties)
            .field("extension_count", &self.extensions.len())
            .finish()
    }
}

impl MethodFixture {
    /// Create an empty fixture
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: HashMap::new(),
            properties: BTreeMap::new(),
            extensions: Vec::new(),
        }
    }

    /// Register a method
    #[must_use]
    pub fn with_method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: FnMut(&[Value]) -> Result<Value, FixtureError> + 'static,
    {
        self.methods.insert(name.into(), Box::new(method));
        self
    }

    /// Register a property
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Declare an extension
    #[must_use]
    pub fn with_extension(mut self, extension: Rc<dyn Extension>) -> Self {
        self.extensions.push(extension);
        self
    }

    /// Current value of a property
    #[must_use]
    pub fn property_value(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

impl Fixture for MethodFixture {
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&mut self, method: &str, args: &[Value]) -> Result<Value, FixtureError> {
        let f = self
            .methods
            .get_mut(method)
            .ok_or_else(|| FixtureError::member_not_found(method))?;
        f(args).map_err(|e| e.with_frame(format!("{}.{method}", self.name)))
    }

    fn property(&self, name: &str) -> Result<Value, FixtureError> {
        self.properties
            .get(name)
            .cloned()
            .ok_or_else(|| FixtureError::member_not_found(name))
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<(), FixtureError> {
        self.properties.insert(name.to_string(), value);
        Ok(())
    }

    fn extensions(&self) -> Vec<Rc<dyn Extension>> {
        self.extensions.clone()
    }
}

/// Fixture serving properties from a YAML or JSON mapping.
#[derive(Debug, Clone, Default)]
pub struct DataFixture {
    name: String,
    data: serde_json::Map<String, Value>,
}

impl DataFixture {
    /// Create an empty data fixture
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: serde_json::Map::new(),
        }
    }

    /// Build from a JSON value; anything but an object is a configuration error.
    pub fn from_value(name: impl Into<String>, value: Value) -> ConcordantResult<Self> {
        match value {
            Value::Object(data) => Ok(Self {
                name: name.into(),
                data,
            }),
            other => Err(crate::ConcordantError::config(format!(
                "fixture data must be a mapping, found {}",
                crate::value::type_name(&other)
            ))),
        }
    }

    /// Parse JSON text
    pub fn from_json(name: impl Into<String>, json: &str) -> ConcordantResult<Self> {
        Self::from_value(name, serde_json::from_str(json)?)
    }

    /// Parse YAML text
    pub fn from_yaml(name: impl Into<String>, yaml: &str) -> ConcordantResult<Self> {
        Self::from_value(name, serde_yaml_ng::from_str(yaml)?)
    }

    /// Load from a file, choosing the format by extension (`.json` or YAML).
    pub fn from_path(path: &Path) -> ConcordantResult<Self> {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(name, &text)
        } else {
            Self::from_yaml(name, &text)
        }
    }
}

impl Fixture for DataFixture {
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&mut self, method: &str, _args: &[Value]) -> Result<Value, FixtureError> {
        Err(FixtureError::member_not_found(method))
    }

    fn property(&self, name: &str) -> Result<Value, FixtureError> {
        self.data
            .get(name)
            .cloned()
            .ok_or_else(|| FixtureError::member_not_found(name))
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<(), FixtureError> {
        self.data.insert(name.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    mod method_fixture_tests {
        use super::*;

        #[test]
        fn test_call_registered_method() {
            let mut fixture = MethodFixture::new("Greeter").with_method("greet", |args| {
                Ok(json!(format!("Hello {}!", args[0].as_str().unwrap_or_default())))
            });
            assert_eq!(fixture.call("greet", &[json!("World")]).unwrap(), json!("Hello World!"));
        }

        #[test]
        fn test_unknown_method() {
            let mut fixture = MethodFixture::new("Empty");
            assert_eq!(
                fixture.call("nope", &[]),
                Err(FixtureError::member_not_found("nope"))
            );
        }

        #[test]
        fn test_failure_carries_frame() {
            let mut fixture = MethodFixture::new("Boom")
                .with_method("explode", |_| Err(FixtureError::failed("kaboom")));
            match fixture.call("explode", &[]) {
                Err(FixtureError::Failed { message, stack }) => {
                    assert_eq!(message, "kaboom");
                    assert_eq!(stack, vec!["Boom.explode".to_string()]);
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        #[test]
        fn test_properties_read_write() {
            let mut fixture = MethodFixture::new("F").with_property("count", 1);
            assert_eq!(fixture.property("count").unwrap(), json!(1));
            fixture.set_property("count", json!(2)).unwrap();
            assert_eq!(fixture.property_value("count"), Some(&json!(2)));
        }
    }

    mod data_fixture_tests {
        use super::*;

        #[test]
        fn test_from_yaml() {
            let fixture = DataFixture::from_yaml("people", "name: Bob\nages: [1, 2]\n").unwrap();
            assert_eq!(fixture.property("name").unwrap(), json!("Bob"));
            assert_eq!(fixture.property("ages").unwrap(), json!([1, 2]));
        }

        #[test]
        fn test_rejects_non_mapping() {
            assert!(DataFixture::from_json("x", "[1, 2]").is_err());
        }

        #[test]
        fn test_from_path_json() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("data.json");
            std::fs::write(&path, r#"{"greeting": "hi"}"#).unwrap();
            let fixture = DataFixture::from_path(&path).unwrap();
            assert_eq!(fixture.name(), "data");
            assert_eq!(fixture.property("greeting").unwrap(), json!("hi"));
        }
    }
}
