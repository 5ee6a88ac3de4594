//! Core types for the resource graph
//!
//! Property values are a tagged variant so the serializer can render
//! literals, references and attribute lookups without inspecting strings.

use indexmap::IndexMap;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declaration-ordered property bag of a resource
pub type Properties = IndexMap<String, PropertyValue>;

/// Build a property bag from `(key, value)` pairs, keeping their order.
pub fn properties<I, K>(entries: I) -> Properties
where
    I: IntoIterator<Item = (K, PropertyValue)>,
    K: Into<String>,
{
    entries.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// Value of a resource property or output
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Literal string
    String(String),
    /// Literal number
    Number(i64),
    /// Literal boolean
    Bool(bool),
    /// Ordered list of values
    List(Vec<PropertyValue>),
    /// Nested key/value structure
    Map(Properties),
    /// Reference to a resource, parameter or pseudo parameter
    Ref(String),
    /// Lookup of a resource attribute only known after provisioning
    GetAtt { resource: String, attribute: String },
    /// Concatenation of values with a delimiter
    Join {
        delimiter: String,
        parts: Vec<PropertyValue>,
    },
    /// Value delivered base64-encoded by the provisioning service
    Base64(Box<PropertyValue>),
}

/// A cross-reference found inside a property value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference<'a> {
    /// `Ref` target, may be a resource or a parameter
    Name(&'a str),
    /// `GetAtt` target, must be a resource
    Attribute(&'a str),
}

impl Reference<'_> {
    /// The referenced logical name
    pub fn target(&self) -> &str {
        match self {
            Self::Name(name) | Self::Attribute(name) => name,
        }
    }
}

impl PropertyValue {
    /// Reference another logical name
    pub fn reference(name: impl Into<String>) -> Self {
        Self::Ref(name.into())
    }

    /// Look up a post-provisioning attribute of a resource
    pub fn attribute(resource: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::GetAtt {
            resource: resource.into(),
            attribute: attribute.into(),
        }
    }

    /// Join values with a delimiter
    pub fn join(delimiter: impl Into<String>, parts: Vec<PropertyValue>) -> Self {
        Self::Join {
            delimiter: delimiter.into(),
            parts,
        }
    }

    /// Wrap a value for base64 delivery
    pub fn base64(value: PropertyValue) -> Self {
        Self::Base64(Box::new(value))
    }

    /// Build a list from anything convertible to values
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<PropertyValue>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Build a nested map from `(key, value)` pairs
    pub fn map<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, PropertyValue)>,
        K: Into<String>,
    {
        Self::Map(properties(entries))
    }

    /// Get the literal string, if this is one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// All cross-references contained in this value, depth first
    pub fn references(&self) -> Vec<Reference<'_>> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<Reference<'a>>) {
        match self {
            Self::String(_) | Self::Number(_) | Self::Bool(_) => {}
            Self::Ref(name) => out.push(Reference::Name(name)),
            Self::GetAtt { resource, .. } => out.push(Reference::Attribute(resource)),
            Self::List(items) | Self::Join { parts: items, .. } => {
                for item in items {
                    item.collect_references(out);
                }
            }
            Self::Map(map) => {
                for value in map.values() {
                    value.collect_references(out);
                }
            }
            Self::Base64(inner) => inner.collect_references(out),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<u16> for PropertyValue {
    fn from(value: u16) -> Self {
        Self::Number(i64::from(value))
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<PropertyValue>> for PropertyValue {
    fn from(value: Vec<PropertyValue>) -> Self {
        Self::List(value)
    }
}

impl Serialize for PropertyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::String(s) => serializer.serialize_str(s),
            Self::Number(n) => serializer.serialize_i64(*n),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::List(items) => items.serialize(serializer),
            Self::Map(map) => map.serialize(serializer),
            Self::Ref(name) => intrinsic(serializer, "Ref", name),
            Self::GetAtt {
                resource,
                attribute,
            } => intrinsic(serializer, "Fn::GetAtt", &[resource, attribute]),
            Self::Join { delimiter, parts } => {
                intrinsic(serializer, "Fn::Join", &(delimiter, parts))
            }
            Self::Base64(inner) => intrinsic(serializer, "Fn::Base64", inner.as_ref()),
        }
    }
}

/// Render a single-key intrinsic function object such as `{"Ref": "Role"}`
fn intrinsic<S, V>(serializer: S, function: &str, argument: &V) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
    V: Serialize + ?Sized,
{
    let mut map = serializer.serialize_map(Some(1))?;
    map.serialize_entry(function, argument)?;
    map.end()
}

/// Provisioning-service resource type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    IamRole,
    IamInstanceProfile,
    IamPolicy,
    Ec2SecurityGroup,
    Ec2Instance,
}

impl ResourceKind {
    /// Type identifier understood by the provisioning service
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IamRole => "AWS::IAM::Role",
            Self::IamInstanceProfile => "AWS::IAM::InstanceProfile",
            Self::IamPolicy => "AWS::IAM::Policy",
            Self::Ec2SecurityGroup => "AWS::EC2::SecurityGroup",
            Self::Ec2Instance => "AWS::EC2::Instance",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ResourceKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// An input requested from the operator at provisioning time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub param_type: String,
    pub description: String,
    pub constraint_description: Option<String>,
    pub default: Option<String>,
}

impl Parameter {
    /// Create a parameter without constraint or default
    pub fn new(
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            constraint_description: None,
            default: None,
        }
    }

    /// Set the text shown when the supplied value fails validation
    pub fn with_constraint(mut self, text: impl Into<String>) -> Self {
        self.constraint_description = Some(text.into());
        self
    }

    /// Set a default value
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// A value exposed once provisioning completes
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub name: String,
    pub description: String,
    pub value: PropertyValue,
}

impl Output {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        value: PropertyValue,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            value,
        }
    }
}

/// A declared infrastructure object
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub name: String,
    pub kind: ResourceKind,
    pub properties: Properties,
}

/// Handle to a declared parameter
///
/// Only the graph hands these out, so holding one proves the
/// parameter exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterRef(pub(crate) String);

impl ParameterRef {
    pub fn name(&self) -> &str {
        &self.0
    }

    /// `Ref` to this parameter
    pub fn reference(&self) -> PropertyValue {
        PropertyValue::Ref(self.0.clone())
    }
}

/// Handle to a declared resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef(pub(crate) String);

impl ResourceRef {
    pub fn name(&self) -> &str {
        &self.0
    }

    /// `Ref` to this resource
    pub fn reference(&self) -> PropertyValue {
        PropertyValue::Ref(self.0.clone())
    }

    /// Post-provisioning attribute of this resource
    pub fn attribute(&self, attribute: impl Into<String>) -> PropertyValue {
        PropertyValue::attribute(self.0.clone(), attribute)
    }
}
