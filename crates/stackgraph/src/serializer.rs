//! Template rendering
//!
//! [`serialize`] is a pure walk over a frozen graph. Sections keep
//! declaration order, so identical graphs always render byte-identical
//! documents.

use crate::error::{Error, Result};
use crate::graph::FrozenGraph;
use crate::types::{Properties, PropertyValue, ResourceKind};
use indexmap::IndexMap;
use serde::Serialize;
use serde::ser::Error as _;

/// Template format version marker
pub const FORMAT_VERSION: &str = "2010-09-09";

/// Rendered template
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Document {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, ParameterEntry>,
    pub resources: IndexMap<String, ResourceEntry>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, OutputEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParameterEntry {
    #[serde(rename = "Type")]
    pub param_type: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceEntry {
    #[serde(rename = "Type")]
    pub kind: ResourceKind,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OutputEntry {
    pub description: String,
    pub value: PropertyValue,
}

impl Document {
    /// Indented JSON text
    pub fn to_json_pretty(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        String::from_utf8(buf).map_err(|e| Error::Serialization(serde_json::Error::custom(e)))
    }

    /// Single-line JSON text
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Render a frozen graph into a document
pub fn serialize(graph: &FrozenGraph) -> Document {
    let parameters = graph
        .parameters()
        .map(|p| {
            (
                p.name.clone(),
                ParameterEntry {
                    param_type: p.param_type.clone(),
                    description: p.description.clone(),
                    constraint_description: p.constraint_description.clone(),
                    default: p.default.clone(),
                },
            )
        })
        .collect();

    let resources = graph
        .resources()
        .map(|r| {
            (
                r.name.clone(),
                ResourceEntry {
                    kind: r.kind,
                    properties: r.properties.clone(),
                },
            )
        })
        .collect();

    let outputs = graph
        .outputs()
        .map(|o| {
            (
                o.name.clone(),
                OutputEntry {
                    description: o.description.clone(),
                    value: o.value.clone(),
                },
            )
        })
        .collect();

    Document {
        format_version: FORMAT_VERSION.to_string(),
        description: graph.description().map(str::to_string),
        parameters,
        resources,
        outputs,
    }
}
