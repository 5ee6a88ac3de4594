//! Resource graph registry
//!
//! The graph is write-once: every declaration is validated as it is
//! registered, so a dependency must be declared before its dependents.
//! Declaration order is therefore always a valid dependency order and
//! the graph never needs sorting.

use crate::error::{Error, Result};
use crate::types::{
    Output, Parameter, ParameterRef, Properties, PropertyValue, Reference, Resource,
    ResourceKind, ResourceRef,
};
use indexmap::IndexMap;
use regex::Regex;
use std::sync::OnceLock;

/// Logical IDs are restricted to ASCII alphanumerics
const LOGICAL_NAME_PATTERN: &str = r"^[A-Za-z0-9]+$";
const LOGICAL_NAME_MAX_LEN: usize = 255;

static LOGICAL_NAME_REGEX: OnceLock<Regex> = OnceLock::new();

fn logical_name_regex() -> &'static Regex {
    LOGICAL_NAME_REGEX.get_or_init(|| Regex::new(LOGICAL_NAME_PATTERN).unwrap())
}

/// Prefix of provisioning-service pseudo parameters such as `AWS::Region`
const PSEUDO_PARAMETER_PREFIX: &str = "AWS::";

#[derive(Debug, Default)]
struct GraphContents {
    description: Option<String>,
    parameters: IndexMap<String, Parameter>,
    resources: IndexMap<String, Resource>,
    outputs: IndexMap<String, Output>,
}

/// Mutable registry of parameters, resources and outputs
#[derive(Debug, Default)]
pub struct ResourceGraph {
    contents: GraphContents,
    frozen: bool,
}

impl ResourceGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the free-text template description
    pub fn set_description(&mut self, description: impl Into<String>) -> Result<()> {
        self.ensure_open("set description")?;
        self.contents.description = Some(description.into());
        Ok(())
    }

    /// Register a provisioning-time parameter
    pub fn declare_parameter(&mut self, parameter: Parameter) -> Result<ParameterRef> {
        self.ensure_open("declare parameter")?;
        self.ensure_new_name(&parameter.name)?;

        log::debug!(
            "declared parameter {} ({})",
            parameter.name,
            parameter.param_type
        );
        let name = parameter.name.clone();
        self.contents.parameters.insert(name.clone(), parameter);
        Ok(ParameterRef(name))
    }

    /// Register a resource
    ///
    /// Every reference inside `properties` must point at an already
    /// declared resource or parameter.
    pub fn declare_resource(
        &mut self,
        kind: ResourceKind,
        name: impl Into<String>,
        properties: Properties,
    ) -> Result<ResourceRef> {
        let name = name.into();
        self.ensure_open("declare resource")?;
        self.ensure_new_name(&name)?;
        for value in properties.values() {
            self.ensure_resolved(&name, value)?;
        }

        log::debug!("declared resource {} ({})", name, kind);
        self.contents.resources.insert(
            name.clone(),
            Resource {
                name: name.clone(),
                kind,
                properties,
            },
        );
        Ok(ResourceRef(name))
    }

    /// Register an output
    pub fn declare_output(&mut self, output: Output) -> Result<()> {
        self.ensure_open("declare output")?;
        validate_name(&output.name)?;
        if self.contents.outputs.contains_key(&output.name) {
            return Err(Error::DuplicateName { name: output.name });
        }
        self.ensure_resolved(&output.name, &output.value)?;

        log::debug!("declared output {}", output.name);
        self.contents.outputs.insert(output.name.clone(), output);
        Ok(())
    }

    /// Whether the graph has been frozen
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Hand the contents over to a read-only view
    ///
    /// Any later declaration on this graph fails with `GraphFrozen`, and so
    /// does a second `freeze`.
    pub fn freeze(&mut self) -> Result<FrozenGraph> {
        self.ensure_open("freeze")?;
        self.frozen = true;
        Ok(FrozenGraph {
            contents: std::mem::take(&mut self.contents),
        })
    }

    fn ensure_open(&self, operation: &str) -> Result<()> {
        if self.frozen {
            return Err(Error::GraphFrozen {
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    /// Parameters and resources share one namespace since both are `Ref` targets
    fn ensure_new_name(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        if self.contents.parameters.contains_key(name) || self.contents.resources.contains_key(name)
        {
            return Err(Error::DuplicateName {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn ensure_resolved(&self, from: &str, value: &PropertyValue) -> Result<()> {
        for reference in value.references() {
            let resolved = match reference {
                Reference::Name(target) => {
                    target.starts_with(PSEUDO_PARAMETER_PREFIX)
                        || self.contents.resources.contains_key(target)
                        || self.contents.parameters.contains_key(target)
                }
                Reference::Attribute(target) => self.contents.resources.contains_key(target),
            };
            if !resolved {
                return Err(Error::DanglingReference {
                    from: from.to_string(),
                    target: reference.target().to_string(),
                });
            }
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.len() <= LOGICAL_NAME_MAX_LEN && logical_name_regex().is_match(name) {
        Ok(())
    } else {
        Err(Error::InvalidName {
            name: name.to_string(),
        })
    }
}

/// Read-only view of a completed graph
#[derive(Debug)]
pub struct FrozenGraph {
    contents: GraphContents,
}

impl FrozenGraph {
    pub fn description(&self) -> Option<&str> {
        self.contents.description.as_deref()
    }

    /// Parameters in declaration order
    pub fn parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.contents.parameters.values()
    }

    /// Resources in declaration order
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.contents.resources.values()
    }

    /// Outputs in declaration order
    pub fn outputs(&self) -> impl Iterator<Item = &Output> {
        self.contents.outputs.values()
    }

    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.contents.resources.get(name)
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.contents.parameters.get(name)
    }

    pub fn output(&self, name: &str) -> Option<&Output> {
        self.contents.outputs.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::properties;

    fn key_pair() -> Parameter {
        Parameter::new("KeyPair", "AWS::EC2::KeyPair::KeyName", "SSH key pair")
    }

    #[test]
    fn test_declare_in_dependency_order() {
        let mut graph = ResourceGraph::new();
        let role = graph
            .declare_resource(ResourceKind::IamRole, "Role", Properties::new())
            .unwrap();
        let profile = graph
            .declare_resource(
                ResourceKind::IamInstanceProfile,
                "InstanceProfile",
                properties([("Roles", PropertyValue::list([role.reference()]))]),
            )
            .unwrap();

        assert_eq!(profile.name(), "InstanceProfile");
        let frozen = graph.freeze().unwrap();
        let names: Vec<_> = frozen.resources().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Role", "InstanceProfile"]);
    }

    #[test]
    fn test_dangling_reference_in_property() {
        let mut graph = ResourceGraph::new();
        let result = graph.declare_resource(
            ResourceKind::IamInstanceProfile,
            "InstanceProfile",
            properties([("Roles", PropertyValue::list([PropertyValue::reference("Role")]))]),
        );

        match result {
            Err(Error::DanglingReference { from, target }) => {
                assert_eq!(from, "InstanceProfile");
                assert_eq!(target, "Role");
            }
            other => panic!("Expected DanglingReference, got {:?}", other),
        }
    }

    #[test]
    fn test_dangling_reference_nested_in_policy() {
        let mut graph = ResourceGraph::new();
        let document = PropertyValue::map([(
            "Statement",
            PropertyValue::list([PropertyValue::map([(
                "Resource",
                PropertyValue::attribute("Bucket", "Arn"),
            )])]),
        )]);
        let result = graph.declare_resource(
            ResourceKind::IamPolicy,
            "Policy",
            properties([("PolicyDocument", document)]),
        );
        assert!(matches!(result, Err(Error::DanglingReference { .. })));
    }

    #[test]
    fn test_attribute_lookup_requires_resource() {
        let mut graph = ResourceGraph::new();
        graph.declare_parameter(key_pair()).unwrap();

        // A parameter can be a Ref target but has no attributes
        let result = graph.declare_output(Output::new(
            "Key",
            "key",
            PropertyValue::attribute("KeyPair", "Name"),
        ));
        assert!(matches!(result, Err(Error::DanglingReference { .. })));

        graph
            .declare_output(Output::new("KeyName", "key", PropertyValue::reference("KeyPair")))
            .unwrap();
    }

    #[test]
    fn test_pseudo_parameter_reference() {
        let mut graph = ResourceGraph::new();
        graph
            .declare_resource(
                ResourceKind::Ec2SecurityGroup,
                "SecurityGroup",
                properties([("GroupDescription", PropertyValue::reference("AWS::Region"))]),
            )
            .unwrap();
    }

    #[test]
    fn test_duplicate_names_across_kinds() {
        let mut graph = ResourceGraph::new();
        graph.declare_parameter(key_pair()).unwrap();

        let result = graph.declare_resource(ResourceKind::IamRole, "KeyPair", Properties::new());
        assert!(matches!(result, Err(Error::DuplicateName { ref name }) if name == "KeyPair"));

        graph
            .declare_resource(ResourceKind::IamRole, "Role", Properties::new())
            .unwrap();
        let result = graph.declare_parameter(Parameter::new("Role", "String", "dup"));
        assert!(matches!(result, Err(Error::DuplicateName { .. })));

        let result = graph.declare_resource(ResourceKind::Ec2Instance, "Role", Properties::new());
        assert!(matches!(result, Err(Error::DuplicateName { .. })));
    }

    #[test]
    fn test_duplicate_output() {
        let mut graph = ResourceGraph::new();
        graph
            .declare_output(Output::new("Url", "first", "http://x".into()))
            .unwrap();
        let result = graph.declare_output(Output::new("Url", "second", "http://y".into()));
        assert!(matches!(result, Err(Error::DuplicateName { .. })));
    }

    #[test]
    fn test_invalid_names() {
        let mut graph = ResourceGraph::new();
        for bad in ["", "Security-Group", "my role", "Role!"] {
            let result = graph.declare_resource(ResourceKind::IamRole, bad, Properties::new());
            assert!(
                matches!(result, Err(Error::InvalidName { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_frozen_rejects_declarations() {
        let mut graph = ResourceGraph::new();
        let _frozen = graph.freeze().unwrap();
        assert!(graph.is_frozen());

        assert!(matches!(
            graph.declare_parameter(key_pair()),
            Err(Error::GraphFrozen { .. })
        ));
        assert!(matches!(
            graph.declare_resource(ResourceKind::IamRole, "Role", Properties::new()),
            Err(Error::GraphFrozen { .. })
        ));
        assert!(matches!(
            graph.declare_output(Output::new("Url", "url", "x".into())),
            Err(Error::GraphFrozen { .. })
        ));
        assert!(matches!(
            graph.set_description("late"),
            Err(Error::GraphFrozen { .. })
        ));
    }

    #[test]
    fn test_freeze_twice_fails() {
        let mut graph = ResourceGraph::new();
        graph
            .declare_resource(ResourceKind::IamRole, "Role", Properties::new())
            .unwrap();

        let frozen = graph.freeze().unwrap();
        assert_eq!(frozen.resources().count(), 1);
        assert!(matches!(
            graph.freeze(),
            Err(Error::GraphFrozen { ref operation }) if operation == "freeze"
        ));
        assert_eq!(frozen.resources().count(), 1);
    }

    #[test]
    fn test_frozen_lookup() {
        let mut graph = ResourceGraph::new();
        graph.set_description("demo").unwrap();
        graph.declare_parameter(key_pair()).unwrap();
        graph
            .declare_resource(ResourceKind::IamRole, "Role", Properties::new())
            .unwrap();

        let frozen = graph.freeze().unwrap();
        assert_eq!(frozen.description(), Some("demo"));
        assert_eq!(frozen.resource("Role").map(|r| r.kind), Some(ResourceKind::IamRole));
        assert!(frozen.parameter("KeyPair").is_some());
        assert!(frozen.output("Url").is_none());
    }
}
