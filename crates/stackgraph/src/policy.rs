//! Typed access-policy documents
//!
//! Trust and permission policies are built from these types and rendered
//! into nested property values when attached to a resource.

use crate::types::PropertyValue;
use serde::{Deserialize, Serialize};

/// Action that lets a principal assume a role
pub const ASSUME_ROLE_ACTION: &str = "sts:AssumeRole";

/// Build an action identifier such as `codepipeline:*`
pub fn action(namespace: &str, name: &str) -> String {
    format!("{namespace}:{name}")
}

/// Whether a statement grants or denies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

impl Effect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "Allow",
            Self::Deny => "Deny",
        }
    }
}

/// The party a trust statement applies to
///
/// A statement carries at most one principal, and each principal is of
/// exactly one type, so trust can never span service and account scopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Principal {
    /// A cloud service, e.g. `ec2.amazonaws.com`
    Service(Vec<String>),
    /// An account or IAM identity ARN
    Aws(Vec<String>),
}

impl Principal {
    /// Single service principal
    pub fn service(identifier: impl Into<String>) -> Self {
        Self::Service(vec![identifier.into()])
    }

    fn key(&self) -> &'static str {
        match self {
            Self::Service(_) => "Service",
            Self::Aws(_) => "AWS",
        }
    }

    fn identifiers(&self) -> &[String] {
        match self {
            Self::Service(ids) | Self::Aws(ids) => ids,
        }
    }
}

/// One policy statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub effect: Effect,
    pub actions: Vec<String>,
    pub principal: Option<Principal>,
    pub resources: Vec<String>,
}

impl Statement {
    /// Allow the given actions
    pub fn allow<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            effect: Effect::Allow,
            actions: actions.into_iter().map(Into::into).collect(),
            principal: None,
            resources: Vec::new(),
        }
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn with_resources<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resources = resources.into_iter().map(Into::into).collect();
        self
    }

    fn to_property(&self) -> PropertyValue {
        let mut entries = vec![
            ("Effect", PropertyValue::from(self.effect.as_str())),
            ("Action", PropertyValue::list(self.actions.iter().map(String::as_str))),
        ];
        if let Some(principal) = &self.principal {
            entries.push((
                "Principal",
                PropertyValue::map([(
                    principal.key(),
                    PropertyValue::list(principal.identifiers().iter().map(String::as_str)),
                )]),
            ));
        }
        if !self.resources.is_empty() {
            entries.push((
                "Resource",
                PropertyValue::list(self.resources.iter().map(String::as_str)),
            ));
        }
        PropertyValue::map(entries)
    }
}

/// A list of statements
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyDocument {
    pub statements: Vec<Statement>,
}

impl PolicyDocument {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    /// Render as a nested property value
    pub fn to_property(&self) -> PropertyValue {
        PropertyValue::map([(
            "Statement",
            PropertyValue::List(self.statements.iter().map(Statement::to_property).collect()),
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trust_policy_rendering() {
        let doc = PolicyDocument::new(vec![
            Statement::allow([ASSUME_ROLE_ACTION])
                .with_principal(Principal::service("ec2.amazonaws.com")),
        ]);

        let json = serde_json::to_string(&doc.to_property()).unwrap();
        assert_eq!(
            json,
            r#"{"Statement":[{"Effect":"Allow","Action":["sts:AssumeRole"],"Principal":{"Service":["ec2.amazonaws.com"]}}]}"#
        );
    }

    #[test]
    fn test_permission_policy_rendering() {
        let doc = PolicyDocument::new(vec![
            Statement::allow([action("codepipeline", "*")]).with_resources(["*"]),
        ]);

        let json = serde_json::to_string(&doc.to_property()).unwrap();
        assert_eq!(
            json,
            r#"{"Statement":[{"Effect":"Allow","Action":["codepipeline:*"],"Resource":["*"]}]}"#
        );
    }

    #[test]
    fn test_aws_principal_key() {
        let statement = Statement::allow([ASSUME_ROLE_ACTION])
            .with_principal(Principal::Aws(vec!["arn:aws:iam::123456789012:root".into()]));
        let json = serde_json::to_string(&statement.to_property()).unwrap();
        assert!(json.contains(r#""Principal":{"AWS":["#));
    }

    #[test]
    fn test_policy_has_no_references() {
        let doc = PolicyDocument::new(vec![Statement::allow(["s3:*"]).with_resources(["*"])]);
        assert!(doc.to_property().references().is_empty());
    }
}
