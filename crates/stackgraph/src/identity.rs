//! Role, instance profile and permission policy
//!
//! The permission policy grants a whole action namespace on every
//! resource. That breadth is intentional for a single-purpose host and
//! must not be narrowed here.

use crate::error::Result;
use crate::graph::ResourceGraph;
use crate::policy::{ASSUME_ROLE_ACTION, PolicyDocument, Principal, Statement, action};
use crate::types::{PropertyValue, ResourceKind, ResourceRef, properties};

pub const ROLE: &str = "Role";
pub const INSTANCE_PROFILE: &str = "InstanceProfile";
pub const POLICY: &str = "Policy";

/// Default instance profile path
pub const ROOT_PATH: &str = "/";

/// Settings for the identity resources
#[derive(Debug, Clone)]
pub struct IdentityGraph {
    /// Service principal allowed to assume the role
    pub trust_principal: String,
    pub policy_name: String,
    /// Action namespace granted with a `*` wildcard
    pub action_namespace: String,
}

/// Handles to the declared identity resources
#[derive(Debug, Clone)]
pub struct IdentityRefs {
    pub role: ResourceRef,
    pub profile: ResourceRef,
    pub policy: ResourceRef,
}

impl IdentityGraph {
    /// Trust policy letting the compute service assume the role
    pub fn trust_policy(&self) -> PolicyDocument {
        PolicyDocument::new(vec![
            Statement::allow([ASSUME_ROLE_ACTION])
                .with_principal(Principal::service(self.trust_principal.as_str())),
        ])
    }

    /// Wildcard permission policy attached to the role
    pub fn permission_policy(&self) -> PolicyDocument {
        PolicyDocument::new(vec![
            Statement::allow([action(&self.action_namespace, "*")]).with_resources(["*"]),
        ])
    }

    /// Declare role, profile and policy, in that order
    pub fn declare(&self, graph: &mut ResourceGraph) -> Result<IdentityRefs> {
        let role = graph.declare_resource(
            ResourceKind::IamRole,
            ROLE,
            properties([("AssumeRolePolicyDocument", self.trust_policy().to_property())]),
        )?;

        let profile = graph.declare_resource(
            ResourceKind::IamInstanceProfile,
            INSTANCE_PROFILE,
            properties([
                ("Path", PropertyValue::from(ROOT_PATH)),
                ("Roles", PropertyValue::list([role.reference()])),
            ]),
        )?;

        let policy = graph.declare_resource(
            ResourceKind::IamPolicy,
            POLICY,
            properties([
                ("PolicyName", PropertyValue::from(self.policy_name.as_str())),
                ("PolicyDocument", self.permission_policy().to_property()),
                ("Roles", PropertyValue::list([role.reference()])),
            ]),
        )?;

        Ok(IdentityRefs {
            role,
            profile,
            policy,
        })
    }
}
