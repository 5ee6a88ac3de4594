//! The single-instance deployment stack
//!
//! Wires identity, network and bootstrap pieces into one graph in
//! dependency order and exposes the instance address and URL as outputs.

use crate::bootstrap::{BootstrapMode, BootstrapScript};
use crate::error::{Error, Result};
use crate::graph::{FrozenGraph, ResourceGraph};
use crate::identity::IdentityGraph;
use crate::network::{NetworkAddress, NetworkPolicy, SSH_PORT};
use crate::resolver::AddressResolver;
use crate::serializer::{Document, serialize};
use crate::types::{Output, Parameter, PropertyValue, ResourceKind, ResourceRef, properties};
use serde::{Deserialize, Serialize};

/// Logical name of the compute instance
pub const INSTANCE: &str = "instance";

/// Parameter type for an existing SSH key pair name
pub const KEY_PAIR_TYPE: &str = "AWS::EC2::KeyPair::KeyName";

/// Overridable generation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    /// Application name, also the playbook file name
    pub application_name: String,
    /// Port the application listens on
    pub application_port: u16,
    /// Repository holding the playbook
    pub playbook_repository: String,
    /// Machine image identifier
    pub image_id: String,
    /// Instance size class
    pub instance_type: String,
    /// Service principal trusted to assume the role
    pub trust_principal: String,
    /// Free-text template description
    pub description: String,
    /// How the instance applies its configuration
    pub bootstrap_mode: BootstrapMode,
    /// Name of the role's permission policy
    pub policy_name: String,
    /// Action namespace granted by the permission policy
    pub policy_action_namespace: String,
    /// Name of the key-pair parameter
    pub key_pair_parameter: String,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            application_name: "jenkins".to_string(),
            application_port: 8080,
            playbook_repository: "https://github.com/chilliblast/ansible".to_string(),
            image_id: "ami-ebd02392".to_string(),
            instance_type: "t2.micro".to_string(),
            trust_principal: "ec2.amazonaws.com".to_string(),
            description: "Effective DevOps in AWS: HelloWorld web application".to_string(),
            bootstrap_mode: BootstrapMode::default(),
            policy_name: "AllowCodePipeline".to_string(),
            policy_action_namespace: "codepipeline".to_string(),
            key_pair_parameter: "KeyPair".to_string(),
        }
    }
}

impl StackConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("application_name", &self.application_name),
            ("playbook_repository", &self.playbook_repository),
            ("image_id", &self.image_id),
            ("instance_type", &self.instance_type),
            ("trust_principal", &self.trust_principal),
            ("policy_name", &self.policy_name),
            ("policy_action_namespace", &self.policy_action_namespace),
            ("key_pair_parameter", &self.key_pair_parameter),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::config(field, "must not be empty"));
            }
        }

        if self.application_name.chars().any(char::is_whitespace) {
            return Err(Error::config(
                "application_name",
                "must not contain whitespace",
            ));
        }
        if self.application_port == 0 {
            return Err(Error::config("application_port", "must not be 0"));
        }
        if self.application_port == SSH_PORT {
            return Err(Error::config(
                "application_port",
                format!("conflicts with the SSH control port {SSH_PORT}"),
            ));
        }
        Ok(())
    }
}

/// Build the frozen stack graph for a resolved caller address
pub fn build_stack(config: &StackConfig, address: NetworkAddress) -> Result<FrozenGraph> {
    config.validate()?;

    let mut graph = ResourceGraph::new();
    graph.set_description(config.description.as_str())?;

    let key_pair = graph.declare_parameter(
        Parameter::new(
            config.key_pair_parameter.as_str(),
            KEY_PAIR_TYPE,
            "Name of an existing EC2 KeyPair to SSH",
        )
        .with_constraint("must be the name of an existing EC2 KeyPair."),
    )?;

    let identity = IdentityGraph {
        trust_principal: config.trust_principal.clone(),
        policy_name: config.policy_name.clone(),
        action_namespace: config.policy_action_namespace.clone(),
    }
    .declare(&mut graph)?;

    let network = NetworkPolicy::new(address, config.application_port);
    let security_group = network.declare(&mut graph)?;

    let script = BootstrapScript::compose(
        config.bootstrap_mode,
        &config.application_name,
        &config.playbook_repository,
    );
    log::debug!(
        "bootstrap script ({}, {} lines)",
        script.mode(),
        script.lines().len()
    );

    let instance = graph.declare_resource(
        ResourceKind::Ec2Instance,
        INSTANCE,
        properties([
            ("ImageId", PropertyValue::from(config.image_id.as_str())),
            ("InstanceType", PropertyValue::from(config.instance_type.as_str())),
            (
                "SecurityGroups",
                PropertyValue::list([security_group.reference()]),
            ),
            ("KeyName", key_pair.reference()),
            ("UserData", script.to_user_data()),
            ("IamInstanceProfile", identity.profile.reference()),
        ]),
    )?;

    declare_outputs(&mut graph, &instance, config.application_port)?;
    graph.freeze()
}

fn declare_outputs(graph: &mut ResourceGraph, instance: &ResourceRef, port: u16) -> Result<()> {
    graph.declare_output(Output::new(
        "InstancePublicIp",
        "Public IP of our instance.",
        instance.attribute("PublicIp"),
    ))?;
    graph.declare_output(Output::new(
        "WebUrl",
        "Application endpoint",
        PropertyValue::join(
            "",
            vec![
                "http://".into(),
                instance.attribute("PublicDnsName"),
                ":".into(),
                port.to_string().into(),
            ],
        ),
    ))
}

/// Resolve the caller address, build the stack and render it
///
/// Nothing is rendered unless every step succeeds.
pub fn generate(config: &StackConfig, resolver: &dyn AddressResolver) -> Result<Document> {
    let address = resolver.resolve()?;
    log::info!("resolved caller address {}", address);
    let graph = build_stack(config, address)?;
    Ok(serialize(&graph))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{INSTANCE_PROFILE, POLICY, ROLE};
    use crate::network::SECURITY_GROUP;
    use crate::resolver::StaticResolver;
    use serde_json::{Value, json};

    fn demo_document(address: &str) -> Value {
        let config = StackConfig {
            key_pair_parameter: "KeyPair".to_string(),
            ..StackConfig::default()
        };
        let resolver = StaticResolver::new(address.parse().unwrap());
        let doc = generate(&config, &resolver).unwrap();
        serde_json::from_str(&doc.to_json_pretty().unwrap()).unwrap()
    }

    #[test]
    fn test_end_to_end_demo() {
        let doc = demo_document("198.51.100.4");
        let resources = &doc["Resources"];

        assert_eq!(
            doc["Parameters"]["KeyPair"]["Type"],
            "AWS::EC2::KeyPair::KeyName"
        );

        assert_eq!(resources[ROLE]["Type"], "AWS::IAM::Role");
        assert_eq!(
            resources[ROLE]["Properties"]["AssumeRolePolicyDocument"]["Statement"][0]["Principal"],
            json!({"Service": ["ec2.amazonaws.com"]})
        );

        assert_eq!(resources[INSTANCE_PROFILE]["Type"], "AWS::IAM::InstanceProfile");
        assert_eq!(
            resources[INSTANCE_PROFILE]["Properties"]["Roles"],
            json!([{"Ref": "Role"}])
        );

        assert_eq!(
            resources[POLICY]["Properties"]["Roles"],
            json!([{"Ref": "Role"}])
        );

        let ingress = &resources[SECURITY_GROUP]["Properties"]["SecurityGroupIngress"];
        assert_eq!(
            ingress,
            &json!([
                {"IpProtocol": "tcp", "FromPort": 22, "ToPort": 22, "CidrIp": "198.51.100.4/32"},
                {"IpProtocol": "tcp", "FromPort": 8080, "ToPort": 8080, "CidrIp": "198.51.100.4/32"}
            ])
        );

        let instance = &resources[INSTANCE]["Properties"];
        assert_eq!(instance["SecurityGroups"], json!([{"Ref": "SecurityGroup"}]));
        assert_eq!(instance["IamInstanceProfile"], json!({"Ref": "InstanceProfile"}));
        assert_eq!(instance["KeyName"], json!({"Ref": "KeyPair"}));
        assert!(instance["UserData"]["Fn::Base64"]["Fn::Join"].is_array());

        assert_eq!(
            doc["Outputs"]["InstancePublicIp"]["Value"],
            json!({"Fn::GetAtt": ["instance", "PublicIp"]})
        );
        assert_eq!(
            doc["Outputs"]["WebUrl"]["Value"],
            json!({"Fn::Join": ["", [
                "http://",
                {"Fn::GetAtt": ["instance", "PublicDnsName"]},
                ":",
                "8080"
            ]]})
        );
    }

    #[test]
    fn test_resource_declaration_order() {
        let graph = build_stack(&StackConfig::default(), "203.0.113.7".parse().unwrap()).unwrap();
        let names: Vec<_> = graph.resources().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![ROLE, INSTANCE_PROFILE, POLICY, SECURITY_GROUP, INSTANCE]
        );
    }

    #[test]
    fn test_generation_is_byte_identical() {
        let config = StackConfig::default();
        let resolver = StaticResolver::new("203.0.113.7".parse().unwrap());
        let first = generate(&config, &resolver).unwrap().to_json_pretty().unwrap();
        let second = generate(&config, &resolver).unwrap().to_json_pretty().unwrap();
        assert_eq!(first, second);
        assert!(first.contains("203.0.113.7/32"));
    }

    #[test]
    fn test_resolution_failure_aborts() {
        let failing = || -> Result<NetworkAddress> { Err(Error::resolution("no route to host")) };
        let result = generate(&StackConfig::default(), &failing);
        assert!(matches!(result, Err(Error::Resolution { .. })));
    }

    #[test]
    fn test_custom_port_flows_through() {
        let config = StackConfig {
            application_port: 9090,
            ..StackConfig::default()
        };
        let resolver = StaticResolver::new("203.0.113.7".parse().unwrap());
        let json = generate(&config, &resolver).unwrap().to_json().unwrap();
        assert!(json.contains(r#""FromPort":9090"#));
        assert!(json.contains(r#""Allow SSH and TCP/9090 access""#));
        assert!(json.contains(r#"":","9090"]"#));
    }

    #[test]
    fn test_ssh_port_is_not_configurable() {
        let config: StackConfig =
            serde_json::from_str(r#"{"ssh_port": 2222, "application_port": 9090}"#).unwrap();
        let rendered = serde_json::to_value(&config).unwrap();
        assert!(rendered.get("ssh_port").is_none());

        let doc = generate(&config, &StaticResolver::new("203.0.113.7".parse().unwrap())).unwrap();
        let value = serde_json::to_value(&doc).unwrap();
        let rules = value["Resources"][SECURITY_GROUP]["Properties"]["SecurityGroupIngress"]
            .as_array()
            .unwrap();
        let ports: Vec<_> = rules.iter().map(|r| r["FromPort"].clone()).collect();
        assert_eq!(ports, vec![json!(SSH_PORT), json!(9090)]);
    }

    #[test]
    fn test_pull_mode_user_data() {
        let config = StackConfig {
            bootstrap_mode: BootstrapMode::PullPeriodic,
            ..StackConfig::default()
        };
        let json = generate(&config, &StaticResolver::new("203.0.113.7".parse().unwrap()))
            .unwrap()
            .to_json()
            .unwrap();
        assert!(json.contains("/usr/local/bin/ansible-pull -U"));
        assert!(!json.contains("/usr/local/bin/ansible-playbook"));
    }

    #[test]
    fn test_validate_rejects_bad_config() {
        let cases = [
            StackConfig {
                application_name: String::new(),
                ..StackConfig::default()
            },
            StackConfig {
                application_name: "my app".to_string(),
                ..StackConfig::default()
            },
            StackConfig {
                application_port: 0,
                ..StackConfig::default()
            },
            StackConfig {
                application_port: 22,
                ..StackConfig::default()
            },
            StackConfig {
                image_id: "  ".to_string(),
                ..StackConfig::default()
            },
        ];
        for config in cases {
            assert!(matches!(
                config.validate(),
                Err(Error::InvalidConfig { .. })
            ));
        }
        assert!(StackConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_key_pair_name_rejected() {
        let config = StackConfig {
            key_pair_parameter: "key-pair".to_string(),
            ..StackConfig::default()
        };
        let result = build_stack(&config, "203.0.113.7".parse().unwrap());
        assert!(matches!(result, Err(Error::InvalidName { .. })));
    }

    #[test]
    fn test_key_pair_name_collision() {
        // The key pair parameter shares a namespace with resources
        let config = StackConfig {
            key_pair_parameter: "Role".to_string(),
            ..StackConfig::default()
        };
        let result = build_stack(&config, "203.0.113.7".parse().unwrap());
        assert!(matches!(result, Err(Error::DuplicateName { .. })));
    }

    #[test]
    fn test_config_deserialize_partial() {
        let config: StackConfig =
            serde_json::from_str(r#"{"application_port": 8443, "bootstrap_mode": "pull-periodic"}"#)
                .unwrap();
        assert_eq!(config.application_port, 8443);
        assert_eq!(config.bootstrap_mode, BootstrapMode::PullPeriodic);
        assert_eq!(config.application_name, "jenkins");
    }
}
