//! First-boot script delivered to the compute instance
//!
//! The script is a plain ordered list of shell lines. Nothing here checks
//! shell syntax; the only contract is ordering: packages install before
//! the configuration-management tool that needs them runs.

use crate::types::PropertyValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pull-mode executable
pub const ANSIBLE_PULL: &str = "/usr/local/bin/ansible-pull";

/// Playbook-mode executable
pub const ANSIBLE_PLAYBOOK: &str = "/usr/local/bin/ansible-playbook";

/// Where playbook mode checks out the repository
pub const CHECKOUT_ROOT: &str = "/tmp";

/// Cron schedule for periodic re-runs
const RERUN_SCHEDULE: &str = "*/10 * * * *";

const INTERPRETER: &str = "#!/bin/bash";

/// Toolchain and headers needed to `pip install ansible`
const PACKAGE_LINES: &[&str] = &[
    "yum install --enablerepo=epel -y git",
    "yum install -y gcc",
    "yum install -y libffi",
    "yum install -y libffi-devel",
    "yum install -y openssl-devel",
    "pip install ansible",
];

/// How the instance applies its configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BootstrapMode {
    /// `ansible-pull` fetches the repository itself on every run
    PullPeriodic,
    /// Clone once, then run `ansible-playbook` against the checkout
    #[default]
    PlaybookOnce,
}

impl BootstrapMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PullPeriodic => "pull-periodic",
            Self::PlaybookOnce => "playbook-once",
        }
    }

    /// Executable invoked by this mode
    pub fn executable(&self) -> &'static str {
        match self {
            Self::PullPeriodic => ANSIBLE_PULL,
            Self::PlaybookOnce => ANSIBLE_PLAYBOOK,
        }
    }

    fn cron_file(&self) -> &'static str {
        match self {
            Self::PullPeriodic => "/etc/cron.d/ansible-pull",
            Self::PlaybookOnce => "/etc/cron.d/ansible-playbook",
        }
    }
}

impl fmt::Display for BootstrapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directory name a `git clone` of `repository` produces
pub fn checkout_dir(repository: &str) -> &str {
    let trimmed = repository.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Command line that applies the playbook for `application`
pub fn invocation_command(mode: BootstrapMode, application: &str, repository: &str) -> String {
    match mode {
        BootstrapMode::PullPeriodic => format!(
            "{} -U {} {}.yml -i localhost",
            ANSIBLE_PULL, repository, application
        ),
        BootstrapMode::PlaybookOnce => format!(
            "{} {}/{}/{}.yml -i localhost",
            ANSIBLE_PLAYBOOK,
            CHECKOUT_ROOT,
            checkout_dir(repository),
            application
        ),
    }
}

/// Ordered shell lines run on first boot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapScript {
    mode: BootstrapMode,
    lines: Vec<String>,
}

impl BootstrapScript {
    /// Compose the script for a mode
    ///
    /// Order: interpreter, packages, checkout (playbook mode only), the
    /// invocation, then the cron entry that re-runs it.
    pub fn compose(mode: BootstrapMode, application: &str, repository: &str) -> Self {
        let mut lines = vec![INTERPRETER.to_string()];
        lines.extend(PACKAGE_LINES.iter().map(|l| (*l).to_string()));

        if mode == BootstrapMode::PlaybookOnce {
            lines.push(format!("cd {CHECKOUT_ROOT};git clone {repository}"));
        }

        let command = invocation_command(mode, application, repository);
        let rerun = format!(
            "echo '{} {}' > {}",
            RERUN_SCHEDULE,
            command,
            mode.cron_file()
        );
        lines.push(command);
        lines.push(rerun);

        Self { mode, lines }
    }

    pub fn mode(&self) -> BootstrapMode {
        self.mode
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Newline-joined script text
    pub fn render(&self) -> String {
        self.lines.join("\n")
    }

    /// Opaque user-data value: base64 of the newline-joined lines
    pub fn to_user_data(&self) -> PropertyValue {
        PropertyValue::base64(PropertyValue::join(
            "\n",
            self.lines.iter().map(|l| PropertyValue::from(l.as_str())).collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPO: &str = "https://github.com/chilliblast/ansible";

    fn count_starting_with(script: &BootstrapScript, prefix: &str) -> usize {
        script.lines().iter().filter(|l| l.starts_with(prefix)).count()
    }

    fn position_of(script: &BootstrapScript, prefix: &str) -> usize {
        script
            .lines()
            .iter()
            .position(|l| l.starts_with(prefix))
            .unwrap()
    }

    #[test]
    fn test_playbook_once_single_invocation() {
        let script = BootstrapScript::compose(BootstrapMode::PlaybookOnce, "jenkins", REPO);

        assert_eq!(count_starting_with(&script, ANSIBLE_PLAYBOOK), 1);
        assert_eq!(count_starting_with(&script, ANSIBLE_PULL), 0);
        assert!(!script.render().contains(ANSIBLE_PULL));

        let invocation = position_of(&script, ANSIBLE_PLAYBOOK);
        for package in PACKAGE_LINES {
            let pos = script.lines().iter().position(|l| l == package).unwrap();
            assert!(pos < invocation, "{package} must precede the invocation");
        }
        assert!(position_of(&script, "cd /tmp;git clone") < invocation);
    }

    #[test]
    fn test_playbook_once_lines() {
        let script = BootstrapScript::compose(BootstrapMode::PlaybookOnce, "jenkins", REPO);
        let lines = script.lines();

        assert_eq!(lines[0], "#!/bin/bash");
        assert_eq!(
            lines[lines.len() - 2],
            "/usr/local/bin/ansible-playbook /tmp/ansible/jenkins.yml -i localhost"
        );
        assert_eq!(
            lines[lines.len() - 1],
            "echo '*/10 * * * * /usr/local/bin/ansible-playbook /tmp/ansible/jenkins.yml -i localhost' > /etc/cron.d/ansible-playbook"
        );
    }

    #[test]
    fn test_pull_periodic_lines() {
        let script = BootstrapScript::compose(BootstrapMode::PullPeriodic, "jenkins", REPO);

        assert_eq!(count_starting_with(&script, ANSIBLE_PULL), 1);
        assert_eq!(count_starting_with(&script, ANSIBLE_PLAYBOOK), 0);
        assert_eq!(count_starting_with(&script, "cd /tmp"), 0);
        assert!(script.lines().contains(
            &"/usr/local/bin/ansible-pull -U https://github.com/chilliblast/ansible jenkins.yml -i localhost"
                .to_string()
        ));
        assert!(script.render().ends_with("> /etc/cron.d/ansible-pull"));
    }

    #[test]
    fn test_checkout_dir() {
        assert_eq!(checkout_dir(REPO), "ansible");
        assert_eq!(checkout_dir("https://example.com/org/playbooks.git"), "playbooks");
        assert_eq!(checkout_dir("https://example.com/org/site/"), "site");
    }

    #[test]
    fn test_render_joins_with_newlines() {
        let script = BootstrapScript::compose(BootstrapMode::PlaybookOnce, "app", REPO);
        let rendered = script.render();
        assert_eq!(rendered.lines().count(), script.lines().len());
        assert!(!rendered.ends_with('\n'));
    }

    #[test]
    fn test_user_data_shape() {
        let script = BootstrapScript::compose(BootstrapMode::PlaybookOnce, "app", REPO);
        match script.to_user_data() {
            PropertyValue::Base64(inner) => match *inner {
                PropertyValue::Join { delimiter, parts } => {
                    assert_eq!(delimiter, "\n");
                    assert_eq!(parts.len(), script.lines().len());
                }
                other => panic!("Expected Join, got {:?}", other),
            },
            other => panic!("Expected Base64, got {:?}", other),
        }
    }

    #[test]
    fn test_mode_serde_names() {
        let json = serde_json::to_string(&BootstrapMode::PullPeriodic).unwrap();
        assert_eq!(json, r#""pull-periodic""#);
        assert_eq!(BootstrapMode::default(), BootstrapMode::PlaybookOnce);
        assert_eq!(BootstrapMode::PlaybookOnce.to_string(), "playbook-once");
    }
}
