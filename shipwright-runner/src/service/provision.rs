//! Provisioning service
//!
//! Installs host prerequisites before a target is built. The provisioner
//! holds an ordered table of rules; every rule whose predicate matches the
//! job's target runs, in declaration order, before the toolchain is set up.
//!
//! Rules name packages of the target's native platform, so they only run
//! when that platform is the host's. Cross-host targets skip provisioning.

use anyhow::Result;
use async_trait::async_trait;
use shipwright_core::domain::provision::ProvisionRule;
use shipwright_core::domain::target::{HostPlatform, TargetSpec};
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use crate::error::JobError;
use crate::process;

/// Collaborator that installs system packages on the host
#[async_trait]
pub trait PackageManager: Send + Sync {
    /// Installs every package, failing if any cannot be resolved or installed
    async fn install(&self, packages: &[String]) -> Result<()>;
}

/// Package manager of the current host (`apt-get`, `brew` or `choco`)
pub struct SystemPackageManager {
    platform: HostPlatform,
    use_sudo: bool,
    /// Package managers take a global lock; concurrent jobs queue here instead
    lock: Mutex<()>,
    index_refreshed: OnceCell<()>,
}

impl SystemPackageManager {
    /// Creates a package manager for the given host platform
    ///
    /// # Arguments
    /// * `platform` - Host platform, decides which package manager is driven
    /// * `use_sudo` - Prefix `apt-get` invocations with `sudo`
    pub fn new(platform: HostPlatform, use_sudo: bool) -> Self {
        Self {
            platform,
            use_sudo,
            lock: Mutex::new(()),
            index_refreshed: OnceCell::new(),
        }
    }

    fn apt_command(&self) -> Command {
        let mut command = if self.use_sudo {
            let mut sudo = Command::new("sudo");
            sudo.arg("apt-get");
            sudo
        } else {
            Command::new("apt-get")
        };
        command.env("DEBIAN_FRONTEND", "noninteractive");
        command
    }

    async fn refresh_apt_index(&self) -> Result<()> {
        self.index_refreshed
            .get_or_try_init(|| async {
                let mut command = self.apt_command();
                command.arg("update");
                process::run(command, "apt-get update").await.map(|_| ())
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PackageManager for SystemPackageManager {
    async fn install(&self, packages: &[String]) -> Result<()> {
        if packages.is_empty() {
            return Ok(());
        }

        let _guard = self.lock.lock().await;

        match self.platform {
            HostPlatform::Linux => {
                self.refresh_apt_index().await?;
                let mut command = self.apt_command();
                command
                    .arg("install")
                    .arg("-y")
                    .arg("--no-install-recommends")
                    .args(packages);
                process::run(command, "apt-get install").await?;
            }
            HostPlatform::Macos => {
                let mut command = Command::new("brew");
                command.arg("install").args(packages);
                process::run(command, "brew install").await?;
            }
            HostPlatform::Windows => {
                let mut command = Command::new("choco");
                command.arg("install").arg("-y").args(packages);
                process::run(command, "choco install").await?;
            }
        }

        Ok(())
    }
}

/// Runs the provisioning rules that apply to a target
pub struct Provisioner {
    rules: Vec<ProvisionRule>,
    packages: Arc<dyn PackageManager>,
    host: HostPlatform,
}

impl Provisioner {
    /// Creates a provisioner installing through `packages` on a `host` machine
    pub fn new(
        rules: Vec<ProvisionRule>,
        packages: Arc<dyn PackageManager>,
        host: HostPlatform,
    ) -> Self {
        Self {
            rules,
            packages,
            host,
        }
    }

    /// Rules whose predicate holds for `target`, in declaration order
    pub fn matching_rules<'a>(
        &'a self,
        target: &'a TargetSpec,
    ) -> impl Iterator<Item = &'a ProvisionRule> + 'a {
        self.rules.iter().filter(move |rule| rule.applies_to(target))
    }

    /// Executes every matching rule; the first failure aborts provisioning
    pub async fn provision(&self, target: &TargetSpec) -> Result<(), JobError> {
        if target.host_platform != self.host {
            let skipped = self.matching_rules(target).count();
            if skipped > 0 {
                warn!(
                    "Skipping {} provisioning rule(s) for {}: packages target {} but this host is {}",
                    skipped, target.triple, target.host_platform, self.host
                );
            }
            return Ok(());
        }

        let mut applied = 0;

        for rule in self.matching_rules(target) {
            info!(
                "Provisioning {} for {}: {}",
                rule.name,
                target.triple,
                rule.packages.join(" ")
            );

            self.packages
                .install(&rule.packages)
                .await
                .map_err(|source| JobError::Provisioning {
                    triple: target.triple.clone(),
                    source: source.context(format!("rule '{}'", rule.name)),
                })?;

            applied += 1;
        }

        if applied == 0 {
            debug!("No provisioning rules apply to {}", target.triple);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePackageManager;
    use shipwright_core::domain::job::JobStage;
    use shipwright_core::domain::provision::TargetPredicate;
    use shipwright_core::domain::target::TargetRegistry;

    fn target(triple: &str) -> TargetSpec {
        TargetRegistry::default().get(triple).unwrap().clone()
    }

    #[tokio::test]
    async fn test_linux_rule_runs_once_for_linux_only() {
        let packages = Arc::new(FakePackageManager::default());
        let provisioner = Provisioner::new(
            vec![ProvisionRule::linux_audio()],
            packages.clone(),
            HostPlatform::Linux,
        );

        for t in TargetRegistry::default().list_targets() {
            provisioner.provision(t).await.unwrap();
        }

        assert_eq!(
            packages.installs(),
            vec![vec!["libasound2-dev".to_string(), "libasound2".to_string()]]
        );
    }

    #[tokio::test]
    async fn test_rules_run_in_declaration_order() {
        let packages = Arc::new(FakePackageManager::default());
        let provisioner = Provisioner::new(
            vec![
                ProvisionRule::new("first", TargetPredicate::Always, vec!["a".to_string()]),
                ProvisionRule::new(
                    "skipped",
                    TargetPredicate::TripleContains("windows".to_string()),
                    vec!["b".to_string()],
                ),
                ProvisionRule::new(
                    "third",
                    TargetPredicate::TripleContains("linux".to_string()),
                    vec!["c".to_string()],
                ),
            ],
            packages.clone(),
            HostPlatform::Linux,
        );

        provisioner
            .provision(&target("x86_64-unknown-linux-musl"))
            .await
            .unwrap();

        assert_eq!(
            packages.installs(),
            vec![vec!["a".to_string()], vec!["c".to_string()]]
        );
    }

    #[tokio::test]
    async fn test_failure_aborts_remaining_rules() {
        let packages = Arc::new(FakePackageManager::failing());
        let provisioner = Provisioner::new(
            vec![
                ProvisionRule::linux_audio(),
                ProvisionRule::new("never", TargetPredicate::Always, vec!["z".to_string()]),
            ],
            packages.clone(),
            HostPlatform::Linux,
        );

        let err = provisioner
            .provision(&target("x86_64-unknown-linux-musl"))
            .await
            .unwrap_err();

        assert_eq!(err.stage(), JobStage::Provisioning);
        assert!(err.to_string().contains("linux-audio"));
        assert_eq!(packages.installs().len(), 1);
    }

    #[tokio::test]
    async fn test_no_matching_rules_is_noop() {
        let packages = Arc::new(FakePackageManager::failing());
        let provisioner = Provisioner::new(
            vec![ProvisionRule::linux_audio()],
            packages.clone(),
            HostPlatform::Linux,
        );

        provisioner
            .provision(&target("x86_64-apple-darwin"))
            .await
            .unwrap();
        assert!(packages.installs().is_empty());
    }

    #[tokio::test]
    async fn test_cross_host_target_skips_rules() {
        let packages = Arc::new(FakePackageManager::failing());
        let provisioner = Provisioner::new(
            vec![ProvisionRule::linux_audio()],
            packages.clone(),
            HostPlatform::Macos,
        );

        provisioner
            .provision(&target("x86_64-unknown-linux-musl"))
            .await
            .unwrap();
        assert!(packages.installs().is_empty());
    }
}
