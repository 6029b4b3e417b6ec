//! The orchestration context of one invocation.

use std::path::{Path, PathBuf};

use glob_match::glob_match;
use tracing::debug;

use crate::build::{
    BuildPipeline, BuildSettings, DockerRegistry, Istioctl, Registry, SidecarInjector,
};
use crate::config::ForgeConfig;
use crate::deploy::{Cluster, DeployStage, Kubectl};
use crate::error::{ForgeError, Result};
use crate::graph::{find_parent_containing, Discovery, Target, SERVICE_FILE};
use crate::tasks::{CancelToken, RootOutcome, TaskContext, TaskResult, TaskRuntime};
use crate::template::Bindings;

use super::args::TargetArgs;

/// What each selected service task does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Goal {
    /// Build containers.
    Bake,
    /// Render manifests.
    Manifest,
    /// Bake, push and render.
    Build,
    /// Build, then apply.
    Deploy,
}

/// Per-invocation switches for `build` and `deploy`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgeOptions {
    pub namespace: Option<String>,
    pub dry_run: bool,
    /// Glob selecting service tasks by name.
    pub filter: String,
}

impl Default for ForgeOptions {
    fn default() -> Self {
        Self::from(&TargetArgs::default())
    }
}

impl From<&TargetArgs> for ForgeOptions {
    fn from(args: &TargetArgs) -> Self {
        Self {
            namespace: args.namespace.clone(),
            dry_run: args.dry_run,
            filter: args.filter.clone(),
        }
    }
}

/// Owns everything one invocation needs: configuration, discovered services
/// and the external collaborators.
pub struct Forge {
    config: ForgeConfig,
    options: ForgeOptions,
    discovery: Discovery,
    registry: Box<dyn Registry>,
    cluster: Box<dyn Cluster>,
    injector: Box<dyn SidecarInjector>,
    cancel: CancelToken,
    env: Bindings,
    cwd: PathBuf,
    requested: Vec<String>,
}

impl Forge {
    /// A context using docker, kubectl and istioctl.
    pub fn new(
        config: ForgeConfig,
        options: ForgeOptions,
        cwd: impl Into<PathBuf>,
    ) -> Result<Self> {
        let registry = DockerRegistry::new(
            config.registry.clone(),
            config.namespace.clone(),
            config.user.clone(),
            config.password.clone(),
        )?;
        Ok(Self {
            config,
            options,
            discovery: Discovery::new(),
            registry: Box::new(registry),
            cluster: Box::new(Kubectl),
            injector: Box::new(Istioctl),
            cancel: CancelToken::new(),
            env: Bindings::new().with_process_env(),
            cwd: cwd.into(),
            requested: Vec::new(),
        })
    }

    /// Replace the external collaborators.
    pub fn with_collaborators(
        mut self,
        registry: Box<dyn Registry>,
        cluster: Box<dyn Cluster>,
        injector: Box<dyn SidecarInjector>,
    ) -> Self {
        self.registry = registry;
        self.cluster = cluster;
        self.injector = injector;
        self
    }

    /// Template bindings for `env.*` and service descriptors. Keys must carry
    /// the `env.` prefix.
    pub fn with_env(mut self, env: Bindings) -> Self {
        self.discovery = Discovery::with_bindings(env.clone());
        self.env = env;
        self
    }

    /// Observe `token` for cancellation.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }

    pub fn discovery(&self) -> &Discovery {
        &self.discovery
    }

    /// Discover services and return the ones to run, in dependency order.
    ///
    /// Services found from the working directory are requested; the config
    /// base directory is scanned too so their dependencies resolve.
    pub fn load_services(&mut self) -> Result<Vec<String>> {
        let cwd = self.cwd.canonicalize()?;
        let start = find_parent_containing(&cwd, SERVICE_FILE).unwrap_or(cwd);
        debug!("searching for services in {}", start.display());
        let found = self.discovery.search(&start)?;

        let base = self.config.base_dir().to_path_buf();
        if base.is_dir() && base != start {
            debug!("searching for services in {}", base.display());
            self.discovery.search(&base)?;
        }

        self.requested = found;
        self.discovery.order(&self.requested)
    }

    fn pipeline(&self) -> BuildPipeline<'_> {
        let settings = BuildSettings {
            registry: self.config.registry.clone(),
            namespace: self.config.namespace.clone(),
        };
        BuildPipeline::new(
            self.registry.as_ref(),
            self.cluster.as_ref(),
            self.injector.as_ref(),
            settings,
        )
        .with_env(self.env.clone())
        .with_credential(self.config.password.clone())
    }

    /// Run `goal` for every selected service.
    ///
    /// Discovery and ordering errors are returned before any task runs.
    /// Service tasks not matching the filter are skipped.
    pub fn execute(&mut self, goal: Goal) -> Result<RootOutcome<()>> {
        let services = self.load_services()?;
        let filter = self.options.filter.clone();

        let runtime = TaskRuntime::new()
            .with_cancel(self.cancel.clone())
            .with_include(move |node| node.depth() != 1 || glob_match(&filter, node.name()));

        let this = &*self;
        Ok(runtime.run("forge", |cx| {
            cx.touch(&this.config.password);
            for name in &services {
                if let Some(target) = this.discovery.get(name) {
                    cx.spawn(name.as_str(), |cx| this.run_goal(cx, goal, target));
                }
            }
            Ok(())
        }))
    }

    fn run_goal(&self, cx: &mut TaskContext<'_>, goal: Goal, target: &Target) -> TaskResult<()> {
        let pipeline = self.pipeline();
        match goal {
            Goal::Bake => {
                pipeline.bake(cx, target).get()?;
            }
            Goal::Manifest => {
                pipeline.manifest(cx, target).get()?;
            }
            Goal::Build => {
                pipeline.build(cx, target).get()?;
            }
            Goal::Deploy => {
                let built = pipeline.build(cx, target).get()?;
                let stage = DeployStage::new(
                    self.cluster.as_ref(),
                    self.options.namespace.clone(),
                    self.options.dry_run,
                );
                stage.deploy(cx, &built.manifest_dir).get()?;
            }
        }
        Ok(())
    }

    /// Template bindings of the first service found from the working
    /// directory, as YAML.
    pub fn metadata(&mut self) -> Result<String> {
        self.load_services()?;
        let target = self
            .requested
            .first()
            .and_then(|name| self.discovery.get(name))
            .ok_or_else(|| {
                ForgeError::Other(anyhow::anyhow!(
                    "no {} found at or below {}",
                    SERVICE_FILE,
                    self.cwd.display()
                ))
            })?;
        let bindings = self.pipeline().metadata(target)?;
        serde_yaml::to_string(&bindings.to_yaml())
            .map_err(|e| ForgeError::Other(anyhow::anyhow!("unable to render metadata: {}", e)))
    }

    /// Working directory services are looked up from.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }
}
