//! Per-service build stages.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::image::{image_name, image_reference};
use super::registry::Registry;
use super::sidecar::SidecarInjector;
use super::version::{content_version, service_version};
use crate::deploy::Cluster;
use crate::error::{ForgeError, Result};
use crate::graph::{Container, Target};
use crate::secrets::Sensitive;
use crate::tasks::{TaskContext, TaskHandle, TaskResult};
use crate::template::{Bindings, Interpolator, TemplateEngine};

/// Where images are published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    pub registry: String,
    pub namespace: String,
}

/// A container with its resolved version and image reference.
#[derive(Debug, Clone)]
pub struct ResolvedContainer {
    pub container: Container,
    pub image: String,
    pub version: String,
    pub reference: String,
}

/// What `build` did for one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerBuild {
    pub dockerfile: String,
    pub reference: String,
    pub built: bool,
    pub pushed: bool,
}

/// Result of a full `build` of one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    pub manifest_dir: PathBuf,
    pub containers: Vec<ContainerBuild>,
}

impl BuildResult {
    pub fn built(&self) -> Vec<&str> {
        self.containers
            .iter()
            .filter(|c| c.built)
            .map(|c| c.dockerfile.as_str())
            .collect()
    }

    pub fn pushed(&self) -> Vec<&str> {
        self.containers
            .iter()
            .filter(|c| c.pushed)
            .map(|c| c.reference.as_str())
            .collect()
    }
}

/// Runs the build stages of a service, each as its own task.
pub struct BuildPipeline<'a> {
    registry: &'a dyn Registry,
    cluster: &'a dyn Cluster,
    injector: &'a dyn SidecarInjector,
    engine: &'a dyn TemplateEngine,
    settings: BuildSettings,
    env: Bindings,
    credentials: Vec<Sensitive<String>>,
}

impl<'a> BuildPipeline<'a> {
    pub fn new(
        registry: &'a dyn Registry,
        cluster: &'a dyn Cluster,
        injector: &'a dyn SidecarInjector,
        settings: BuildSettings,
    ) -> Self {
        Self {
            registry,
            cluster,
            injector,
            engine: &Interpolator,
            settings,
            env: Bindings::new(),
            credentials: Vec::new(),
        }
    }

    pub fn with_engine(mut self, engine: &'a dyn TemplateEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Bindings available to manifests as `env.*`. Keys must already carry
    /// the `env.` prefix.
    pub fn with_env(mut self, env: Bindings) -> Self {
        self.env = env;
        self
    }

    /// A credential the registry uses, so stage output masks it.
    pub fn with_credential(mut self, credential: Sensitive<String>) -> Self {
        self.credentials.push(credential);
        self
    }

    fn touch_credentials(&self, cx: &mut TaskContext<'_>) {
        for credential in &self.credentials {
            cx.touch(credential);
        }
    }

    /// Version and image reference for every container of `target`.
    pub fn resolve(&self, target: &Target) -> Result<Vec<ResolvedContainer>> {
        target
            .containers()
            .into_iter()
            .map(|container| {
                let image = image_name(target.name(), &container.dockerfile);
                let version = content_version(target, &container)?;
                let reference = image_reference(
                    &self.settings.registry,
                    &self.settings.namespace,
                    &image,
                    &version,
                );
                Ok(ResolvedContainer {
                    container,
                    image,
                    version,
                    reference,
                })
            })
            .collect()
    }

    /// Everything a manifest template can reference for `target`.
    ///
    /// `build.version` is the image tag when the service has a single
    /// container. With several containers each has its own tag (see
    /// `build.images.<dockerfile>`), and `build.version` falls back to a
    /// hash over all of the service's files.
    pub fn metadata(&self, target: &Target) -> Result<Bindings> {
        let resolved = self.resolve(target)?;
        let version = match resolved.as_slice() {
            [only] => only.version.clone(),
            _ => service_version(target)?,
        };

        let mut bindings = self.env.clone();
        bindings.extend_yaml("service", &target.info());
        bindings.insert("build.version", version);
        bindings.insert("build.registry", self.settings.registry.as_str());
        bindings.insert("build.namespace", self.settings.namespace.as_str());
        for resolved in resolved {
            bindings.insert(
                format!("build.images.{}", resolved.container.dockerfile),
                resolved.reference,
            );
        }
        Ok(bindings)
    }

    /// Build every container whose version is not available yet. Returns the
    /// dockerfiles that were built.
    pub fn bake(&self, cx: &mut TaskContext<'_>, target: &Target) -> TaskHandle<Vec<String>> {
        self.bake_stage(cx, target, false)
    }

    fn bake_stage(
        &self,
        cx: &mut TaskContext<'_>,
        target: &Target,
        nested: bool,
    ) -> TaskHandle<Vec<String>> {
        spawn_stage(cx, nested, "bake", |cx| {
            self.touch_credentials(cx);
            cx.status("checking if images exist");

            let mut missing = Vec::new();
            for resolved in self.resolve(target)? {
                if !self.registry.exists(&resolved.image, &resolved.version)? {
                    missing.push(resolved);
                }
            }
            if missing.is_empty() {
                cx.summarize("skipped, images exist");
                return Ok(Vec::new());
            }

            let root = target.root();
            let mut built = Vec::with_capacity(missing.len());
            for resolved in &missing {
                let container = &resolved.container;
                cx.status(&format!(
                    "building {} for {}",
                    container.dockerfile,
                    target.name()
                ));
                self.registry.build(
                    &container.abs_context(root),
                    &container.abs_dockerfile(root),
                    &resolved.image,
                    &resolved.version,
                    &container.args,
                )?;
                built.push(container.dockerfile.clone());
            }

            cx.summarize(format!("built {}", built.join(", ")));
            Ok(built)
        })
    }

    /// Push every built container the registry does not hold yet. Returns
    /// the pushed image references.
    pub fn push(&self, cx: &mut TaskContext<'_>, target: &Target) -> TaskHandle<Vec<String>> {
        self.push_stage(cx, target, false)
    }

    fn push_stage(
        &self,
        cx: &mut TaskContext<'_>,
        target: &Target,
        nested: bool,
    ) -> TaskHandle<Vec<String>> {
        spawn_stage(cx, nested, "push", |cx| {
            self.touch_credentials(cx);
            cx.status(&format!("checking if {} containers exist", target.name()));

            let mut unpushed = Vec::new();
            for resolved in self.resolve(target)? {
                if self.registry.needs_push(&resolved.image, &resolved.version)? {
                    unpushed.push(resolved);
                }
            }
            if unpushed.is_empty() {
                cx.summarize("skipped, images exist");
                return Ok(Vec::new());
            }

            let mut pushed = Vec::with_capacity(unpushed.len());
            for resolved in &unpushed {
                cx.status(&format!("pushing container {}", resolved.container.dockerfile));
                pushed.push(self.registry.push(&resolved.image, &resolved.version)?);
            }

            let dockerfiles: Vec<&str> = unpushed
                .iter()
                .map(|r| r.container.dockerfile.as_str())
                .collect();
            cx.summarize(format!("pushed {}", dockerfiles.join(", ")));
            Ok(pushed)
        })
    }

    /// Render `<root>/k8s/` into `<root>/.forge/k8s/<name>/`, injecting
    /// sidecars when the service asks for it. Returns the output directory.
    pub fn manifest(&self, cx: &mut TaskContext<'_>, target: &Target) -> TaskHandle<PathBuf> {
        self.manifest_stage(cx, target, false)
    }

    fn manifest_stage(
        &self,
        cx: &mut TaskContext<'_>,
        target: &Target,
        nested: bool,
    ) -> TaskHandle<PathBuf> {
        spawn_stage(cx, nested, "manifest", |cx| {
            cx.status(&format!("generating manifests for {}", target.name()));

            let source = target.root().join("k8s");
            if !source.is_dir() {
                return Err(ForgeError::NoSuchDirectory { path: source }.into());
            }
            let output = manifest_dir(target);
            let bindings = self.metadata(target)?;
            render_tree(self.engine, &source, &output, &bindings)?;
            let resources = self.cluster.list_resources(&output)?;

            let istio = target.istio();
            if istio {
                cx.status("istioifying kube manifests");
                self.injector.inject(&output)?;
            }

            let resources: Vec<String> = resources.iter().map(ToString::to_string).collect();
            cx.summarize(format!(
                "generated {}\nwrote {}manifests to {}",
                resources.join(", "),
                if istio { "istioified " } else { "" },
                output.display()
            ));
            Ok(output)
        })
    }

    /// `bake`, then `push`, then `manifest`. A failed stage stops the rest.
    ///
    /// The stages run as detail tasks of `build`.
    pub fn build(&self, cx: &mut TaskContext<'_>, target: &Target) -> TaskHandle<BuildResult> {
        cx.spawn("build", |cx| {
            self.touch_credentials(cx);
            let built = self.bake_stage(cx, target, true).get()?;
            let pushed = self.push_stage(cx, target, true).get()?;
            let manifest_dir = self.manifest_stage(cx, target, true).get()?;

            let containers = self
                .resolve(target)?
                .into_iter()
                .map(|r| ContainerBuild {
                    built: built.contains(&r.container.dockerfile),
                    pushed: pushed.contains(&r.reference),
                    dockerfile: r.container.dockerfile,
                    reference: r.reference,
                })
                .collect();
            let result = BuildResult {
                manifest_dir,
                containers,
            };

            let mut lines = Vec::new();
            if !built.is_empty() {
                lines.push(built.join(", "));
            }
            if !pushed.is_empty() {
                lines.push(format!("pushed {}", pushed.join(", ")));
            }
            lines.push(format!("manifests {}", result.manifest_dir.display()));
            cx.summarize(lines.join("\n"));
            Ok(result)
        })
    }
}

fn spawn_stage<T>(
    cx: &mut TaskContext<'_>,
    nested: bool,
    name: &str,
    body: impl FnOnce(&mut TaskContext<'_>) -> TaskResult<T>,
) -> TaskHandle<T> {
    if nested {
        cx.spawn_detail(name, body)
    } else {
        cx.spawn(name, body)
    }
}

/// Output directory for a service's rendered manifests.
pub fn manifest_dir(target: &Target) -> PathBuf {
    target
        .root()
        .join(".forge")
        .join("k8s")
        .join(target.name())
}

/// Render every file below `source` into the same relative path below
/// `output`, replacing whatever `output` held before.
fn render_tree(
    engine: &dyn TemplateEngine,
    source: &Path,
    output: &Path,
    bindings: &Bindings,
) -> Result<()> {
    if output.exists() {
        fs::remove_dir_all(output)?;
    }
    fs::create_dir_all(output)?;
    render_dir(engine, source, source, output, bindings)
}

fn render_dir(
    engine: &dyn TemplateEngine,
    base: &Path,
    dir: &Path,
    output: &Path,
    bindings: &Bindings,
) -> Result<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|e| e.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    entries.sort();

    for path in entries {
        let rel = path.strip_prefix(base).unwrap_or(&path);
        let dest = output.join(rel);
        if path.is_dir() {
            fs::create_dir_all(&dest)?;
            render_dir(engine, base, &path, output, bindings)?;
        } else {
            let source = fs::read_to_string(&path)?;
            let name = Path::new("k8s").join(rel).to_string_lossy().into_owned();
            let rendered = engine.render(&name, &source, bindings)?;
            debug!("rendered {} -> {}", name, dest.display());
            fs::write(&dest, rendered)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::{ApplyOutput, ResourceDescriptor};
    use crate::graph::Discovery;
    use crate::tasks::{Outcome, TaskRuntime};
    use std::cell::RefCell;
    use std::collections::{BTreeMap, BTreeSet};
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeRegistry {
        local: RefCell<BTreeSet<String>>,
        remote: RefCell<BTreeSet<String>>,
        builds: RefCell<Vec<String>>,
        pushes: RefCell<Vec<String>>,
        fail_build: bool,
    }

    impl FakeRegistry {
        fn key(image: &str, version: &str) -> String {
            format!("{}:{}", image, version)
        }
    }

    impl Registry for FakeRegistry {
        fn exists(&self, image: &str, version: &str) -> Result<bool> {
            let key = Self::key(image, version);
            Ok(self.local.borrow().contains(&key) || self.remote.borrow().contains(&key))
        }

        fn build(
            &self,
            _context: &Path,
            _dockerfile: &Path,
            image: &str,
            version: &str,
            _args: &BTreeMap<String, String>,
        ) -> Result<()> {
            if self.fail_build {
                return Err(ForgeError::ExternalTool {
                    tool: "docker".into(),
                    message: "build failed".into(),
                    output: "step 3/7: missing base image".into(),
                });
            }
            let key = Self::key(image, version);
            self.builds.borrow_mut().push(key.clone());
            self.local.borrow_mut().insert(key);
            Ok(())
        }

        fn needs_push(&self, image: &str, version: &str) -> Result<bool> {
            let key = Self::key(image, version);
            Ok(self.local.borrow().contains(&key) && !self.remote.borrow().contains(&key))
        }

        fn push(&self, image: &str, version: &str) -> Result<String> {
            let key = Self::key(image, version);
            self.pushes.borrow_mut().push(key.clone());
            self.remote.borrow_mut().insert(key.clone());
            Ok(format!("registry.test/team/{}", key))
        }

        fn validate(&self) -> Result<()> {
            Ok(())
        }
    }

    struct FakeCluster;

    impl Cluster for FakeCluster {
        fn apply_manifests(&self, _: &Path, _: Option<&str>, _: bool) -> Result<ApplyOutput> {
            unreachable!("build never applies")
        }

        fn list_resources(&self, dir: &Path) -> Result<Vec<ResourceDescriptor>> {
            crate::deploy::read_resources(dir)
        }
    }

    #[derive(Default)]
    struct FakeInjector {
        injected: RefCell<Vec<PathBuf>>,
    }

    impl SidecarInjector for FakeInjector {
        fn inject(&self, manifest_dir: &Path) -> Result<()> {
            self.injected.borrow_mut().push(manifest_dir.to_path_buf());
            Ok(())
        }
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn service(root: &Path, descriptor: &str) -> Target {
        write(root, "svc/service.yaml", descriptor);
        write(root, "svc/Dockerfile", "FROM alpine\n");
        write(root, "svc/app.py", "print('hi')\n");
        write(
            root,
            "svc/k8s/deploy.yaml",
            "kind: Deployment\nmetadata:\n  name: ${service.name}\nspec:\n  image: ${build.images.Dockerfile}\n  ns: ${build.namespace}\n",
        );
        let mut d = Discovery::with_bindings(Bindings::new());
        d.search(root).unwrap();
        d.get("svc").unwrap().clone()
    }

    fn settings() -> BuildSettings {
        BuildSettings {
            registry: "registry.test".into(),
            namespace: "team".into(),
        }
    }

    #[test]
    fn bake_skips_when_image_exists() {
        let temp = TempDir::new().unwrap();
        let target = service(temp.path(), "name: svc\n");
        let registry = FakeRegistry::default();
        let (cluster, injector) = (FakeCluster, FakeInjector::default());
        let pipeline = BuildPipeline::new(&registry, &cluster, &injector, settings());

        let resolved = pipeline.resolve(&target).unwrap();
        registry
            .remote
            .borrow_mut()
            .insert(FakeRegistry::key(&resolved[0].image, &resolved[0].version));

        let outcome = TaskRuntime::new().run("forge", |cx| pipeline.bake(cx, &target).get());
        assert_eq!(outcome.value(), Some(&Vec::<String>::new()));
        assert_eq!(
            outcome.summary_of("forge.bake").as_deref(),
            Some("skipped, images exist")
        );
        assert!(registry.builds.borrow().is_empty());
    }

    #[test]
    fn bake_builds_missing_image_then_push_pushes_it() {
        let temp = TempDir::new().unwrap();
        let target = service(temp.path(), "name: svc\n");
        let registry = FakeRegistry::default();
        let (cluster, injector) = (FakeCluster, FakeInjector::default());
        let pipeline = BuildPipeline::new(&registry, &cluster, &injector, settings());

        let outcome = TaskRuntime::new().run("forge", |cx| {
            let built = pipeline.bake(cx, &target).get()?;
            let pushed = pipeline.push(cx, &target).get()?;
            Ok((built, pushed))
        });

        let (built, pushed) = outcome.value().unwrap();
        assert_eq!(built, &vec!["Dockerfile".to_string()]);
        assert_eq!(pushed.len(), 1);
        assert_eq!(registry.pushes.borrow().len(), 1);
        assert_eq!(
            outcome.summary_of("forge.push").as_deref(),
            Some("pushed Dockerfile")
        );

        for resolved in pipeline.resolve(&target).unwrap() {
            assert!(!registry.needs_push(&resolved.image, &resolved.version).unwrap());
        }
    }

    #[test]
    fn bake_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let target = service(temp.path(), "name: svc\n");
        let registry = FakeRegistry::default();
        let (cluster, injector) = (FakeCluster, FakeInjector::default());
        let pipeline = BuildPipeline::new(&registry, &cluster, &injector, settings());

        let outcome = TaskRuntime::new().run("forge", |cx| {
            let first = pipeline.bake(cx, &target).get()?;
            Ok(first)
        });
        assert_eq!(outcome.value().map(Vec::len), Some(1));

        let again = TaskRuntime::new().run("forge", |cx| pipeline.bake(cx, &target).get());
        assert_eq!(again.value(), Some(&Vec::<String>::new()));
        assert_eq!(registry.builds.borrow().len(), 1);
    }

    #[test]
    fn manifest_renders_templates_with_build_metadata() {
        let temp = TempDir::new().unwrap();
        let target = service(temp.path(), "name: svc\n");
        let registry = FakeRegistry::default();
        let (cluster, injector) = (FakeCluster, FakeInjector::default());
        let pipeline = BuildPipeline::new(&registry, &cluster, &injector, settings());

        let outcome = TaskRuntime::new().run("forge", |cx| pipeline.manifest(cx, &target).get());
        let dir = outcome.value().unwrap().clone();
        assert_eq!(dir, target.root().join(".forge/k8s/svc"));

        let rendered = fs::read_to_string(dir.join("deploy.yaml")).unwrap();
        let reference = &pipeline.resolve(&target).unwrap()[0].reference;
        assert!(rendered.contains("name: svc"));
        assert!(rendered.contains(&format!("image: {}", reference)));
        assert!(rendered.contains("ns: team"));

        let summary = outcome.summary_of("forge.manifest").unwrap();
        assert!(summary.starts_with("generated deployment/svc\n"));
        assert!(summary.contains(&format!("wrote manifests to {}", dir.display())));
        assert!(injector.injected.borrow().is_empty());
    }

    #[test]
    fn manifest_injects_sidecars_when_requested() {
        let temp = TempDir::new().unwrap();
        let target = service(temp.path(), "name: svc\nistio: true\n");
        let registry = FakeRegistry::default();
        let (cluster, injector) = (FakeCluster, FakeInjector::default());
        let pipeline = BuildPipeline::new(&registry, &cluster, &injector, settings());

        let outcome = TaskRuntime::new().run("forge", |cx| pipeline.manifest(cx, &target).get());
        assert!(outcome.is_success());
        assert_eq!(injector.injected.borrow().len(), 1);
        assert!(outcome
            .summary_of("forge.manifest")
            .unwrap()
            .contains("wrote istioified manifests"));
    }

    #[test]
    fn missing_k8s_directory_is_a_task_error() {
        let temp = TempDir::new().unwrap();
        let target = service(temp.path(), "name: svc\n");
        fs::remove_dir_all(target.root().join("k8s")).unwrap();
        let registry = FakeRegistry::default();
        let (cluster, injector) = (FakeCluster, FakeInjector::default());
        let pipeline = BuildPipeline::new(&registry, &cluster, &injector, settings());

        let outcome = TaskRuntime::new().run("forge", |cx| {
            pipeline.manifest(cx, &target);
            Ok(())
        });
        assert_eq!(outcome.find("forge.manifest").unwrap().outcome(), Outcome::Error);
        assert!(outcome.fault().is_none());
    }

    #[test]
    fn build_runs_all_stages_and_summarizes() {
        let temp = TempDir::new().unwrap();
        let target = service(temp.path(), "name: svc\n");
        let registry = FakeRegistry::default();
        let (cluster, injector) = (FakeCluster, FakeInjector::default());
        let pipeline = BuildPipeline::new(&registry, &cluster, &injector, settings());

        let outcome = TaskRuntime::new().run("forge", |cx| pipeline.build(cx, &target).get());
        let result = outcome.value().unwrap();
        assert_eq!(result.built(), vec!["Dockerfile"]);
        assert_eq!(result.pushed().len(), 1);

        let summary = outcome.summary_of("forge.build").unwrap();
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines[0], "Dockerfile");
        assert!(lines[1].starts_with("pushed registry.test/team/svc:"));
        assert!(lines[2].starts_with("manifests "));
        for stage in ["bake", "push", "manifest"] {
            let node = outcome.find(&format!("forge.build.{}", stage)).unwrap();
            assert_eq!(node.outcome(), Outcome::Ok);
            assert!(node.is_detail());
        }
        assert!(!outcome.report(false).contains("bake"));
        assert!(outcome.report(true).contains("bake"));
    }

    #[test]
    fn failed_bake_blocks_later_stages() {
        let temp = TempDir::new().unwrap();
        let target = service(temp.path(), "name: svc\n");
        let registry = FakeRegistry {
            fail_build: true,
            ..Default::default()
        };
        let (cluster, injector) = (FakeCluster, FakeInjector::default());
        let pipeline = BuildPipeline::new(&registry, &cluster, &injector, settings());

        let outcome = TaskRuntime::new().run("forge", |cx| {
            pipeline.build(cx, &target);
            Ok(())
        });

        assert_eq!(outcome.find("forge.build.bake").unwrap().outcome(), Outcome::Error);
        assert!(outcome.find("forge.build.push").is_none());
        assert!(outcome.find("forge.build.manifest").is_none());
        let errors = outcome.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path(), "forge.build.bake");
        assert!(outcome.report(false).contains("missing base image"));
    }

    #[test]
    fn credential_is_masked_in_stage_output() {
        let temp = TempDir::new().unwrap();
        let target = service(temp.path(), "name: svc\n");
        let registry = FakeRegistry::default();
        let (cluster, injector) = (FakeCluster, FakeInjector::default());
        let password = Sensitive::new("s3cr3t-pw".to_string());
        let pipeline = BuildPipeline::new(&registry, &cluster, &injector, settings())
            .with_credential(password.clone());

        let outcome = TaskRuntime::new().run("forge", |cx| {
            pipeline.bake(cx, &target);
            cx.summarize("login with s3cr3t-pw");
            Ok(())
        });

        let report = outcome.report(true);
        assert!(!report.contains("s3cr3t-pw"));
        assert!(report.contains(crate::secrets::MASK));
    }

    #[test]
    fn metadata_exposes_service_and_build_keys() {
        let temp = TempDir::new().unwrap();
        let target = service(temp.path(), "name: svc\nrequires: []\nport: 8080\n");
        let registry = FakeRegistry::default();
        let (cluster, injector) = (FakeCluster, FakeInjector::default());
        let mut env = Bindings::new();
        env.insert("env.STAGE", "qa");
        let pipeline =
            BuildPipeline::new(&registry, &cluster, &injector, settings()).with_env(env);

        let metadata = pipeline.metadata(&target).unwrap();
        assert_eq!(metadata.get("env.STAGE"), Some("qa"));
        assert_eq!(metadata.get("service.name"), Some("svc"));
        assert_eq!(metadata.get("service.port"), Some("8080"));
        assert_eq!(metadata.get("build.registry"), Some("registry.test"));
        assert_eq!(metadata.get("build.namespace"), Some("team"));
        assert!(metadata.get("build.version").unwrap().ends_with(".sha"));
        assert!(metadata
            .get("build.images.Dockerfile")
            .unwrap()
            .starts_with("registry.test/team/svc:"));
    }

    #[test]
    fn build_version_is_the_tag_of_a_single_container() {
        let temp = TempDir::new().unwrap();
        let target = service(temp.path(), "name: svc\n");
        let registry = FakeRegistry::default();
        let (cluster, injector) = (FakeCluster, FakeInjector::default());
        let pipeline = BuildPipeline::new(&registry, &cluster, &injector, settings());

        let metadata = pipeline.metadata(&target).unwrap();
        let version = metadata.get("build.version").unwrap();
        let image = metadata.get("build.images.Dockerfile").unwrap();
        assert_eq!(image, format!("registry.test/team/svc:{}", version));
    }

    #[test]
    fn build_version_hashes_the_service_with_several_containers() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "svc/worker/Dockerfile", "FROM busybox\n");
        let target = service(temp.path(), "name: svc\n");
        assert_eq!(target.containers().len(), 2);
        let registry = FakeRegistry::default();
        let (cluster, injector) = (FakeCluster, FakeInjector::default());
        let pipeline = BuildPipeline::new(&registry, &cluster, &injector, settings());

        let metadata = pipeline.metadata(&target).unwrap();
        let expected = service_version(&target).unwrap();
        assert_eq!(metadata.get("build.version"), Some(expected.as_str()));
    }
}
