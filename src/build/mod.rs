//! Container builds and manifest rendering.
//!
//! - [`BuildPipeline`] - The `bake`, `push`, `manifest` and `build` stages
//! - [`Registry`] - Image builder and registry; [`DockerRegistry`] is the
//!   `docker` + registry v2 implementation
//! - [`SidecarInjector`] - Manifest rewriting; [`Istioctl`] shells out to
//!   `istioctl kube-inject`
//! - [`content_version`] - Deterministic image tags from build inputs

pub mod image;
pub mod pipeline;
pub mod registry;
pub mod sidecar;
pub mod version;

pub use image::{image_name, image_reference};
pub use pipeline::{
    manifest_dir, BuildPipeline, BuildResult, BuildSettings, ContainerBuild, ResolvedContainer,
};
pub use registry::{DockerRegistry, Registry};
pub use sidecar::{Istioctl, SidecarInjector};
pub use version::{content_version, service_version};
