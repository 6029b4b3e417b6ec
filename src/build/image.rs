//! Image naming.

use std::path::Path;

/// Image name for a container: the service name, joined with the
/// dockerfile's directory when it is not at the service root.
pub fn image_name(service: &str, dockerfile: &str) -> String {
    let name = match Path::new(dockerfile).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            format!("{}/{}", service, dir.to_string_lossy())
        }
        _ => service.to_string(),
    };
    name.replace('/', "-")
}

/// Fully qualified image reference: `<registry>/<namespace>/<image>:<version>`.
pub fn image_reference(registry: &str, namespace: &str, image: &str, version: &str) -> String {
    format!("{}/{}/{}:{}", registry, namespace, image, version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_dockerfile_uses_service_name() {
        assert_eq!(image_name("api", "Dockerfile"), "api");
    }

    #[test]
    fn nested_dockerfile_joins_directory() {
        assert_eq!(image_name("api", "worker/Dockerfile"), "api-worker");
        assert_eq!(image_name("api", "jobs/nightly/Dockerfile"), "api-jobs-nightly");
    }

    #[test]
    fn reference_format() {
        assert_eq!(
            image_reference("registry.example.com", "team", "api", "abc.sha"),
            "registry.example.com/team/api:abc.sha"
        );
    }
}
