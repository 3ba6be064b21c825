//! # Build Unit Generation

use crate::artifact::{Artifact, UnitKey, UnitType};
use crate::compose::BuildSpec;
use crate::generator::env::resolve_environment;
use crate::generator::ini::IniDocument;

#[must_use]
pub fn generate(project_name: &str, service_name: &str, build: &BuildSpec, managed_by: &str) -> Artifact {
    let mut doc = IniDocument::new();
    doc.section("Unit").entry("Description", format!("{project_name}-{service_name} build"));

    doc.section("Build");
    doc.entry("ImageTag", UnitKey::new(&format!("{project_name}-{service_name}"), UnitType::Build).as_str());
    doc.entry("SetWorkingDirectory", build.context.as_deref().unwrap_or("."));
    if let Some(dockerfile) = &build.dockerfile {
        doc.entry("File", dockerfile);
    }
    for (k, v) in resolve_environment(&build.args) {
        doc.entry("SetBuildArg", format!("{k}={v}"));
    }
    doc.entry("Label", format!("managed-by={managed_by}"));

    doc.section("Install").entry("WantedBy", "multi-user.target");

    let key = UnitKey::new(&format!("{project_name}-{service_name}"), UnitType::Build);
    Artifact::new(key, doc.render().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_build_unit_with_context_and_args() {
        let build = BuildSpec {
            context: Some("./app".to_string()),
            dockerfile: Some("Dockerfile.prod".to_string()),
            ..Default::default()
        };
        let artifact = generate("web", "api", &build, "quad-reconciler");
        assert_eq!(artifact.key.as_str(), "web-api.build");
        let text = String::from_utf8(artifact.content).unwrap();
        assert!(text.contains("SetWorkingDirectory=./app"));
        assert!(text.contains("File=Dockerfile.prod"));
    }
}
