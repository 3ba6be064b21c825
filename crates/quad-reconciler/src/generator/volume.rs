//! # Volume Unit Generation

use crate::artifact::{Artifact, UnitKey, UnitType};
use crate::compose::VolumeDef;
use crate::generator::env::{resolve_labels, sorted_map};
use crate::generator::ini::IniDocument;

#[must_use]
pub fn generate(project_name: &str, volume_name: &str, volume: &VolumeDef, managed_by: &str) -> Artifact {
    let mut doc = IniDocument::new();
    doc.section("Unit").entry("Description", format!("{project_name}-{volume_name} volume"));

    doc.section("Volume");
    if let Some(driver) = &volume.driver {
        doc.entry("Driver", driver);
    }
    for (k, v) in sorted_map(&volume.driver_opts) {
        doc.entry("Options", format!("{k}={v}"));
    }
    for (k, v) in resolve_labels(&volume.labels, managed_by) {
        doc.entry("Label", format!("{k}={v}"));
    }

    doc.section("Install").entry("WantedBy", "multi-user.target");

    let key = UnitKey::new(&format!("{project_name}-{volume_name}"), UnitType::Volume);
    Artifact::new(key, doc.render().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_volume_unit_with_driver_opts() {
        let mut volume = VolumeDef { driver: Some("local".to_string()), ..Default::default() };
        volume.driver_opts.insert("type".to_string(), "nfs".to_string());
        let artifact = generate("web", "data", &volume, "quad-reconciler");
        assert_eq!(artifact.key.as_str(), "web-data.volume");
        let text = String::from_utf8(artifact.content).unwrap();
        assert!(text.contains("Driver=local"));
        assert!(text.contains("Options=type=nfs"));
        assert!(text.contains("Label=managed-by=quad-reconciler"));
    }
}
