//! # Network Unit Generation

use crate::artifact::{Artifact, UnitKey, UnitType};
use crate::compose::NetworkDef;
use crate::generator::env::{resolve_labels, sorted_map};
use crate::generator::ini::IniDocument;

#[must_use]
pub fn generate(project_name: &str, network_name: &str, network: &NetworkDef, managed_by: &str) -> Artifact {
    let mut doc = IniDocument::new();
    doc.section("Unit").entry("Description", format!("{project_name}-{network_name} network"));

    doc.section("Network");
    if let Some(driver) = &network.driver {
        doc.entry("Driver", driver);
    }
    if network.internal {
        doc.entry("Internal", "true");
    }
    if network.enable_ipv6 {
        doc.entry("IPv6", "true");
    }
    if let Some(ipam) = &network.ipam {
        if let Some(driver) = &ipam.driver {
            doc.entry("IPAMDriver", driver);
        }
        for config in &ipam.config {
            for (k, v) in sorted_map(config) {
                doc.entry("IPAMConfig", format!("{k}={v}"));
            }
        }
    }
    for (k, v) in sorted_map(&network.options) {
        doc.entry("Options", format!("{k}={v}"));
    }
    for (k, v) in resolve_labels(&network.labels, managed_by) {
        doc.entry("Label", format!("{k}={v}"));
    }

    doc.section("Install").entry("WantedBy", "multi-user.target");

    let key = UnitKey::new(&format!("{project_name}-{network_name}"), UnitType::Network);
    Artifact::new(key, doc.render().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_network_unit_with_ipam() {
        let network = NetworkDef { internal: true, enable_ipv6: true, ..Default::default() };
        let artifact = generate("web", "default", &network, "quad-reconciler");
        assert_eq!(artifact.key.as_str(), "web-default.network");
        let text = String::from_utf8(artifact.content).unwrap();
        assert!(text.contains("Internal=true"));
        assert!(text.contains("IPv6=true"));
    }
}
