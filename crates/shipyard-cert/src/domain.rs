//! Per-domain renewal settings.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::authority::ResourceRegions;
use crate::error::{CertError, CertResult};

/// Resources bound to one domain's certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DomainConfig {
    /// Resource types to rebind, e.g. `clb`, `cdn`, `apigateway`.
    pub types: Vec<String>,
    /// Regions per resource type.
    pub types_regions: BTreeMap<String, Vec<String>>,
}

impl DomainConfig {
    pub fn resource_regions(&self) -> Vec<ResourceRegions> {
        self.types_regions
            .iter()
            .map(|(resource_type, regions)| ResourceRegions {
                resource_type: resource_type.clone(),
                regions: regions.clone(),
            })
            .collect()
    }
}

/// Domains to renew, keyed by domain name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct DomainSet(pub BTreeMap<String, DomainConfig>);

impl DomainSet {
    pub fn from_json(json: &str) -> CertResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> CertResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| CertError::LocalRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DomainConfig)> {
        self.0.iter().map(|(d, c)| (d.as_str(), c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_domain_payload() {
        let set = DomainSet::from_json(
            r#"{
                "example.com": {
                    "types": ["clb", "cdn"],
                    "types_regions": {"clb": ["ap-guangzhou", "ap-shanghai"]}
                },
                "api.example.com": {}
            }"#,
        )
        .unwrap();

        assert_eq!(set.len(), 2);
        let (_, cfg) = set.iter().find(|(d, _)| *d == "example.com").unwrap();
        assert_eq!(cfg.types, vec!["clb", "cdn"]);
        assert_eq!(
            cfg.resource_regions(),
            vec![ResourceRegions {
                resource_type: "clb".to_string(),
                regions: vec!["ap-guangzhou".to_string(), "ap-shanghai".to_string()],
            }]
        );

        let (_, empty) = set.iter().find(|(d, _)| *d == "api.example.com").unwrap();
        assert!(empty.types.is_empty());
        assert!(empty.resource_regions().is_empty());
    }

    #[test]
    fn rejects_non_object_payload() {
        assert!(matches!(
            DomainSet::from_json("[1, 2]"),
            Err(CertError::DomainConfig(_))
        ));
    }
}
