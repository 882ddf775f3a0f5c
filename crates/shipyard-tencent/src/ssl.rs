//! SSL certificate service as a [`CertificateAuthority`].

use std::io::{Cursor, Read};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::{Value, json};

use shipyard_cert::{AuthorityError, CertificateAuthority, ReplaceRequest};

use crate::client::{Service, TencentClient};
use crate::error::{TencentError, TencentResult};

#[derive(Debug, Clone)]
pub struct SslAuthority {
    client: TencentClient,
}

impl SslAuthority {
    pub fn new(client: TencentClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CertificateList {
    #[serde(default)]
    certificates: Vec<CertificateSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CertificateSummary {
    certificate_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DownloadedCertificate {
    content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct UploadedCertificate {
    certificate_id: String,
}

#[derive(Debug, Deserialize)]
struct Empty {}

/// Body of `UpdateCertificateInstance`.
pub fn update_instance_request(request: &ReplaceRequest) -> Value {
    let regions: Vec<Value> = request
        .resource_regions
        .iter()
        .map(|r| json!({ "ResourceType": r.resource_type, "Regions": r.regions }))
        .collect();
    json!({
        "OldCertificateId": request.old_id,
        "ResourceTypes": request.resource_types,
        "ResourceTypesRegions": regions,
        "CertificatePublicKey": request.public_cert,
        "CertificatePrivateKey": request.private_key,
        "ExpiringNotificationSwitch": 1,
        "Repeatable": false,
        "AllowDownload": true,
    })
}

/// Pull `<domain>.pem` out of a base64 encoded certificate bundle.
pub fn extract_pem(content: &str, domain: &str) -> TencentResult<Vec<u8>> {
    let bundle = STANDARD
        .decode(content.trim())
        .map_err(|e| TencentError::Malformed(format!("certificate bundle is not base64: {e}")))?;
    let mut archive = zip::ZipArchive::new(Cursor::new(bundle))
        .map_err(|e| TencentError::Malformed(format!("certificate bundle is not a zip: {e}")))?;

    let name = format!("{domain}.pem");
    let mut entry = archive
        .by_name(&name)
        .map_err(|e| TencentError::Malformed(format!("{name} not in certificate bundle: {e}")))?;
    let mut pem = Vec::new();
    entry
        .read_to_end(&mut pem)
        .map_err(|e| TencentError::Malformed(format!("failed to read {name}: {e}")))?;
    Ok(pem)
}

impl CertificateAuthority for SslAuthority {
    async fn search_latest(&self, domain: &str) -> Result<Option<String>, AuthorityError> {
        let list: CertificateList = self
            .client
            .call(
                Service::SSL,
                "DescribeCertificates",
                &json!({
                    "SearchKey": domain,
                    "ExpirationSort": "DESC",
                    "FilterSource": "upload",
                }),
            )
            .await?;
        Ok(list.certificates.into_iter().next().map(|c| c.certificate_id))
    }

    async fn download(&self, cert_id: &str, domain: &str) -> Result<Vec<u8>, AuthorityError> {
        let downloaded: DownloadedCertificate = self
            .client
            .call(
                Service::SSL,
                "DownloadCertificate",
                &json!({ "CertificateId": cert_id }),
            )
            .await?;
        Ok(extract_pem(&downloaded.content, domain)?)
    }

    async fn upload(&self, private_key: &str, public_cert: &str) -> Result<String, AuthorityError> {
        let uploaded: UploadedCertificate = self
            .client
            .call(
                Service::SSL,
                "UploadCertificate",
                &json!({
                    "CertificatePublicKey": public_cert,
                    "CertificatePrivateKey": private_key,
                }),
            )
            .await?;
        Ok(uploaded.certificate_id)
    }

    async fn replace(&self, request: &ReplaceRequest) -> Result<(), AuthorityError> {
        let _: Empty = self
            .client
            .call(
                Service::SSL,
                "UpdateCertificateInstance",
                &update_instance_request(request),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use shipyard_cert::ResourceRegions;

    use super::*;

    fn bundle(entries: &[(&str, &str)]) -> String {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            for (name, body) in entries {
                writer
                    .start_file(*name, zip::write::FileOptions::default())
                    .unwrap();
                writer.write_all(body.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }
        STANDARD.encode(buf.into_inner())
    }

    #[test]
    fn extracts_domain_pem_from_bundle() {
        let content = bundle(&[
            ("example.com.key", "KEY"),
            ("example.com.pem", "CHAIN"),
        ]);
        assert_eq!(extract_pem(&content, "example.com").unwrap(), b"CHAIN");
    }

    #[test]
    fn missing_pem_is_malformed() {
        let content = bundle(&[("other.pem", "CHAIN")]);
        assert!(matches!(
            extract_pem(&content, "example.com"),
            Err(TencentError::Malformed(_))
        ));
    }

    #[test]
    fn replace_request_keeps_bindings_and_flags() {
        let request = ReplaceRequest {
            old_id: "cert-a".to_string(),
            resource_types: vec!["clb".to_string()],
            resource_regions: vec![ResourceRegions {
                resource_type: "clb".to_string(),
                regions: vec!["ap-guangzhou".to_string()],
            }],
            private_key: "KEY".to_string(),
            public_cert: "CHAIN".to_string(),
        };
        let body = update_instance_request(&request);
        assert_eq!(body["OldCertificateId"], "cert-a");
        assert_eq!(
            body["ResourceTypesRegions"],
            json!([{ "ResourceType": "clb", "Regions": ["ap-guangzhou"] }])
        );
        assert_eq!(body["ExpiringNotificationSwitch"], 1);
        assert_eq!(body["Repeatable"], false);
        assert_eq!(body["AllowDownload"], true);
    }
}
