//! Certificates issued on local disk by acme.sh.
//!
//! Layout under the acme.sh config home:
//!
//! ```text
//! <config_home>/<domain>_ecc/fullchain.cer
//! <config_home>/<domain>_ecc/<domain>.key
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use tokio::process::Command;
use tracing::{debug, info, warn};

use shipyard_core::config::CertificateConfig;

use crate::error::{CertError, CertResult};

/// A locally issued certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalCertificate {
    pub private_key: String,
    /// `fullchain.cer` exactly as it is on disk.
    pub chain: Vec<u8>,
}

impl LocalCertificate {
    /// Whether `remote` holds exactly the same certificate chain, byte for byte.
    pub fn matches(&self, remote: &[u8]) -> bool {
        self.chain == remote
    }

    /// The chain as PEM text for upload.
    pub fn public_cert(&self) -> String {
        String::from_utf8_lossy(&self.chain).into_owned()
    }
}

/// Reads certificates from an acme.sh config home.
#[derive(Debug, Clone)]
pub struct LocalStore {
    config_home: PathBuf,
}

impl LocalStore {
    pub fn new(config_home: impl Into<PathBuf>) -> Self {
        Self {
            config_home: config_home.into(),
        }
    }

    pub fn config_home(&self) -> &Path {
        &self.config_home
    }

    pub fn domain_dir(&self, domain: &str) -> PathBuf {
        self.config_home.join(format!("{domain}_ecc"))
    }

    pub fn fullchain_path(&self, domain: &str) -> PathBuf {
        self.domain_dir(domain).join("fullchain.cer")
    }

    pub fn key_path(&self, domain: &str) -> PathBuf {
        self.domain_dir(domain).join(format!("{domain}.key"))
    }

    pub async fn read(&self, domain: &str) -> CertResult<LocalCertificate> {
        let chain_path = self.fullchain_path(domain);
        let chain = tokio::fs::read(&chain_path)
            .await
            .map_err(|source| local_read(&chain_path, source))?;
        let key_path = self.key_path(domain);
        let private_key = tokio::fs::read_to_string(&key_path)
            .await
            .map_err(|source| local_read(&key_path, source))?;
        Ok(LocalCertificate { private_key, chain })
    }
}

fn local_read(path: &Path, source: std::io::Error) -> CertError {
    CertError::LocalRead {
        path: path.to_path_buf(),
        source,
    }
}

/// Runs `acme.sh --cron` to renew every certificate it manages.
#[derive(Debug, Clone)]
pub struct AcmeRunner {
    acme_home: PathBuf,
    config_home: PathBuf,
}

impl AcmeRunner {
    pub fn new(acme_home: impl Into<PathBuf>, config_home: impl Into<PathBuf>) -> Self {
        Self {
            acme_home: acme_home.into(),
            config_home: config_home.into(),
        }
    }

    pub fn from_config(config: &CertificateConfig) -> Self {
        Self::new(&config.acme_home, &config.config_home)
    }

    pub fn script(&self) -> PathBuf {
        self.acme_home.join("acme.sh")
    }

    /// Run the renewal cron once.
    ///
    /// A non-zero exit is logged and returned; only a failure to start the
    /// script is an error.
    pub async fn run(&self) -> CertResult<ExitStatus> {
        let script = self.script();
        let mut cmd = Command::new(&script);
        cmd.arg("--cron")
            .arg("--home")
            .arg(&self.acme_home)
            .arg("--config-home")
            .arg(&self.config_home);

        debug!("Running: {:?}", cmd);

        let output = cmd.output().await.map_err(|source| CertError::Acme {
            path: script.clone(),
            source,
        })?;

        if output.status.success() {
            info!(script = %script.display(), "acme.sh renewal finished");
        } else {
            warn!(
                script = %script.display(),
                code = output.status.code().unwrap_or(-1),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "acme.sh renewal exited with an error, continuing"
            );
        }
        Ok(output.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_follows_acme_convention() {
        let store = LocalStore::new("/mnt/etc/acme.sh");
        assert_eq!(
            store.fullchain_path("example.com"),
            PathBuf::from("/mnt/etc/acme.sh/example.com_ecc/fullchain.cer")
        );
        assert_eq!(
            store.key_path("example.com"),
            PathBuf::from("/mnt/etc/acme.sh/example.com_ecc/example.com.key")
        );
    }

    #[tokio::test]
    async fn reads_key_and_chain() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        std::fs::create_dir_all(store.domain_dir("a.test")).unwrap();
        std::fs::write(store.fullchain_path("a.test"), "CHAIN").unwrap();
        std::fs::write(store.key_path("a.test"), "KEY").unwrap();

        let cert = store.read("a.test").await.unwrap();
        assert_eq!(cert.chain, b"CHAIN");
        assert_eq!(cert.public_cert(), "CHAIN");
        assert_eq!(cert.private_key, "KEY");
        assert!(cert.matches(b"CHAIN"));
        assert!(!cert.matches(b"CHAIN\n"));
    }

    #[tokio::test]
    async fn chain_is_read_as_raw_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        std::fs::create_dir_all(store.domain_dir("a.test")).unwrap();
        std::fs::write(store.fullchain_path("a.test"), [0xff, 0xfe, b'C']).unwrap();
        std::fs::write(store.key_path("a.test"), "KEY").unwrap();

        let cert = store.read("a.test").await.unwrap();
        assert!(cert.matches(&[0xff, 0xfe, b'C']));
        assert!(!cert.matches(b"C"));
    }

    #[tokio::test]
    async fn missing_certificate_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        let err = store.read("missing.test").await.unwrap_err();
        match err {
            CertError::LocalRead { path, .. } => {
                assert!(path.ends_with("missing.test_ecc/fullchain.cer"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_acme_script_fails_to_start() {
        let dir = tempfile::tempdir().unwrap();
        let runner = AcmeRunner::new(dir.path().join("nope"), dir.path());
        assert!(matches!(runner.run().await, Err(CertError::Acme { .. })));
    }
}
