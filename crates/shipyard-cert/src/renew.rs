//! Diff-and-replace renewal.

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use shipyard_core::config::CertificateConfig;

use crate::authority::{CertificateAuthority, ReplaceRequest};
use crate::domain::{DomainConfig, DomainSet};
use crate::error::{AuthorityError, CertError, CertResult};
use crate::local::{AcmeRunner, LocalStore};

/// What happened to one domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RenewOutcome {
    /// The uploaded certificate already matches the local one.
    NotRenewed { cert_id: String },
    /// The uploaded certificate was replaced and its resources rebound.
    Replaced { old_id: String },
    /// Nothing was uploaded yet; the local certificate was uploaded.
    Uploaded { cert_id: String },
}

impl fmt::Display for RenewOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenewOutcome::NotRenewed { cert_id } => write!(f, "not renewed ({cert_id})"),
            RenewOutcome::Replaced { old_id } => write!(f, "replaced {old_id}"),
            RenewOutcome::Uploaded { cert_id } => write!(f, "uploaded as {cert_id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainFailure {
    pub domain: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenewReport {
    pub outcomes: Vec<(String, RenewOutcome)>,
    pub failures: Vec<DomainFailure>,
}

impl RenewReport {
    pub fn outcome(&self, domain: &str) -> Option<&RenewOutcome> {
        self.outcomes
            .iter()
            .find(|(d, _)| d == domain)
            .map(|(_, o)| o)
    }

    pub fn into_result(self) -> CertResult<Self> {
        if self.failures.is_empty() {
            Ok(self)
        } else {
            Err(CertError::Incomplete {
                failed: self.failures.len(),
                total: self.failures.len() + self.outcomes.len(),
            })
        }
    }
}

/// Renews every configured domain against a certificate authority.
pub struct Renewer<A> {
    authority: A,
    local: LocalStore,
    acme: Option<AcmeRunner>,
}

impl<A: CertificateAuthority> Renewer<A> {
    pub fn new(authority: A, local: LocalStore) -> Self {
        Self {
            authority,
            local,
            acme: None,
        }
    }

    pub fn from_config(authority: A, config: &CertificateConfig) -> Self {
        let renewer = Self::new(authority, LocalStore::new(&config.config_home));
        if config.run_acme {
            renewer.with_acme(AcmeRunner::from_config(config))
        } else {
            renewer
        }
    }

    /// Run acme.sh before comparing certificates.
    pub fn with_acme(mut self, acme: AcmeRunner) -> Self {
        self.acme = Some(acme);
        self
    }

    pub fn authority(&self) -> &A {
        &self.authority
    }

    /// Renew each domain in turn. A failing domain is recorded and the
    /// remaining domains still run.
    pub async fn renew_all(&self, domains: &DomainSet) -> RenewReport {
        if let Some(acme) = &self.acme {
            if let Err(e) = acme.run().await {
                warn!(error = %e, "acme.sh did not run, comparing existing certificates");
            }
        }

        let mut report = RenewReport::default();
        for (domain, config) in domains.iter() {
            info!(%domain, "handling domain");
            match self.renew_domain(domain, config).await {
                Ok(outcome) => {
                    info!(%domain, %outcome, "domain handled");
                    report.outcomes.push((domain.to_string(), outcome));
                }
                Err(e) => {
                    warn!(%domain, error = %e, "domain renewal failed");
                    report.failures.push(DomainFailure {
                        domain: domain.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }
        report
    }

    pub async fn renew_domain(&self, domain: &str, config: &DomainConfig) -> CertResult<RenewOutcome> {
        let local = self.local.read(domain).await?;
        let remote_err = |source: AuthorityError| CertError::Authority {
            domain: domain.to_string(),
            source,
        };

        let Some(cert_id) = self.authority.search_latest(domain).await.map_err(remote_err)? else {
            let cert_id = self
                .authority
                .upload(&local.private_key, &local.public_cert())
                .await
                .map_err(remote_err)?;
            info!(%domain, %cert_id, "uploaded first certificate");
            return Ok(RenewOutcome::Uploaded { cert_id });
        };
        info!(%domain, %cert_id, "latest uploaded certificate");

        let online = self
            .authority
            .download(&cert_id, domain)
            .await
            .map_err(remote_err)?;
        if local.matches(&online) {
            return Ok(RenewOutcome::NotRenewed { cert_id });
        }

        let public_cert = local.public_cert();
        let request = ReplaceRequest {
            old_id: cert_id.clone(),
            resource_types: config.types.clone(),
            resource_regions: config.resource_regions(),
            private_key: local.private_key,
            public_cert,
        };
        self.authority.replace(&request).await.map_err(remote_err)?;
        info!(%domain, old_id = %cert_id, "replaced certificate");
        Ok(RenewOutcome::Replaced { old_id: cert_id })
    }
}
