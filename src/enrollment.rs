//! Enrollment coordinator
//!
//! Bootstraps the `admin` identity and the derived `application` identity
//! from the certificate authority. Both steps are idempotent: a label that
//! already has stored credentials is never enrolled again. Each identity is
//! stored only after every protocol step for it has succeeded.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument};

use crate::ca::{CertificateAuthority, RegistrationRequest};
use crate::domain::{Identity, IdentityType, ADMIN_LABEL, APPLICATION_LABEL};
use crate::identity::IdentityStore;
use crate::infra::{with_deadline, EnrollmentStage, GatewayError, Result};
use crate::ledger::{LedgerNetwork, NetworkBindings};

/// Static enrollment parameters.
#[derive(Debug, Clone)]
pub struct EnrollmentSettings {
    /// Bootstrap registrar enrollment id
    pub admin_id: String,
    /// Bootstrap registrar secret
    pub admin_secret: String,
    /// Enrollment id registered for the application identity
    pub app_enrollment_id: String,
    pub affiliation: String,
    pub role: String,
    /// Deadline applied to each CA and session-open call
    pub call_timeout: Option<Duration>,
}

impl Default for EnrollmentSettings {
    fn default() -> Self {
        Self {
            admin_id: "admin".to_string(),
            admin_secret: "adminpw".to_string(),
            app_enrollment_id: "appUser".to_string(),
            affiliation: "org1.department1".to_string(),
            role: "client".to_string(),
            call_timeout: Some(Duration::from_secs(30)),
        }
    }
}

pub struct EnrollmentCoordinator {
    store: Arc<dyn IdentityStore>,
    ca: Arc<dyn CertificateAuthority>,
    network: Arc<dyn LedgerNetwork>,
    organization_id: String,
    settings: EnrollmentSettings,
}

impl EnrollmentCoordinator {
    pub fn new(
        store: Arc<dyn IdentityStore>,
        bindings: &NetworkBindings,
        settings: EnrollmentSettings,
    ) -> Self {
        Self {
            store,
            ca: Arc::clone(&bindings.ca),
            network: Arc::clone(&bindings.network),
            organization_id: bindings.organization_id.clone(),
            settings,
        }
    }

    /// Run both enrollment steps and return the application identity.
    pub async fn ensure_enrolled(&self) -> Result<Identity> {
        let admin = self.ensure_admin_enrolled().await?;
        self.ensure_application_enrolled(&admin).await
    }

    /// Enroll the bootstrap registrar unless `admin` is already stored.
    #[instrument(skip(self))]
    pub async fn ensure_admin_enrolled(&self) -> Result<Identity> {
        if let Some(existing) = self.load(ADMIN_LABEL).await? {
            return Ok(existing);
        }

        let enrollment = with_deadline(
            "admin enrollment",
            self.settings.call_timeout,
            async {
                self.ca
                    .enroll(&self.settings.admin_id, &self.settings.admin_secret)
                    .await
                    .map_err(|e| GatewayError::enrollment(EnrollmentStage::EnrollAdmin, e))
            },
        )
        .await?;

        let admin = Identity {
            label: ADMIN_LABEL.to_string(),
            identity_type: IdentityType::Admin,
            certificate: enrollment.certificate,
            private_key: enrollment.private_key,
            organization_id: self.organization_id.clone(),
        };
        self.save(&admin).await?;

        info!(msp_id = %self.organization_id, "Enrolled admin identity");
        Ok(admin)
    }

    /// Register and enroll the application identity unless it is already
    /// stored. The transient admin session is closed on every exit path.
    #[instrument(skip(self, admin))]
    pub async fn ensure_application_enrolled(&self, admin: &Identity) -> Result<Identity> {
        if let Some(existing) = self.load(APPLICATION_LABEL).await? {
            return Ok(existing);
        }

        let session = with_deadline("admin session", self.settings.call_timeout, async {
            self.network
                .connect(admin)
                .await
                .map_err(|e| GatewayError::enrollment(EnrollmentStage::OpenAdminSession, e))
        })
        .await?;

        let outcome = self.register_and_enroll(admin).await;
        session.close().await;

        let application = outcome?;
        self.save(&application).await?;

        info!(
            enrollment_id = %self.settings.app_enrollment_id,
            "Enrolled application identity"
        );
        Ok(application)
    }

    async fn register_and_enroll(&self, admin: &Identity) -> Result<Identity> {
        let request = RegistrationRequest {
            enrollment_id: self.settings.app_enrollment_id.clone(),
            affiliation: self.settings.affiliation.clone(),
            role: self.settings.role.clone(),
        };

        let secret = with_deadline("registration", self.settings.call_timeout, async {
            self.ca
                .register(admin, &request)
                .await
                .map_err(|e| GatewayError::enrollment(EnrollmentStage::Register, e))
        })
        .await?;

        let enrollment = with_deadline(
            "application enrollment",
            self.settings.call_timeout,
            async {
                self.ca
                    .enroll(&request.enrollment_id, &secret)
                    .await
                    .map_err(|e| GatewayError::enrollment(EnrollmentStage::EnrollApplication, e))
            },
        )
        .await?;

        Ok(Identity {
            label: APPLICATION_LABEL.to_string(),
            identity_type: IdentityType::Application,
            certificate: enrollment.certificate,
            private_key: enrollment.private_key,
            organization_id: self.organization_id.clone(),
        })
    }

    async fn load(&self, label: &str) -> Result<Option<Identity>> {
        self.store
            .get(label)
            .await
            .map_err(|e| GatewayError::enrollment(EnrollmentStage::LoadIdentity, e))
    }

    async fn save(&self, identity: &Identity) -> Result<()> {
        self.store
            .put(&identity.label, identity)
            .await
            .map_err(|e| GatewayError::enrollment(EnrollmentStage::StoreIdentity, e))
    }
}
