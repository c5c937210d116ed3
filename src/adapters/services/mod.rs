//! Services consumed by the migration but owned by the target system
//!
//! - [`Encryptor`] - opaque encryption of stored values
//! - [`InvoicePresenter`] - invoice subtotal/tax/total computation
//! - [`ModuleInstaller`] - provisioning module registration

pub mod encryption;
pub mod installer;
pub mod presenter;

pub use encryption::{AesGcmEncryptor, Encryptor};
pub use installer::{ModuleInstaller, RegistryInstaller};
pub use presenter::{InvoicePresenter, InvoiceTotals, PresentedLine, TaxPresenter, TaxRate};

use crate::config::TargetConfig;
use crate::domain::Result;
use std::sync::Arc;

/// Service handles shared by every importer
#[derive(Clone)]
pub struct MigrationServices {
    pub encryptor: Arc<dyn Encryptor>,
    pub presenter: Arc<dyn InvoicePresenter>,
    pub installer: Arc<dyn ModuleInstaller>,
}

impl MigrationServices {
    /// Default service implementations keyed from the target configuration
    pub fn from_config(target: &TargetConfig) -> Result<Self> {
        Ok(Self {
            encryptor: Arc::new(AesGcmEncryptor::new(&target.encryption_key)?),
            presenter: Arc::new(TaxPresenter::default()),
            installer: Arc::new(RegistryInstaller),
        })
    }
}
