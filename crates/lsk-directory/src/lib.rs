//! Resource directory — the leasable-resource collaborator.
//!
//! The lease engine consumes, but does not own, the catalog of leasable
//! resources. What it needs from a resource is narrow: who owns it, whether
//! it can be leased right now, what it costs, and (for the active tenant's
//! read path) the encrypted credential blobs. Everything else about the
//! catalog lives elsewhere.
//!
//! # Availability contract
//!
//! The availability flag is owned exclusively by the order engine. External
//! readers may read it; they must not write it. The engine preserves:
//! `in-use` exactly while an order on the resource is `active`; `listed`
//! only on closure without a pending appeal; `delisted` only on appeal
//! resolution.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

// ---------------------------------------------------------------------------
// Availability
// ---------------------------------------------------------------------------

/// Tri-state availability flag on a leasable resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Availability {
    /// Bookable.
    Listed,
    /// Withdrawn from the catalog (operator action or appeal resolution).
    Delisted,
    /// An active lease holds the resource.
    InUse,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Listed => "listed",
            Availability::Delisted => "delisted",
            Availability::InUse => "in-use",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DirectoryError> {
        match s {
            "listed" => Ok(Availability::Listed),
            "delisted" => Ok(Availability::Delisted),
            "in-use" => Ok(Availability::InUse),
            other => Err(DirectoryError::Invalid(format!(
                "invalid availability: {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Pricing
// ---------------------------------------------------------------------------

/// Tiered pricing for a resource. All amounts are integer cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTiers {
    /// Rate per 30-minute block, applied pro rata to minute leases.
    pub per_half_hour_cents: i64,
    /// Rate per whole hour.
    pub per_hour_cents: i64,
    /// Flat rate for an overnight lease (ends 08:00 the next day).
    pub overnight_cents: i64,
    /// Deposit charged on top of rent, settled outside this engine.
    pub deposit_cents: i64,
}

// ---------------------------------------------------------------------------
// ResourceRecord
// ---------------------------------------------------------------------------

/// The slice of a catalog record the lease engine reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: i64,
    pub owner_uid: i64,
    pub availability: Availability,
    pub pricing: PricingTiers,
    /// Encrypted login name, decrypted only for the active tenant.
    pub login_enc: Option<String>,
    /// Encrypted secret, decrypted only for the active tenant.
    pub secret_enc: Option<String>,
}

// ---------------------------------------------------------------------------
// DirectoryError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// The resource does not exist.
    NotFound(i64),
    /// Malformed stored data (bad availability string, undecryptable blob).
    Invalid(String),
    /// The directory backend could not be reached.
    Unavailable(String),
}

impl std::fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DirectoryError::NotFound(id) => write!(f, "resource {id} not found"),
            DirectoryError::Invalid(msg) => write!(f, "invalid directory data: {msg}"),
            DirectoryError::Unavailable(msg) => write!(f, "resource directory unavailable: {msg}"),
        }
    }
}

impl std::error::Error for DirectoryError {}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Read/write access to leasable-resource records.
#[async_trait]
pub trait ResourceDirectory: Send + Sync {
    async fn get(&self, resource_id: i64) -> Result<Option<ResourceRecord>, DirectoryError>;

    /// Write the availability flag. Only the order engine calls this.
    async fn set_availability(
        &self,
        resource_id: i64,
        flag: Availability,
    ) -> Result<(), DirectoryError>;

    /// Resource ids owned by `owner_uid` (the owner-side order listing).
    async fn list_owned(&self, owner_uid: i64) -> Result<Vec<i64>, DirectoryError>;
}

/// Decrypts leased-resource secrets. Real key management is an external
/// collaborator; the engine only ever asks for a decrypt bound to one
/// resource id.
#[async_trait]
pub trait CredentialVault: Send + Sync {
    async fn decrypt(&self, blob: &str, resource_id: i64) -> Result<String, DirectoryError>;
}

// ---------------------------------------------------------------------------
// MemoryDirectory
// ---------------------------------------------------------------------------

/// In-memory directory for tests and single-node runs.
#[derive(Default)]
pub struct MemoryDirectory {
    resources: Mutex<BTreeMap<i64, ResourceRecord>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or replace a record.
    pub async fn put(&self, record: ResourceRecord) {
        self.resources.lock().await.insert(record.id, record);
    }
}

#[async_trait]
impl ResourceDirectory for MemoryDirectory {
    async fn get(&self, resource_id: i64) -> Result<Option<ResourceRecord>, DirectoryError> {
        Ok(self.resources.lock().await.get(&resource_id).cloned())
    }

    async fn set_availability(
        &self,
        resource_id: i64,
        flag: Availability,
    ) -> Result<(), DirectoryError> {
        let mut resources = self.resources.lock().await;
        let record = resources
            .get_mut(&resource_id)
            .ok_or(DirectoryError::NotFound(resource_id))?;
        record.availability = flag;
        Ok(())
    }

    async fn list_owned(&self, owner_uid: i64) -> Result<Vec<i64>, DirectoryError> {
        Ok(self
            .resources
            .lock()
            .await
            .values()
            .filter(|r| r.owner_uid == owner_uid)
            .map(|r| r.id)
            .collect())
    }
}

// ---------------------------------------------------------------------------
// DevVault
// ---------------------------------------------------------------------------

/// Development stand-in for the credential vault.
///
/// Blobs have the shape `enc:{resource_id}:{plaintext}`; the resource id in
/// the blob must match the id the caller is decrypting for, which mirrors
/// the binding the real vault enforces.
#[derive(Default)]
pub struct DevVault;

impl DevVault {
    pub fn new() -> Self {
        Self
    }

    /// Produce a blob that [`decrypt`][CredentialVault::decrypt] accepts.
    pub fn seal(plaintext: &str, resource_id: i64) -> String {
        format!("enc:{resource_id}:{plaintext}")
    }
}

#[async_trait]
impl CredentialVault for DevVault {
    async fn decrypt(&self, blob: &str, resource_id: i64) -> Result<String, DirectoryError> {
        let rest = blob
            .strip_prefix("enc:")
            .ok_or_else(|| DirectoryError::Invalid("not a sealed blob".to_string()))?;
        let (id_part, plaintext) = rest
            .split_once(':')
            .ok_or_else(|| DirectoryError::Invalid("malformed sealed blob".to_string()))?;
        let bound_id: i64 = id_part
            .parse()
            .map_err(|_| DirectoryError::Invalid("malformed resource binding".to_string()))?;
        if bound_id != resource_id {
            return Err(DirectoryError::Invalid(format!(
                "blob bound to resource {bound_id}, not {resource_id}"
            )));
        }
        Ok(plaintext.to_string())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
