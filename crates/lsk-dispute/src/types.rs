//! Appeal types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lsk_orders::MarketError;

/// What the appeal is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppealCategory {
    /// The leased account itself misbehaved (banned, locked, wrong tier).
    ResourceFault,
    /// Disagreement over the deposit.
    DepositDispute,
    /// Tenant damaged or drained the account.
    MaliciousUse,
    /// Tenant attempted to steal the credentials.
    CredentialTheft,
    Other,
}

impl AppealCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppealCategory::ResourceFault => "resource-fault",
            AppealCategory::DepositDispute => "deposit-dispute",
            AppealCategory::MaliciousUse => "malicious-use",
            AppealCategory::CredentialTheft => "credential-theft",
            AppealCategory::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Result<Self, MarketError> {
        match s {
            "resource-fault" => Ok(AppealCategory::ResourceFault),
            "deposit-dispute" => Ok(AppealCategory::DepositDispute),
            "malicious-use" => Ok(AppealCategory::MaliciousUse),
            "credential-theft" => Ok(AppealCategory::CredentialTheft),
            "other" => Ok(AppealCategory::Other),
            other => Err(MarketError::Validation(format!(
                "invalid appeal category: {other}"
            ))),
        }
    }
}

/// The resolver's ruling. `None` on an appeal means unresolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    FavorTenant,
    FavorOwner,
    Split,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::FavorTenant => "favor-tenant",
            Verdict::FavorOwner => "favor-owner",
            Verdict::Split => "split",
        }
    }

    pub fn parse(s: &str) -> Result<Self, MarketError> {
        match s {
            "favor-tenant" => Ok(Verdict::FavorTenant),
            "favor-owner" => Ok(Verdict::FavorOwner),
            "split" => Ok(Verdict::Split),
            other => Err(MarketError::Validation(format!("invalid verdict: {other}"))),
        }
    }
}

/// A post-use claim that blocks normal resource relisting until
/// adjudicated. At most one unresolved appeal exists per order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appeal {
    pub id: i64,
    pub order_id: i64,
    /// Who raised it — the tenant or the resource owner.
    pub opened_by: i64,
    pub category: AppealCategory,
    /// Evidence references (upload URLs); storage itself is external.
    pub evidence: Vec<String>,
    pub verdict: Option<Verdict>,
    pub resolver_uid: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Appeal {
    pub fn is_resolved(&self) -> bool {
        self.verdict.is_some()
    }
}

/// Insert payload; the store assigns the id, verdict starts empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppeal {
    pub order_id: i64,
    pub opened_by: i64,
    pub category: AppealCategory,
    pub evidence: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Listing filter: an appeal is `unresolved` until a verdict lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppealState {
    Unresolved,
    Resolved,
}

impl AppealState {
    pub fn parse(s: &str) -> Result<Self, MarketError> {
        match s {
            "unresolved" => Ok(AppealState::Unresolved),
            "resolved" => Ok(AppealState::Resolved),
            other => Err(MarketError::Validation(format!(
                "invalid appeal state: {other}"
            ))),
        }
    }
}
