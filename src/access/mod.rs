//! Geo-RBAC access decisions
//!
//! The single entrypoint for role + geography authorization over read
//! models. Pure function: no I/O, no mutation, deterministic. Denials carry
//! a structured reason code and never shipment content.

pub mod audit;

use serde::{Deserialize, Serialize};

use crate::lifecycle::{AccessScope, ActorRole};
use crate::projection::ShipmentRow;

/// Closed set of denial reason codes
///
/// These are the only strings an audit trail may carry; shipment payloads
/// never appear beside them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenialReason {
    /// The role has no read-model scope
    RoleUnknown,
    /// The caller supplied no allowed regions
    RegionListEmpty,
    /// The shipment has no resolved geography for the scope
    MissingGeoData,
    /// The shipment's geography is outside the allowed regions
    GeoScopeMismatch,
    /// The role's scope is not recognized
    ScopeUnknown,
}

impl DenialReason {
    /// Stable string token
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::RoleUnknown => "ROLE_UNKNOWN",
            DenialReason::RegionListEmpty => "REGION_LIST_EMPTY",
            DenialReason::MissingGeoData => "MISSING_GEO_DATA",
            DenialReason::GeoScopeMismatch => "GEO_SCOPE_MISMATCH",
            DenialReason::ScopeUnknown => "SCOPE_UNKNOWN",
        }
    }
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an access check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDecision {
    /// True when access is allowed
    pub allowed: bool,
    /// Present exactly when denied
    pub denial_reason: Option<DenialReason>,
}

impl AccessDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            denial_reason: None,
        }
    }

    fn deny(reason: DenialReason) -> Self {
        Self {
            allowed: false,
            denial_reason: Some(reason),
        }
    }
}

/// Decide whether `role` may see `shipment`.
///
/// Rule ladder:
/// - SYSTEM and COO: always allowed
/// - VIEWER: allowed (read-only, unrestricted)
/// - roles without a scope: denied `ROLE_UNKNOWN`
/// - GLOBAL scope: allowed
/// - empty or missing region list: denied `REGION_LIST_EMPTY`
/// - scoped roles: the shipment's source state / destination state /
///   corridor must be present and inside `allowed_regions`
pub fn check(
    role: ActorRole,
    shipment: &ShipmentRow,
    allowed_regions: Option<&[String]>,
) -> AccessDecision {
    if matches!(role, ActorRole::System | ActorRole::Coo) {
        return AccessDecision::allow();
    }
    if role == ActorRole::Viewer {
        return AccessDecision::allow();
    }

    let scope = match role.scope() {
        Some(scope) => scope,
        None => return AccessDecision::deny(DenialReason::RoleUnknown),
    };

    if scope == AccessScope::Global {
        return AccessDecision::allow();
    }

    let regions = match allowed_regions {
        Some(regions) if !regions.is_empty() => regions,
        _ => return AccessDecision::deny(DenialReason::RegionListEmpty),
    };

    let subject = match scope {
        AccessScope::SourceState => shipment.source_state.as_deref(),
        AccessScope::DestinationState => shipment.destination_state.as_deref(),
        AccessScope::Corridor => shipment.corridor.as_deref(),
        // Handled above; kept total for the closed enum
        AccessScope::Global => return AccessDecision::allow(),
    };

    match subject {
        None => AccessDecision::deny(DenialReason::MissingGeoData),
        Some(value) if value.trim().is_empty() => {
            AccessDecision::deny(DenialReason::MissingGeoData)
        }
        Some(value) => {
            if regions.iter().any(|r| r == value) {
                AccessDecision::allow()
            } else {
                AccessDecision::deny(DenialReason::GeoScopeMismatch)
            }
        }
    }
}
