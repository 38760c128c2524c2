//! Role and scope definitions
//!
//! Declarations only. The scope table is consumed by `access`; the
//! authority table next door is consumed by `emitter`.

use serde::{Deserialize, Serialize};

/// System actors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorRole {
    /// Originates shipments
    Sender,
    /// Sender-side manager (source-state scope)
    SenderManager,
    /// Sender-side supervisor (source-state scope)
    SenderSupervisor,
    /// Destination-side manager (destination-state scope)
    ReceiverManager,
    /// Destination warehouse manager (destination-state scope)
    WarehouseManager,
    /// Transport carrier
    Carrier,
    /// Read-only observer (corridor scope)
    Viewer,
    /// Chief operating officer (global)
    Coo,
    /// Automation (global)
    System,
    /// External regulator; snapshot-only surface
    Regulator,
}

impl ActorRole {
    /// Stable string token used on the wire and in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Sender => "SENDER",
            ActorRole::SenderManager => "SENDER_MANAGER",
            ActorRole::SenderSupervisor => "SENDER_SUPERVISOR",
            ActorRole::ReceiverManager => "RECEIVER_MANAGER",
            ActorRole::WarehouseManager => "WAREHOUSE_MANAGER",
            ActorRole::Carrier => "CARRIER",
            ActorRole::Viewer => "VIEWER",
            ActorRole::Coo => "COO",
            ActorRole::System => "SYSTEM",
            ActorRole::Regulator => "REGULATOR",
        }
    }

    /// Geographic scope for read access, if the role has one.
    ///
    /// Roles absent from this table (SENDER, CARRIER, REGULATOR) have no
    /// read-model scope: the access guard denies them, and the regulator
    /// goes through its own snapshot-only surface.
    pub fn scope(&self) -> Option<AccessScope> {
        match self {
            ActorRole::SenderManager | ActorRole::SenderSupervisor => {
                Some(AccessScope::SourceState)
            }
            ActorRole::ReceiverManager | ActorRole::WarehouseManager => {
                Some(AccessScope::DestinationState)
            }
            ActorRole::Viewer => Some(AccessScope::Corridor),
            ActorRole::Coo | ActorRole::System => Some(AccessScope::Global),
            ActorRole::Sender | ActorRole::Carrier | ActorRole::Regulator => None,
        }
    }
}

impl std::fmt::Display for ActorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geographic access scopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessScope {
    /// Shipment's source state must be in the allowed regions
    SourceState,
    /// Shipment's destination state must be in the allowed regions
    DestinationState,
    /// Shipment's corridor string must be in the allowed regions
    Corridor,
    /// Unrestricted
    Global,
}

impl AccessScope {
    /// Stable string token
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessScope::SourceState => "SOURCE_STATE",
            AccessScope::DestinationState => "DESTINATION_STATE",
            AccessScope::Corridor => "CORRIDOR",
            AccessScope::Global => "GLOBAL",
        }
    }
}

impl std::fmt::Display for AccessScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
