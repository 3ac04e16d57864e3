//! # Tenant Isolation Guard
//!
//! Pure decision functions over the acting identity and a resource's tenant.
//!
//! - A superuser may read every tenant and may never write.
//! - A tenant actor reads and writes only its own tenant's records.
//! - An actor without a tenant may neither read nor write tenant data.
//! - Records without a tenant are system/global and immutable to everyone.
//!
//! Every rejected mutation is logged as a named violation before the error
//! is returned. Lookups of records outside the actor's filter report
//! `NotFound`, never `Forbidden`, so existence does not leak across tenants.

use crate::{OkrError, TenantId};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// IDENTITY
// =============================================================================

/// The three-valued tenant identity of an actor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantIdentity {
    /// Cross-tenant, read-only.
    Superuser,
    /// Scoped to exactly one tenant.
    Tenant(TenantId),
    /// Authenticated but not a member of any tenant.
    NoTenant,
}

impl TenantIdentity {
    /// Build an identity from raw request claims.
    ///
    /// The superuser flag wins over any tenant claim. An absent or blank
    /// tenant claim means "no tenant".
    #[must_use]
    pub fn from_claims(tenant: Option<&str>, superuser: bool) -> Self {
        if superuser {
            return TenantIdentity::Superuser;
        }
        match tenant.map(str::trim) {
            Some(t) if !t.is_empty() => TenantIdentity::Tenant(TenantId::new(t)),
            _ => TenantIdentity::NoTenant,
        }
    }

    /// The tenant this actor is scoped to, if any.
    #[must_use]
    pub fn tenant_id(&self) -> Option<&TenantId> {
        match self {
            TenantIdentity::Tenant(id) => Some(id),
            TenantIdentity::Superuser | TenantIdentity::NoTenant => None,
        }
    }

    #[must_use]
    pub fn is_superuser(&self) -> bool {
        matches!(self, TenantIdentity::Superuser)
    }
}

impl fmt::Display for TenantIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TenantIdentity::Superuser => f.write_str("superuser"),
            TenantIdentity::Tenant(id) => write!(f, "tenant:{}", id),
            TenantIdentity::NoTenant => f.write_str("no-tenant"),
        }
    }
}

// =============================================================================
// VIOLATIONS
// =============================================================================

/// Named isolation violations, emitted for downstream monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TenantViolation {
    CrossTenantAccess,
    SuperuserMutation,
    NoTenantMutation,
    GlobalResourceMutation,
}

impl TenantViolation {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantViolation::CrossTenantAccess => "CROSS_TENANT_ACCESS",
            TenantViolation::SuperuserMutation => "SUPERUSER_MUTATION",
            TenantViolation::NoTenantMutation => "NO_TENANT_MUTATION",
            TenantViolation::GlobalResourceMutation => "GLOBAL_RESOURCE_MUTATION",
        }
    }
}

impl fmt::Display for TenantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// READ FILTER
// =============================================================================

/// Read filter derived from an actor's identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantFilter {
    /// No restriction (superuser).
    All,
    /// Only records of this tenant.
    Tenant(TenantId),
    /// Matches nothing (actor without a tenant).
    Empty,
}

impl TenantFilter {
    /// Apply the filter to a single record's tenant.
    #[must_use]
    pub fn admits(&self, resource_tenant: Option<&TenantId>) -> bool {
        match self {
            TenantFilter::All => true,
            TenantFilter::Tenant(id) => resource_tenant == Some(id),
            TenantFilter::Empty => false,
        }
    }

    /// `true` when the filter can never match.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, TenantFilter::Empty)
    }
}

// =============================================================================
// GUARD
// =============================================================================

/// Tenant isolation checks. Stateless.
pub struct TenantGuard;

impl TenantGuard {
    /// Reject actors that may never write: superusers and tenant-less actors.
    pub fn assert_can_mutate(actor: &TenantIdentity) -> Result<(), OkrError> {
        match actor {
            TenantIdentity::Tenant(_) => Ok(()),
            TenantIdentity::Superuser => Err(Self::reject(
                TenantViolation::SuperuserMutation,
                actor,
                None,
                "superuser identity is read-only",
            )),
            TenantIdentity::NoTenant => Err(Self::reject(
                TenantViolation::NoTenantMutation,
                actor,
                None,
                "actor has no tenant",
            )),
        }
    }

    /// Require the resource to belong to the actor's tenant.
    ///
    /// Global records (no tenant) are rejected for every actor, superusers
    /// included.
    pub fn assert_same_tenant(
        resource_tenant: Option<&TenantId>,
        actor: &TenantIdentity,
    ) -> Result<(), OkrError> {
        let Some(resource) = resource_tenant else {
            return Err(Self::reject(
                TenantViolation::GlobalResourceMutation,
                actor,
                None,
                "system resources are immutable",
            ));
        };
        match actor {
            TenantIdentity::Tenant(own) if own == resource => Ok(()),
            _ => Err(Self::reject(
                TenantViolation::CrossTenantAccess,
                actor,
                Some(resource),
                "resource belongs to another tenant",
            )),
        }
    }

    /// Build the read filter for an actor.
    #[must_use]
    pub fn build_tenant_filter(actor: &TenantIdentity) -> TenantFilter {
        match actor {
            TenantIdentity::Superuser => TenantFilter::All,
            TenantIdentity::Tenant(id) => TenantFilter::Tenant(id.clone()),
            TenantIdentity::NoTenant => TenantFilter::Empty,
        }
    }

    /// Visibility check for point lookups.
    ///
    /// Returns `NotFound` naming `what` when the actor's filter does not admit
    /// the record.
    pub fn ensure_visible(
        resource_tenant: Option<&TenantId>,
        actor: &TenantIdentity,
        what: &str,
    ) -> Result<(), OkrError> {
        if Self::build_tenant_filter(actor).admits(resource_tenant) {
            Ok(())
        } else {
            Err(OkrError::NotFound(what.to_string()))
        }
    }

    fn reject(
        violation: TenantViolation,
        actor: &TenantIdentity,
        resource_tenant: Option<&TenantId>,
        reason: &str,
    ) -> OkrError {
        tracing::warn!(
            target: "okr_core::tenant",
            violation = violation.as_str(),
            actor = %actor,
            resource_tenant = resource_tenant.map_or("<global>", TenantId::as_str),
            "tenant isolation violation: {}",
            reason
        );
        OkrError::Forbidden(format!("{}: {}", violation, reason))
    }
}

// =============================================================================
// TESTS
// =============================================================================
