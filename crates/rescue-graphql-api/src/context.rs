//! # API Context
//!
//! Application state and per-request identity facts for GraphQL resolvers.
//!
//! The gateway owns authentication; by the time a resolver runs, identity
//! and role are already-validated facts carried in [`CallerIdentity`]. The
//! engine itself never re-derives who is calling.

use axum::http::HeaderMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::schema::{AlertEvent, DriverLocationEvent};
use rescue_dispatch::DispatchEngine;

/// Broadcast channel capacity
const CHANNEL_CAPACITY: usize = 1024;

/// Application context shared across all GraphQL resolvers
#[derive(Clone)]
pub struct ApiContext {
    /// The dispatch engine
    pub engine: DispatchEngine,

    /// Alert lifecycle event broadcaster
    pub alert_tx: broadcast::Sender<AlertEvent>,

    /// Driver location update broadcaster
    pub location_tx: broadcast::Sender<DriverLocationEvent>,
}

impl ApiContext {
    /// Create a new API context around an engine
    pub fn new(engine: DispatchEngine) -> Self {
        let (alert_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (location_tx, _) = broadcast::channel(CHANNEL_CAPACITY);

        Self {
            engine,
            alert_tx,
            location_tx,
        }
    }
}

// =============================================================================
// CALLER IDENTITY
// =============================================================================

/// Role resolved by the authentication collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    /// Ordinary reporting user
    #[default]
    Reporter,
    /// Ambulance driver
    Driver,
    /// Privileged dispatcher/administrator
    Admin,
}

/// Already-validated identity facts for one request.
///
/// Extracted from the `x-caller-id` / `x-caller-role` headers, which stand
/// in for the external session layer in this deployment.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallerIdentity {
    pub caller_id: Option<Uuid>,
    pub role: Role,
}

impl CallerIdentity {
    /// Parse identity headers; absent or malformed headers yield an
    /// anonymous reporter.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let caller_id = headers
            .get("x-caller-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok());

        let role = headers
            .get("x-caller-role")
            .and_then(|v| v.to_str().ok())
            .map(|s| match s.to_ascii_lowercase().as_str() {
                "admin" => Role::Admin,
                "driver" => Role::Driver,
                _ => Role::Reporter,
            })
            .unwrap_or_default();

        Self { caller_id, role }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Any identified caller, whatever the role.
    pub fn require_authenticated(&self) -> ApiResult<Uuid> {
        self.caller_id
            .ok_or_else(|| ApiError::Unauthorized("caller identity required".to_string()))
    }

    /// Privileged operations: verify, dispatch, administrative resolve.
    pub fn require_admin(&self) -> ApiResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Unauthorized(
                "privileged caller required".to_string(),
            ))
        }
    }

    /// Driver operations must be performed by that driver (admins may act
    /// on a driver's behalf for operational cleanup).
    pub fn require_driver(&self, driver_id: Uuid) -> ApiResult<()> {
        if self.is_admin() {
            return Ok(());
        }
        if self.role == Role::Driver && self.caller_id == Some(driver_id) {
            return Ok(());
        }
        Err(ApiError::Unauthorized(
            "caller is not this driver".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(id: Option<Uuid>, role: Option<&str>) -> HeaderMap {
        let mut map = HeaderMap::new();
        if let Some(id) = id {
            map.insert("x-caller-id", HeaderValue::from_str(&id.to_string()).unwrap());
        }
        if let Some(role) = role {
            map.insert("x-caller-role", HeaderValue::from_str(role).unwrap());
        }
        map
    }

    #[test]
    fn test_missing_headers_are_anonymous() {
        let identity = CallerIdentity::from_headers(&HeaderMap::new());
        assert!(identity.caller_id.is_none());
        assert_eq!(identity.role, Role::Reporter);
        assert!(identity.require_authenticated().is_err());
    }

    #[test]
    fn test_role_parsing() {
        let id = Uuid::new_v4();
        let identity = CallerIdentity::from_headers(&headers(Some(id), Some("ADMIN")));
        assert!(identity.is_admin());
        assert!(identity.require_admin().is_ok());

        let identity = CallerIdentity::from_headers(&headers(Some(id), Some("driver")));
        assert_eq!(identity.role, Role::Driver);
        assert!(identity.require_driver(id).is_ok());
        assert!(identity.require_driver(Uuid::new_v4()).is_err());

        let identity = CallerIdentity::from_headers(&headers(Some(id), Some("nonsense")));
        assert_eq!(identity.role, Role::Reporter);
    }

    #[test]
    fn test_admin_may_act_for_any_driver() {
        let identity = CallerIdentity::from_headers(&headers(Some(Uuid::new_v4()), Some("admin")));
        assert!(identity.require_driver(Uuid::new_v4()).is_ok());
    }
}
