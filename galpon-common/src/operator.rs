//! Operator identity and provider scoping
//!
//! There is no login flow; requests name their operator in the `X-Operator`
//! header and the extractor resolves it against the `operators` table. Role
//! and provider assignment then drive what the request may touch: admins are
//! unscoped, VMS operators only reach rows belonging to their own provider.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

/// Request header carrying the operator name
pub const OPERATOR_HEADER: &str = "x-operator";

/// Operator roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Operador,
    Vms,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Operador => "OPERADOR",
            Role::Vms => "VMS",
        }
    }

    pub fn parse(value: &str) -> Option<Role> {
        match value {
            "ADMIN" => Some(Role::Admin),
            "OPERADOR" => Some(Role::Operador),
            "VMS" => Some(Role::Vms),
            _ => None,
        }
    }
}

/// A resolved operator identity
#[derive(Debug, Clone, Serialize)]
pub struct Operator {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
    pub provider_id: Option<Uuid>,
}

/// Which providers' rows a request may touch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderScope {
    /// Unrestricted (admin)
    All,
    /// Only rows belonging to this provider
    Provider(Uuid),
}

impl ProviderScope {
    pub fn allows(&self, provider_id: Uuid) -> bool {
        match self {
            ProviderScope::All => true,
            ProviderScope::Provider(own) => *own == provider_id,
        }
    }

    /// Provider id to filter queries by; `None` means no filter
    pub fn filter(&self) -> Option<Uuid> {
        match self {
            ProviderScope::All => None,
            ProviderScope::Provider(id) => Some(*id),
        }
    }
}

impl Operator {
    /// Admin check for endpoints that mutate shared reference data
    pub fn require_admin(&self) -> Result<(), IdentityError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(IdentityError::Forbidden)
        }
    }

    /// Provider scope for VMS endpoints.
    ///
    /// Admins see every provider; anyone else must have a provider assigned.
    pub fn vms_scope(&self) -> Result<ProviderScope, IdentityError> {
        match (self.role, self.provider_id) {
            (Role::Admin, _) => Ok(ProviderScope::All),
            (_, Some(provider_id)) => Ok(ProviderScope::Provider(provider_id)),
            (_, None) => Err(IdentityError::NoProvider),
        }
    }

    /// Check access to a resource owned by `provider_id`
    pub fn check_provider_access(&self, provider_id: Uuid) -> Result<(), IdentityError> {
        let scope = self.vms_scope()?;
        if scope.allows(provider_id) {
            Ok(())
        } else {
            Err(IdentityError::Forbidden)
        }
    }

    /// Load an operator row by name; inactive operators resolve to `None`
    pub async fn load(pool: &SqlitePool, name: &str) -> crate::Result<Option<Operator>> {
        let row = sqlx::query(
            "SELECT id, name, role, provider_id FROM operators WHERE name = ? AND active = 1",
        )
        .bind(name)
        .fetch_optional(pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: String = row.get("id");
        let role: String = row.get("role");
        let provider_id: Option<String> = row.get("provider_id");

        let id = Uuid::parse_str(&id)
            .map_err(|e| crate::Error::Internal(format!("Invalid operator id: {}", e)))?;
        let role = Role::parse(&role)
            .ok_or_else(|| crate::Error::Internal(format!("Unknown operator role: {}", role)))?;
        let provider_id = match provider_id {
            Some(raw) => Some(
                Uuid::parse_str(&raw)
                    .map_err(|e| crate::Error::Internal(format!("Invalid provider id: {}", e)))?,
            ),
            None => None,
        };

        Ok(Some(Operator {
            id,
            name: row.get("name"),
            role,
            provider_id,
        }))
    }
}

/// Identity resolution failures, rendered in the standard error envelope
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("X-Operator header is required")]
    MissingHeader,
    #[error("Unknown or inactive operator")]
    UnknownOperator,
    #[error("Operator has no provider assigned")]
    NoProvider,
    #[error("Operator may not access this resource")]
    Forbidden,
    #[error("identity lookup failed: {0}")]
    Database(String),
}

impl IntoResponse for IdentityError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            IdentityError::MissingHeader => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "X-Operator header is required".to_string(),
            ),
            IdentityError::UnknownOperator => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Unknown or inactive operator".to_string(),
            ),
            IdentityError::NoProvider => (
                StatusCode::FORBIDDEN,
                "no_provider",
                "Operator has no provider assigned".to_string(),
            ),
            IdentityError::Forbidden => (
                StatusCode::FORBIDDEN,
                "forbidden",
                "Operator may not access this resource".to_string(),
            ),
            IdentityError::Database(msg) => {
                tracing::error!("Identity lookup failed: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Failed to resolve operator".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Operator
where
    SqlitePool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = IdentityError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let name = parts
            .headers
            .get(OPERATOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(IdentityError::MissingHeader)?;

        let pool = SqlitePool::from_ref(state);
        let operator = Operator::load(&pool, name)
            .await
            .map_err(|e| IdentityError::Database(e.to_string()))?;

        operator.ok_or(IdentityError::UnknownOperator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operator(role: Role, provider_id: Option<Uuid>) -> Operator {
        Operator {
            id: Uuid::new_v4(),
            name: "test".to_string(),
            role,
            provider_id,
        }
    }

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Admin, Role::Operador, Role::Vms] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("SUPERUSER"), None);
    }

    #[test]
    fn test_admin_scope_is_unrestricted() {
        let op = operator(Role::Admin, None);
        let scope = op.vms_scope().unwrap();
        assert_eq!(scope, ProviderScope::All);
        assert!(scope.allows(Uuid::new_v4()));
        assert_eq!(scope.filter(), None);
    }

    #[test]
    fn test_vms_operator_scoped_to_own_provider() {
        let own = Uuid::new_v4();
        let op = operator(Role::Vms, Some(own));
        let scope = op.vms_scope().unwrap();
        assert!(scope.allows(own));
        assert!(!scope.allows(Uuid::new_v4()));
        assert_eq!(scope.filter(), Some(own));
    }

    #[test]
    fn test_vms_operator_without_provider_rejected() {
        let op = operator(Role::Vms, None);
        assert!(matches!(op.vms_scope(), Err(IdentityError::NoProvider)));
    }

    #[test]
    fn test_check_provider_access() {
        let own = Uuid::new_v4();
        let other = Uuid::new_v4();
        let op = operator(Role::Vms, Some(own));
        assert!(op.check_provider_access(own).is_ok());
        assert!(matches!(
            op.check_provider_access(other),
            Err(IdentityError::Forbidden)
        ));
    }

    #[test]
    fn test_require_admin() {
        assert!(operator(Role::Admin, None).require_admin().is_ok());
        assert!(operator(Role::Operador, None).require_admin().is_err());
        assert!(operator(Role::Vms, Some(Uuid::new_v4())).require_admin().is_err());
    }
}
