use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::models::{Role, User};
use crate::AppState;

/// Claims carried inside the JWT issued at login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - the user's id
    pub sub: String,
    pub username: String,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
}

/// Signing and verification keys for session tokens.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiration_seconds: u64,
}

impl JwtKeys {
    pub fn new(secret: &str, expiration_seconds: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiration_seconds,
        }
    }

    /// Issues an HS256 token for `user`.
    pub fn issue(&self, user: &User) -> ApiResult<String> {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: user.id.clone(),
            username: user.username.clone(),
            role: user.role,
            iat: now,
            exp: now.saturating_add(usize::try_from(self.expiration_seconds).unwrap_or(usize::MAX)),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("Failed to encode token: {}", e)))
    }

    pub fn verify(&self, token: &str) -> ApiResult<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Token validation failed: {}", e);
                ApiError::Unauthorized("Invalid or expired token".to_string())
            })
    }
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, cost)
}

/// Compares a plaintext password with a stored bcrypt hash.
/// A malformed hash counts as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// The authenticated caller, stored in request extensions by [`require_auth`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
    pub role: Role,
}

impl CurrentUser {
    /// Fails with `403` unless the caller's role grants `permission`.
    pub fn require(&self, permission: Permission) -> ApiResult<()> {
        if permission.allows(self.role) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "Role {} is not allowed to {}",
                self.role,
                permission.describe()
            )))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))
    }
}

/// Middleware validating a Bearer JWT in the `Authorization` header.
///
/// On success the [`CurrentUser`] is attached to the request; otherwise `401`.
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

    let claims = state.jwt.verify(token)?;
    req.extensions_mut().insert(CurrentUser {
        id: claims.sub,
        username: claims.username,
        role: claims.role,
    });

    Ok(next.run(req).await)
}

/// Actions guarded by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ManageLeads,
    ViewClients,
    ManageClients,
    ViewQuotations,
    EditQuotations,
    ApproveQuotations,
    ViewInvoices,
    ManageInvoices,
    ViewTickets,
    RaiseTickets,
    EditTickets,
    ViewDashboard,
    ListUsers,
}

impl Permission {
    pub fn allowed_roles(self) -> &'static [Role] {
        use Role::*;
        match self {
            Permission::ManageLeads => &[Admin, Manager, Exec],
            Permission::ViewClients => &[Admin, Manager, Exec, Accountant, Engineer],
            Permission::ManageClients => &[Admin, Manager, Exec],
            Permission::ViewQuotations => &[Admin, Manager, Exec, Accountant, Client],
            Permission::EditQuotations => &[Admin, Manager, Exec],
            Permission::ApproveQuotations => &[Admin, Manager],
            Permission::ViewInvoices => &[Admin, Accountant, Client],
            Permission::ManageInvoices => &[Admin, Accountant],
            Permission::ViewTickets | Permission::RaiseTickets => &[Admin, Engineer, Client],
            Permission::EditTickets => &[Admin, Engineer],
            Permission::ViewDashboard => &[Admin, Manager, Exec, Accountant, Engineer, Client],
            Permission::ListUsers => &[Admin, Manager],
        }
    }

    pub fn allows(self, role: Role) -> bool {
        self.allowed_roles().contains(&role)
    }

    fn describe(self) -> &'static str {
        match self {
            Permission::ManageLeads => "manage leads",
            Permission::ViewClients => "view clients",
            Permission::ManageClients => "manage clients",
            Permission::ViewQuotations => "view quotations",
            Permission::EditQuotations => "edit quotations",
            Permission::ApproveQuotations => "approve quotations",
            Permission::ViewInvoices => "view invoices",
            Permission::ManageInvoices => "manage invoices",
            Permission::ViewTickets => "view tickets",
            Permission::RaiseTickets => "raise tickets",
            Permission::EditTickets => "edit tickets",
            Permission::ViewDashboard => "view the dashboard",
            Permission::ListUsers => "list users",
        }
    }
}
