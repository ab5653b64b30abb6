//! Request identity.
//!
//! The server does not authenticate end users itself. An upstream gateway does that and forwards the result in two
//! headers (names are configurable, see [`IdentityConfig`]):
//! * the user id, e.g. `X-Authenticated-User: 6523f1...`
//! * an optional comma-separated role list, e.g. `X-Authenticated-Roles: user,admin`
//!
//! [`crate::middleware::IdentityMiddlewareFactory`] reads these on every `/api` request and stores an
//! [`AuthenticatedUser`] in the request extensions. Handlers take `AuthenticatedUser` as an extractor.
use std::{
    fmt::Display,
    future::{ready, Ready},
    str::FromStr,
};

use actix_web::{dev::Payload, http::header::HeaderMap, FromRequest, HttpMessage, HttpRequest};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    config::IdentityConfig,
    errors::{AuthError, ServerError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    /// The backend that creates orders with the provider, registering them on behalf of users.
    Service,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
            Role::Service => write!(f, "service"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            "service" => Ok(Role::Service),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub roles: Vec<Role>,
}

impl AuthenticatedUser {
    pub fn new<S: Into<String>>(user_id: S, roles: &[Role]) -> Self {
        Self { user_id: user_id.into(), roles: roles.to_vec() }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    /// Reads the identity headers. Every authenticated user has the `User` role. Unknown roles are ignored.
    pub fn from_headers(headers: &HeaderMap, config: &IdentityConfig) -> Result<Self, AuthError> {
        let user_id = headers
            .get(config.user_header.as_str())
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(AuthError::MissingIdentity)?
            .to_string();
        let mut roles = vec![Role::User];
        if let Some(list) = headers.get(config.roles_header.as_str()).and_then(|v| v.to_str().ok()) {
            for token in list.split(',').filter(|s| !s.trim().is_empty()) {
                match token.parse::<Role>() {
                    Ok(role) if !roles.contains(&role) => roles.push(role),
                    Ok(_) => {},
                    Err(e) => debug!("💻️ Ignoring role for {user_id}. {e}"),
                }
            }
        }
        Ok(Self { user_id, roles })
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user = req.extensions().get::<AuthenticatedUser>().cloned().ok_or_else(|| {
            warn!("💻️ No authenticated user found in request extensions");
            ServerError::AuthenticationError(AuthError::MissingIdentity)
        });
        ready(user)
    }
}
