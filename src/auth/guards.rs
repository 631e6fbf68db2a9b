//! Per-route credential gates.
//!
//! Each route is registered with a [`RouteAccess`] which picks the gate that
//! runs before the handler. Gates read tokens from cookies only, verify them
//! with the [`TokenCodec`] and put the resulting identity into the request
//! extensions, where the extractors below pick it up.
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::{
    auth::{
        claims::{SessionPayload, TokenKind},
        cookies::read_cookie,
        session::RefreshIdentity,
    },
    error::AuthError,
    state::AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    Public,
    AccessProtected,
    RefreshProtected,
}

/// Identity attached by the access gate.
#[derive(Debug, Clone)]
pub struct AccessIdentity(pub SessionPayload);

fn access_gate(state: &AppState, req: &mut Request) -> Result<(), AuthError> {
    let token = read_cookie(req.headers(), &state.cookies.access.name)
        .ok_or(AuthError::Unauthorized)?;
    let payload = state
        .codec
        .verify(TokenKind::Access, token)
        .map_err(|_| {
            warn!("invalid or expired access token");
            AuthError::Unauthorized
        })?;
    req.extensions_mut().insert(AccessIdentity(payload));
    Ok(())
}

fn refresh_gate(state: &AppState, req: &mut Request) -> Result<(), AuthError> {
    let raw_token = read_cookie(req.headers(), &state.cookies.refresh.name)
        .ok_or(AuthError::MalformedRefreshToken)?
        .to_string();
    // Signature and expiry only; the stored digest is checked by the session manager.
    let payload = state
        .codec
        .verify(TokenKind::Refresh, &raw_token)
        .map_err(|_| {
            warn!("invalid or expired refresh token");
            AuthError::Unauthorized
        })?;
    req.extensions_mut()
        .insert(RefreshIdentity { payload, raw_token });
    Ok(())
}

/// Middleware body; wire with `from_fn_with_state((state, access), guard)`.
pub async fn guard(
    State((state, access)): State<(AppState, RouteAccess)>,
    mut req: Request,
    next: Next,
) -> Response {
    let checked = match access {
        RouteAccess::Public => Ok(()),
        RouteAccess::AccessProtected => access_gate(&state, &mut req),
        RouteAccess::RefreshProtected => refresh_gate(&state, &mut req),
    };
    match checked {
        Ok(()) => next.run(req).await,
        Err(e) => e.into_response(),
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AccessIdentity
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AccessIdentity>()
            .cloned()
            .ok_or(AuthError::Unauthorized)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RefreshIdentity
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RefreshIdentity>()
            .cloned()
            .ok_or(AuthError::MalformedRefreshToken)
    }
}
