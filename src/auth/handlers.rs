use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::from_fn_with_state,
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{SignInRequest, SignInResponse, SignUpRequest, SignUpResponse},
        guards::{guard, AccessIdentity, RouteAccess},
        session::{RefreshIdentity, SignUp},
    },
    config::REFRESH_ROUTE,
    error::AuthError,
    state::AppState,
};

pub fn auth_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/auth/signup",
            post(sign_up).layer(from_fn_with_state(
                (state.clone(), RouteAccess::Public),
                guard,
            )),
        )
        .route(
            "/auth/signin",
            post(sign_in).layer(from_fn_with_state(
                (state.clone(), RouteAccess::Public),
                guard,
            )),
        )
        .route(
            "/auth/logout",
            post(logout).layer(from_fn_with_state(
                (state.clone(), RouteAccess::AccessProtected),
                guard,
            )),
        )
        .route(
            REFRESH_ROUTE,
            post(refresh_access_token).layer(from_fn_with_state(
                (state.clone(), RouteAccess::RefreshProtected),
                guard,
            )),
        )
}

#[instrument(skip_all)]
pub async fn sign_up(
    State(state): State<AppState>,
    Json(payload): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<SignUpResponse>), AuthError> {
    let payload = payload.normalize()?;
    let message = state
        .sessions
        .sign_up(SignUp {
            login: &payload.login,
            username: &payload.username,
            password: &payload.password,
            confirm_password: &payload.confirm_password,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            message: message.to_string(),
        }),
    ))
}

#[instrument(skip_all)]
pub async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<SignInRequest>,
) -> Result<(HeaderMap, Json<SignInResponse>), AuthError> {
    let payload = payload.normalize()?;
    let (user, tokens) = state
        .sessions
        .sign_in(&payload.login, &payload.password)
        .await?;

    let mut headers = HeaderMap::new();
    state.cookies.bind(&mut headers, &tokens);
    Ok((
        headers,
        Json(SignInResponse {
            id: user.id,
            username: user.username,
        }),
    ))
}

#[instrument(skip_all, fields(user_id = %identity.0.id))]
pub async fn logout(
    State(state): State<AppState>,
    identity: AccessIdentity,
) -> Result<HeaderMap, AuthError> {
    let mut headers = HeaderMap::new();
    state.cookies.strip(&mut headers);
    state.sessions.logout(identity.0.id).await?;
    Ok(headers)
}

#[instrument(skip_all, fields(user_id = %identity.payload.id))]
pub async fn refresh_access_token(
    State(state): State<AppState>,
    identity: RefreshIdentity,
) -> Result<HeaderMap, AuthError> {
    let tokens = state.sessions.refresh(&identity).await?;
    let mut headers = HeaderMap::new();
    state.cookies.bind(&mut headers, &tokens);
    Ok(headers)
}
