use axum::extract::{Path, State};
use axum::http::header::HeaderName;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use axum_extra::extract::Form;
use serde::{Deserialize, Serialize};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::audit::AUDIT_TARGET;
use crate::auth::{hash_password, validate_signup, verify_password, verify_unknown_user};
use crate::store::{CardId, StoreError};

use super::error::AppError;
use super::flash::Flash;
use super::session::Session;
use super::state::AppState;
use super::views;

pub const SIGNUP_INVALID: &str =
    "Username must be at least 3 characters and password at least 8 characters long.";
pub const USERNAME_TAKEN: &str = "Username already exists.";
pub const LOGIN_FAILED: &str = "Invalid username or password.";

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Deserialize)]
struct CredentialsForm {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct CardForm {
    card_number: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/signup", get(signup_form).post(signup))
        .route("/login", get(login_form).post(login))
        .route("/logout", get(logout))
        .route(
            "/create_credit_card",
            get(create_card_form).post(create_card),
        )
        .route("/view_credit_card/{card_id}", get(view_card))
        // Layers wrap outward: the id must be set before it is propagated.
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            REQUEST_ID_HEADER,
        )))
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static(REQUEST_ID_HEADER),
            MakeRequestUuid,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn home(State(state): State<AppState>, mut session: Session) -> Result<Response, AppError> {
    let notice = session.take_flash().map(Flash::message);
    let cards = match session.user_id() {
        Some(user_id) => Some(state.store.list_cards_for_user(user_id).await?),
        None => None,
    };
    let page = views::home(notice, cards.as_deref());
    Ok((session, page).into_response())
}

async fn signup_form(mut session: Session) -> Response {
    let notice = session.take_flash().map(Flash::message);
    (session, views::signup(notice)).into_response()
}

async fn signup(
    State(state): State<AppState>,
    mut session: Session,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, AppError> {
    if let Err(violation) = validate_signup(&form.username, &form.password) {
        warn!(
            target: AUDIT_TARGET,
            username = ?form.username,
            reason = %violation,
            "signup input validation violation"
        );
        return Ok((StatusCode::BAD_REQUEST, views::signup(Some(SIGNUP_INVALID))).into_response());
    }

    let password_hash = hash_password(form.password).await?;
    match state.store.create_user(&form.username, &password_hash).await {
        Ok(user_id) => {
            info!(
                target: AUDIT_TARGET,
                user_id,
                username = ?form.username,
                "new user signed up"
            );
            session.flash(Flash::AccountCreated);
            Ok((session, Redirect::to("/login")).into_response())
        }
        Err(StoreError::Conflict) => {
            warn!(
                target: AUDIT_TARGET,
                username = ?form.username,
                "signup attempt with existing username"
            );
            Ok((StatusCode::CONFLICT, views::signup(Some(USERNAME_TAKEN))).into_response())
        }
        Err(err) => Err(err.into()),
    }
}

async fn login_form(mut session: Session) -> Response {
    let notice = session.take_flash().map(Flash::message);
    (session, views::login(notice)).into_response()
}

async fn login(
    State(state): State<AppState>,
    mut session: Session,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, AppError> {
    let user = state.store.find_user_by_username(&form.username).await?;
    let verified = match &user {
        Some(user) => verify_password(form.password, user.password_hash.clone()).await?,
        None => verify_unknown_user(form.password).await?,
    };

    match user {
        Some(user) if verified => {
            session.sign_in(user.id);
            info!(
                target: AUDIT_TARGET,
                user_id = user.id,
                username = ?user.username,
                "user logged in"
            );
            Ok((session, Redirect::to("/")).into_response())
        }
        // Unknown user and wrong password look the same from outside.
        _ => {
            warn!(
                target: AUDIT_TARGET,
                username = ?form.username,
                "failed login attempt"
            );
            Ok((StatusCode::UNAUTHORIZED, views::login(Some(LOGIN_FAILED))).into_response())
        }
    }
}

async fn logout(mut session: Session) -> Response {
    if let Some(user_id) = session.user_id() {
        info!(target: AUDIT_TARGET, user_id, "user logged out");
    }
    session.sign_out();
    (session, Redirect::to("/")).into_response()
}

async fn create_card_form(mut session: Session) -> Response {
    if session.user_id().is_none() {
        warn!(
            target: AUDIT_TARGET,
            "unauthorized attempt to access create_credit_card"
        );
        return login_required(session);
    }
    let notice = session.take_flash().map(Flash::message);
    (session, views::create_card(notice)).into_response()
}

async fn create_card(
    State(state): State<AppState>,
    mut session: Session,
    Form(form): Form<CardForm>,
) -> Result<Response, AppError> {
    let Some(user_id) = session.user_id() else {
        warn!(
            target: AUDIT_TARGET,
            "unauthorized attempt to access create_credit_card"
        );
        return Ok(login_required(session));
    };

    let card_id = state.store.create_card(user_id, &form.card_number).await?;
    info!(
        target: AUDIT_TARGET,
        user_id,
        card_id,
        "credit card created"
    );
    session.flash(Flash::CardAdded);
    Ok((session, Redirect::to("/")).into_response())
}

async fn view_card(
    State(state): State<AppState>,
    mut session: Session,
    Path(card_id): Path<CardId>,
) -> Result<Response, AppError> {
    let Some(user_id) = session.user_id() else {
        warn!(
            target: AUDIT_TARGET,
            card_id,
            "unauthorized attempt to view credit card"
        );
        return Ok(login_required(session));
    };

    match state.store.find_card_for_user(card_id, user_id).await? {
        Some(card) => {
            info!(
                target: AUDIT_TARGET,
                card_id,
                user_id = card.user_id,
                "credit card viewed"
            );
            let notice = session.take_flash().map(Flash::message);
            Ok((session, views::card_detail(notice, &card)).into_response())
        }
        // Missing and foreign cards get the same answer.
        None => {
            warn!(
                target: AUDIT_TARGET,
                card_id,
                user_id,
                "attempt to view non-existent or unauthorized credit card"
            );
            session.flash(Flash::CardUnavailable);
            Ok((session, Redirect::to("/")).into_response())
        }
    }
}

fn login_required(mut session: Session) -> Response {
    session.flash(Flash::LoginRequired);
    (session, Redirect::to("/login")).into_response()
}
