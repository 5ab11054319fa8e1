use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponseParts, ResponseParts};
use axum_extra::extract::cookie::CookieJar;
use cookie::{Cookie, SameSite};

use crate::store::UserId;

use super::flash::Flash;
use super::state::{AppState, SessionStore};

pub const SESSION_COOKIE: &str = "cardvault_session";
pub const FLASH_COOKIE: &str = "cardvault_flash";

/// The caller's session for one request.
///
/// Extracted from the request cookies and handed back as a response part, so
/// whatever a handler changes (sign in, sign out, flash) reaches the client as
/// `Set-Cookie` headers.
#[derive(Debug)]
pub struct Session {
    sessions: SessionStore,
    jar: CookieJar,
    token: Option<String>,
    user_id: Option<UserId>,
    secure: bool,
}

impl FromRequestParts<AppState> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let mut jar = CookieJar::from_headers(&parts.headers);
        let mut token = jar
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string());
        let user_id = token.as_deref().and_then(|token| state.sessions.get(token));

        // Unknown or expired token: tell the browser to stop sending it.
        if token.is_some() && user_id.is_none() {
            token = None;
            jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
        }

        Ok(Self {
            sessions: state.sessions.clone(),
            jar,
            token,
            user_id,
            secure: state.config.secure_cookies,
        })
    }
}

impl Session {
    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    /// Binds the session to `user_id` under a fresh token. A previous token,
    /// valid or not, is discarded.
    pub fn sign_in(&mut self, user_id: UserId) {
        if let Some(previous) = self.token.take() {
            self.sessions.remove(&previous);
        }
        let token = self.sessions.create(user_id);
        let cookie = self.cookie(SESSION_COOKIE, token.clone());
        self.update_jar(|jar| jar.add(cookie));
        self.token = Some(token);
        self.user_id = Some(user_id);
    }

    /// Drops the user binding. Safe to call without a session.
    pub fn sign_out(&mut self) {
        if let Some(token) = self.token.take() {
            self.sessions.remove(&token);
        }
        self.user_id = None;
        self.update_jar(|jar| jar.remove(Cookie::build(SESSION_COOKIE).path("/")));
    }

    pub fn flash(&mut self, flash: Flash) {
        let cookie = self.cookie(FLASH_COOKIE, flash.code().to_string());
        self.update_jar(|jar| jar.add(cookie));
    }

    /// Returns the pending flash, if any, and clears it.
    pub fn take_flash(&mut self) -> Option<Flash> {
        let code = self
            .jar
            .get(FLASH_COOKIE)
            .map(|cookie| cookie.value().to_string())?;
        self.update_jar(|jar| jar.remove(Cookie::build(FLASH_COOKIE).path("/")));
        Flash::from_code(&code)
    }

    fn cookie(&self, name: &'static str, value: String) -> Cookie<'static> {
        Cookie::build((name, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .build()
    }

    fn update_jar(&mut self, update: impl FnOnce(CookieJar) -> CookieJar) {
        let jar = std::mem::replace(&mut self.jar, CookieJar::new());
        self.jar = update(jar);
    }
}

impl IntoResponseParts for Session {
    type Error = Infallible;

    fn into_response_parts(self, res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        self.jar.into_response_parts(res)
    }
}
