//! Binds issued tokens to `Set-Cookie` headers and reads them back.
use axum::http::{header, HeaderMap, HeaderValue};
use time::{macros::format_description, OffsetDateTime};

use crate::{
    auth::jwt::{IssuedToken, TokenPair},
    config::CookieConfig,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Lax,
    Strict,
}

impl SameSite {
    fn as_str(self) -> &'static str {
        match self {
            SameSite::Lax => "Lax",
            SameSite::Strict => "Strict",
        }
    }
}

/// Name and scope of one cookie.
#[derive(Debug, Clone)]
pub struct CookieSpec {
    pub name: String,
    pub path: String,
    pub same_site: SameSite,
}

#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub access: CookieSpec,
    pub refresh: CookieSpec,
    pub secure: bool,
}

fn http_date(at: OffsetDateTime) -> String {
    let fmt = format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    );
    at.to_offset(time::UtcOffset::UTC)
        .format(fmt)
        .unwrap_or_else(|_| "Thu, 01 Jan 1970 00:00:00 GMT".to_string())
}

impl CookieSettings {
    pub fn new(cfg: &CookieConfig) -> Self {
        Self {
            access: CookieSpec {
                name: cfg.access_name.clone(),
                path: cfg.access_path.clone(),
                same_site: SameSite::Lax,
            },
            refresh: CookieSpec {
                name: cfg.refresh_name.clone(),
                path: cfg.refresh_path.clone(),
                same_site: SameSite::Strict,
            },
            secure: cfg.secure,
        }
    }

    fn render(
        &self,
        spec: &CookieSpec,
        value: &str,
        expires: OffsetDateTime,
        max_age: u64,
    ) -> String {
        let mut cookie = format!(
            "{}={}; Path={}; Expires={}; Max-Age={}; HttpOnly; SameSite={}",
            spec.name,
            value,
            spec.path,
            http_date(expires),
            max_age,
            spec.same_site.as_str()
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    fn set_cookie(&self, spec: &CookieSpec, token: &IssuedToken) -> String {
        self.render(spec, &token.token, token.expires_at, token.ttl.as_secs())
    }

    fn clear_cookie(&self, spec: &CookieSpec) -> String {
        self.render(spec, "", OffsetDateTime::UNIX_EPOCH, 0)
    }

    /// Append both token cookies to `headers`.
    pub fn bind(&self, headers: &mut HeaderMap, tokens: &TokenPair) {
        for cookie in [
            self.set_cookie(&self.refresh, &tokens.refresh),
            self.set_cookie(&self.access, &tokens.access),
        ] {
            if let Ok(v) = HeaderValue::from_str(&cookie) {
                headers.append(header::SET_COOKIE, v);
            }
        }
    }

    /// Append expired cookies for both tokens, each on its own path.
    pub fn strip(&self, headers: &mut HeaderMap) {
        for cookie in [self.clear_cookie(&self.access), self.clear_cookie(&self.refresh)] {
            if let Ok(v) = HeaderValue::from_str(&cookie) {
                headers.append(header::SET_COOKIE, v);
            }
        }
    }
}

/// Value of the request cookie called `name`, if present and non-empty.
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|line| line.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
}
