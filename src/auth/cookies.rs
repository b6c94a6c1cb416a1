use std::time::Duration;

use tower_cookies::{
    cookie::{time::Duration as CookieDuration, SameSite},
    Cookie,
};

use crate::auth::claims::TokenKind;

/// Session cookie carrying a token of `kind`.
pub fn token_cookie(kind: TokenKind, value: String, ttl: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((kind.cookie_name(), value))
        .path("/")
        // Not available to client-side JS.
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .max_age(CookieDuration::seconds(ttl.as_secs() as i64))
        .build()
}

/// Expired empty cookie that makes the browser drop `kind`'s cookie.
///
/// Sent whether or not the request carried the cookie.
pub fn expired_cookie(kind: TokenKind, secure: bool) -> Cookie<'static> {
    Cookie::build((kind.cookie_name(), ""))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .max_age(CookieDuration::ZERO)
        .expires(tower_cookies::cookie::time::OffsetDateTime::UNIX_EPOCH)
        .build()
}
