use std::borrow::Cow;

use time::{Duration, OffsetDateTime};
use tower_cookies::Cookie;

use crate::{
    SameSite,
    chunk::ChunkLimits,
    error::ConfigurationError,
    exclude::{ExclusionList, ExclusionPattern},
};

pub const DEFAULT_COOKIE_NAME: &str = "session";
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 4093;
pub const DEFAULT_MAX_CHUNKS: usize = 8;
pub const DEFAULT_MAX_AGE: Duration = Duration::days(14);
pub const DEFAULT_SECURITY_SCHEME_NAME: &str = "sessionCookie";

#[derive(Debug, Clone)]
pub struct SessionAuthConfig {
    pub(crate) name: Cow<'static, str>,
    pub(crate) http_only: bool,
    pub(crate) same_site: SameSite,
    pub(crate) max_age: Option<Duration>,
    pub(crate) secure: bool,
    pub(crate) path: Cow<'static, str>,
    pub(crate) domain: Option<Cow<'static, str>>,
    pub(crate) max_chunk_size: usize,
    pub(crate) max_chunks: usize,
    pub(crate) exclude: ExclusionList,
    pub(crate) clear_on_invalid: bool,
    pub(crate) security_scheme_name: Cow<'static, str>,
}

impl Default for SessionAuthConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.into(),
            http_only: true,
            same_site: SameSite::Lax,
            max_age: Some(DEFAULT_MAX_AGE),
            secure: true,
            path: "/".into(),
            domain: None,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            max_chunks: DEFAULT_MAX_CHUNKS,
            exclude: ExclusionList::default(),
            clear_on_invalid: true,
            security_scheme_name: DEFAULT_SECURITY_SCHEME_NAME.into(),
        }
    }
}

impl SessionAuthConfig {
    /// Cookie name prefix. Single-cookie sessions use it verbatim, chunked sessions append
    /// `-<index>`.
    #[must_use]
    pub fn with_name<N: Into<Cow<'static, str>>>(mut self, name: N) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    #[must_use]
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }

    /// Lifetime of the session cookie and of the encrypted payload inside it.
    #[must_use]
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Emit browser-session cookies with no `Max-Age` and no payload expiry.
    #[must_use]
    pub fn without_max_age(mut self) -> Self {
        self.max_age = None;
        self
    }

    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn with_path<P: Into<Cow<'static, str>>>(mut self, path: P) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn with_domain<D: Into<Cow<'static, str>>>(mut self, domain: D) -> Self {
        self.domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn without_domain(mut self) -> Self {
        self.domain = None;
        self
    }

    /// Longest cookie value emitted per chunk.
    ///
    /// Only the value is counted. Browsers commonly cap name, `=` and value together at 4096
    /// bytes, so with the default of 4093 a chunk such as `session-0=<value>` can exceed that
    /// cap. Lower this by the length of the longest chunk name plus one when that matters.
    #[must_use]
    pub fn with_max_chunk_size(mut self, max_chunk_size: usize) -> Self {
        self.max_chunk_size = max_chunk_size;
        self
    }

    /// Most chunk cookies a single session may occupy.
    #[must_use]
    pub fn with_max_chunks(mut self, max_chunks: usize) -> Self {
        self.max_chunks = max_chunks;
        self
    }

    #[must_use]
    pub fn with_exclude<I, P>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<ExclusionPattern>,
    {
        self.exclude = ExclusionList::new(patterns);
        self
    }

    #[must_use]
    pub fn with_exclusion_list(mut self, exclude: ExclusionList) -> Self {
        self.exclude = exclude;
        self
    }

    /// Expire the client's session cookies when they fail to decode or no longer resolve to
    /// a user.
    #[must_use]
    pub fn with_clear_on_invalid(mut self, clear_on_invalid: bool) -> Self {
        self.clear_on_invalid = clear_on_invalid;
        self
    }

    #[must_use]
    pub fn with_security_scheme_name<N: Into<Cow<'static, str>>>(mut self, name: N) -> Self {
        self.security_scheme_name = name.into();
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn exclusions(&self) -> &ExclusionList {
        &self.exclude
    }

    pub(crate) fn chunk_limits(&self) -> ChunkLimits {
        ChunkLimits::new(self.max_chunk_size, self.max_chunks)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigurationError> {
        if !is_cookie_token(&self.name) {
            return Err(ConfigurationError::InvalidCookieName(self.name.to_string()));
        }
        if self.max_chunk_size == 0 {
            return Err(ConfigurationError::ZeroChunkSize);
        }
        if self.max_chunks == 0 {
            return Err(ConfigurationError::ZeroMaxChunks);
        }
        Ok(())
    }

    /// When a payload sealed now should stop being accepted.
    pub(crate) fn expires_at(&self) -> Option<OffsetDateTime> {
        self.max_age.map(|max_age| OffsetDateTime::now_utc() + max_age)
    }

    pub(crate) fn build_cookie(&self, name: String, value: String) -> Cookie<'static> {
        let mut cookie_builder = Cookie::build((name, value))
            .http_only(self.http_only)
            .same_site(self.same_site)
            .secure(self.secure)
            .path(self.path.clone());

        if let Some(max_age) = self.max_age {
            cookie_builder = cookie_builder.max_age(std::cmp::max(max_age, Duration::ZERO));
        }

        if let Some(domain) = self.domain.clone() {
            cookie_builder = cookie_builder.domain(domain);
        }

        cookie_builder.build()
    }

    pub(crate) fn removal_cookie(&self, name: String) -> Cookie<'static> {
        let mut cookie = Cookie::new(name, "");
        cookie.set_path(self.path.clone());
        if let Some(domain) = self.domain.clone() {
            cookie.set_domain(domain);
        }
        cookie
    }
}

// RFC 6265 cookie-name token: visible ASCII minus separators.
fn is_cookie_token(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?={}".contains(&b))
}
