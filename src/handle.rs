use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use tower_cookies::Cookies;

use crate::{
    auth::SessionSettings,
    chunk::{self, ChunkSlots},
    codec,
    error::SessionError,
    session::SessionData,
};

/// Stages session cookies on the outgoing response.
///
/// The layer inserts one handle per request. It is available on excluded routes too, so a
/// login route that skips authentication can still start a session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    inner: Arc<HandleInner>,
}

#[derive(Debug)]
struct HandleInner {
    cookies: Cookies,
    settings: Arc<SessionSettings>,
    slots: Mutex<ChunkSlots>,
    session_set: AtomicBool,
    session_cleared: AtomicBool,
}

impl SessionHandle {
    pub(crate) fn new(cookies: Cookies, settings: Arc<SessionSettings>, slots: ChunkSlots) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                cookies,
                settings,
                slots: Mutex::new(slots),
                session_set: AtomicBool::new(false),
                session_cleared: AtomicBool::new(false),
            }),
        }
    }

    // Slots are plain data, so a poisoned lock still holds a usable value.
    fn lock_slots(&self) -> MutexGuard<'_, ChunkSlots> {
        self.inner
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Encrypt `session` into chunk cookies, expiring any chunk cookies it no longer uses.
    ///
    /// # Errors
    /// Returns [`SessionError::TooLarge`] if the session needs more than the configured number
    /// of cookies, or [`SessionError::Encode`] if it cannot be sealed. Nothing is staged on
    /// error.
    pub fn set_session(&self, session: &SessionData) -> Result<(), SessionError> {
        let settings = &self.inner.settings;
        let config = &settings.config;

        let sealed = match config.expires_at() {
            Some(expires_at) => codec::encode_until(session, &settings.secret, expires_at),
            None => codec::encode(session, &settings.secret),
        }
        .inspect_err(|err| tracing::error!(err = %err, "failed to seal session"))?;

        let chunks = chunk::split(config.name(), &sealed, config.max_chunk_size);
        if chunks.len() > config.max_chunks {
            tracing::error!(
                chunks = chunks.len(),
                max = config.max_chunks,
                "session does not fit in the allowed cookies"
            );
            return Err(SessionError::TooLarge {
                chunks: chunks.len(),
                max: config.max_chunks,
            });
        }

        let next = ChunkSlots::for_count(chunks.len());
        let mut slots = self.lock_slots();
        for name in chunk::clear(config.name(), *slots, next) {
            self.inner.cookies.remove(config.removal_cookie(name));
        }
        for (name, value) in chunks {
            self.inner.cookies.add(config.build_cookie(name, value));
        }
        *slots = next;

        self.inner.session_set.store(true, Ordering::Release);
        self.inner.session_cleared.store(false, Ordering::Release);
        Ok(())
    }

    /// Expire every session cookie the client sent or this request staged.
    pub fn clear_session(&self) {
        let config = &self.inner.settings.config;
        let mut slots = self.lock_slots();
        for name in slots.names(config.name()) {
            self.inner.cookies.remove(config.removal_cookie(name));
        }
        *slots = ChunkSlots::default();

        self.inner.session_set.store(false, Ordering::Release);
        self.inner.session_cleared.store(true, Ordering::Release);
    }

    /// A new session is staged on the response.
    #[must_use]
    pub fn did_set_session(&self) -> bool {
        self.inner.session_set.load(Ordering::Acquire)
    }

    /// The session was cleared after the last `set_session`, if any.
    #[must_use]
    pub fn did_clear_session(&self) -> bool {
        self.inner.session_cleared.load(Ordering::Acquire)
    }
}
