//! The session-authentication state machine.
//!
//! `SessionAuthAgent` owns the lifecycle of one logical server-side
//! session: it decides when a new session must be created versus reused,
//! persists the session fields across requests, injects the anti-forgery
//! token into outgoing mutating requests, and tears the session down on
//! logout.

use reqwest::{header::HeaderValue, Method, Request};
use tracing::{debug, info, warn};

use crate::api::SessionService;
use crate::error::Error;
use crate::models::Session;
use crate::storage::{
    SessionStorage, CSRF_TOKEN_KEY, SESSION_HREF_KEY, SESSION_ID_KEY, SESSION_NAME_KEY,
};

use super::{AuthInfo, Credentials};

/// Header carrying the anti-forgery token on state-changing requests.
pub const CSRF_TOKEN_HEADER: &str = "X-CSRF-Token";

/// HTTP methods that do not mutate server state and therefore never carry
/// the anti-forgery token.
const SAFE_METHODS: [Method; 4] = [Method::GET, Method::HEAD, Method::OPTIONS, Method::TRACE];

/// Client-side session authentication agent.
///
/// The agent derives its state from storage: a stored session identifier
/// means authenticated, nothing stored means unauthenticated. It is the
/// only writer of the four session keys, and always writes or removes them
/// as a unit.
pub struct SessionAuthAgent<P, S> {
    service: P,
    storage: S,
    credentials: Option<Credentials>,
}

impl<P, S> std::fmt::Debug for SessionAuthAgent<P, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionAuthAgent")
            .field("has_credentials", &self.credentials.is_some())
            .finish_non_exhaustive()
    }
}

impl<P, S> SessionAuthAgent<P, S>
where
    P: SessionService,
    S: SessionStorage,
{
    /// Create an agent from either a credential pair or a descriptor of an
    /// existing session.
    ///
    /// Credentials must be a complete pair and a session descriptor must
    /// carry all four fields; anything else is [`Error::InvalidAuthInfo`].
    /// Constructing from a descriptor seeds the storage, so the agent
    /// starts out authenticated.
    pub fn new(auth_info: AuthInfo, service: P, mut storage: S) -> Result<Self, Error> {
        match auth_info {
            AuthInfo::Credentials(credentials) => {
                if credentials.login.is_empty() || credentials.password.is_empty() {
                    return Err(Error::InvalidAuthInfo);
                }
                Ok(Self {
                    service,
                    storage,
                    credentials: Some(credentials),
                })
            }
            AuthInfo::Session(session) => {
                if !session.is_complete() {
                    return Err(Error::InvalidAuthInfo);
                }
                Self::persist_session(&mut storage, &session);
                Ok(Self {
                    service,
                    storage,
                    credentials: None,
                })
            }
        }
    }

    /// Shorthand for [`SessionAuthAgent::new`] with a login/password pair.
    pub fn with_credentials(
        login: impl Into<String>,
        password: impl Into<String>,
        service: P,
        storage: S,
    ) -> Result<Self, Error> {
        Self::new(
            AuthInfo::Credentials(Credentials::new(login, password)),
            service,
            storage,
        )
    }

    /// Shorthand for [`SessionAuthAgent::new`] with an existing session
    /// descriptor.
    pub fn with_session(session: Session, service: P, storage: S) -> Result<Self, Error> {
        Self::new(AuthInfo::Session(session), service, storage)
    }

    /// Replace the in-memory credential pair used by future
    /// authentications. Has no effect on an already-persisted session.
    pub fn set_credentials(&mut self, login: impl Into<String>, password: impl Into<String>) {
        self.credentials = Some(Credentials::new(login, password));
    }

    /// Replace the injected session service.
    pub fn set_service_provider(&mut self, service: P) {
        self.service = service;
    }

    /// Read-only view of the underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Guarantee that a session is persisted.
    ///
    /// An already-stored session identifier is trusted without a server
    /// round-trip; callers that need freshness use [`is_logged_in`]
    /// instead. On first-time authentication the held credentials are
    /// submitted and, on success, all four session fields are persisted as
    /// a unit.
    ///
    /// [`is_logged_in`]: SessionAuthAgent::is_logged_in
    pub async fn ensure_authentication(&mut self) -> Result<(), Error> {
        if self.storage.get_item(SESSION_ID_KEY).is_some() {
            debug!("Reusing stored session");
            return Ok(());
        }

        let credentials = self.credentials.as_ref().ok_or(Error::InvalidAuthInfo)?;
        let create_struct = self
            .service
            .new_session_create_struct(&credentials.login, &credentials.password);

        match self.service.create_session(&create_struct).await {
            Ok(session) => {
                Self::persist_session(&mut self.storage, &session);
                info!(identifier = %session.identifier, "Authenticated");
                Ok(())
            }
            Err(e) => Err(Error::SessionCreate(e)),
        }
    }

    /// Check whether the stored session is still alive on the server.
    ///
    /// With no stored session this returns `Ok(false)` without any network
    /// interaction. A failed refresh clears the stored session before the
    /// error is returned, so the next [`ensure_authentication`] starts from
    /// scratch.
    ///
    /// [`ensure_authentication`]: SessionAuthAgent::ensure_authentication
    pub async fn is_logged_in(&mut self) -> Result<bool, Error> {
        let Some(session_id) = self.storage.get_item(SESSION_ID_KEY) else {
            return Ok(false);
        };

        match self.service.refresh_session(&session_id).await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!(identifier = %session_id, "Session refresh failed, clearing stored session");
                Self::clear_session(&mut self.storage);
                Err(Error::SessionRefresh(e))
            }
        }
    }

    /// Authenticate as the current credentials, discarding any stored
    /// session first.
    ///
    /// A failed logout is logged and otherwise ignored; authentication
    /// proceeds with whatever state remains.
    pub async fn log_in(&mut self) -> Result<(), Error> {
        if self.storage.get_item(SESSION_ID_KEY).is_some() {
            if let Err(e) = self.log_out().await {
                warn!(error = %e, "Logout before re-authentication failed");
            }
        }
        self.ensure_authentication().await
    }

    /// Delete the remote session and clear the stored state.
    ///
    /// With no stored session this is a successful no-op. On a delete
    /// failure the stored state is retained, so a retry can reuse the same
    /// href.
    pub async fn log_out(&mut self) -> Result<(), Error> {
        let Some(href) = self.storage.get_item(SESSION_HREF_KEY) else {
            return Ok(());
        };

        match self.service.delete_session(&href).await {
            Ok(()) => {
                Self::clear_session(&mut self.storage);
                info!("Logged out");
                Ok(())
            }
            Err(e) => Err(Error::SessionDelete(e)),
        }
    }

    /// Attach the anti-forgery token to an outgoing request.
    ///
    /// Safe methods (GET, HEAD, OPTIONS, TRACE) are left untouched; any
    /// other method gets the stored token under [`CSRF_TOKEN_HEADER`].
    /// Pure mutation, no I/O, cannot fail: without a stored token the
    /// request passes through unchanged.
    pub fn authenticate_request(&self, request: &mut Request) {
        if SAFE_METHODS.contains(request.method()) {
            return;
        }
        let Some(token) = self.storage.get_item(CSRF_TOKEN_KEY) else {
            return;
        };
        match HeaderValue::from_str(&token) {
            Ok(value) => {
                request.headers_mut().insert(CSRF_TOKEN_HEADER, value);
            }
            Err(e) => {
                warn!(error = %e, "Stored CSRF token is not a valid header value");
            }
        }
    }

    /// Write all four session fields as a unit.
    fn persist_session(storage: &mut S, session: &Session) {
        storage.set_item(SESSION_NAME_KEY, &session.name);
        storage.set_item(SESSION_ID_KEY, &session.identifier);
        storage.set_item(SESSION_HREF_KEY, &session.href);
        storage.set_item(CSRF_TOKEN_KEY, &session.csrf_token);
    }

    /// Remove all four session fields as a unit.
    fn clear_session(storage: &mut S) {
        storage.remove_item(SESSION_NAME_KEY);
        storage.remove_item(SESSION_ID_KEY);
        storage.remove_item(SESSION_HREF_KEY);
        storage.remove_item(CSRF_TOKEN_KEY);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use reqwest::Url;

    use crate::api::ServiceError;
    use crate::models::SessionCreateStruct;
    use crate::storage::InMemoryStorage;

    use super::*;

    #[derive(Default)]
    struct Calls {
        create: usize,
        refresh: Vec<String>,
        delete: Vec<String>,
        last_login: Option<(String, String)>,
    }

    /// Scripted service double recording every collaborator call.
    struct MockService {
        session: Session,
        fail_create: bool,
        fail_refresh: bool,
        fail_delete: bool,
        calls: Mutex<Calls>,
    }

    impl MockService {
        fn base() -> Self {
            Self {
                session: sample_session(),
                fail_create: false,
                fail_refresh: false,
                fail_delete: false,
                calls: Mutex::new(Calls::default()),
            }
        }

        fn new() -> Arc<Self> {
            Arc::new(Self::base())
        }

        fn failing_create() -> Arc<Self> {
            Arc::new(Self {
                fail_create: true,
                ..Self::base()
            })
        }

        fn failing_refresh() -> Arc<Self> {
            Arc::new(Self {
                fail_refresh: true,
                ..Self::base()
            })
        }

        fn failing_delete() -> Arc<Self> {
            Arc::new(Self {
                fail_delete: true,
                ..Self::base()
            })
        }

        fn create_calls(&self) -> usize {
            self.calls.lock().unwrap().create
        }

        fn refresh_calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().refresh.clone()
        }

        fn delete_calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().delete.clone()
        }

        fn last_login(&self) -> Option<(String, String)> {
            self.calls.lock().unwrap().last_login.clone()
        }
    }

    #[async_trait]
    impl SessionService for Arc<MockService> {
        async fn create_session(
            &self,
            create_struct: &SessionCreateStruct,
        ) -> Result<Session, ServiceError> {
            let mut calls = self.calls.lock().unwrap();
            calls.create += 1;
            calls.last_login = Some((
                create_struct.login.clone(),
                create_struct.password.clone(),
            ));
            if self.fail_create {
                return Err(ServiceError::Unauthorized);
            }
            Ok(self.session.clone())
        }

        async fn refresh_session(&self, session_id: &str) -> Result<Session, ServiceError> {
            self.calls
                .lock()
                .unwrap()
                .refresh
                .push(session_id.to_string());
            if self.fail_refresh {
                return Err(ServiceError::Unauthorized);
            }
            Ok(self.session.clone())
        }

        async fn delete_session(&self, session_href: &str) -> Result<(), ServiceError> {
            self.calls
                .lock()
                .unwrap()
                .delete
                .push(session_href.to_string());
            if self.fail_delete {
                return Err(ServiceError::ServerError("delete failed".to_string()));
            }
            Ok(())
        }
    }

    fn sample_session() -> Session {
        Session {
            name: "SESSID".to_string(),
            href: "/sessions/abc".to_string(),
            identifier: "abc".to_string(),
            csrf_token: "tok1".to_string(),
        }
    }

    fn stored_session(agent: &SessionAuthAgent<Arc<MockService>, InMemoryStorage>) -> [Option<String>; 4] {
        [
            agent.storage().get_item(SESSION_NAME_KEY),
            agent.storage().get_item(SESSION_ID_KEY),
            agent.storage().get_item(SESSION_HREF_KEY),
            agent.storage().get_item(CSRF_TOKEN_KEY),
        ]
    }

    fn request(method: Method) -> Request {
        Request::new(
            method,
            Url::parse("https://api.example.net/content/objects/1").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_first_authentication_creates_and_persists() {
        let service = MockService::new();
        let mut agent = SessionAuthAgent::with_credentials(
            "admin",
            "publish",
            service.clone(),
            InMemoryStorage::new(),
        )
        .unwrap();

        agent.ensure_authentication().await.unwrap();

        assert_eq!(service.create_calls(), 1);
        assert_eq!(
            service.last_login(),
            Some(("admin".to_string(), "publish".to_string()))
        );
        assert_eq!(
            stored_session(&agent),
            [
                Some("SESSID".to_string()),
                Some("abc".to_string()),
                Some("/sessions/abc".to_string()),
                Some("tok1".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_stored_session_is_reused_without_network() {
        let service = MockService::new();
        let mut storage = InMemoryStorage::new();
        storage.set_item(SESSION_ID_KEY, "abc");

        let mut agent =
            SessionAuthAgent::with_credentials("admin", "publish", service.clone(), storage)
                .unwrap();

        agent.ensure_authentication().await.unwrap();
        assert_eq!(service.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_create_failure_leaves_unauthenticated() {
        let service = MockService::failing_create();
        let mut agent = SessionAuthAgent::with_credentials(
            "admin",
            "wrong",
            service.clone(),
            InMemoryStorage::new(),
        )
        .unwrap();

        let err = agent.ensure_authentication().await.unwrap_err();
        assert!(matches!(err, Error::SessionCreate(_)));
        assert_eq!(stored_session(&agent), [None, None, None, None]);
    }

    #[test]
    fn test_session_descriptor_seeds_storage() {
        let agent = SessionAuthAgent::with_session(
            sample_session(),
            MockService::new(),
            InMemoryStorage::new(),
        )
        .unwrap();

        assert_eq!(
            stored_session(&agent),
            [
                Some("SESSID".to_string()),
                Some("abc".to_string()),
                Some("/sessions/abc".to_string()),
                Some("tok1".to_string()),
            ]
        );
    }

    #[test]
    fn test_construction_rejects_incomplete_auth_info() {
        let err = SessionAuthAgent::with_credentials(
            "",
            "publish",
            MockService::new(),
            InMemoryStorage::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidAuthInfo));

        let mut partial = sample_session();
        partial.csrf_token.clear();
        let err =
            SessionAuthAgent::with_session(partial, MockService::new(), InMemoryStorage::new())
                .unwrap_err();
        assert!(matches!(err, Error::InvalidAuthInfo));
    }

    #[test]
    fn test_safe_methods_are_never_mutated() {
        let agent = SessionAuthAgent::with_session(
            sample_session(),
            MockService::new(),
            InMemoryStorage::new(),
        )
        .unwrap();

        for method in [Method::GET, Method::HEAD, Method::OPTIONS, Method::TRACE] {
            let mut req = request(method);
            agent.authenticate_request(&mut req);
            assert!(req.headers().is_empty(), "{} must stay untouched", req.method());
        }
    }

    #[test]
    fn test_mutating_methods_get_the_token() {
        let agent = SessionAuthAgent::with_session(
            sample_session(),
            MockService::new(),
            InMemoryStorage::new(),
        )
        .unwrap();

        for method in [Method::POST, Method::PUT, Method::PATCH, Method::DELETE] {
            let mut req = request(method);
            agent.authenticate_request(&mut req);
            assert_eq!(
                req.headers().get(CSRF_TOKEN_HEADER).map(|v| v.to_str().unwrap()),
                Some("tok1")
            );
        }
    }

    #[test]
    fn test_no_stored_token_leaves_headers_untouched() {
        let agent = SessionAuthAgent::with_credentials(
            "admin",
            "publish",
            MockService::new(),
            InMemoryStorage::new(),
        )
        .unwrap();

        let mut req = request(Method::POST);
        agent.authenticate_request(&mut req);
        assert!(req.headers().is_empty());
    }

    #[tokio::test]
    async fn test_logout_without_session_is_a_successful_noop() {
        let service = MockService::new();
        let mut agent = SessionAuthAgent::with_credentials(
            "admin",
            "publish",
            service.clone(),
            InMemoryStorage::new(),
        )
        .unwrap();

        agent.log_out().await.unwrap();
        assert!(service.delete_calls().is_empty());
    }

    #[tokio::test]
    async fn test_logout_deletes_and_clears_storage() {
        let service = MockService::new();
        let mut agent = SessionAuthAgent::with_session(
            sample_session(),
            service.clone(),
            InMemoryStorage::new(),
        )
        .unwrap();

        agent.log_out().await.unwrap();

        assert_eq!(service.delete_calls(), vec!["/sessions/abc".to_string()]);
        assert_eq!(stored_session(&agent), [None, None, None, None]);
    }

    #[tokio::test]
    async fn test_logout_failure_retains_storage() {
        let service = MockService::failing_delete();
        let mut agent = SessionAuthAgent::with_session(
            sample_session(),
            service.clone(),
            InMemoryStorage::new(),
        )
        .unwrap();

        let err = agent.log_out().await.unwrap_err();
        assert!(matches!(err, Error::SessionDelete(_)));
        assert_eq!(
            stored_session(&agent),
            [
                Some("SESSID".to_string()),
                Some("abc".to_string()),
                Some("/sessions/abc".to_string()),
                Some("tok1".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_is_logged_in_without_session_skips_network() {
        let service = MockService::new();
        let mut agent = SessionAuthAgent::with_credentials(
            "admin",
            "publish",
            service.clone(),
            InMemoryStorage::new(),
        )
        .unwrap();

        assert!(!agent.is_logged_in().await.unwrap());
        assert!(service.refresh_calls().is_empty());
    }

    #[tokio::test]
    async fn test_is_logged_in_refreshes_stored_session() {
        let service = MockService::new();
        let mut agent = SessionAuthAgent::with_session(
            sample_session(),
            service.clone(),
            InMemoryStorage::new(),
        )
        .unwrap();

        assert!(agent.is_logged_in().await.unwrap());
        assert_eq!(service.refresh_calls(), vec!["abc".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_refresh_clears_storage() {
        let service = MockService::failing_refresh();
        let mut agent = SessionAuthAgent::with_session(
            sample_session(),
            service.clone(),
            InMemoryStorage::new(),
        )
        .unwrap();

        let err = agent.is_logged_in().await.unwrap_err();
        assert!(matches!(err, Error::SessionRefresh(_)));
        assert_eq!(stored_session(&agent), [None, None, None, None]);
    }

    #[tokio::test]
    async fn test_authentication_without_credentials_fails() {
        // A descriptor-constructed agent that loses its session has no
        // credentials to re-authenticate with.
        let service = MockService::failing_refresh();
        let mut agent = SessionAuthAgent::with_session(
            sample_session(),
            service.clone(),
            InMemoryStorage::new(),
        )
        .unwrap();

        agent.is_logged_in().await.unwrap_err();
        let err = agent.ensure_authentication().await.unwrap_err();
        assert!(matches!(err, Error::InvalidAuthInfo));
    }

    #[tokio::test]
    async fn test_login_discards_stored_session_and_reauthenticates() {
        let service = MockService::new();
        let mut agent = SessionAuthAgent::with_session(
            sample_session(),
            service.clone(),
            InMemoryStorage::new(),
        )
        .unwrap();
        agent.set_credentials("admin", "publish");

        agent.log_in().await.unwrap();

        assert_eq!(service.delete_calls(), vec!["/sessions/abc".to_string()]);
        assert_eq!(service.create_calls(), 1);
        assert_eq!(
            agent.storage().get_item(SESSION_ID_KEY).as_deref(),
            Some("abc")
        );
    }

    #[tokio::test]
    async fn test_login_without_stored_session_authenticates_directly() {
        let service = MockService::new();
        let mut agent = SessionAuthAgent::with_credentials(
            "admin",
            "publish",
            service.clone(),
            InMemoryStorage::new(),
        )
        .unwrap();

        agent.log_in().await.unwrap();

        assert!(service.delete_calls().is_empty());
        assert_eq!(service.create_calls(), 1);
    }

    #[tokio::test]
    async fn test_set_credentials_takes_effect_on_next_authentication() {
        let service = MockService::new();
        let mut agent = SessionAuthAgent::with_credentials(
            "admin",
            "publish",
            service.clone(),
            InMemoryStorage::new(),
        )
        .unwrap();

        agent.set_credentials("editor", "secret");
        agent.ensure_authentication().await.unwrap();

        assert_eq!(
            service.last_login(),
            Some(("editor".to_string(), "secret".to_string()))
        );
    }

    #[tokio::test]
    async fn test_set_service_provider_replaces_collaborator() {
        let first = MockService::new();
        let second = MockService::new();
        let mut agent = SessionAuthAgent::with_credentials(
            "admin",
            "publish",
            first.clone(),
            InMemoryStorage::new(),
        )
        .unwrap();

        agent.set_service_provider(second.clone());
        agent.ensure_authentication().await.unwrap();

        assert_eq!(first.create_calls(), 0);
        assert_eq!(second.create_calls(), 1);
    }
}
