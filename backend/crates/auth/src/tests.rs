//! Scenario tests for the auth crate
//! Whole flows through `AuthOrchestrator` on the in-memory store and cache

#[cfg(test)]
mod support {
    use kernel::id::{MenuId, RoleId, UserId};
    use platform::device::DeviceContext;
    use std::sync::Arc;

    use crate::application::{AuditQueue, AuthOrchestrator, AuthOutput, LoginInput, RegisterInput};
    use crate::domain::entity::{Menu, User};
    use crate::infra::cache::CacheStore;
    use crate::infra::cache::memory::MemoryCache;
    use crate::infra::memory::MemoryAuthRepository;
    use crate::AuthConfig;

    pub const EMAIL: &str = "carol@example.com";
    pub const PASSWORD: &str = "Correct-Horse-42";

    pub struct Harness {
        pub engine: AuthOrchestrator<MemoryAuthRepository>,
        pub store: Arc<MemoryAuthRepository>,
        pub user: User,
    }

    pub fn memory_cache() -> (MemoryCache, Arc<CacheStore>) {
        let mem = MemoryCache::new();
        let cache = Arc::new(CacheStore::Memory(mem.clone()));
        (mem, cache)
    }

    pub async fn harness(cache: Option<Arc<CacheStore>>) -> Harness {
        harness_with(cache, AuditQueue::disabled()).await
    }

    pub async fn harness_with(cache: Option<Arc<CacheStore>>, audit: AuditQueue) -> Harness {
        let store = Arc::new(MemoryAuthRepository::new());
        let config = Arc::new(AuthConfig::development());
        let engine = AuthOrchestrator::new(store.clone(), cache, config, audit);

        let user = engine
            .register(RegisterInput {
                name: "Carol".into(),
                email: EMAIL.into(),
                password: PASSWORD.into(),
            })
            .await
            .unwrap();

        Harness { engine, store, user }
    }

    pub fn device(id: &str) -> DeviceContext {
        DeviceContext::new(
            Some(id.into()),
            None,
            Some("192.0.2.10".parse().unwrap()),
            Some("Mozilla/5.0 (X11; Linux x86_64)".into()),
        )
    }

    pub async fn login(h: &Harness, device_id: &str) -> AuthOutput {
        h.engine
            .login(LoginInput {
                email: EMAIL.into(),
                password: PASSWORD.into(),
                device: device(device_id),
            })
            .await
            .unwrap()
    }

    pub fn bearer(token: &str) -> String {
        format!("Bearer {token}")
    }

    /// Role with order.view + order.create, create revoked for the user, and
    /// an "Orders" section with one leaf per permission.
    pub fn seed_orders(store: &MemoryAuthRepository, user_id: UserId) {
        let role = RoleId::new();
        store.add_role(role, ["order.view", "order.create"]);
        store.assign_role(user_id, role);
        store.set_permission_override(user_id, "order.create", false);

        let root = menu(None, "orders", 1, &[]);
        store.add_menu(menu(Some(root.id), "order-list", 1, &["order.view"]));
        store.add_menu(menu(Some(root.id), "order-new", 2, &["order.create"]));
        store.add_menu(root);
    }

    fn menu(parent_id: Option<MenuId>, slug: &str, display_order: i32, permissions: &[&str]) -> Menu {
        Menu {
            id: MenuId::new(),
            parent_id,
            name: slug.to_uppercase(),
            slug: slug.into(),
            icon: None,
            route: Some(format!("/{slug}")),
            display_order,
            is_active: true,
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            children: Vec::new(),
        }
    }
}

#[cfg(test)]
mod flow_tests {
    use super::support::*;
    use crate::domain::repository::{SessionRepository, TokenRepository};
    use crate::domain::value_object::token_hash::TokenHash;
    use crate::domain::value_object::token_type::TokenType;
    use tokio_test::assert_err;

    #[tokio::test]
    async fn test_login_issues_a_working_pair() {
        let (_, cache) = memory_cache();
        let h = harness(Some(cache)).await;
        let out = login(&h, "laptop").await;

        assert_eq!(out.tokens.token_type, "Bearer");
        assert_ne!(out.tokens.access_token, out.tokens.refresh_token);

        let access = h
            .engine
            .authenticate(&bearer(&out.tokens.access_token))
            .await
            .unwrap();
        assert_eq!(access.claims.sub, h.user.id);
        assert_eq!(access.claims.sid, out.session.id);
        assert_eq!(access.claims.typ, TokenType::Access);

        let session = h.store.find_session(out.session.id).await.unwrap().unwrap();
        assert!(session.is_active);
        assert_eq!(
            session.refresh_token_hash,
            TokenHash::of(&out.tokens.refresh_token)
        );
        assert!(out.user.last_login_at.is_some());
    }

    #[tokio::test]
    async fn test_tokens_are_not_interchangeable() {
        let h = harness(None).await;
        let out = login(&h, "laptop").await;

        assert_err!(
            h.engine
                .authenticate(&bearer(&out.tokens.refresh_token))
                .await
        );
        assert_err!(
            h.engine
                .authenticate_refresh(&bearer(&out.tokens.access_token))
                .await
        );
        assert_err!(h.engine.authenticate("").await);
        assert_err!(h.engine.authenticate("Bearer not.a.jwt").await);
    }

    #[tokio::test]
    async fn test_refresh_token_is_reusable() {
        let h = harness(None).await;
        let out = login(&h, "phone").await;
        let header = bearer(&out.tokens.refresh_token);

        let mut issued = Vec::new();
        for _ in 0..2 {
            let refresh = h.engine.authenticate_refresh(&header).await.unwrap();
            let again = h
                .engine
                .refresh_token(crate::application::RefreshInput {
                    refresh,
                    device: device("phone"),
                })
                .await
                .unwrap();
            assert_eq!(again.tokens.refresh_token, out.tokens.refresh_token);
            assert_eq!(again.session.id, out.session.id);
            issued.push(again.tokens.access_token);
        }

        assert_ne!(issued[0], issued[1]);
        assert_ne!(issued[0], out.tokens.access_token);
        for token in &issued {
            let access = h.engine.authenticate(&bearer(token)).await.unwrap();
            assert!(access.claims.jti.is_some());
        }
        // login + two refreshes
        let live = h
            .store
            .find_live_tokens_for_user(h.user.id, chrono::Utc::now())
            .await
            .unwrap();
        assert_eq!(live.len(), 4);
    }

    #[tokio::test]
    async fn test_login_resolves_permissions_and_menu() {
        let h = harness(None).await;
        seed_orders(&h.store, h.user.id);

        let out = login(&h, "laptop").await;
        assert_eq!(out.permissions, vec!["order.view".to_string()]);

        assert_eq!(out.menus.len(), 1);
        let orders = &out.menus[0];
        assert_eq!(orders.slug, "orders");
        let children: Vec<&str> = orders.children.iter().map(|m| m.slug.as_str()).collect();
        assert_eq!(children, vec!["order-list"]);

        assert!(h.engine.has_permission(h.user.id, "order.view").await.unwrap());
        assert!(!h.engine.has_permission(h.user.id, "order.create").await.unwrap());
    }

    #[tokio::test]
    async fn test_login_without_grants_yields_empty_menu() {
        let h = harness(None).await;
        seed_orders(&h.store, h.user.id);
        h.store
            .set_permission_override(h.user.id, "order.view", false);

        let out = login(&h, "laptop").await;
        assert!(out.permissions.is_empty());
        assert!(out.menus.is_empty());
    }
}

#[cfg(test)]
mod revocation_tests {
    use super::support::*;
    use crate::domain::repository::{SessionRepository, TokenRepository};
    use crate::domain::value_object::token_hash::TokenHash;
    use crate::infra::cache::keys;
    use crate::ErrorKind;
    use std::time::Duration;
    use tokio_test::assert_err;

    #[tokio::test]
    async fn test_blacklist_rejects_before_record_is_deleted() {
        let (_, cache) = memory_cache();
        let h = harness(Some(cache.clone())).await;
        let out = login(&h, "laptop").await;
        let hash = TokenHash::of(&out.tokens.access_token);

        cache
            .set(&keys::blacklist(&hash), "1", Duration::from_secs(60))
            .await
            .unwrap();

        assert!(h.store.find_token_by_hash(&hash).await.unwrap().is_some());
        let err = h
            .engine
            .authenticate(&bearer(&out.tokens.access_token))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn test_logout_touches_only_its_own_session() {
        let (_, cache) = memory_cache();
        let h = harness(Some(cache.clone())).await;
        let laptop = login(&h, "laptop").await;
        let phone = login(&h, "phone").await;

        let access = h
            .engine
            .authenticate(&bearer(&laptop.tokens.access_token))
            .await
            .unwrap();
        h.engine
            .logout(&access.token_hash, access.claims.sub, access.claims.sid)
            .await
            .unwrap();

        // laptop pair is gone and blacklisted
        for token in [&laptop.tokens.access_token, &laptop.tokens.refresh_token] {
            let hash = TokenHash::of(token);
            assert!(h.store.find_token_by_hash(&hash).await.unwrap().is_none());
            assert!(cache.exists(&keys::blacklist(&hash)).await.unwrap());
        }
        assert!(h.store.find_session(laptop.session.id).await.unwrap().is_none());
        assert_err!(
            h.engine
                .authenticate(&bearer(&laptop.tokens.access_token))
                .await
        );
        assert_err!(
            h.engine
                .authenticate_refresh(&bearer(&laptop.tokens.refresh_token))
                .await
        );

        // phone pair untouched
        for token in [&phone.tokens.access_token, &phone.tokens.refresh_token] {
            let hash = TokenHash::of(token);
            assert!(h.store.find_token_by_hash(&hash).await.unwrap().is_some());
            assert!(!cache.exists(&keys::blacklist(&hash)).await.unwrap());
        }
        h.engine
            .authenticate(&bearer(&phone.tokens.access_token))
            .await
            .unwrap();
        h.engine
            .authenticate_refresh(&bearer(&phone.tokens.refresh_token))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_logout_of_foreign_session_is_not_found() {
        let h = harness(None).await;
        let out = login(&h, "laptop").await;

        let err = h
            .engine
            .logout(
                &TokenHash::of(&out.tokens.access_token),
                kernel::id::UserId::new(),
                out.session.id,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(h.store.find_session(out.session.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_logout_revokes_only_the_presented_access_token() {
        let (_, cache) = memory_cache();
        let h = harness(Some(cache)).await;
        let out = login(&h, "laptop").await;

        let refresh = h
            .engine
            .authenticate_refresh(&bearer(&out.tokens.refresh_token))
            .await
            .unwrap();
        let refreshed = h
            .engine
            .refresh_token(crate::application::RefreshInput {
                refresh,
                device: device("laptop"),
            })
            .await
            .unwrap();

        let access = h
            .engine
            .authenticate(&bearer(&refreshed.tokens.access_token))
            .await
            .unwrap();
        h.engine
            .logout(&access.token_hash, access.claims.sub, access.claims.sid)
            .await
            .unwrap();

        assert_err!(
            h.engine
                .authenticate(&bearer(&refreshed.tokens.access_token))
                .await
        );
        assert_err!(
            h.engine
                .authenticate_refresh(&bearer(&out.tokens.refresh_token))
                .await
        );
        // the login access token of the same session lives until it expires
        let earlier = h
            .engine
            .authenticate(&bearer(&out.tokens.access_token))
            .await
            .unwrap();
        assert_eq!(earlier.claims.sid, out.session.id);
    }

    #[tokio::test]
    async fn test_logout_all_deactivates_but_keeps_sessions() {
        let (_, cache) = memory_cache();
        let h = harness(Some(cache.clone())).await;
        let laptop = login(&h, "laptop").await;
        let phone = login(&h, "phone").await;

        let outcome = h.engine.logout_all(h.user.id).await.unwrap();
        assert_eq!(outcome.tokens_revoked, 4);
        assert_eq!(outcome.sessions_deactivated, 2);

        for out in [&laptop, &phone] {
            let session = h.store.find_session(out.session.id).await.unwrap().unwrap();
            assert!(!session.is_active);

            assert_err!(
                h.engine
                    .authenticate(&bearer(&out.tokens.access_token))
                    .await
            );
            assert_err!(
                h.engine
                    .authenticate_refresh(&bearer(&out.tokens.refresh_token))
                    .await
            );
        }

        // mirrors are cleared; the blacklist entries stay
        let mirrored = cache
            .get(&keys::session(h.user.id, laptop.session.id))
            .await
            .unwrap();
        assert!(mirrored.is_none());
        assert!(
            cache
                .exists(&keys::blacklist(&TokenHash::of(&phone.tokens.access_token)))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_revocation_without_cache() {
        let h = harness(None).await;
        let laptop = login(&h, "laptop").await;
        let phone = login(&h, "phone").await;

        let access = h
            .engine
            .authenticate(&bearer(&laptop.tokens.access_token))
            .await
            .unwrap();
        h.engine
            .logout(&access.token_hash, access.claims.sub, access.claims.sid)
            .await
            .unwrap();

        assert_err!(
            h.engine
                .authenticate(&bearer(&laptop.tokens.access_token))
                .await
        );
        h.engine
            .authenticate(&bearer(&phone.tokens.access_token))
            .await
            .unwrap();

        let outcome = h.engine.logout_all(h.user.id).await.unwrap();
        assert_eq!(outcome.tokens_revoked, 2);
        assert_eq!(outcome.sessions_deactivated, 1);
        assert_err!(
            h.engine
                .authenticate(&bearer(&phone.tokens.access_token))
                .await
        );
    }
}

#[cfg(test)]
mod cache_failure_tests {
    use super::support::*;
    use crate::domain::repository::{SessionRepository, TokenRepository};
    use crate::domain::value_object::token_hash::TokenHash;
    use crate::{AuthError, ErrorKind};

    #[tokio::test]
    async fn test_logout_all_aborts_when_blacklist_write_fails() {
        let (mem, cache) = memory_cache();
        let h = harness(Some(cache)).await;
        let out = login(&h, "laptop").await;

        mem.set_failing(true);
        let err = h.engine.logout_all(h.user.id).await.unwrap_err();
        assert!(matches!(err, AuthError::Cache(_)));
        assert_eq!(err.kind(), ErrorKind::InternalServerError);

        // nothing was deleted or deactivated
        let session = h.store.find_session(out.session.id).await.unwrap().unwrap();
        assert!(session.is_active);
        let hash = TokenHash::of(&out.tokens.access_token);
        assert!(h.store.find_token_by_hash(&hash).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_logout_aborts_when_blacklist_write_fails() {
        let (mem, cache) = memory_cache();
        let h = harness(Some(cache)).await;
        let out = login(&h, "laptop").await;
        let hash = TokenHash::of(&out.tokens.access_token);

        mem.set_failing(true);
        let err = h
            .engine
            .logout(&hash, h.user.id, out.session.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Cache(_)));
        assert!(h.store.find_session(out.session.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unreachable_cache_falls_back_to_store() {
        let (mem, cache) = memory_cache();
        let h = harness(Some(cache)).await;
        let out = login(&h, "laptop").await;

        mem.set_failing(true);
        let access = h
            .engine
            .authenticate(&bearer(&out.tokens.access_token))
            .await
            .unwrap();
        assert_eq!(access.claims.sub, h.user.id);
        h.engine
            .authenticate_refresh(&bearer(&out.tokens.refresh_token))
            .await
            .unwrap();
    }
}

#[cfg(test)]
mod audit_tests {
    use super::support::*;
    use crate::application::{AuditQueue, AuditWorker, AuthOrchestrator, RegisterInput};
    use crate::domain::repository::TokenRepository;
    use crate::domain::value_object::token_hash::TokenHash;
    use crate::infra::memory::MemoryAuthRepository;
    use crate::AuthConfig;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_authenticated_token_is_marked_used_and_stays_valid() {
        let store = Arc::new(MemoryAuthRepository::new());
        let (queue, worker) = AuditWorker::spawn(store.clone(), 16);
        let engine = AuthOrchestrator::new(
            store.clone(),
            None,
            Arc::new(AuthConfig::development()),
            queue,
        );
        engine
            .register(RegisterInput {
                name: "Carol".into(),
                email: EMAIL.into(),
                password: PASSWORD.into(),
            })
            .await
            .unwrap();

        let out = engine
            .login(crate::application::LoginInput {
                email: EMAIL.into(),
                password: PASSWORD.into(),
                device: device("laptop"),
            })
            .await
            .unwrap();
        let header = bearer(&out.tokens.access_token);
        engine.authenticate(&header).await.unwrap();

        assert_eq!(worker.shutdown().await, 1);

        let record = store
            .find_token_by_hash(&TokenHash::of(&out.tokens.access_token))
            .await
            .unwrap()
            .unwrap();
        assert!(record.is_used());
        engine.authenticate(&header).await.unwrap();
    }

    #[tokio::test]
    async fn test_refresh_marks_the_refresh_token() {
        let store = Arc::new(MemoryAuthRepository::new());
        let (queue, worker) = AuditWorker::spawn(store.clone(), 16);
        let engine = AuthOrchestrator::new(
            store.clone(),
            None,
            Arc::new(AuthConfig::development()),
            queue,
        );
        engine
            .register(RegisterInput {
                name: "Carol".into(),
                email: EMAIL.into(),
                password: PASSWORD.into(),
            })
            .await
            .unwrap();
        let out = engine
            .login(crate::application::LoginInput {
                email: EMAIL.into(),
                password: PASSWORD.into(),
                device: device("laptop"),
            })
            .await
            .unwrap();

        let refresh = engine
            .authenticate_refresh(&bearer(&out.tokens.refresh_token))
            .await
            .unwrap();
        engine
            .refresh_token(crate::application::RefreshInput {
                refresh,
                device: device("laptop"),
            })
            .await
            .unwrap();
        worker.shutdown().await;

        let record = store
            .find_token_by_hash(&TokenHash::of(&out.tokens.refresh_token))
            .await
            .unwrap()
            .unwrap();
        assert!(record.is_used());
        // used refresh tokens are still accepted
        engine
            .authenticate_refresh(&bearer(&out.tokens.refresh_token))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_disabled_queue_leaves_records_untouched() {
        let (_, cache) = memory_cache();
        let h = harness_with(Some(cache), AuditQueue::disabled()).await;
        let out = login(&h, "laptop").await;
        h.engine
            .authenticate(&bearer(&out.tokens.access_token))
            .await
            .unwrap();

        let record = h
            .store
            .find_token_by_hash(&TokenHash::of(&out.tokens.access_token))
            .await
            .unwrap()
            .unwrap();
        assert!(!record.is_used());
    }
}

#[cfg(test)]
mod http_tests {
    use super::support::*;
    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::application::AuthOrchestrator;
    use crate::infra::memory::MemoryAuthRepository;
    use crate::presentation::{
        AuthAppState, PermissionGuard, require_access_token, require_permission,
    };
    use crate::auth_router;
    use axum::middleware::from_fn_with_state;
    use axum::routing::get;

    fn post(uri: &str, bearer_token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut req = Request::builder()
            .method("POST")
            .uri(uri)
            .header("x-device-id", "test-device");
        if let Some(token) = bearer_token {
            req = req.header(header::AUTHORIZATION, bearer(token));
        }
        match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn app() -> Router {
        let h = harness(None).await;
        auth_router(Arc::new(h.engine))
    }

    fn credentials() -> Value {
        json!({ "email": EMAIL, "password": PASSWORD })
    }

    #[tokio::test]
    async fn test_register_hides_password_hash() {
        let app = app().await;
        let (status, body) = send(
            &app,
            post(
                "/register",
                None,
                Some(json!({ "name": "Dave", "email": "Dave@Example.com", "password": PASSWORD })),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["email"], "dave@example.com");
        assert_eq!(body["user"]["emailVerified"], false);
        assert!(body["user"].get("passwordHash").is_none());

        let (status, _) = send(
            &app,
            post(
                "/register",
                None,
                Some(json!({ "name": "Dave", "email": "dave@example.com", "password": PASSWORD })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_login_refresh_logout_roundtrip() {
        let app = app().await;

        let (status, body) = send(&app, post("/login", None, Some(credentials()))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tokens"]["tokenType"], "Bearer");
        assert_eq!(body["session"]["deviceId"], "test-device");
        let access = body["tokens"]["accessToken"].as_str().unwrap().to_string();
        let refresh = body["tokens"]["refreshToken"].as_str().unwrap().to_string();

        let (status, body) = send(&app, post("/refresh", Some(&refresh), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tokens"]["refreshToken"], refresh.as_str());
        assert_ne!(body["tokens"]["accessToken"], access.as_str());

        // an access token cannot refresh
        let (status, _) = send(&app, post("/refresh", Some(&access), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, post("/logout", Some(&access), None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, post("/logout", Some(&access), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = send(&app, post("/refresh", Some(&refresh), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_logout_all_reports_counts() {
        let app = app().await;
        let (_, first) = send(&app, post("/login", None, Some(credentials()))).await;
        send(&app, post("/login", None, Some(credentials()))).await;
        let access = first["tokens"]["accessToken"].as_str().unwrap().to_string();

        let (status, body) = send(&app, post("/logout-all", Some(&access), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tokensRevoked"], 4);
        assert_eq!(body["sessionsDeactivated"], 2);
    }

    #[tokio::test]
    async fn test_failures_render_uniformly() {
        let app = app().await;

        let (missing, missing_body) = send(&app, post("/logout", None, None)).await;
        let (forged, forged_body) = send(&app, post("/logout", Some("a.b.c"), None)).await;
        assert_eq!(missing, StatusCode::UNAUTHORIZED);
        assert_eq!(forged, StatusCode::UNAUTHORIZED);
        assert_eq!(missing_body["detail"], forged_body["detail"]);

        let (status, _) = send(
            &app,
            post(
                "/login",
                None,
                Some(json!({ "email": EMAIL, "password": "wrong-password-1" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    /// One GET route behind `require_permission`, optionally behind the
    /// access layer as well.
    fn guarded(
        engine: &Arc<AuthOrchestrator<MemoryAuthRepository>>,
        path: &str,
        permission: &'static str,
        with_access_layer: bool,
    ) -> Router {
        let router = Router::new().route(path, get(|| async { StatusCode::OK })).route_layer(
            from_fn_with_state(
                PermissionGuard::new(engine.clone(), permission),
                require_permission::<MemoryAuthRepository>,
            ),
        );
        if !with_access_layer {
            return router;
        }
        router.route_layer(from_fn_with_state(
            AuthAppState {
                engine: engine.clone(),
            },
            require_access_token::<MemoryAuthRepository>,
        ))
    }

    #[tokio::test]
    async fn test_permission_guard_statuses() {
        let h = harness(None).await;
        seed_orders(&h.store, h.user.id);
        let access = login(&h, "laptop").await.tokens.access_token;
        let engine = Arc::new(h.engine);

        let app = Router::new()
            .merge(guarded(&engine, "/orders", "order.view", true))
            .merge(guarded(&engine, "/orders/new", "order.create", true))
            .merge(guarded(&engine, "/unlayered", "order.view", false));

        let get_with = |uri: &str| {
            Request::builder()
                .method("GET")
                .uri(uri)
                .header(header::AUTHORIZATION, bearer(&access))
                .body(Body::empty())
                .unwrap()
        };

        let (held, _) = send(&app, get_with("/orders")).await;
        assert_eq!(held, StatusCode::OK);

        // granted by the role, revoked by a per-user override
        let (revoked, body) = send(&app, get_with("/orders/new")).await;
        assert_eq!(revoked, StatusCode::FORBIDDEN);
        assert_eq!(body["status"], 403);

        let (unlayered, _) = send(&app, get_with("/unlayered")).await;
        assert_eq!(unlayered, StatusCode::UNAUTHORIZED);
    }
}
