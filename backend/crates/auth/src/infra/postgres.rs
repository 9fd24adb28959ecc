//! PostgreSQL Repository Implementations

use chrono::{DateTime, Utc};
use kernel::id::{MenuId, RoleId, SessionId, UserId};
use platform::password::HashedPassword;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::entity::{Menu, User, UserSession, UserToken};
use crate::domain::repository::{
    MenuRepository, PermissionRepository, SessionRepository, TokenRepository, UserRepository,
};
use crate::domain::value_object::{email::Email, token_hash::TokenHash, token_type::TokenType};
use crate::error::{AuthError, AuthResult};

/// PostgreSQL-backed auth repository
#[derive(Clone)]
pub struct PgAuthRepository {
    pool: PgPool,
}

impl PgAuthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Delete tokens and inactive sessions past their expiry.
    pub async fn cleanup_expired(&self) -> AuthResult<u64> {
        let now = Utc::now();

        let tokens = sqlx::query("DELETE FROM user_tokens WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?
            .rows_affected();

        let sessions = sqlx::query("DELETE FROM user_sessions WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::info!(
            tokens_deleted = tokens,
            sessions_deleted = sessions,
            "Cleaned up expired auth rows"
        );

        Ok(tokens + sessions)
    }
}

// ============================================================================
// User Repository Implementation
// ============================================================================

const USER_COLUMNS: &str = r#"
    id,
    name,
    email,
    avatar,
    password_hash,
    is_active,
    email_verified_at,
    failed_login_attempts,
    locked_until,
    last_login_at,
    created_at,
    updated_at
"#;

impl UserRepository for PgAuthRepository {
    async fn create_user(&self, user: &User) -> AuthResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (
                id,
                name,
                email,
                avatar,
                password_hash,
                is_active,
                email_verified_at,
                failed_login_attempts,
                locked_until,
                last_login_at,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(user.email.as_str())
        .bind(&user.avatar)
        .bind(user.password_hash.as_phc_string())
        .bind(user.is_active)
        .bind(user.email_verified_at)
        .bind(user.failed_login_attempts)
        .bind(user.locked_until)
        .bind(user.last_login_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            // Lost a race with a concurrent registration of the same email
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some("23505") => {
                Err(AuthError::EmailTaken)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user_by_id(&self, user_id: UserId) -> AuthResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn find_user_by_email(&self, email: &Email) -> AuthResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn email_exists(&self, email: &Email) -> AuthResult<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email.as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn increment_failed_logins(&self, user_id: UserId) -> AuthResult<i32> {
        let attempts = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE users SET
                failed_login_attempts = failed_login_attempts + 1,
                updated_at = NOW()
            WHERE id = $1
            RETURNING failed_login_attempts
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AuthError::UserNotFound)?;

        Ok(attempts)
    }

    async fn lock_user(&self, user_id: UserId, until: DateTime<Utc>) -> AuthResult<()> {
        sqlx::query("UPDATE users SET locked_until = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id.as_uuid())
            .bind(until)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn reset_login_lock(&self, user_id: UserId) -> AuthResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET
                failed_login_attempts = 0,
                locked_until = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_successful_login(&self, user_id: UserId, at: DateTime<Utc>) -> AuthResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET
                failed_login_attempts = 0,
                locked_until = NULL,
                last_login_at = $2,
                updated_at = $2
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// ============================================================================
// Session Repository Implementation
// ============================================================================

impl SessionRepository for PgAuthRepository {
    async fn create_session(&self, session: &UserSession) -> AuthResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_sessions (
                id,
                user_id,
                refresh_token_hash,
                device_id,
                device_fingerprint,
                device_name,
                device_type,
                ip_address,
                user_agent,
                is_active,
                expires_at,
                last_used_at,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(session.id.as_uuid())
        .bind(session.user_id.as_uuid())
        .bind(session.refresh_token_hash.as_str())
        .bind(&session.device_id)
        .bind(&session.device_fingerprint)
        .bind(&session.device_name)
        .bind(&session.device_type)
        .bind(&session.ip_address)
        .bind(&session.user_agent)
        .bind(session.is_active)
        .bind(session.expires_at)
        .bind(session.last_used_at)
        .bind(session.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_session(&self, session_id: SessionId) -> AuthResult<Option<UserSession>> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT
                id,
                user_id,
                refresh_token_hash,
                device_id,
                device_fingerprint,
                device_name,
                device_type,
                ip_address,
                user_agent,
                is_active,
                expires_at,
                last_used_at,
                created_at
            FROM user_sessions
            WHERE id = $1
            "#,
        )
        .bind(session_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(SessionRow::into_session))
    }

    async fn touch_session(&self, session_id: SessionId, at: DateTime<Utc>) -> AuthResult<()> {
        sqlx::query("UPDATE user_sessions SET last_used_at = $2 WHERE id = $1")
            .bind(session_id.as_uuid())
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_session(&self, session_id: SessionId) -> AuthResult<()> {
        sqlx::query("DELETE FROM user_sessions WHERE id = $1")
            .bind(session_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn deactivate_user_sessions(&self, user_id: UserId) -> AuthResult<u64> {
        let updated = sqlx::query(
            "UPDATE user_sessions SET is_active = FALSE WHERE user_id = $1 AND is_active",
        )
        .bind(user_id.as_uuid())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(updated)
    }
}

// ============================================================================
// Token Repository Implementation
// ============================================================================

impl TokenRepository for PgAuthRepository {
    async fn create_token(&self, token: &UserToken) -> AuthResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_tokens (
                id,
                user_id,
                token_hash,
                token_type,
                expires_at,
                used_at,
                ip_address,
                user_agent,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(token.id.as_uuid())
        .bind(token.user_id.as_uuid())
        .bind(token.token_hash.as_str())
        .bind(token.token_type.as_str())
        .bind(token.expires_at)
        .bind(token.used_at)
        .bind(&token.ip_address)
        .bind(&token.user_agent)
        .bind(token.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_token_by_hash(&self, token_hash: &TokenHash) -> AuthResult<Option<UserToken>> {
        let row = sqlx::query_as::<_, TokenRow>(
            r#"
            SELECT
                id,
                user_id,
                token_hash,
                token_type,
                expires_at,
                used_at,
                ip_address,
                user_agent,
                created_at
            FROM user_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TokenRow::into_token).transpose()
    }

    async fn find_live_tokens_for_user(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> AuthResult<Vec<UserToken>> {
        let rows = sqlx::query_as::<_, TokenRow>(
            r#"
            SELECT
                id,
                user_id,
                token_hash,
                token_type,
                expires_at,
                used_at,
                ip_address,
                user_agent,
                created_at
            FROM user_tokens
            WHERE user_id = $1 AND expires_at > $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TokenRow::into_token).collect()
    }

    async fn delete_tokens(&self, token_hashes: &[TokenHash]) -> AuthResult<u64> {
        if token_hashes.is_empty() {
            return Ok(0);
        }

        let hashes: Vec<&str> = token_hashes.iter().map(TokenHash::as_str).collect();
        let deleted = sqlx::query("DELETE FROM user_tokens WHERE token_hash = ANY($1)")
            .bind(&hashes)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted)
    }

    async fn delete_user_tokens(&self, user_id: UserId) -> AuthResult<u64> {
        let deleted = sqlx::query("DELETE FROM user_tokens WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted)
    }

    async fn mark_token_used(&self, token_hash: &TokenHash, at: DateTime<Utc>) -> AuthResult<()> {
        sqlx::query("UPDATE user_tokens SET used_at = $2 WHERE token_hash = $1")
            .bind(token_hash.as_str())
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

// ============================================================================
// Permission Repository Implementation
// ============================================================================

impl PermissionRepository for PgAuthRepository {
    async fn role_ids_for_user(&self, user_id: UserId) -> AuthResult<Vec<RoleId>> {
        let ids = sqlx::query_scalar::<_, Uuid>("SELECT role_id FROM user_roles WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;

        Ok(ids.into_iter().map(RoleId::from).collect())
    }

    async fn permission_slugs_for_roles(&self, role_ids: &[RoleId]) -> AuthResult<Vec<String>> {
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = role_ids.iter().map(|id| *id.as_uuid()).collect();
        let slugs = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT p.slug
            FROM role_permissions rp
            JOIN permissions p ON p.id = rp.permission_id
            WHERE rp.role_id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(slugs)
    }

    async fn permission_overrides_for_user(
        &self,
        user_id: UserId,
    ) -> AuthResult<HashMap<String, bool>> {
        let rows = sqlx::query_as::<_, (String, bool)>(
            r#"
            SELECT p.slug, up.granted
            FROM user_permissions up
            JOIN permissions p ON p.id = up.permission_id
            WHERE up.user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }
}

// ============================================================================
// Menu Repository Implementation
// ============================================================================

const MENU_SELECT: &str = r#"
    SELECT
        m.id,
        m.parent_id,
        m.name,
        m.slug,
        m.icon,
        m.route,
        m.display_order,
        m.is_active,
        COALESCE(
            ARRAY_AGG(p.slug ORDER BY p.slug) FILTER (WHERE p.slug IS NOT NULL),
            ARRAY[]::TEXT[]
        ) AS permissions
    FROM menus m
    LEFT JOIN menu_permissions mp ON mp.menu_id = m.id
    LEFT JOIN permissions p ON p.id = mp.permission_id
"#;

impl MenuRepository for PgAuthRepository {
    async fn find_root_menus(&self) -> AuthResult<Vec<Menu>> {
        let sql = format!(
            "{MENU_SELECT} WHERE m.parent_id IS NULL AND m.is_active \
             GROUP BY m.id ORDER BY m.display_order"
        );
        let rows = sqlx::query_as::<_, MenuRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(MenuRow::into_menu).collect())
    }

    async fn find_child_menus(&self, parent_id: MenuId) -> AuthResult<Vec<Menu>> {
        let sql = format!(
            "{MENU_SELECT} WHERE m.parent_id = $1 AND m.is_active \
             GROUP BY m.id ORDER BY m.display_order"
        );
        let rows = sqlx::query_as::<_, MenuRow>(&sql)
            .bind(parent_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(MenuRow::into_menu).collect())
    }
}

// ============================================================================
// Row Types
// ============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    avatar: Option<String>,
    password_hash: String,
    is_active: bool,
    email_verified_at: Option<DateTime<Utc>>,
    failed_login_attempts: i32,
    locked_until: Option<DateTime<Utc>>,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> AuthResult<User> {
        let email = Email::new(&self.email)
            .map_err(|e| AuthError::Internal(format!("Invalid stored email: {e}")))?;
        let password_hash = HashedPassword::from_phc_string(self.password_hash)
            .map_err(|e| AuthError::Internal(format!("Invalid stored password hash: {e}")))?;

        Ok(User {
            id: UserId::from(self.id),
            name: self.name,
            email,
            avatar: self.avatar,
            password_hash,
            is_active: self.is_active,
            email_verified_at: self.email_verified_at,
            failed_login_attempts: self.failed_login_attempts,
            locked_until: self.locked_until,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    user_id: Uuid,
    refresh_token_hash: String,
    device_id: String,
    device_fingerprint: String,
    device_name: Option<String>,
    device_type: String,
    ip_address: Option<String>,
    user_agent: Option<String>,
    is_active: bool,
    expires_at: DateTime<Utc>,
    last_used_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl SessionRow {
    fn into_session(self) -> UserSession {
        UserSession {
            id: SessionId::from(self.id),
            user_id: UserId::from(self.user_id),
            refresh_token_hash: TokenHash::from_digest(self.refresh_token_hash),
            device_id: self.device_id,
            device_fingerprint: self.device_fingerprint,
            device_name: self.device_name,
            device_type: self.device_type,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            is_active: self.is_active,
            expires_at: self.expires_at,
            last_used_at: self.last_used_at,
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TokenRow {
    id: Uuid,
    user_id: Uuid,
    token_hash: String,
    token_type: String,
    expires_at: DateTime<Utc>,
    used_at: Option<DateTime<Utc>>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    created_at: DateTime<Utc>,
}

impl TokenRow {
    fn into_token(self) -> AuthResult<UserToken> {
        let token_type = self
            .token_type
            .parse::<TokenType>()
            .map_err(|e| AuthError::Internal(format!("Invalid stored token type: {e}")))?;

        Ok(UserToken {
            id: self.id.into(),
            user_id: UserId::from(self.user_id),
            token_hash: TokenHash::from_digest(self.token_hash),
            token_type,
            expires_at: self.expires_at,
            used_at: self.used_at,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MenuRow {
    id: Uuid,
    parent_id: Option<Uuid>,
    name: String,
    slug: String,
    icon: Option<String>,
    route: Option<String>,
    display_order: i32,
    is_active: bool,
    permissions: Vec<String>,
}

impl MenuRow {
    fn into_menu(self) -> Menu {
        Menu {
            id: MenuId::from(self.id),
            parent_id: self.parent_id.map(MenuId::from),
            name: self.name,
            slug: self.slug,
            icon: self.icon,
            route: self.route,
            display_order: self.display_order,
            is_active: self.is_active,
            permissions: self.permissions,
            children: Vec::new(),
        }
    }
}
