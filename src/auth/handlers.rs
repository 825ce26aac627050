use crate::{
    auth::{
        auth::AuthUser,
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    error::ApiError,
    model::{role::Role, user::{User, UserProfile}},
    models::{Claims, LoginReqDto, RegisterReq, TokenType},
};
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

use crate::utils::email_cache;
use crate::utils::email_filter;

const MIN_PASSWORD_LEN: usize = 6;

/// Role/manager invariants checked before anything touches the database.
/// The schema CHECK constraint is only defense in depth behind this.
pub(crate) fn validate_registration(payload: &RegisterReq) -> Result<Role, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("Name is required".into()));
    }

    let email = payload.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::Validation("Valid email is required".into()));
    }

    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters".into(),
        ));
    }

    let role = Role::from_str(&payload.role)
        .ok_or_else(|| ApiError::Validation("Role must be employee or manager".into()))?;

    match role {
        Role::Employee if payload.manager_id.is_none() => Err(ApiError::Validation(
            "Manager is required for employee registration".into(),
        )),
        Role::Manager if payload.manager_id.is_some() => Err(ApiError::Validation(
            "Managers cannot be assigned to another manager".into(),
        )),
        _ => Ok(role),
    }
}

/// Display code assigned at registration: EMP001, EMP002, ... / MGR001, ...
pub(crate) fn format_employee_code(role: &Role, ordinal: i64) -> String {
    format!("{}{:03}", role.code_prefix(), ordinal)
}

async fn next_employee_code(role: &Role, pool: &PgPool) -> Result<String, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = $1")
        .bind(role.as_str())
        .fetch_one(pool)
        .await?;

    Ok(format_employee_code(role, count + 1))
}

/// true  => email AVAILABLE
/// false => email TAKEN
pub async fn is_email_available(email: &str, pool: &PgPool) -> bool {
    let email = email.to_lowercase();

    // 1. Cuckoo filter — fast negative
    if !email_filter::might_exist(&email) {
        return true;
    }

    // 2. Moka cache — fast positive
    if email_cache::is_taken(&email).await {
        return false;
    }

    // 3. Database fallback
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(&email)
            .fetch_one(pool)
            .await
            .unwrap_or(true); // fail-safe

    !exists
}

async fn store_refresh_token(pool: &PgPool, user_id: i64, claims: &Claims) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES ($1, $2, to_timestamp($3))
        "#,
    )
    .bind(user_id)
    .bind(&claims.jti)
    .bind(claims.exp as i64)
    .execute(pool)
    .await?;

    Ok(())
}

/// User registration handler
pub async fn register(
    payload: web::Json<RegisterReq>,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let role = validate_registration(&payload)?;
    let email = payload.email.trim().to_lowercase();

    if !is_email_available(&email, pool.get_ref()).await {
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    // Employees must point at an existing manager
    if role == Role::Employee {
        let manager_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1 AND role = 'manager')",
        )
        .bind(payload.manager_id)
        .fetch_one(pool.get_ref())
        .await?;

        if !manager_exists {
            return Err(ApiError::Validation("Invalid manager selected".into()));
        }
    }

    let hashed = hash_password(&payload.password)
        .map_err(|e| ApiError::Store(format!("Password hashing failed: {e}")))?;

    let employee_code = next_employee_code(&role, pool.get_ref()).await?;

    let manager_id = match role {
        Role::Employee => payload.manager_id,
        Role::Manager => None,
    };

    let inserted = sqlx::query_as::<_, UserProfile>(
        r#"
        INSERT INTO users (name, email, password, role, employee_code, department, manager_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, name, email, role, employee_code, department, manager_id, created_at
        "#,
    )
    .bind(payload.name.trim())
    .bind(&email)
    .bind(&hashed)
    .bind(role.as_str())
    .bind(&employee_code)
    .bind(&payload.department)
    .bind(manager_id)
    .fetch_one(pool.get_ref())
    .await;

    let user = match inserted {
        Ok(user) => {
            // keep the filter and cache in step with the new row
            email_filter::insert(&email);
            email_cache::mark_taken(&email).await;
            user
        }
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23505") {
                    return Err(ApiError::Conflict("Email already registered".into()));
                }
            }
            error!(error = %e, "Failed to register user");
            return Err(e.into());
        }
    };

    let access_token = generate_access_token(
        user.id,
        user.email.clone(),
        user.role.clone(),
        &config.jwt_secret,
        config.access_token_ttl,
    );

    let (refresh_token, refresh_claims) = generate_refresh_token(
        user.id,
        user.email.clone(),
        user.role.clone(),
        &config.jwt_secret,
        config.refresh_token_ttl,
    );

    store_refresh_token(pool.get_ref(), user.id, &refresh_claims).await?;

    info!(user_id = user.id, role = %user.role, "User registered");

    Ok(HttpResponse::Created().json(json!({
        "message": "Registration successful",
        "access_token": access_token,
        "refresh_token": refresh_token,
        "user": user,
    })))
}

#[instrument(
    name = "auth_login",
    skip(pool, config, payload),
    fields(email = %payload.email)
)]
pub async fn login(
    payload: web::Json<LoginReqDto>,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    info!("Login request received");

    if payload.email.trim().is_empty() || payload.password.is_empty() {
        info!("Validation failed: empty email or password");
        return Err(ApiError::Validation("Email and password required".into()));
    }

    debug!("Fetching user from database");

    let db_user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, password, role, employee_code, department, manager_id
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(payload.email.trim().to_lowercase())
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Database error while fetching user");
        ApiError::from(e)
    })?
    .ok_or_else(|| {
        info!("Invalid credentials: user not found");
        ApiError::Authentication("Invalid credentials".into())
    })?;

    debug!(user_id = db_user.id, "User found, verifying password");

    if verify_password(&payload.password, &db_user.password).is_err() {
        info!("Invalid credentials: password mismatch");
        return Err(ApiError::Authentication("Invalid credentials".into()));
    }

    let access_token = generate_access_token(
        db_user.id,
        db_user.email.clone(),
        db_user.role.clone(),
        &config.jwt_secret,
        config.access_token_ttl,
    );

    let (refresh_token, refresh_claims) = generate_refresh_token(
        db_user.id,
        db_user.email.clone(),
        db_user.role.clone(),
        &config.jwt_secret,
        config.refresh_token_ttl,
    );

    debug!(
        user_id = db_user.id,
        jti = %refresh_claims.jti,
        "Storing refresh token"
    );

    store_refresh_token(pool.get_ref(), db_user.id, &refresh_claims)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to store refresh token");
            ApiError::from(e)
        })?;

    // Non-fatal: login still succeeds if this write fails
    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
        .bind(db_user.id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
    }

    info!("Login successful");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Login successful",
        "access_token": access_token,
        "refresh_token": refresh_token,
        "user": {
            "id": db_user.id,
            "name": db_user.name,
            "email": db_user.email,
            "role": db_user.role,
            "employee_code": db_user.employee_code,
            "department": db_user.department,
            "manager_id": db_user.manager_id,
        },
    })))
}

/// Current profile for the bearer token
pub async fn me(auth: AuthUser, pool: web::Data<PgPool>) -> Result<HttpResponse, ApiError> {
    let user = sqlx::query_as::<_, UserProfile>(
        r#"
        SELECT id, name, email, role, employee_code, department, manager_id, created_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(auth.user_id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(HttpResponse::Ok().json(json!({ "user": user })))
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct ManagerRow {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "Sam Lee")]
    pub name: String,
    #[schema(example = "sam.lee@company.com")]
    pub email: String,
    #[schema(example = "MGR001")]
    pub employee_code: String,
    #[schema(example = "Engineering", nullable = true)]
    pub department: Option<String>,
}

/// Public list of managers, shown on the employee registration form
pub async fn list_managers(pool: web::Data<PgPool>) -> Result<HttpResponse, ApiError> {
    let managers = sqlx::query_as::<_, ManagerRow>(
        r#"
        SELECT id, name, email, employee_code, department
        FROM users
        WHERE role = 'manager'
        ORDER BY name
        "#,
    )
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(json!({ "managers": managers })))
}

pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::Authentication("No token".into()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Authentication("Invalid token".into()))?;

    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| ApiError::Authentication("Invalid or expired token".into()))?;

    if claims.token_type != TokenType::Refresh {
        return Err(ApiError::Authentication("Not a refresh token".into()));
    }

    let record: Option<(i64, i64, bool)> = sqlx::query_as(
        r#"
        SELECT id, user_id, revoked
        FROM refresh_tokens
        WHERE jti = $1
        "#,
    )
    .bind(&claims.jti)
    .fetch_optional(pool.get_ref())
    .await?;

    let (record_id, user_id) = match record {
        Some((id, user_id, false)) => (id, user_id),
        _ => return Err(ApiError::Authentication("Refresh token revoked".into())),
    };

    // rotate: revoke old refresh token before issuing the next one
    sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = $1")
        .bind(record_id)
        .execute(pool.get_ref())
        .await?;

    let (new_refresh_token, new_claims) = generate_refresh_token(
        claims.user_id,
        claims.sub.clone(),
        claims.role.clone(),
        &config.jwt_secret,
        config.refresh_token_ttl,
    );

    store_refresh_token(pool.get_ref(), user_id, &new_claims).await?;

    let access_token = generate_access_token(
        claims.user_id,
        claims.sub.clone(),
        claims.role.clone(),
        &config.jwt_secret,
        config.access_token_ttl,
    );

    Ok(HttpResponse::Ok().json(json!({
        "access_token": access_token,
        "refresh_token": new_refresh_token
    })))
}

pub async fn logout(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
) -> HttpResponse {
    let header = match req.headers().get("Authorization") {
        Some(h) => h.to_str().unwrap_or(""),
        None => return HttpResponse::NoContent().finish(),
    };

    let token = match header.strip_prefix("Bearer ") {
        Some(t) => t,
        None => return HttpResponse::NoContent().finish(),
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return HttpResponse::NoContent().finish(),
    };

    // only refresh tokens can log out
    if claims.token_type != TokenType::Refresh {
        return HttpResponse::NoContent().finish();
    }

    // revoke refresh token (idempotent; succeeds even if it never existed)
    let _ = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = $1")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await;

    HttpResponse::NoContent().finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(role: &str, manager_id: Option<i64>) -> RegisterReq {
        RegisterReq {
            name: "Jane Doe".into(),
            email: "jane@company.com".into(),
            password: "secret123".into(),
            role: role.into(),
            department: Some("Engineering".into()),
            manager_id,
        }
    }

    #[test]
    fn employee_without_manager_is_rejected() {
        let err = validate_registration(&req("employee", None)).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn manager_with_manager_is_rejected() {
        let err = validate_registration(&req("manager", Some(1))).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn valid_shapes_pass() {
        assert_eq!(
            validate_registration(&req("employee", Some(1))).unwrap(),
            Role::Employee
        );
        assert_eq!(
            validate_registration(&req("manager", None)).unwrap(),
            Role::Manager
        );
    }

    #[test]
    fn unknown_role_is_rejected() {
        let err = validate_registration(&req("admin", None)).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn short_password_is_rejected() {
        let mut payload = req("manager", None);
        payload.password = "pw".into();
        let err = validate_registration(&payload).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn mangled_email_is_rejected() {
        let mut payload = req("manager", None);
        payload.email = "not-an-email".into();
        let err = validate_registration(&payload).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn employee_codes_are_zero_padded() {
        assert_eq!(format_employee_code(&Role::Employee, 1), "EMP001");
        assert_eq!(format_employee_code(&Role::Employee, 42), "EMP042");
        assert_eq!(format_employee_code(&Role::Manager, 7), "MGR007");
        assert_eq!(format_employee_code(&Role::Manager, 1234), "MGR1234");
    }
}
