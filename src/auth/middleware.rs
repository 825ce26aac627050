use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::ApiError;
use crate::model::role::Role;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| ApiError::Store("App config missing".into()))?;

    let header_value = match req.headers().get("Authorization") {
        Some(h) => h.to_str().map_err(|_| {
            ApiError::Authentication("Invalid Authorization header encoding".into())
        })?,
        None => {
            return Err(ApiError::Authentication("Missing Authorization header".into()).into());
        }
    };

    let token = match header_value.strip_prefix("Bearer ") {
        Some(t) => t,
        None => {
            return Err(ApiError::Authentication(
                "Authorization header must start with Bearer".into(),
            )
            .into());
        }
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => {
            return Err(ApiError::Authentication("Invalid or expired token".into()).into());
        }
    };

    let role = match Role::from_str(&claims.role) {
        Some(role) => role,
        None => {
            return Err(ApiError::Authentication("Invalid role".into()).into());
        }
    };

    let auth_user = AuthUser {
        user_id: claims.user_id,
        email: claims.sub,
        role,
    };

    req.extensions_mut().insert(auth_user);

    next.call(req).await
}
