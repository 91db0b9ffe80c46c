use axum::{extract::FromRequestParts, http::header};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use crate::{
    dto::auth::Claims,
    error::AppError,
    models::{ActorRef, Role},
};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
    pub shop_id: Option<Uuid>,
}

impl AuthUser {
    pub fn actor(&self) -> ActorRef {
        self.role.actor(self.user_id)
    }

    pub fn is_staff(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Moderator)
    }

    /// The shop a merchant acts for.
    pub fn own_shop(&self) -> Result<Uuid, AppError> {
        match (self.role, self.shop_id) {
            (Role::Merchant, Some(shop_id)) => Ok(shop_id),
            _ => Err(AppError::Forbidden),
        }
    }
}

pub fn ensure_role(user: &AuthUser, roles: &[Role]) -> Result<(), AppError> {
    if !roles.contains(&user.role) {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, &[Role::Admin])
}

pub fn ensure_staff(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, &[Role::Admin, Role::Moderator])
}

/// Staff see every shop, merchants only their own.
pub fn ensure_shop_access(user: &AuthUser, shop_id: Uuid) -> Result<(), AppError> {
    if user.is_staff() || user.own_shop().is_ok_and(|own| own == shop_id) {
        return Ok(());
    }
    Err(AppError::Forbidden)
}

/// Riders may only act on parcels handed to them. Other roles pass.
pub fn ensure_carrier(user: &AuthUser, rider_id: Option<Uuid>) -> Result<(), AppError> {
    if user.role == Role::Rider && rider_id != Some(user.user_id) {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;
    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::BadRequest("Missing Authorization header".into()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::BadRequest("Invalid Authorization header".into()))?;

        let Some(token) = auth_str.strip_prefix("Bearer ") else {
            return Err(AppError::BadRequest("Invalid Authorization scheme".into()));
        };

        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| AppError::Internal(anyhow::anyhow!("JWT_SECRET is not set")))?;

        let decoded = decode::<Claims>(
            token.trim(),
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AppError::BadRequest("Invalid or expired token".into()))?;

        user_from_claims(decoded.claims)
    }
}

fn user_from_claims(claims: Claims) -> Result<AuthUser, AppError> {
    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::BadRequest("Invalid user id in token".into()))?;
    let role = claims
        .role
        .parse::<Role>()
        .map_err(|_| AppError::Forbidden)?;
    let shop_id = claims
        .shop_id
        .as_deref()
        .map(Uuid::parse_str)
        .transpose()
        .map_err(|_| AppError::BadRequest("Invalid shop id in token".into()))?;

    Ok(AuthUser {
        user_id,
        role,
        shop_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: &str, shop_id: Option<Uuid>) -> Claims {
        Claims {
            sub: Uuid::nil().to_string(),
            role: role.to_string(),
            shop_id: shop_id.map(|id| id.to_string()),
            exp: 0,
        }
    }

    #[test]
    fn merchants_only_reach_their_own_shop() {
        let shop = Uuid::now_v7();
        let merchant = user_from_claims(claims("merchant", Some(shop))).unwrap();
        assert!(ensure_shop_access(&merchant, shop).is_ok());
        assert!(ensure_shop_access(&merchant, Uuid::now_v7()).is_err());
        assert!(matches!(merchant.actor(), ActorRef::Merchant(_)));
    }

    #[test]
    fn staff_reach_every_shop() {
        let moderator = user_from_claims(claims("moderator", None)).unwrap();
        assert!(ensure_shop_access(&moderator, Uuid::now_v7()).is_ok());
        assert!(ensure_staff(&moderator).is_ok());
        assert!(ensure_admin(&moderator).is_err());
        assert!(moderator.own_shop().is_err());
    }

    #[test]
    fn riders_only_touch_their_own_parcels() {
        let rider = AuthUser {
            user_id: Uuid::now_v7(),
            role: Role::Rider,
            shop_id: None,
        };
        assert!(ensure_carrier(&rider, Some(rider.user_id)).is_ok());
        assert!(matches!(
            ensure_carrier(&rider, Some(Uuid::now_v7())),
            Err(AppError::Forbidden)
        ));
        assert!(matches!(ensure_carrier(&rider, None), Err(AppError::Forbidden)));

        let moderator = user_from_claims(claims("moderator", None)).unwrap();
        assert!(ensure_carrier(&moderator, None).is_ok());
    }

    #[test]
    fn unknown_roles_are_rejected() {
        assert!(matches!(
            user_from_claims(claims("superuser", None)),
            Err(AppError::Forbidden)
        ));
    }
}
