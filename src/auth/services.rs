use axum::extract::FromRef;
use bson::{oid::ObjectId, DateTime};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use validator::Validate;

use super::{
    claims::Identity,
    dto::{
        LoginRequest, LoginResponse, PublicUser, RefreshRequest, RegisterRequest,
        RegisterResponse, UserResponse,
    },
    jwt::JwtKeys,
    password::{check_password, hash_password, PasswordCheck},
    repo::UserStore,
    repo_types::User,
};
use crate::{
    error::{ApiError, ApiResult, StoreError},
    state::AppState,
    worker::run_bounded,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Emails are stored and matched as typed; only surrounding whitespace is dropped.
fn clean_email(email: &str) -> String {
    email.trim().to_string()
}

/// Creates a user and returns an access token for it.
///
/// The email count check and the insert are separate store calls; the unique index on
/// `email` turns a lost race into [`ApiError::DuplicateEmail`] as well.
pub async fn register(state: &AppState, mut req: RegisterRequest) -> ApiResult<RegisterResponse> {
    req.email = clean_email(&req.email);
    req.validate()?;

    let users = state.users.clone();
    let keys = JwtKeys::from_ref(state);
    run_bounded(state.write_deadlines(), async move {
        if users.count_by_email(&req.email).await? > 0 {
            warn!(email = %req.email, "email already registered");
            return Err(ApiError::DuplicateEmail);
        }

        let password = hash_password(&req.password).map_err(ApiError::Internal)?;
        let now = DateTime::now();
        let mut user = User {
            id: None,
            user_id: ObjectId::new().to_hex(),
            email: req.email,
            password,
            first_name: req.first_name,
            last_name: req.last_name,
            role: req.role,
            favourite_genres: req.favourite_genres,
            token: None,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        let token = keys.sign_access(&Identity::from(&user))?;
        user.token = Some(token.clone());

        match users.insert(&user).await {
            Ok(()) => {}
            Err(StoreError::Duplicate) => {
                warn!(email = %user.email, "email taken between check and insert");
                return Err(ApiError::DuplicateEmail);
            }
            Err(e) => return Err(e.into()),
        }

        info!(user_id = %user.user_id, email = %user.email, "user registered");
        Ok(RegisterResponse {
            token,
            user: PublicUser::from(&user),
        })
    })
    .await
    .into_result()
}

/// Verifies credentials and rotates the user's token pair.
///
/// Unknown email and wrong password are indistinguishable to the caller.
pub async fn login(state: &AppState, mut req: LoginRequest) -> ApiResult<LoginResponse> {
    req.email = clean_email(&req.email);
    if !is_valid_email(&req.email) {
        warn!(email = %req.email, "invalid email");
        return Err(ApiError::bad_request("Invalid email"));
    }

    let users = state.users.clone();
    let keys = JwtKeys::from_ref(state);
    run_bounded(state.write_deadlines(), async move {
        let Some(user) = users.find_by_email(&req.email).await? else {
            warn!(email = %req.email, "login unknown email");
            return Err(ApiError::InvalidCredentials);
        };

        match check_password(&req.password, &user.password) {
            PasswordCheck::Match => {}
            PasswordCheck::Mismatch => {
                warn!(user_id = %user.user_id, "login invalid password");
                return Err(ApiError::InvalidCredentials);
            }
            PasswordCheck::UnreadableHash => {
                warn!(user_id = %user.user_id, "stored password hash unreadable");
                return Err(ApiError::InvalidCredentials);
            }
        }

        let response = issue_session(&keys, users.as_ref(), &user).await?;
        info!(user_id = %user.user_id, email = %user.email, "user logged in");
        Ok(LoginResponse { response })
    })
    .await
    .into_result()
}

/// Exchanges the current refresh token for a new pair.
///
/// Only the most recently issued refresh token is accepted.
pub async fn refresh(state: &AppState, req: RefreshRequest) -> ApiResult<LoginResponse> {
    let keys = JwtKeys::from_ref(state);
    let claims = keys.verify_refresh(&req.refresh_token).map_err(|e| {
        warn!(error = %e, "refresh token rejected");
        ApiError::Unauthorized("Invalid refresh token".into())
    })?;

    let users = state.users.clone();
    run_bounded(state.write_deadlines(), async move {
        let user = users
            .find_by_user_id(&claims.sub)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Invalid refresh token".into()))?;

        if user.refresh_token.as_deref() != Some(req.refresh_token.as_str()) {
            warn!(user_id = %user.user_id, "superseded refresh token presented");
            return Err(ApiError::Unauthorized("Invalid refresh token".into()));
        }

        let response = issue_session(&keys, users.as_ref(), &user).await?;
        info!(user_id = %user.user_id, "tokens refreshed");
        Ok(LoginResponse { response })
    })
    .await
    .into_result()
}

/// Overwrites the stored token pair of `user_id`.
pub async fn record_tokens(
    users: &dyn UserStore,
    user_id: &str,
    access: &str,
    refresh: &str,
) -> ApiResult<()> {
    let matched = users
        .update_tokens(user_id, access, refresh, DateTime::now())
        .await?;
    if !matched {
        return Err(ApiError::Persistence(anyhow::anyhow!(
            "no user {user_id} to record tokens on"
        )));
    }
    Ok(())
}

async fn issue_session(keys: &JwtKeys, users: &dyn UserStore, user: &User) -> ApiResult<UserResponse> {
    let who = Identity::from(user);
    let token = keys.sign_access(&who)?;
    let refresh_token = keys.sign_refresh(&who)?;
    record_tokens(users, &user.user_id, &token, &refresh_token).await?;

    Ok(UserResponse {
        user_id: user.user_id.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        email: user.email.clone(),
        role: user.role,
        favourite_genres: user.favourite_genres.clone(),
        token,
        refresh_token,
    })
}
