use crate::{
    auth::AuthService,
    db::DbPool,
    entities::user::{self, Entity as UserEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Request/Response types for the user service

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserProfile {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

/// Service for account registration and credential login
#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DbPool>,
    auth_service: Arc<AuthService>,
    event_sender: Option<Arc<EventSender>>,
}

impl UserService {
    pub fn new(
        db_pool: Arc<DbPool>,
        auth_service: Arc<AuthService>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db_pool,
            auth_service,
            event_sender,
        }
    }

    /// Registers a new account and returns a fresh token
    #[instrument(skip(self, request))]
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;
        let email = request.email.trim().to_ascii_lowercase();

        let existing = UserEntity::find()
            .filter(user::Column::Email.eq(email.clone()))
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to check for existing account");
                ServiceError::DatabaseError(e)
            })?;

        if existing.is_some() {
            return Err(ServiceError::Conflict(
                "An account with this email already exists".to_string(),
            ));
        }

        let password_hash = self.auth_service.hash_password(&request.password)?;
        let now = Utc::now();
        let user_id = Uuid::new_v4();

        let model = user::ActiveModel {
            id: Set(user_id),
            email: Set(email),
            name: Set(request.name.trim().to_string()),
            password_hash: Set(password_hash),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create account");
            ServiceError::DatabaseError(e)
        })?;

        info!(user_id = %user_id, "Account registered");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::UserRegistered(user_id)).await {
                warn!(error = %e, user_id = %user_id, "Failed to send user registered event");
            }
        }

        let token = self.auth_service.create_token(&model)?;
        Ok(AuthResponse {
            token,
            user: model.into(),
        })
    }

    /// Verifies credentials and returns a fresh token.
    ///
    /// Failures never reveal whether the email or the password was wrong.
    #[instrument(skip(self, request))]
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;
        let email = request.email.trim().to_ascii_lowercase();

        let user = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to look up account for login");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::AuthError("Invalid email or password".to_string()))?;

        let verified = self
            .auth_service
            .verify_password(&request.password, &user.password_hash)?;
        if !verified {
            warn!(user_id = %user.id, "Login attempt with wrong password");
            return Err(ServiceError::AuthError(
                "Invalid email or password".to_string(),
            ));
        }

        info!(user_id = %user.id, "User logged in");

        let token = self.auth_service.create_token(&user)?;
        Ok(AuthResponse {
            token,
            user: user.into(),
        })
    }
}
