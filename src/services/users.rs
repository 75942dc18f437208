use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::AuthService,
    entities::{user, User},
    errors::ServiceError,
    events::{Event, EventSender},
};

pub const TIER_MIN: i32 = 1;
pub const TIER_MAX: i32 = 3;

#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
    auth: AuthService,
    event_sender: EventSender,
}

impl UserService {
    pub fn new(db: Arc<DatabaseConnection>, auth: AuthService, event_sender: EventSender) -> Self {
        Self {
            db,
            auth,
            event_sender,
        }
    }

    /// Registers a new user at tier 1 with empty history. Emails are
    /// stored lowercased; a duplicate registration is a conflict, not an
    /// auth failure, so the client can prompt for sign-in instead.
    #[instrument(skip(self, password))]
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        name: Option<String>,
    ) -> Result<(user::Model, String), ServiceError> {
        let email = email.trim().to_lowercase();

        let existing = User::find()
            .filter(user::Column::Email.eq(email.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "an account for '{}' already exists",
                email
            )));
        }

        let password_hash = self.auth.hash_password(password)?;

        let row = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email),
            password_hash: Set(password_hash),
            name: Set(name),
            tier: Set(TIER_MIN),
            order_history: Set(serde_json::json!([])),
            coupons_used: Set(serde_json::json!([])),
            status: Set("active".to_string()),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };
        let user = row.insert(&*self.db).await?;

        let token = self.auth.generate_token(&user)?;
        self.event_sender
            .send(Event::UserRegistered(user.id))
            .await;

        Ok((user, token))
    }

    /// Password sign-in. Unknown email and wrong password produce the same
    /// error so the endpoint does not leak which emails are registered.
    #[instrument(skip(self, password))]
    pub async fn signin(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(user::Model, String), ServiceError> {
        let email = email.trim().to_lowercase();

        let user = User::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::AuthError("invalid email or password".to_string()))?;

        if !self.auth.verify_password(password, &user.password_hash)? {
            return Err(ServiceError::AuthError(
                "invalid email or password".to_string(),
            ));
        }
        if user.status != "active" {
            return Err(ServiceError::Forbidden("account is disabled".to_string()));
        }

        let token = self.auth.generate_token(&user)?;
        Ok((user, token))
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, user_id: Uuid) -> Result<user::Model, ServiceError> {
        User::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user {}", user_id)))
    }

    /// Moves a user to a new membership tier, widening or narrowing the
    /// catalog they can see.
    #[instrument(skip(self))]
    pub async fn update_tier(&self, user_id: Uuid, tier: i32) -> Result<user::Model, ServiceError> {
        if !(TIER_MIN..=TIER_MAX).contains(&tier) {
            return Err(ServiceError::ValidationError(format!(
                "tier must be between {} and {}",
                TIER_MIN, TIER_MAX
            )));
        }

        let user = self.get_user(user_id).await?;
        let mut active: user::ActiveModel = user.into();
        active.tier = Set(tier);
        active.updated_at = Set(Some(Utc::now()));
        Ok(active.update(&*self.db).await?)
    }
}
