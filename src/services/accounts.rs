use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{hash_password, verify_password, AuthService, TokenResponse};
use crate::entities::{address, user, Role};
use crate::errors::ServiceError;
use crate::models::double_option;
use crate::repositories::AccountStore;

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct RegisterInput {
    #[validate(email(message = "a valid email is required"))]
    pub email: String,
    #[validate(length(min = 6, max = 128, message = "password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 120, message = "name is required"))]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct LoginInput {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Issued token together with the account it belongs to
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: TokenResponse,
    pub user: user::Model,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateProfileInput {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct ChangePasswordInput {
    #[validate(length(min = 1))]
    pub current_password: String,
    #[validate(length(min = 6, max = 128, message = "password must be at least 6 characters"))]
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct AddressInput {
    #[validate(length(min = 1, max = 200, message = "address_line1 is required"))]
    pub address_line1: String,
    #[validate(length(max = 200))]
    pub address_line2: Option<String>,
    #[validate(length(min = 1, max = 100, message = "city is required"))]
    pub city: String,
    #[validate(length(min = 1, max = 100, message = "state is required"))]
    pub state: String,
    #[validate(length(min = 1, max = 20, message = "postal_code is required"))]
    pub postal_code: String,
    #[validate(length(min = 1, max = 100, message = "country is required"))]
    pub country: String,
    #[validate(length(min = 5, max = 32, message = "invalid phone number"))]
    pub phone: Option<String>,
}

/// Partial address update; `null` clears an optional field
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateAddressInput {
    #[validate(length(min = 1, max = 200))]
    pub address_line1: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub address_line2: Option<Option<String>>,
    #[validate(length(min = 1, max = 100))]
    pub city: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub state: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub postal_code: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub phone: Option<Option<String>>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn trimmed(value: String) -> String {
    value.trim().to_string()
}

/// Registration, login, profile and addresses
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn AccountStore>,
    auth: Arc<AuthService>,
}

impl AccountService {
    pub fn new(store: Arc<dyn AccountStore>, auth: Arc<AuthService>) -> Self {
        Self { store, auth }
    }

    /// New accounts are always customers.
    #[instrument(skip(self, input))]
    pub async fn register(&self, input: RegisterInput) -> Result<AuthResponse, ServiceError> {
        input.validate()?;
        let name = trimmed(input.name);
        if name.is_empty() {
            return Err(ServiceError::InvalidArgument("name is required".to_string()));
        }

        let now = Utc::now();
        let created = self
            .store
            .create_user(user::Model {
                id: Uuid::new_v4(),
                email: normalize_email(&input.email),
                password_hash: hash_password(&input.password)?,
                name,
                role: Role::Customer,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!(user_id = %created.id, "user registered");
        let token = self.auth.issue_token(&created)?;
        Ok(AuthResponse {
            token,
            user: created,
        })
    }

    /// Unknown email and wrong password fail the same way.
    #[instrument(skip(self, input))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthResponse, ServiceError> {
        input.validate()?;
        let invalid = || ServiceError::Unauthenticated("invalid email or password".to_string());

        let account = self
            .store
            .find_user_by_email(&normalize_email(&input.email))
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(&input.password, &account.password_hash) {
            warn!(user_id = %account.id, "failed login");
            return Err(invalid());
        }

        let token = self.auth.issue_token(&account)?;
        info!(user_id = %account.id, "user logged in");
        Ok(AuthResponse {
            token,
            user: account,
        })
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<user::Model, ServiceError> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    #[instrument(skip(self, input))]
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        input: UpdateProfileInput,
    ) -> Result<user::Model, ServiceError> {
        input.validate()?;
        let mut account = self.profile(user_id).await?;

        if let Some(name) = input.name {
            account.name = trimmed(name);
        }
        if let Some(email) = input.email {
            account.email = normalize_email(&email);
        }
        account.updated_at = Utc::now();

        let updated = self.store.update_user(account).await?;
        info!(%user_id, "profile updated");
        Ok(updated)
    }

    #[instrument(skip(self, input))]
    pub async fn change_password(
        &self,
        user_id: Uuid,
        input: ChangePasswordInput,
    ) -> Result<(), ServiceError> {
        input.validate()?;
        let mut account = self.profile(user_id).await?;

        if !verify_password(&input.current_password, &account.password_hash) {
            warn!(%user_id, "password change with wrong current password");
            return Err(ServiceError::InvalidArgument(
                "current password is incorrect".to_string(),
            ));
        }

        account.password_hash = hash_password(&input.new_password)?;
        account.updated_at = Utc::now();
        self.store.update_user(account).await?;
        info!(%user_id, "password changed");
        Ok(())
    }

    pub async fn list_addresses(&self, user_id: Uuid) -> Result<Vec<address::Model>, ServiceError> {
        self.store.list_addresses(user_id).await
    }

    #[instrument(skip(self, input))]
    pub async fn add_address(
        &self,
        user_id: Uuid,
        input: AddressInput,
    ) -> Result<address::Model, ServiceError> {
        input.validate()?;
        let now = Utc::now();
        let created = self
            .store
            .create_address(address::Model {
                id: Uuid::new_v4(),
                user_id,
                address_line1: trimmed(input.address_line1),
                address_line2: input.address_line2.map(trimmed),
                city: trimmed(input.city),
                state: trimmed(input.state),
                postal_code: trimmed(input.postal_code),
                country: trimmed(input.country),
                phone: input.phone.map(trimmed),
                created_at: now,
                updated_at: now,
            })
            .await?;
        info!(address_id = %created.id, "address added");
        Ok(created)
    }

    async fn owned_address(
        &self,
        user_id: Uuid,
        address_id: Uuid,
    ) -> Result<address::Model, ServiceError> {
        match self.store.find_address(address_id).await? {
            Some(found) if found.user_id == user_id => Ok(found),
            _ => Err(ServiceError::NotFound("Address not found".to_string())),
        }
    }

    #[instrument(skip(self, input))]
    pub async fn update_address(
        &self,
        user_id: Uuid,
        address_id: Uuid,
        input: UpdateAddressInput,
    ) -> Result<address::Model, ServiceError> {
        input.validate()?;
        let mut current = self.owned_address(user_id, address_id).await?;

        if let Some(line1) = input.address_line1 {
            current.address_line1 = trimmed(line1);
        }
        if let Some(line2) = input.address_line2 {
            current.address_line2 = line2.map(trimmed);
        }
        if let Some(city) = input.city {
            current.city = trimmed(city);
        }
        if let Some(state) = input.state {
            current.state = trimmed(state);
        }
        if let Some(postal_code) = input.postal_code {
            current.postal_code = trimmed(postal_code);
        }
        if let Some(country) = input.country {
            current.country = trimmed(country);
        }
        if let Some(phone) = input.phone {
            current.phone = phone.map(trimmed);
        }
        current.updated_at = Utc::now();

        self.store.update_address(current).await
    }

    #[instrument(skip(self))]
    pub async fn delete_address(&self, user_id: Uuid, address_id: Uuid) -> Result<(), ServiceError> {
        let found = self.owned_address(user_id, address_id).await?;
        if !self.store.delete_address(found.id).await? {
            return Err(ServiceError::NotFound("Address not found".to_string()));
        }
        info!(%address_id, "address deleted");
        Ok(())
    }
}
