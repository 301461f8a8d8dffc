use std::borrow::Cow;

use anyhow::Context;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use validator::{Validate, ValidateEmail, ValidateLength, ValidationError, ValidationErrors};

use crate::{
    auth::{compute_password_hash, error::AuthError, issue_token, verify_password_hash},
    config::Jwt,
    db::Store,
    error::Error,
    model::{ProfilePatch, Role, User},
    notification::{NotificationEvent, Notifier, dispatch},
    services::invalid,
    telemetry::spawn_blocking_with_tracing,
};

#[derive(serde::Deserialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: SecretString,
    pub role: Role,
    pub display_name: Option<String>,
}

fn check_password(password: &SecretString, field: &'static str, errors: &mut ValidationErrors) {
    if !password
        .expose_secret()
        .validate_length(Some(6), Some(72), None)
    {
        errors.add(
            field,
            ValidationError::new("password_length")
                .with_message(Cow::from("Password length must be between 6 and 72")),
        );
    }
}

impl Validate for Registration {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.username.validate_length(Some(3), Some(50), None) {
            errors.add(
                "username",
                ValidationError::new("username_length")
                    .with_message(Cow::from("Username length must be between 3 and 50")),
            );
        }
        if !self.email.validate_email() {
            errors.add(
                "email",
                ValidationError::new("email_email")
                    .with_message(Cow::from("Incorrect email format")),
            );
        }
        if !self.email.validate_length(Some(1), Some(100), None) {
            errors.add(
                "email",
                ValidationError::new("email_length")
                    .with_message(Cow::from("Email length must be between 1 and 100")),
            );
        }
        check_password(&self.password, "password", &mut errors);
        if !matches!(self.role, Role::Creator | Role::Reader) {
            errors.add(
                "role",
                ValidationError::new("role_self_assign")
                    .with_message(Cow::from("Role must be CREATOR or READER")),
            );
        }

        if !errors.errors().is_empty() {
            return Err(errors);
        }

        Ok(())
    }
}

#[derive(serde::Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

#[derive(serde::Deserialize)]
pub struct PasswordChange {
    pub current_password: SecretString,
    pub new_password: SecretString,
}

impl Validate for PasswordChange {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_password(&self.new_password, "new_password", &mut errors);

        if !errors.errors().is_empty() {
            return Err(errors);
        }

        Ok(())
    }
}

#[derive(serde::Serialize, Debug)]
pub struct Session {
    pub token: String,
    pub user: User,
}

async fn hash_password(password: SecretString) -> Result<String, Error> {
    spawn_blocking_with_tracing(move || compute_password_hash(password))
        .await
        .context("compute password hash")
        .map_err(Error::Other)?
}

async fn check_credential(hash: String, password: SecretString) -> Result<(), Error> {
    spawn_blocking_with_tracing(move || verify_password_hash(hash, password))
        .await
        .context("verify password hash")
        .map_err(Error::Other)?
        .map_err(|_| Error::Auth(AuthError::IncorrectCredential))
}

#[tracing::instrument(name = "register user", skip_all, fields(username = %input.username))]
pub async fn register(
    store: &dyn Store,
    allow_registration: bool,
    input: Registration,
) -> Result<User, Error> {
    if !allow_registration {
        return Err(Error::Auth(AuthError::RegistrationClosed));
    }
    input.validate().map_err(Error::Validation)?;

    let password_hash = hash_password(input.password).await?;

    let mut tx = store.begin().await?;
    if tx.find_user_by_username(&input.username).await?.is_some() {
        return Err(Error::Conflict("username already taken".to_string()));
    }
    if tx.find_user_by_email(&input.email).await?.is_some() {
        return Err(Error::Conflict("email already taken".to_string()));
    }

    let user = tx
        .insert_user(
            User {
                id: 0,
                username: input.username,
                email: input.email,
                role: input.role,
                display_name: input.display_name,
                bio: None,
                profile_image_url: None,
                device_token: None,
                created_at: Utc::now(),
            },
            password_hash,
        )
        .await?;
    tx.commit().await?;

    tracing::info!(user_id = user.id, role = %user.role, "User registered");

    Ok(user)
}

/// Verifies the credentials and issues a token. A user with a registered
/// device gets a sign-in notification.
#[tracing::instrument(name = "login", skip_all, fields(username = %credentials.username))]
pub async fn login(
    store: &dyn Store,
    notifier: &dyn Notifier,
    jwt: &Jwt,
    credentials: Credentials,
) -> Result<Session, Error> {
    let mut tx = store.begin().await?;
    let (user, password_hash) = tx
        .find_user_credentials(&credentials.username)
        .await?
        .ok_or(Error::Auth(AuthError::IncorrectCredential))?;
    tx.commit().await?;

    check_credential(password_hash, credentials.password).await?;

    let token = issue_token(&user.username, user.id, user.role, jwt)?;

    if let Some(device_token) = user.device_token.as_deref().filter(|t| !t.is_empty()) {
        dispatch(notifier, NotificationEvent::login_success(&user, device_token)).await;
    }

    Ok(Session { token, user })
}

/// Loads the user a token was issued to. A token whose user no longer exists
/// does not authenticate.
#[tracing::instrument(name = "resolve actor", skip(store))]
pub async fn resolve_actor(store: &dyn Store, user_id: i64) -> Result<User, Error> {
    let mut tx = store.begin().await?;
    let user = tx
        .find_user(user_id)
        .await?
        .ok_or(Error::Auth(AuthError::Unauthenticated))?;
    tx.commit().await?;

    Ok(user)
}

#[tracing::instrument(name = "update profile", skip_all, fields(actor_id = actor.id))]
pub async fn update_profile(
    store: &dyn Store,
    actor: &User,
    patch: ProfilePatch,
) -> Result<User, Error> {
    patch.validate().map_err(Error::Validation)?;

    let mut tx = store.begin().await?;
    let mut user = tx
        .find_user(actor.id)
        .await?
        .ok_or(Error::Auth(AuthError::Unauthenticated))?;

    if let Some(email) = patch.email.as_deref().filter(|email| *email != user.email) {
        if tx.find_user_by_email(email).await?.is_some() {
            return Err(Error::Conflict("email already taken".to_string()));
        }
    }

    patch.apply(&mut user);
    tx.update_user(&user).await?;
    tx.commit().await?;

    Ok(user)
}

#[tracing::instrument(name = "change password", skip_all, fields(actor_id = actor.id))]
pub async fn change_password(
    store: &dyn Store,
    actor: &User,
    change: PasswordChange,
) -> Result<(), Error> {
    change.validate().map_err(Error::Validation)?;

    let current_hash = {
        let mut tx = store.begin().await?;
        let (_, hash) = tx
            .find_user_credentials(&actor.username)
            .await?
            .ok_or(Error::Auth(AuthError::Unauthenticated))?;
        tx.commit().await?;
        hash
    };

    check_credential(current_hash, change.current_password).await?;
    let new_hash = hash_password(change.new_password).await?;

    let mut tx = store.begin().await?;
    tx.update_user_password(actor.id, new_hash).await?;
    tx.commit().await?;

    tracing::info!("Password changed");

    Ok(())
}

/// Stores the device token of the actor and moves the role topic
/// subscription from the previous token to the new one.
#[tracing::instrument(name = "register device", skip_all, fields(actor_id = actor.id))]
pub async fn register_device(
    store: &dyn Store,
    notifier: &dyn Notifier,
    actor: &User,
    device_token: String,
) -> Result<User, Error> {
    if device_token.trim().is_empty() {
        return Err(invalid(
            "device_token",
            "device_token_blank",
            "Device token must not be blank",
        ));
    }

    let (user, previous) = {
        let mut tx = store.begin().await?;
        let mut user = tx
            .find_user(actor.id)
            .await?
            .ok_or(Error::Auth(AuthError::Unauthenticated))?;
        let previous = user.device_token.replace(device_token.clone());
        tx.update_user(&user).await?;
        tx.commit().await?;
        (user, previous)
    };

    let topic = user.role.topic();

    if let Some(previous) = previous.filter(|p| *p != device_token) {
        if let Err(error) = notifier
            .unsubscribe(std::slice::from_ref(&previous), &topic)
            .await
        {
            tracing::warn!(err.msg = %error, err.details = ?error, "Failed to unsubscribe previous device");
        }
    }

    match notifier
        .subscribe(std::slice::from_ref(&device_token), &topic)
        .await
    {
        Ok(()) => {
            dispatch(
                notifier,
                NotificationEvent::topic_subscription_changed(&device_token, &topic, true),
            )
            .await;
        }
        Err(error) => {
            tracing::warn!(err.msg = %error, err.details = ?error, "Failed to subscribe device");
        }
    }

    Ok(user)
}
