use std::{io::Cursor, sync::Arc, sync::Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, header},
    response::Response,
};
use chrono::{DateTime, Duration, Utc};
use fake::{Fake, faker::internet::en::Username};
use http_body_util::BodyExt;
use image::{ImageFormat, RgbImage};
use mangashelf::{
    auth::issue_token,
    config::{Application, Config, Database, Jwt, Media, Notification, StorageKind},
    db::MemoryStore,
    media::LocalMediaStore,
    model::{Role, User},
    notification::{NotificationError, NotificationEvent, Notifier},
    routes::init_router,
    state::AppState,
};
use rand::Rng;
use serde::de::DeserializeOwned;
use tempfile::TempDir;
use tower::ServiceExt;

/// Captures everything the application tries to send.
#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<NotificationEvent>>,
    pub subscriptions: Mutex<Vec<(String, String, bool)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &NotificationEvent) -> Result<bool, NotificationError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(true)
    }

    async fn subscribe(&self, tokens: &[String], topic: &str) -> Result<(), NotificationError> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        for token in tokens {
            subscriptions.push((token.clone(), topic.to_string(), true));
        }
        Ok(())
    }

    async fn unsubscribe(&self, tokens: &[String], topic: &str) -> Result<(), NotificationError> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        for token in tokens {
            subscriptions.push((token.clone(), topic.to_string(), false));
        }
        Ok(())
    }
}

pub struct AppStateTest {
    pub app_state: AppState,
    pub notifier: Arc<RecordingNotifier>,
    _media_dir: TempDir,
}

fn test_config(allow_registration: bool, media_dir: &TempDir) -> Config {
    Config {
        application: Application {
            port: 0,
            host: "127.0.0.1".to_string(),
            allow_registration,
            run_migration: false,
            storage: StorageKind::Memory,
        },
        database: Database {
            username: "postgres".to_string(),
            password: "password".into(),
            host: "localhost".to_string(),
            port: 5432,
            database_name: "mangashelf".to_string(),
        },
        jwt: Jwt {
            secret: "test-secret".into(),
            iss: "mangashelf".into(),
            aud: "mangashelf".into(),
            expiry_hours: 1,
        },
        media: Media {
            base_path: media_dir.path().to_path_buf(),
            base_url: "http://localhost/files".to_string(),
            secure_base_url: "https://localhost/files".to_string(),
        },
        notification: Notification {
            enabled: false,
            endpoint: None,
        },
    }
}

impl AppStateTest {
    pub fn new(allow_registration: bool) -> Self {
        let media_dir = tempfile::tempdir().unwrap();
        let config = test_config(allow_registration, &media_dir);
        let notifier = Arc::new(RecordingNotifier::default());

        let app_state = AppState {
            store: Arc::new(MemoryStore::new()),
            media: Arc::new(LocalMediaStore::new(&config.media)),
            notifier: notifier.clone(),
            config,
        };

        AppStateTest {
            app_state,
            notifier,
            _media_dir: media_dir,
        }
    }

    pub async fn generate_response(&self, request: Request<Body>) -> Response {
        init_router(self.app_state.clone())
            .oneshot(request)
            .await
            .unwrap()
    }

    /// Inserts a user straight into the store and issues a token for it.
    pub async fn create_user(&self, role: Role) -> (User, String) {
        let suffix: u32 = rand::rng().random();
        let username = format!("{}_{}", Username().fake::<String>(), suffix);

        let mut tx = self.app_state.store.begin().await.unwrap();
        let user = tx
            .insert_user(
                User {
                    id: 0,
                    email: format!("{}@example.com", username),
                    username,
                    role,
                    display_name: None,
                    bio: None,
                    profile_image_url: None,
                    device_token: None,
                    created_at: Utc::now(),
                },
                "not-a-hash".to_string(),
            )
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let token = issue_token(&user.username, user.id, user.role, &self.app_state.config.jwt)
            .unwrap();

        (user, token)
    }

    /// Moves a manga's `updated_at` a day back and returns the new value.
    pub async fn backdate_manga(&self, id: i64) -> DateTime<Utc> {
        let past = Utc::now() - Duration::days(1);
        let mut tx = self.app_state.store.begin().await.unwrap();
        tx.touch_work(id, past).await.unwrap();
        tx.commit().await.unwrap();
        past
    }
}

pub fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    builder.body(Body::empty()).unwrap()
}

pub fn bytes_request(uri: &str, token: &str, bytes: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(bytes))
        .unwrap()
}

pub async fn response_json<T: DeserializeOwned>(response: Response) -> T {
    let response_body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&response_body).unwrap()
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    RgbImage::new(width, height)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}
