//! Test utilities for handler and integration tests.

use crate::config::{Config, EmailTransportKind};
use crate::email::Notifier;
use crate::upload::UploadStore;
use crate::{AppState, build_router};
use axum_test::TestServer;
use lettre::address::Envelope;
use lettre::transport::stub::AsyncStubTransport;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A running test server plus the handles tests need to observe side effects.
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    // Keeps the uploads directory alive for the duration of the test
    _uploads: TempDir,
}

impl TestApp {
    /// Files currently in the uploads directory
    pub fn uploaded_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(self.state.uploads.dir())
            .expect("Failed to read uploads directory")
            .map(|entry| entry.expect("Failed to read directory entry").path())
            .collect();
        files.sort();
        files
    }

    /// Emails recorded by the stub transport, in send order
    pub async fn sent_messages(&self) -> Vec<(Envelope, String)> {
        self.state.notifier.sent_messages().await
    }
}

pub fn create_test_config(uploads_dir: &Path) -> Config {
    let mut config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        uploads_dir: uploads_dir.to_path_buf(),
        ..Default::default()
    };
    config.email.transport = EmailTransportKind::File;
    config.email.file.path = std::env::temp_dir().join(format!("acars-test-emails-{}", std::process::id()));
    config.email.from_email = Some("website@acars.test".to_string());
    config
}

pub fn create_test_app() -> TestApp {
    create_test_app_with(AsyncStubTransport::new_ok(), |_| {})
}

/// Test app whose mail relay fails every send
pub fn create_failing_test_app() -> TestApp {
    create_test_app_with(AsyncStubTransport::new_error(), |_| {})
}

pub fn create_test_app_with(stub: AsyncStubTransport, configure: impl FnOnce(&mut Config)) -> TestApp {
    build_test_app(configure, |config| Notifier::with_stub(config, stub))
}

/// Test app whose mail relay delivers `successful_sends` messages, then fails every send
pub fn create_test_app_failing_after(successful_sends: usize) -> TestApp {
    build_test_app(|_| {}, |config| Notifier::failing_after(config, successful_sends))
}

fn build_test_app(
    configure: impl FnOnce(&mut Config),
    notifier: impl FnOnce(&Config) -> crate::errors::Result<Notifier>,
) -> TestApp {
    let uploads = tempfile::tempdir().expect("Failed to create uploads directory");
    let mut config = create_test_config(uploads.path());
    configure(&mut config);

    let notifier = notifier(&config).expect("Failed to create notifier");
    let state = AppState::builder()
        .config(config.clone())
        .notifier(Arc::new(notifier))
        .uploads(UploadStore::new(&config.uploads_dir))
        .build();

    let router = build_router(state.clone()).expect("Failed to build router");
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp {
        server,
        state,
        _uploads: uploads,
    }
}
