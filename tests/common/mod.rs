// Shared fixtures for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use otm_repository_core::engine::user_store::FileAuthenticationProvider;
use otm_repository_core::engine::RepositorySecurityManager;
use otm_repository_core::engine_core::password::PasswordValidator;
use otm_repository_core::messaging::{MessageReceiver, MessageTransport, TransportError};
use otm_repository_core::persistence::{FileChangeSetManager, SecurityFileLayout};
use std::collections::VecDeque;
use std::io::ErrorKind;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub fn security_manager(dir: &TempDir) -> RepositorySecurityManager {
    let layout = SecurityFileLayout::new(dir.path());
    let change_sets = Arc::new(FileChangeSetManager::new(dir.path()));
    let validator = PasswordValidator::new(Some("SHA-1"), None).unwrap();
    let provider = Arc::new(FileAuthenticationProvider::new(
        &layout,
        change_sets.clone(),
        validator,
    ));
    RepositorySecurityManager::new(layout, change_sets, provider)
}

/// In-memory transport that records sent messages.
///
/// The first `failed_connects` calls to `open_receiver` are refused; later
/// receivers deliver whatever is pushed with `push_response`.
#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<(String, Bytes)>>,
    pub connect_attempts: AtomicUsize,
    pub destroyed: AtomicUsize,
    failed_connects: usize,
    responses: Arc<Mutex<VecDeque<Result<Bytes, TransportError>>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_connects(failed_connects: usize) -> Self {
        Self {
            failed_connects,
            ..Self::default()
        }
    }

    pub fn push_response(&self, response: Result<Bytes, TransportError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn sent_to(&self, destination: &str) -> Vec<serde_json::Value> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(d, _)| d == destination)
            .map(|(_, body)| serde_json::from_slice(body).unwrap())
            .collect()
    }
}

#[async_trait]
impl MessageTransport for RecordingTransport {
    async fn send(&self, destination: &str, payload: Bytes) -> Result<(), TransportError> {
        self.sent
            .lock()
            .unwrap()
            .push((destination.to_string(), payload));
        Ok(())
    }

    async fn open_receiver(
        &self,
        _destination: &str,
    ) -> Result<Box<dyn MessageReceiver>, TransportError> {
        let attempt = self.connect_attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failed_connects {
            return Err(TransportError::Io(std::io::Error::from(
                ErrorKind::ConnectionRefused,
            )));
        }
        Ok(Box::new(QueueReceiver {
            responses: Arc::clone(&self.responses),
        }))
    }

    fn destroy_connections(&self) {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

struct QueueReceiver {
    responses: Arc<Mutex<VecDeque<Result<Bytes, TransportError>>>>,
}

#[async_trait]
impl MessageReceiver for QueueReceiver {
    async fn receive(&mut self, timeout: Duration) -> Result<Option<Bytes>, TransportError> {
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Ok(bytes)) => Ok(Some(bytes)),
            Some(Err(e)) => Err(e),
            None => {
                tokio::time::sleep(timeout.min(Duration::from_millis(10))).await;
                Ok(None)
            }
        }
    }
}
