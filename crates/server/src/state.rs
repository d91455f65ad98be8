//! Application state shared across handlers.

use crate::webhooks::Notifier;
use shrink_core::ContentSniffer;
use shrink_core::config::AppConfig;
use shrink_metadata::MetadataStore;
use shrink_signer::CapabilitySigner;
use shrink_storage::FileStore;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Uploaded file storage.
    pub storage: Arc<dyn FileStore>,
    /// Short URL mappings.
    pub metadata: Arc<dyn MetadataStore>,
    /// Deletion capability signer.
    pub signer: Arc<CapabilitySigner>,
    /// Upload type detection and allow-list.
    pub sniffer: Arc<ContentSniffer>,
    /// Webhook fan-out.
    pub notifier: Notifier,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The sniffer and notifier are derived from `config`.
    pub fn new(
        config: AppConfig,
        storage: Arc<dyn FileStore>,
        metadata: Arc<dyn MetadataStore>,
        signer: CapabilitySigner,
    ) -> Self {
        let sniffer = ContentSniffer::from_config(&config.upload);
        let notifier = Notifier::new(&config.webhooks);

        if config.server.upload_password.is_none() {
            tracing::warn!("server.upload_password is not set; anyone can upload and shorten");
        }

        Self {
            config: Arc::new(config),
            storage,
            metadata,
            signer: Arc::new(signer),
            sniffer: Arc::new(sniffer),
            notifier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shrink_metadata::SqliteStore;
    use shrink_signer::ServerSecret;
    use shrink_storage::FilesystemBackend;
    use tempfile::tempdir;

    async fn build_state(config: AppConfig) -> (tempfile::TempDir, AppState) {
        let temp = tempdir().unwrap();
        let storage: Arc<dyn FileStore> = Arc::new(
            FilesystemBackend::new(temp.path().join("uploads"))
                .await
                .unwrap(),
        );
        let metadata: Arc<dyn MetadataStore> =
            Arc::new(SqliteStore::new(temp.path().join("urls.db")).await.unwrap());
        let signer =
            CapabilitySigner::new(ServerSecret::new("state-test-secret").unwrap()).unwrap();

        let state = AppState::new(config, storage, metadata, signer);
        (temp, state)
    }

    #[tokio::test]
    async fn sniffer_follows_upload_config() {
        let mut config = AppConfig::for_testing();
        config.upload.allowed_extensions = vec!["png".to_string()];

        let (_temp, state) = build_state(config).await;
        assert!(state.sniffer.policy().allows("png"));
        assert!(!state.sniffer.policy().allows("txt"));
    }

    #[tokio::test]
    async fn notifier_disabled_without_webhooks() {
        let (_temp, state) = build_state(AppConfig::for_testing()).await;
        assert!(!state.notifier.is_enabled());
    }

    #[tokio::test]
    async fn clones_share_backends() {
        let (_temp, state) = build_state(AppConfig::for_testing()).await;
        let other = state.clone();
        assert!(Arc::ptr_eq(&state.signer, &other.signer));
        assert!(Arc::ptr_eq(&state.config, &other.config));
    }
}
