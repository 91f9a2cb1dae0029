//! Remote staging folder setup.

use chunkup_protocol::RemoteError;
use tracing::debug;

use crate::ports::Transport;
use crate::types::Depth;

/// Ensures the staging folder at `url` exists.
///
/// A not-found probe creates the folder; any other probe error is returned
/// unchanged. Running this twice against the same folder is harmless.
pub async fn ensure_folder(transport: &dyn Transport, url: &str) -> Result<(), RemoteError> {
    match transport.probe(url, Depth::Zero).await {
        Ok(()) => {
            debug!(folder = %url, "staging folder exists");
            Ok(())
        }
        Err(e) if e.is_not_found() => {
            debug!(folder = %url, "creating staging folder");
            transport.create_folder(url).await
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Call, MockTransport};

    const URL: &str = "https://cloud.example.com/remote.php/dav/uploads/alice/f1";

    #[tokio::test]
    async fn existing_folder_is_left_alone() {
        let t = MockTransport::new();
        t.all_folders_exist();
        ensure_folder(&t, URL).await.unwrap();
        assert_eq!(t.calls(), vec![Call::Probe(URL.into())]);
    }

    #[tokio::test]
    async fn missing_folder_is_created_once() {
        let t = MockTransport::new();
        ensure_folder(&t, URL).await.unwrap();
        ensure_folder(&t, URL).await.unwrap();
        assert_eq!(
            t.calls(),
            vec![
                Call::Probe(URL.into()),
                Call::CreateFolder(URL.into()),
                Call::Probe(URL.into()),
            ]
        );
    }

    #[tokio::test]
    async fn other_probe_errors_surface_unchanged() {
        let t = MockTransport::new();
        t.fail_probe(RemoteError::new(503, "Service Unavailable"));
        let err = ensure_folder(&t, URL).await.unwrap_err();
        assert_eq!(err.code, 503);
        assert_eq!(t.calls(), vec![Call::Probe(URL.into())]);
    }

    #[tokio::test]
    async fn create_failure_is_returned() {
        let t = MockTransport::new();
        t.fail_create(RemoteError::new(507, "Insufficient Storage"));
        let err = ensure_folder(&t, URL).await.unwrap_err();
        assert_eq!(err.code, 507);
    }
}
