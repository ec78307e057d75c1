use std::io;
use std::path::Path;

use dial::{DialError, NetworkConfig};

/// Read the persisted network configuration.
///
/// A missing or unparsable file is a configuration error: the service never
/// guesses interfaces on its own.
pub async fn load(path: &Path) -> dial::Result<NetworkConfig> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(DialError::Configuration(format!(
                "network configuration not found at {}",
                path.display()
            )));
        }
        Err(e) => {
            return Err(DialError::Configuration(format!(
                "read {}: {e}",
                path.display()
            )));
        }
    };
    serde_yaml_ng::from_str(&content)
        .map_err(|e| DialError::Configuration(format!("parse {}: {e}", path.display())))
}
