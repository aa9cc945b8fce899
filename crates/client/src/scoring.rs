use lmrisk_protocol::ScoreRequest;
use lmrisk_tree::Node;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Model selection sent along with every scoring request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringContext {
    pub model: String,
    pub metrics: String,
    pub token_type: String,
    pub workspace_folder: Option<String>,
}

impl Default for ScoringContext {
    fn default() -> Self {
        Self {
            model: "default".to_string(),
            metrics: "full-token-average".to_string(),
            token_type: "all".to_string(),
            workspace_folder: None,
        }
    }
}

impl ScoringContext {
    /// Request body for a file node. Directories produce an empty body.
    #[must_use]
    pub fn request_for(&self, node: &Node) -> ScoreRequest {
        self.request(
            node.content().unwrap_or_default(),
            &node.language_id(),
            &node.path.to_string_lossy(),
            node.modified(),
        )
    }

    #[must_use]
    pub fn request(
        &self,
        content: &str,
        language_id: &str,
        file_path: &str,
        modified: Option<SystemTime>,
    ) -> ScoreRequest {
        ScoreRequest {
            content: content.to_string(),
            language_id: language_id.to_string(),
            file_path: file_path.to_string(),
            timestamp: modified.map_or(0.0, epoch_millis),
            no_return: false,
            reset_context: false,
            metrics: self.metrics.clone(),
            token_type: self.token_type.clone(),
            model: self.model.clone(),
            workspace_folder: self.workspace_folder.clone(),
        }
    }
}

fn epoch_millis(time: SystemTime) -> f64 {
    time.duration_since(UNIX_EPOCH)
        .map_or(0.0, |elapsed| elapsed.as_secs_f64() * 1000.0)
}
