//! Prompt template loading with mtime-based hot reload (spec §4.3: "hot-reloaded
//! on mtime change").

use std::path::PathBuf;
use std::time::SystemTime;
use tokio::sync::RwLock;

use crate::error::LlmError;

const DEFAULT_TEMPLATE: &str = "You are playing a Game Boy Advance game. \
Current map: {current_map}, position ({player_x}, {player_y}), facing {player_direction}.\n\
{spatial_context}\n{direction_guidance}\nRecent actions: {recent_actions}\n\
Notepad:\n{notepad_content}\n\
Call press_button with the buttons to press next.";

/// The eight placeholders the template may contain (spec §4.3).
#[derive(Debug, Clone, Default)]
pub struct PromptVars {
    pub spatial_context: String,
    pub recent_actions: String,
    pub direction_guidance: String,
    pub notepad_content: String,
    pub current_map: String,
    pub player_x: String,
    pub player_y: String,
    pub player_direction: String,
}

impl PromptVars {
    fn render(&self, template: &str) -> String {
        template
            .replace("{spatial_context}", &self.spatial_context)
            .replace("{recent_actions}", &self.recent_actions)
            .replace("{direction_guidance}", &self.direction_guidance)
            .replace("{notepad_content}", &self.notepad_content)
            .replace("{current_map}", &self.current_map)
            .replace("{player_x}", &self.player_x)
            .replace("{player_y}", &self.player_y)
            .replace("{player_direction}", &self.player_direction)
    }
}

struct Cached {
    mtime: SystemTime,
    contents: String,
}

/// A template file, re-read only when its mtime changes.
pub struct PromptTemplate {
    path: PathBuf,
    cached: RwLock<Option<Cached>>,
}

impl PromptTemplate {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: RwLock::new(None),
        }
    }

    /// Load the raw template, re-reading from disk only if the file's mtime
    /// has advanced since the last read. Falls back to a built-in default
    /// when the file doesn't exist yet (e.g. on first run before the UI has
    /// written one).
    async fn contents(&self) -> Result<String, LlmError> {
        let metadata = tokio::fs::metadata(&self.path).await;
        let mtime = match &metadata {
            Ok(m) => m.modified().ok(),
            Err(_) => None,
        };

        if let (Some(mtime), Some(cached)) = (mtime, self.cached.read().await.as_ref()) {
            if cached.mtime == mtime {
                return Ok(cached.contents.clone());
            }
        }

        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(_) => DEFAULT_TEMPLATE.to_string(),
        };

        if let Some(mtime) = mtime {
            *self.cached.write().await = Some(Cached {
                mtime,
                contents: contents.clone(),
            });
        }

        Ok(contents)
    }

    pub async fn render(&self, vars: &PromptVars) -> Result<String, LlmError> {
        let template = self.contents().await?;
        Ok(vars.render(&template))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_vars() -> PromptVars {
        PromptVars {
            spatial_context: "near the entrance".to_string(),
            recent_actions: "UP, UP, A".to_string(),
            direction_guidance: "you seem stuck".to_string(),
            notepad_content: "remember the key is in the chest".to_string(),
            current_map: "1".to_string(),
            player_x: "10".to_string(),
            player_y: "6".to_string(),
            player_direction: "UP".to_string(),
        }
    }

    #[tokio::test]
    async fn missing_file_falls_back_to_default_template() {
        let template = PromptTemplate::new("/nonexistent/prompt_template.txt");
        let rendered = template.render(&sample_vars()).await.unwrap();
        assert!(rendered.contains("position (10, 6)"));
        assert!(rendered.contains("you seem stuck"));
    }

    #[tokio::test]
    async fn reads_and_caches_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt_template.txt");
        tokio::fs::write(&path, "Map {current_map}, stuck? {direction_guidance}")
            .await
            .unwrap();

        let template = PromptTemplate::new(&path);
        let rendered = template.render(&sample_vars()).await.unwrap();
        assert_eq!(rendered, "Map 1, stuck? you seem stuck");
    }

    #[tokio::test]
    async fn picks_up_changes_after_mtime_advances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt_template.txt");
        tokio::fs::write(&path, "v1 {current_map}").await.unwrap();

        let template = PromptTemplate::new(&path);
        assert_eq!(template.render(&sample_vars()).await.unwrap(), "v1 1");

        // Force the mtime forward; some filesystems have coarse mtime
        // resolution so a bare rewrite isn't guaranteed to change it.
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        tokio::fs::write(&path, "v2 {current_map}").await.unwrap();
        let future = SystemTime::now() + std::time::Duration::from_secs(1);
        let file = std::fs::File::open(&path).unwrap();
        file.set_modified(future).ok();

        assert_eq!(template.render(&sample_vars()).await.unwrap(), "v2 1");
    }
}
