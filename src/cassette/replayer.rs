//! Replays recorded interactions from a cassette.

use std::collections::{HashMap, VecDeque};
use std::path::Path;

use super::format::{Cassette, Interaction};

/// Serves recorded interactions in order, per port/method pair.
#[derive(Debug)]
pub struct CassetteReplayer {
    queues: HashMap<(String, String), VecDeque<Interaction>>,
}

impl CassetteReplayer {
    /// Create a replayer from a loaded cassette.
    #[must_use]
    pub fn new(cassette: Cassette) -> Self {
        let mut queues: HashMap<(String, String), VecDeque<Interaction>> = HashMap::new();
        for interaction in cassette.interactions {
            queues
                .entry((interaction.port.clone(), interaction.method.clone()))
                .or_default()
                .push_back(interaction);
        }
        Self { queues }
    }

    /// Load a YAML cassette file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read cassette file {}: {e}", path.display()))?;
        let cassette: Cassette = serde_yaml::from_str(&content)
            .map_err(|e| format!("Failed to parse cassette file {}: {e}", path.display()))?;
        Ok(Self::new(cassette))
    }

    /// Take the next interaction for the given port and method.
    ///
    /// # Errors
    ///
    /// Returns an error when the cassette holds no further interaction for
    /// the pair.
    pub fn next_interaction(&mut self, port: &str, method: &str) -> Result<Interaction, String> {
        self.queues
            .get_mut(&(port.to_string(), method.to_string()))
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| format!("Cassette exhausted: no interaction left for {port}::{method}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn interaction(seq: u64, method: &str) -> Interaction {
        Interaction {
            seq,
            port: "image_provider".into(),
            method: method.into(),
            input: json!({}),
            output: json!({"Ok": {"status": 200, "body": "{}"}}),
        }
    }

    fn cassette(interactions: Vec<Interaction>) -> Cassette {
        Cassette { name: "test".into(), recorded_at: Utc::now(), commit: "abc".into(), interactions }
    }

    #[test]
    fn replay_in_order_per_method() {
        let mut replayer = CassetteReplayer::new(cassette(vec![
            interaction(0, "send"),
            interaction(1, "describe"),
            interaction(2, "send"),
        ]));

        assert_eq!(replayer.next_interaction("image_provider", "send").unwrap().seq, 0);
        assert_eq!(replayer.next_interaction("image_provider", "send").unwrap().seq, 2);
        assert_eq!(replayer.next_interaction("image_provider", "describe").unwrap().seq, 1);
    }

    #[test]
    fn exhausted_replayer_errors() {
        let mut replayer = CassetteReplayer::new(cassette(vec![interaction(0, "send")]));
        assert!(replayer.next_interaction("image_provider", "send").is_ok());
        let err = replayer.next_interaction("image_provider", "send").unwrap_err();
        assert!(err.contains("Cassette exhausted"));
    }

    #[test]
    fn unknown_port_errors() {
        let mut replayer = CassetteReplayer::new(cassette(vec![]));
        assert!(replayer.next_interaction("unknown", "method").is_err());
    }

    #[test]
    fn load_from_yaml() {
        let dir = std::env::temp_dir().join("stylegen_cassette_load_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("test.cassette.yaml");
        let yaml = serde_yaml::to_string(&cassette(vec![interaction(0, "send")])).unwrap();
        std::fs::write(&path, yaml).unwrap();

        let mut replayer = CassetteReplayer::load(&path).unwrap();
        assert_eq!(replayer.next_interaction("image_provider", "send").unwrap().seq, 0);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_nonexistent_fails() {
        assert!(CassetteReplayer::load(Path::new("/nonexistent/cassette.yaml")).is_err());
    }
}
