use std::path::PathBuf;
use std::sync::RwLock;

use tracing::warn;

/// Fallback preamble used when the policy file is missing or malformed.
const FALLBACK_PREAMBLE: &str = "You are a careful research assistant. Follow safety, \
    accuracy, and helpfulness. Answer clearly, show sources when you cite, and refuse \
    unsafe or illegal requests.";

/// Cached system-preamble provider.
///
/// Reads a JSON policy file holding the preamble under one of the keys
/// `preamble`, `system_prompt`, or `policy_text`. The text is cached
/// after the first read; `reload()` re-reads the file and replaces the
/// cache. Store instances are scoped to whoever constructs them;
/// there is no process-wide singleton.
pub struct PolicyStore {
    path: PathBuf,
    cache: RwLock<Option<String>>,
}

impl PolicyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RwLock::new(None),
        }
    }

    /// The system preamble, loading and caching on first call.
    pub fn get_preamble(&self) -> String {
        if let Some(cached) = self.cache.read().expect("policy cache poisoned").as_ref() {
            return cached.clone();
        }
        let loaded = self.load_from_disk();
        *self.cache.write().expect("policy cache poisoned") = Some(loaded.clone());
        loaded
    }

    /// Re-read the policy file and replace the cached preamble.
    pub fn reload(&self) -> String {
        let loaded = self.load_from_disk();
        *self.cache.write().expect("policy cache poisoned") = Some(loaded.clone());
        loaded
    }

    fn load_from_disk(&self) -> String {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Policy file unreadable, using fallback preamble");
                return FALLBACK_PREAMBLE.to_string();
            }
        };

        let data: serde_json::Value = match serde_json::from_str(&content) {
            Ok(v) => v,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Policy file is not valid JSON, using fallback preamble");
                return FALLBACK_PREAMBLE.to_string();
            }
        };

        let preamble = data
            .get("preamble")
            .or_else(|| data.get("system_prompt"))
            .or_else(|| data.get("policy_text"));

        match preamble {
            // A structured preamble is flattened by joining its values.
            Some(serde_json::Value::Object(map)) => map
                .values()
                .map(value_to_text)
                .collect::<Vec<_>>()
                .join("\n"),
            Some(serde_json::Value::String(s)) if !s.is_empty() => s.clone(),
            _ => {
                warn!(path = %self.path.display(), "Policy file has no preamble key, using fallback preamble");
                FALLBACK_PREAMBLE.to_string()
            }
        }
    }
}

fn value_to_text(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn store_with(content: &str) -> (tempfile::NamedTempFile, PolicyStore) {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(content.as_bytes()).expect("write policy");
        let store = PolicyStore::new(tmp.path().to_path_buf());
        (tmp, store)
    }

    #[test]
    fn test_reads_preamble_key() {
        let (_tmp, store) = store_with(r#"{"preamble": "Be precise."}"#);
        assert_eq!(store.get_preamble(), "Be precise.");
    }

    #[test]
    fn test_system_prompt_key_fallback() {
        let (_tmp, store) = store_with(r#"{"system_prompt": "Cite everything."}"#);
        assert_eq!(store.get_preamble(), "Cite everything.");
    }

    #[test]
    fn test_structured_preamble_is_joined() {
        let (_tmp, store) =
            store_with(r#"{"preamble": {"tone": "calm", "rule": "no fabrication"}}"#);
        let preamble = store.get_preamble();
        assert!(preamble.contains("calm"));
        assert!(preamble.contains("no fabrication"));
    }

    #[test]
    fn test_missing_file_uses_fallback() {
        let store = PolicyStore::new("/nonexistent/policy.json");
        assert_eq!(store.get_preamble(), FALLBACK_PREAMBLE);
    }

    #[test]
    fn test_reload_picks_up_changes() {
        let (tmp, store) = store_with(r#"{"preamble": "v1"}"#);
        assert_eq!(store.get_preamble(), "v1");

        std::fs::write(tmp.path(), r#"{"preamble": "v2"}"#).unwrap();
        // Cached until an explicit reload
        assert_eq!(store.get_preamble(), "v1");
        assert_eq!(store.reload(), "v2");
        assert_eq!(store.get_preamble(), "v2");
    }
}
