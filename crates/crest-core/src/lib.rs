use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub type Result<T> = anyhow::Result<T>;

/// Default local inference endpoint (Ollama generate API).
pub const DEFAULT_SUGGEST_ENDPOINT: &str = "http://localhost:11434/api/generate";
/// Default model served by the local endpoint.
pub const DEFAULT_SUGGEST_MODEL: &str = "tinyllama";

pub fn runtime_dir(workspace: &Path) -> PathBuf {
    workspace.join(".crest")
}

/// Generation parameters for the suggestion endpoint. The sampling
/// constants are part of the wire contract and are not tuned per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestConfig {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub num_predict: u32,
    /// Hard bound on one suggestion request. The trigger key blocks the
    /// input loop while the request is outstanding, so this must stay small.
    pub timeout_seconds: u64,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SUGGEST_ENDPOINT.to_string(),
            model: DEFAULT_SUGGEST_MODEL.to_string(),
            temperature: 0.2,
            top_p: 0.9,
            top_k: 40,
            num_predict: 300,
            timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub suggest: SuggestConfig,
    pub show_banner: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            suggest: SuggestConfig::default(),
            show_banner: true,
        }
    }
}

impl AppConfig {
    pub fn user_settings_path() -> Option<PathBuf> {
        let home = std::env::var("HOME")
            .ok()
            .or_else(|| std::env::var("USERPROFILE").ok())?;
        Some(Path::new(&home).join(".crest/settings.json"))
    }

    pub fn project_settings_path(workspace: &Path) -> PathBuf {
        runtime_dir(workspace).join("settings.json")
    }

    pub fn project_local_settings_path(workspace: &Path) -> PathBuf {
        runtime_dir(workspace).join("settings.local.json")
    }

    /// Load configuration by deep-merging settings files over the defaults:
    /// user settings first, then project settings, then project-local
    /// overrides. Missing files are skipped.
    pub fn load(workspace: &Path) -> Result<Self> {
        let mut paths = Vec::new();
        if let Some(user) = Self::user_settings_path() {
            paths.push(user);
        }
        paths.push(Self::project_settings_path(workspace));
        paths.push(Self::project_local_settings_path(workspace));
        Self::load_from_paths(&paths)
    }

    fn load_from_paths(paths: &[PathBuf]) -> Result<Self> {
        let mut merged = serde_json::to_value(Self::default())?;
        for path in paths {
            if !path.exists() {
                continue;
            }
            let raw = fs::read_to_string(path)?;
            let value: serde_json::Value = serde_json::from_str(&raw)?;
            merge_json_value(&mut merged, &value);
        }
        Ok(serde_json::from_value(merged)?)
    }

    pub fn save(&self, workspace: &Path) -> Result<()> {
        let path = Self::project_settings_path(workspace);
        fs::create_dir_all(
            path.parent()
                .ok_or_else(|| anyhow::anyhow!("invalid config path"))?,
        )?;
        fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }
}

fn merge_json_value(base: &mut serde_json::Value, overlay: &serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base_obj), serde_json::Value::Object(overlay_obj)) => {
            for (key, overlay_value) in overlay_obj {
                if let Some(base_value) = base_obj.get_mut(key) {
                    merge_json_value(base_value, overlay_value);
                } else {
                    base_obj.insert(key.clone(), overlay_value.clone());
                }
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value.clone();
        }
    }
}

/// Characters that separate tokens on a completed input line.
const TOKEN_DELIMITERS: [char; 5] = [' ', '\t', '\r', '\n', '\u{7}'];

/// Split a completed line into its argument vector.
///
/// There is no quoting and no escaping: a whitespace character inside
/// quotes still splits. This is a known limitation of the splitter, kept
/// deliberately rather than widened into a shell grammar.
pub fn tokenize(line: &str) -> Vec<String> {
    line.split(&TOKEN_DELIMITERS[..])
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Append-only record of dispatched commands, owned by the shell's
/// top-level context and passed explicitly to whoever needs it.
#[derive(Debug, Default)]
pub struct HistoryLog {
    entries: Vec<String>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a dispatched command. Only the command name and its first
    /// argument are kept; further arguments are dropped from the entry.
    pub fn record(&mut self, argv: &[String]) {
        let entry = match argv {
            [] => return,
            [name] => name.clone(),
            [name, first, ..] => format!("{name} {first}"),
        };
        self.entries.push(entry);
    }

    /// Entries in insertion order with 1-based positions. Restartable:
    /// calling this twice yields the same sequence.
    pub fn entries(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (idx + 1, entry.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Session log under the runtime dir. Every dispatched command and every
/// launch failure is appended with a timestamp; write failures are
/// swallowed so logging can never interrupt the shell.
pub struct Observer {
    log_path: PathBuf,
    verbose: bool,
}

impl Observer {
    pub fn new(workspace: &Path) -> Result<Self> {
        let dir = runtime_dir(workspace);
        fs::create_dir_all(&dir)?;
        Ok(Self {
            log_path: dir.join("session.log"),
            verbose: false,
        })
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn record_dispatch(&self, argv: &[String]) {
        let line = argv.join(" ");
        if self.verbose {
            eprintln!("[crest] dispatch: {line}");
        }
        let _ = self.append_log_line(&format!("{} DISPATCH {line}", Utc::now().to_rfc3339()));
    }

    pub fn record_failure(&self, msg: &str) {
        if self.verbose {
            eprintln!("[crest] {msg}");
        }
        let _ = self.append_log_line(&format!("{} WARN {msg}", Utc::now().to_rfc3339()));
    }

    fn append_log_line(&self, line: &str) -> Result<()> {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_splits_on_whitespace() {
        assert_eq!(tokenize("ls -la foo"), vec!["ls", "-la", "foo"]);
    }

    #[test]
    fn tokenize_handles_every_delimiter() {
        assert_eq!(
            tokenize("a\tb\rc\nd\u{7}e f"),
            vec!["a", "b", "c", "d", "e", "f"]
        );
    }

    #[test]
    fn tokenize_collapses_runs_of_delimiters() {
        assert_eq!(tokenize("  echo   hello  "), vec!["echo", "hello"]);
    }

    #[test]
    fn tokenize_of_blank_input_is_empty() {
        assert!(tokenize("").is_empty());
        assert!(tokenize(" \t \r\n ").is_empty());
    }

    #[test]
    fn tokenize_does_not_honor_quotes() {
        // Quotes are ordinary characters; the space inside still splits.
        assert_eq!(tokenize(r#"echo "a b""#), vec!["echo", "\"a", "b\""]);
    }

    #[test]
    fn history_keeps_first_two_tokens_in_order() {
        let mut log = HistoryLog::new();
        log.record(&["cd".to_string(), "/tmp".to_string()]);
        log.record(&["ls".to_string()]);
        log.record(&["pwd".to_string()]);

        let listed: Vec<(usize, String)> = log
            .entries()
            .map(|(idx, entry)| (idx, entry.to_string()))
            .collect();
        assert_eq!(
            listed,
            vec![
                (1, "cd /tmp".to_string()),
                (2, "ls".to_string()),
                (3, "pwd".to_string()),
            ]
        );
    }

    #[test]
    fn history_listing_is_restartable() {
        let mut log = HistoryLog::new();
        log.record(&["echo".to_string(), "one".to_string(), "two".to_string()]);
        let first: Vec<_> = log.entries().collect();
        let second: Vec<_> = log.entries().collect();
        assert_eq!(first, second);
        // The third token is not part of the entry.
        assert_eq!(first[0], (1, "echo one"));
    }

    #[test]
    fn history_ignores_empty_argv() {
        let mut log = HistoryLog::new();
        log.record(&[]);
        assert!(log.is_empty());
    }

    #[test]
    fn suggest_config_defaults_match_wire_contract() {
        let cfg = SuggestConfig::default();
        assert_eq!(cfg.endpoint, DEFAULT_SUGGEST_ENDPOINT);
        assert_eq!(cfg.model, DEFAULT_SUGGEST_MODEL);
        assert_eq!(cfg.temperature, 0.2);
        assert_eq!(cfg.top_p, 0.9);
        assert_eq!(cfg.top_k, 40);
        assert_eq!(cfg.num_predict, 300);
    }

    #[test]
    fn config_layers_merge_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let user = dir.path().join("user.json");
        let project = dir.path().join("project.json");
        let local = dir.path().join("local.json");
        fs::write(
            &user,
            r#"{"suggest":{"model":"user-model","timeout_seconds":3}}"#,
        )
        .expect("write user");
        fs::write(&project, r#"{"suggest":{"model":"project-model"}}"#).expect("write project");
        fs::write(&local, r#"{"show_banner":false}"#).expect("write local");

        let cfg = AppConfig::load_from_paths(&[user, project, local]).expect("load");
        // Later layers win field-by-field; untouched fields keep defaults.
        assert_eq!(cfg.suggest.model, "project-model");
        assert_eq!(cfg.suggest.timeout_seconds, 3);
        assert_eq!(cfg.suggest.endpoint, DEFAULT_SUGGEST_ENDPOINT);
        assert!(!cfg.show_banner);
    }

    #[test]
    fn config_load_skips_missing_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = AppConfig::load_from_paths(&[dir.path().join("absent.json")]).expect("load");
        assert_eq!(cfg.suggest.model, DEFAULT_SUGGEST_MODEL);
        assert!(cfg.show_banner);
    }

    #[test]
    fn config_save_round_trips_through_project_layer() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut cfg = AppConfig::default();
        cfg.suggest.endpoint = "http://localhost:9999/api/generate".to_string();
        cfg.save(dir.path()).expect("save");

        let loaded =
            AppConfig::load_from_paths(&[AppConfig::project_settings_path(dir.path())])
                .expect("load");
        assert_eq!(loaded.suggest.endpoint, "http://localhost:9999/api/generate");
    }

    #[test]
    fn observer_appends_to_session_log() {
        let dir = tempfile::tempdir().expect("tempdir");
        let observer = Observer::new(dir.path()).expect("observer");
        observer.record_dispatch(&["ls".to_string(), "-la".to_string()]);
        observer.record_failure("command not found: nope");

        let raw = fs::read_to_string(runtime_dir(dir.path()).join("session.log"))
            .expect("read session log");
        assert!(raw.contains("DISPATCH ls -la"));
        assert!(raw.contains("WARN command not found: nope"));
    }
}
