use anyhow::{Result, anyhow};
use crest_core::SuggestConfig;
use reqwest::blocking::Client;
use serde_json::{Value, json};
use std::time::Duration;

/// Prompt template for generic command completion. `{input}` is replaced
/// with the partial command line typed so far.
const COMPLETION_TEMPLATE: &str = "You are a Unix/Linux shell expert. The user typed '{input}'. \
Suggest exactly 3 most useful command completions. Format each suggestion EXACTLY like this:\n\n\
1. ls -la - List all files with detailed permissions and ownership info\n\
2. grep -r 'pattern' . - Search for text recursively in all files\n\
3. find . -type f -name '*.txt' - Find all .txt files in current directory and subdirectories\n\n\
Keep descriptions to a single line, starting with the command followed by a brief description.";

/// Prompt template used when the partial input starts with the
/// change-directory command.
const NAVIGATION_TEMPLATE: &str = "You are a Unix/Linux shell expert. The user typed '{input}'. \
Suggest exactly 3 most useful directory paths they might want to navigate to. Format each suggestion EXACTLY like this:\n\n\
1. /usr/bin - System executables and commands directory\n\
2. /etc - System configuration files directory\n\
3. /var/log - System and application logs directory\n\n\
Keep descriptions to a single line, starting with the path followed by a brief description.";

pub trait SuggestionClient {
    /// Ask for a completion of the partially typed line. Returns `None`
    /// whenever a suggestion cannot be produced; never returns an error.
    fn suggest(&self, partial: &str) -> Option<String>;
}

#[derive(Debug, Clone)]
pub struct OllamaClient {
    cfg: SuggestConfig,
    client: Client,
}

impl OllamaClient {
    pub fn new(cfg: SuggestConfig) -> Result<Self> {
        // The request timeout is the only bound on the suggestion call;
        // the input loop blocks until it resolves.
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_seconds))
            .build()?;
        Ok(Self { cfg, client })
    }

    pub fn config(&self) -> &SuggestConfig {
        &self.cfg
    }

    fn build_prompt(&self, partial: &str) -> String {
        let template = if partial.starts_with("cd") {
            NAVIGATION_TEMPLATE
        } else {
            COMPLETION_TEMPLATE
        };
        template.replace("{input}", partial)
    }

    fn build_payload(&self, partial: &str) -> Value {
        // serde_json serialization performs the JSON escaping the endpoint
        // requires (backslash, quote, newline, carriage return, tab).
        json!({
            "model": self.cfg.model,
            "prompt": self.build_prompt(partial),
            "stream": false,
            "temperature": self.cfg.temperature,
            "top_p": self.cfg.top_p,
            "top_k": self.cfg.top_k,
            "num_predict": self.cfg.num_predict,
        })
    }

    fn complete(&self, partial: &str) -> Result<String> {
        let resp = self
            .client
            .post(&self.cfg.endpoint)
            .json(&self.build_payload(partial))
            .send()?;
        let status = resp.status();
        let body = resp.text()?;
        if !status.is_success() {
            return Err(anyhow!(
                "suggestion endpoint returned HTTP {}",
                status.as_u16()
            ));
        }
        parse_generate_payload(&body)
    }
}

impl SuggestionClient for OllamaClient {
    fn suggest(&self, partial: &str) -> Option<String> {
        // Transport errors, bad status, unparseable bodies and missing
        // fields all collapse to the absence signal.
        self.complete(partial).ok()
    }
}

/// Extract the suggestion text from a generate-API response body. The
/// text is returned verbatim, without post-processing.
fn parse_generate_payload(body: &str) -> Result<String> {
    let value: Value = serde_json::from_str(body)?;
    value
        .get("response")
        .and_then(|v| v.as_str())
        .map(ToString::to_string)
        .ok_or_else(|| anyhow!("generate payload missing string 'response' field"))
}
