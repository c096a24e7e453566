use anyhow::Result;
use crest_core::{AppConfig, HistoryLog, Observer, tokenize};
use crest_llm::{OllamaClient, SuggestionClient};
use crest_tools::{BackgroundTracker, launch_foreground};
use crest_ui::{ReadOutcome, read_line};
use crossterm::style::Stylize;
use std::env;

use crate::builtins;

/// Everything a dispatch cycle touches, owned in one place and passed
/// explicitly to handlers.
pub struct Shell {
    pub config: AppConfig,
    pub history: HistoryLog,
    pub observer: Observer,
    pub suggester: OllamaClient,
    pub background: BackgroundTracker,
}

/// Signal returned by every command handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Top-level dispatcher loop: prompt, read, tokenize, record, execute.
pub fn run(shell: &mut Shell) -> Result<()> {
    let fallback = suggestion_fallback(&shell.config.suggest.model);
    loop {
        shell.background.reap();
        let prompt = render_prompt();
        let suggester = &shell.suggester;
        let outcome = read_line(&prompt, &|partial| suggester.suggest(partial), &fallback)?;
        let line = match outcome {
            ReadOutcome::Eof => break,
            ReadOutcome::Line(line) => line,
        };
        let argv = tokenize(&line);
        if argv.is_empty() {
            continue;
        }
        if dispatch(shell, &argv)? == Flow::Exit {
            break;
        }
    }
    Ok(())
}

/// Record the command, then run it: built-ins by exact name match,
/// anything else as a foreground child process. Launch failures are
/// reported and the loop carries on.
pub fn dispatch(shell: &mut Shell, argv: &[String]) -> Result<Flow> {
    shell.history.record(argv);
    shell.observer.record_dispatch(argv);

    if let Some(builtin) = builtins::lookup(&argv[0]) {
        return (builtin.run)(shell, argv);
    }

    match launch_foreground(argv) {
        Ok(_) => Ok(Flow::Continue),
        Err(err) => {
            eprintln!("crest: {err}");
            shell.observer.record_failure(&err.to_string());
            Ok(Flow::Continue)
        }
    }
}

fn render_prompt() -> String {
    match env::current_dir() {
        Ok(cwd) => {
            let cwd = cwd.display().to_string();
            format!("{} > ", cwd.as_str().green().bold())
        }
        Err(_) => "> ".to_string(),
    }
}

fn suggestion_fallback(model: &str) -> String {
    format!(
        "Unable to get AI suggestions. Is the inference server running?\n\
         Try running: ollama serve\n\
         Make sure you have a model: ollama pull {model}"
    )
}

#[cfg(test)]
pub(crate) mod tests_support {
    use super::*;
    use std::path::Path;

    pub(crate) fn shell_for(workspace: &Path) -> Shell {
        let config = AppConfig::default();
        let observer = Observer::new(workspace).expect("observer");
        let suggester = OllamaClient::new(config.suggest.clone()).expect("client");
        Shell {
            config,
            history: HistoryLog::new(),
            observer,
            suggester,
            background: BackgroundTracker::new(),
        }
    }
}
