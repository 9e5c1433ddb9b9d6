//! Interactive prompts for missing arguments
//!
//! Every positional the command line leaves out is asked for, unless
//! `--no-prompt` is given.

use crate::commands::Cli;
use crate::config::Endpoint;
use crate::{Result, SwarmError};
use dialoguer::{theme::ColorfulTheme, Input};

/// Where missing positionals come from
pub trait InputSource {
    fn server(&self) -> Result<Endpoint>;
    fn count(&self) -> Result<usize>;
    fn action(&self) -> Result<Option<String>>;
}

/// Resolved positionals for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunInputs {
    pub endpoint: Endpoint,
    pub count: usize,
    pub action: Option<String>,
}

/// Take positionals from the command line and ask `source` for the rest
pub fn resolve_inputs(cli: &Cli, source: &dyn InputSource) -> Result<RunInputs> {
    let endpoint = match (&cli.server, cli.no_prompt) {
        (Some(server), _) => Endpoint::parse(server)?,
        (None, false) => source.server()?,
        (None, true) => return Err(missing("SERVER")),
    };

    let count = match (cli.count, cli.no_prompt) {
        (Some(count), _) => count,
        (None, false) => source.count()?,
        (None, true) => return Err(missing("COUNT")),
    };

    let action = match (&cli.action, cli.no_prompt) {
        (Some(action), _) => non_blank(action.clone()),
        (None, false) => source.action()?,
        (None, true) => None,
    };

    Ok(RunInputs {
        endpoint,
        count,
        action,
    })
}

fn missing(name: &str) -> SwarmError {
    SwarmError::Config(format!("{} is required with --no-prompt", name))
}

/// Fill in whatever the command line left out
pub struct Prompter {
    theme: ColorfulTheme,
}

impl Default for Prompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl InputSource for Prompter {
    /// Ask for a server address until one parses
    fn server(&self) -> Result<Endpoint> {
        let input: String = Input::with_theme(&self.theme)
            .with_prompt("Server address (host[:port])")
            .validate_with(|input: &String| -> std::result::Result<(), String> {
                Endpoint::parse(input).map(|_| ()).map_err(|e| e.to_string())
            })
            .interact_text()
            .map_err(prompt_error)?;

        Endpoint::parse(&input)
    }

    fn count(&self) -> Result<usize> {
        Input::with_theme(&self.theme)
            .with_prompt("Number of bots")
            .interact_text()
            .map_err(prompt_error)
    }

    /// Blank input means no one-shot action
    fn action(&self) -> Result<Option<String>> {
        let input: String = Input::with_theme(&self.theme)
            .with_prompt("Optional chat/command (blank to skip)")
            .allow_empty(true)
            .interact_text()
            .map_err(prompt_error)?;

        Ok(non_blank(input))
    }
}

/// `None` for empty or whitespace-only text
pub fn non_blank(text: String) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn prompt_error(error: dialoguer::Error) -> SwarmError {
    SwarmError::Prompt(error.to_string())
}
