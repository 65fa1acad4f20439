//! Subscription selection.
//!
//! Turns a [`SelectionSpec`] (from flags, config or the interactive prompt)
//! into the ordered list of subscriptions to analyze.

use crate::config::{SelectionConfig, SelectionMode};
use crate::error::SelectionError;
use crate::models::{SelectionSpec, Subscription};
use std::io::{BufRead, Write};
use tracing::{debug, warn};

/// Resolve a selection against the subscriptions visible to the credential.
///
/// `current` is the active subscription id reported by the account provider.
/// When it is `None`, the subscription flagged `is_default` is used instead.
pub fn resolve(
    spec: &SelectionSpec,
    available: &[Subscription],
    current: Option<&str>,
) -> Result<Vec<Subscription>, SelectionError> {
    debug!(
        "Resolving selection '{}' against {} subscriptions",
        spec,
        available.len()
    );

    match spec {
        SelectionSpec::All => {
            if available.is_empty() {
                return Err(SelectionError::EmptySubscriptionList);
            }
            Ok(available.to_vec())
        }
        SelectionSpec::Current => {
            let current = current
                .map(str::to_string)
                .or_else(|| available.iter().find(|s| s.is_default).map(|s| s.id.clone()))
                .ok_or(SelectionError::NoCurrentSubscription)?;

            available
                .iter()
                .find(|s| s.matches_id(&current))
                .map(|s| vec![s.clone()])
                .ok_or(SelectionError::NoCurrentSubscription)
        }
        SelectionSpec::Single => available
            .first()
            .map(|s| vec![s.clone()])
            .ok_or(SelectionError::EmptySubscriptionList),
        SelectionSpec::Explicit(ids) => resolve_explicit(ids, available),
    }
}

fn resolve_explicit(
    ids: &[String],
    available: &[Subscription],
) -> Result<Vec<Subscription>, SelectionError> {
    if ids.is_empty() {
        return Err(SelectionError::NothingSelected);
    }

    let mut selected: Vec<Subscription> = Vec::with_capacity(ids.len());
    for id in ids {
        let sub = available
            .iter()
            .find(|s| s.matches_id(id))
            .ok_or_else(|| SelectionError::UnknownSubscriptionId(id.trim().to_string()))?;

        if !selected.iter().any(|s| s.id == sub.id) {
            selected.push(sub.clone());
        }
    }

    Ok(selected)
}

/// Why a line of interactive input was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    Cancelled,
    Invalid(String),
}

/// Parse one line typed at the selection prompt.
///
/// Accepts `all`, `current`, an empty line (same as `current`), `x`/`q` to
/// cancel, or 1-based indices such as `1,3` or `2-4`.
pub fn parse_selection_input(
    input: &str,
    available: &[Subscription],
) -> Result<SelectionSpec, InputError> {
    let normalized = input.trim().to_lowercase();

    match normalized.as_str() {
        "" | "c" | "current" => Ok(SelectionSpec::Current),
        "a" | "all" => Ok(SelectionSpec::All),
        "x" | "q" | "quit" | "exit" => Err(InputError::Cancelled),
        text => {
            let indices = parse_indices(text, available.len())?;
            Ok(SelectionSpec::Explicit(
                indices.into_iter().map(|i| available[i].id.clone()).collect(),
            ))
        }
    }
}

/// Parse comma-separated 1-based indices and ranges into 0-based positions.
fn parse_indices(text: &str, len: usize) -> Result<Vec<usize>, InputError> {
    if len == 0 {
        return Err(InputError::Invalid(
            "there are no subscriptions to choose from".to_string(),
        ));
    }

    let parse_one = |token: &str| -> Result<usize, InputError> {
        let n: usize = token
            .trim()
            .parse()
            .map_err(|_| InputError::Invalid(format!("'{}' is not a valid choice", token.trim())))?;
        if n == 0 || n > len {
            return Err(InputError::Invalid(format!(
                "{} is out of range; enter a number between 1 and {}",
                n, len
            )));
        }
        Ok(n - 1)
    };

    let mut indices = Vec::new();
    for token in text.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let range = match token.split_once('-') {
            Some((start, end)) => {
                let (start, end) = (parse_one(start)?, parse_one(end)?);
                if start > end {
                    return Err(InputError::Invalid(format!(
                        "range '{}' runs backwards",
                        token
                    )));
                }
                start..=end
            }
            None => {
                let i = parse_one(token)?;
                i..=i
            }
        };

        for i in range {
            if !indices.contains(&i) {
                indices.push(i);
            }
        }
    }

    if indices.is_empty() {
        return Err(InputError::Invalid("no subscriptions selected".to_string()));
    }

    Ok(indices)
}

/// Selection configured in `.azcir.toml`, used when no flag selects anything.
///
/// `subscription_ids` wins over `default_mode`.
pub fn configured_spec(config: &SelectionConfig) -> Option<SelectionSpec> {
    if !config.subscription_ids.is_empty() {
        return Some(SelectionSpec::Explicit(config.subscription_ids.clone()));
    }

    config.default_mode.map(|mode| match mode {
        SelectionMode::All => SelectionSpec::All,
        SelectionMode::Current => SelectionSpec::Current,
        SelectionMode::Single => SelectionSpec::Single,
    })
}

/// Interactive subscription picker over any reader/writer pair.
pub struct SelectionPrompt<R, W> {
    reader: R,
    writer: W,
    max_attempts: usize,
}

impl<R: BufRead, W: Write> SelectionPrompt<R, W> {
    pub fn new(reader: R, writer: W, max_attempts: usize) -> Self {
        Self {
            reader,
            writer,
            max_attempts,
        }
    }

    /// Show the menu and read a choice.
    ///
    /// Invalid input is re-prompted up to `max_attempts` times; after that, or
    /// at end of input, the current subscription is used.
    pub fn run(
        &mut self,
        available: &[Subscription],
        current: Option<&str>,
    ) -> Result<SelectionSpec, SelectionError> {
        self.render_menu(available, current)?;

        for attempt in 1..=self.max_attempts {
            write!(
                self.writer,
                "\nSelect subscriptions (e.g. 1,3 or 2-4), 'all', 'current' [default], or 'x' to cancel: "
            )?;
            self.writer.flush()?;

            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                warn!("No input available; using the current subscription");
                return Ok(SelectionSpec::Current);
            }

            match parse_selection_input(&line, available) {
                Ok(spec) => return Ok(spec),
                Err(InputError::Cancelled) => return Err(SelectionError::Cancelled),
                Err(InputError::Invalid(msg)) => {
                    writeln!(
                        self.writer,
                        "❌ {} (attempt {}/{})",
                        msg, attempt, self.max_attempts
                    )?;
                }
            }
        }

        warn!(
            "No valid selection after {} attempts; using the current subscription",
            self.max_attempts
        );
        writeln!(self.writer, "Falling back to the current subscription.")?;
        Ok(SelectionSpec::Current)
    }

    fn render_menu(
        &mut self,
        available: &[Subscription],
        current: Option<&str>,
    ) -> std::io::Result<()> {
        writeln!(self.writer, "\n📋 Available Azure subscriptions ({}):", available.len())?;

        for (i, sub) in available.iter().enumerate() {
            let is_current = match current {
                Some(id) => sub.matches_id(id),
                None => sub.is_default,
            };
            let marker = if is_current { " (current)" } else { "" };
            writeln!(
                self.writer,
                "  {}. {}{} - ID: {}, State: {}",
                i + 1,
                sub.name,
                marker,
                sub.id,
                sub.state
            )?;
        }

        Ok(())
    }
}
