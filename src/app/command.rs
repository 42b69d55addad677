// Service command line parsing and variable expansion.

use std::borrow::Cow;

use super::error::CommandError;

/// A service command line as typed by the user, e.g.
/// `LOG=debug deno run -A ./main.ts --port=$PORT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCommand {
    raw: String,
    overrides: Vec<String>,
    program: String,
    args: Vec<String>,
}

/// A command ready to launch: variables expanded, environment complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl ServiceCommand {
    /// Splits on whitespace. Leading `KEY=VALUE` words are environment
    /// overrides, the first other word is the program.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut words = line.split_whitespace().peekable();
        if words.peek().is_none() {
            return Err(CommandError::Empty);
        }

        let mut overrides = Vec::new();
        while let Some(word) = words.next_if(|w| is_assignment(w)) {
            overrides.push(word.to_string());
        }
        let program = words
            .next()
            .ok_or_else(|| CommandError::MissingProgram(line.to_string()))?
            .to_string();

        Ok(Self {
            raw: line.to_string(),
            overrides,
            program,
            args: words.map(str::to_string).collect(),
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Expands `$VAR` and `${VAR}`: `port_env` becomes `port`, other names
    /// come from the supervisor's environment and expand to nothing when
    /// unset. The returned environment holds `port_env=port` followed by the
    /// overrides, so an override wins.
    pub fn resolve(&self, port_env: &str, port: u16) -> Resolved {
        let expand = |s: &str| -> String {
            let value: Cow<'_, str> = shellexpand::env_with_context_no_errors(s, |var: &str| {
                Some(if var == port_env {
                    port.to_string()
                } else {
                    std::env::var(var).unwrap_or_default()
                })
            });
            value.into_owned()
        };

        let mut env = vec![(port_env.to_string(), port.to_string())];
        for assignment in &self.overrides {
            if let Some((key, value)) = assignment.split_once('=') {
                env.push((key.to_string(), expand(value)));
            }
        }

        Resolved {
            program: expand(&self.program),
            args: self.args.iter().map(|a| expand(a)).collect(),
            env,
        }
    }
}

fn is_assignment(word: &str) -> bool {
    matches!(word.split_once('='), Some((key, _)) if !key.is_empty())
}
