use derive_more::{AsRef, Deref, Display, From, Into};
use serde::{Deserialize, Serialize};
use std::process::{Command, Stdio};
use thiserror::Error;

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, Deref, From, Into, AsRef,
)]
#[serde(transparent)]
pub struct ExecCommand(String);

piemenu::impl_string_newtype!(ExecCommand);

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("command is empty")]
    Empty,
    #[error("could not split '{command}': {source}")]
    Parse {
        command: String,
        source: shell_words::ParseError,
    },
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
}

impl ExecCommand {
    /// Shell-style word splitting; no shell is involved in running it.
    pub fn argv(&self) -> Result<Vec<String>, ExecError> {
        let argv = shell_words::split(&self.0).map_err(|source| ExecError::Parse {
            command: self.0.clone(),
            source,
        })?;
        if argv.is_empty() {
            return Err(ExecError::Empty);
        }
        Ok(argv)
    }

    /// Starts the command detached from our stdio and does not wait for it.
    pub fn spawn(&self) -> Result<(), ExecError> {
        let argv = self.argv()?;
        let (program, args) = argv.split_first().ok_or(ExecError::Empty)?;
        Command::new(program)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ExecError::Spawn {
                program: program.clone(),
                source,
            })?;
        log::info!("launched {}", self.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argv_splits_like_a_shell() {
        let cmd = ExecCommand::new(r#"foot -e "htop --tree""#);
        assert_eq!(cmd.argv().unwrap(), ["foot", "-e", "htop --tree"]);
    }

    #[test]
    fn test_bad_commands_are_rejected() {
        assert!(matches!(ExecCommand::new("   ").argv(), Err(ExecError::Empty)));
        assert!(matches!(
            ExecCommand::new("echo 'unterminated").argv(),
            Err(ExecError::Parse { .. })
        ));
    }
}
