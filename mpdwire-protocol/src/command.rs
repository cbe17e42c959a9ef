//! Command line encoding.

use crate::error::ProtocolError;
use crate::quote::quote;
use std::fmt;

/// Opens a command list whose sub-responses are each terminated by `list_OK`.
pub const COMMAND_LIST_OK_BEGIN: &str = "command_list_ok_begin";

/// Closes a command list.
pub const COMMAND_LIST_END: &str = "command_list_end";

/// A single protocol command: a bare name followed by quoted arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: String,
    args: Vec<String>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Appends an argument only when present.
    pub fn opt_arg(self, arg: Option<impl Into<String>>) -> Self {
        match arg {
            Some(arg) => self.arg(arg),
            None => self,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Encodes the command as one newline-terminated protocol line.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        if self.name.is_empty() || self.name.contains(char::is_whitespace) {
            return Err(ProtocolError::InvalidCommand(self.name.clone()));
        }

        let mut line = self.name.clone();
        for arg in &self.args {
            if arg.contains('\n') {
                return Err(ProtocolError::InvalidArgument(arg.clone()));
            }
            line.push(' ');
            line.push_str(&quote(arg));
        }
        line.push('\n');
        Ok(line)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

/// A batch of commands executed by the daemon in one go.
///
/// The daemon stops at the first failing command; the ACK index is kept
/// as the daemon reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandList {
    commands: Vec<Command>,
}

impl CommandList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn with(mut self, command: Command) -> Self {
        self.push(command);
        self
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Encodes the whole batch, including the begin/end markers.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        let mut out = String::from(COMMAND_LIST_OK_BEGIN);
        out.push('\n');
        for command in &self.commands {
            out.push_str(&command.encode()?);
        }
        out.push_str(COMMAND_LIST_END);
        out.push('\n');
        Ok(out)
    }
}

impl FromIterator<Command> for CommandList {
    fn from_iter<T: IntoIterator<Item = Command>>(iter: T) -> Self {
        Self {
            commands: iter.into_iter().collect(),
        }
    }
}
