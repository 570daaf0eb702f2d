pub mod builtin;
pub mod command_index;
pub mod completion;
pub mod config;
pub mod dispatcher;
pub mod editor;
pub mod lexer;
pub mod macros;
pub mod parser;
pub mod shell;
pub mod trie;

use std::io;

/// Everything the shell reports to the user and then carries on from.
#[derive(thiserror::Error, Debug)]
pub enum ShellError {
    #[error("{0}: command not found")]
    CommandNotFound(String),
    #[error("{name}: {source}")]
    Launch { name: String, source: io::Error },
    #[error("{path}: {source}")]
    Redirect { path: String, source: io::Error },
    #[error("cd: {0}: No such file or directory")]
    NoSuchDirectory(String),
    #[error("cd: {0}: Not a directory")]
    NotADirectory(String),
    #[error("cd: HOME not set")]
    HomeNotSet,
    #[error("exit: {0}: numeric argument required")]
    BadExitCode(String),
}
