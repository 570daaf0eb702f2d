use crate::ShellError;
use crate::command_index::{CommandIndex, CommandKind};
use crate::config::Config;
use crate::print_to;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::{env, fs};

/// Exit status used when `exit` is given something that is not a number.
pub const EXIT_PARSE_ERROR: i32 = 2;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Builtin {
    Echo,
    Exit,
    Type,
    Pwd,
    Cd,
}

impl Builtin {
    pub const ALL: [Builtin; 5] = [
        Builtin::Echo,
        Builtin::Exit,
        Builtin::Type,
        Builtin::Pwd,
        Builtin::Cd,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Echo => "echo",
            Builtin::Exit => "exit",
            Builtin::Type => "type",
            Builtin::Pwd => "pwd",
            Builtin::Cd => "cd",
        }
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn echo(args: &[String], out: &mut dyn Write) -> io::Result<()> {
    let line = args.join(" ");
    print_to!(out, "{line}\n");

    Ok(())
}

/// Resolves the status `exit` terminates with.
pub fn exit_code(args: &[String], err: &mut dyn Write) -> io::Result<i32> {
    let Some(arg) = args.first() else {
        return Ok(0);
    };

    match arg.trim().parse() {
        Ok(code) => Ok(code),
        Err(_) => {
            print_to!(err, "{}\n", ShellError::BadExitCode(arg.clone()));
            Ok(EXIT_PARSE_ERROR)
        }
    }
}

pub fn type_builtin(args: &[String], index: &CommandIndex, out: &mut dyn Write) -> io::Result<()> {
    for arg in args {
        match index.get(arg).map(|entry| &entry.kind) {
            Some(CommandKind::Builtin(_)) => print_to!(out, "{arg} is a shell builtin\n"),
            Some(CommandKind::External(path)) => print_to!(out, "{arg} is {}\n", path.display()),
            None => print_to!(out, "{arg}: not found\n"),
        }
    }

    Ok(())
}

pub fn pwd(out: &mut dyn Write) -> io::Result<()> {
    print_to!(out, "{}\n", env::current_dir()?.display());

    Ok(())
}

pub fn cd(args: &[String], config: &Config, err: &mut dyn Write) -> io::Result<()> {
    let target = match args.first() {
        Some(arg) => expand_home(arg, config.home.as_deref()),
        None => config.home.as_ref().map(PathBuf::from),
    };

    let Some(target) = target else {
        print_to!(err, "{}\n", ShellError::HomeNotSet);
        return Ok(());
    };
    let shown = args.first().cloned().unwrap_or_else(|| target.display().to_string());

    match fs::metadata(&target) {
        Ok(attr) if attr.is_dir() => {}
        Ok(_) => {
            print_to!(err, "{}\n", ShellError::NotADirectory(shown));
            return Ok(());
        }
        Err(ref e) if e.kind() == io::ErrorKind::NotFound => {
            print_to!(err, "{}\n", ShellError::NoSuchDirectory(shown));
            return Ok(());
        }
        Err(e) => {
            print_to!(err, "cd: {shown}: {e}\n");
            return Ok(());
        }
    }

    match env::set_current_dir(&target) {
        Ok(()) => log::debug!("working directory is now {}", target.display()),
        Err(e) => print_to!(err, "cd: {shown}: {e}\n"),
    }

    Ok(())
}

/// Expands a leading `~` or `~/` to `home`. `None` when `~` is used without a home.
fn expand_home(arg: &str, home: Option<&str>) -> Option<PathBuf> {
    let rest = match arg.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => return Some(PathBuf::from(arg)),
    };

    let home = Path::new(home?);
    match rest.trim_start_matches('/') {
        "" => Some(home.to_path_buf()),
        rest => Some(home.join(rest)),
    }
}
