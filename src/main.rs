use cshell::config::Config;
use cshell::shell::Shell;
use std::process;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let shell = Shell::new(Config::from_env());
    let code = shell.repl()?;

    process::exit(code);
}
