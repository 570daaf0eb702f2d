use crate::builtin::Builtin;
use crate::command_index::CommandIndex;
use crate::completion::Completer;
use crate::config::Config;
use crate::dispatcher::{Dispatcher, Flow, Streams};
use crate::editor::Editor;
use crate::parser::Parser;
use anyhow::Context;

pub struct Shell {
    config: Config,
    index: CommandIndex,
    completer: Completer,
}

impl Shell {
    pub fn new(config: Config) -> Shell {
        let index = CommandIndex::build(config.path.as_deref(), &Builtin::ALL);
        let completer = Completer::new(&index);

        Shell {
            config,
            index,
            completer,
        }
    }

    /// Runs until end of input or `exit`, returning the status to exit with.
    pub fn repl(&self) -> anyhow::Result<i32> {
        let editor = Editor::new(&self.completer, &self.config.prompt);
        let mut streams = Streams::inherit();

        loop {
            let Some(line) = editor.readline().context("read line")? else {
                return Ok(0);
            };

            match self.eval(&line, &mut streams) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit(code)) => return Ok(code),
                Err(err) => {
                    log::error!("{line:?}: {err:#}");
                    eprintln!("{err:#}");
                }
            }
        }
    }

    pub fn eval(&self, line: &str, streams: &mut Streams) -> anyhow::Result<Flow> {
        let command_line = Parser::new(line).parse();
        log::debug!("{command_line:?}");

        Dispatcher::new(&self.index, &self.config).dispatch(&command_line, streams)
    }
}
