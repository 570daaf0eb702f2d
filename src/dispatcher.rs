use crate::ShellError;
use crate::builtin::{self, Builtin};
use crate::command_index::{CommandIndex, CommandKind};
use crate::config::Config;
use crate::parser::{CommandLine, OutputStream};
use crate::print_to;
use anyhow::Context;
use std::io::{self, Write};
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::{fs, mem, process};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Flow {
    Continue,
    Exit(i32),
}

/// Destination of one output stream.
pub enum Sink {
    Stdout,
    Stderr,
    File(fs::File),
    Buffer(Vec<u8>),
}

impl Sink {
    /// What a child process gets for this stream. Buffers are piped and
    /// collected once the child exits.
    fn stdio(&self) -> io::Result<process::Stdio> {
        Ok(match self {
            Sink::Stdout | Sink::Stderr => process::Stdio::inherit(),
            Sink::File(file) => process::Stdio::from(file.try_clone()?),
            Sink::Buffer(_) => process::Stdio::piped(),
        })
    }

    pub fn contents(&self) -> Option<&[u8]> {
        match self {
            Sink::Buffer(buf) => Some(buf.as_slice()),
            _ => None,
        }
    }
}

impl io::Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink::Stdout => io::stdout().write(buf),
            Sink::Stderr => io::stderr().write(buf),
            Sink::File(file) => file.write(buf),
            Sink::Buffer(buffer) => buffer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::Stdout => io::stdout().flush(),
            Sink::Stderr => io::stderr().flush(),
            Sink::File(file) => file.flush(),
            Sink::Buffer(_) => Ok(()),
        }
    }
}

pub struct Streams {
    pub out: Sink,
    pub err: Sink,
}

impl Streams {
    pub fn inherit() -> Self {
        Self {
            out: Sink::Stdout,
            err: Sink::Stderr,
        }
    }

    pub fn captured() -> Self {
        Self {
            out: Sink::Buffer(Vec::new()),
            err: Sink::Buffer(Vec::new()),
        }
    }

    fn sink_mut(&mut self, stream: OutputStream) -> &mut Sink {
        match stream {
            OutputStream::Stdout => &mut self.out,
            OutputStream::Stderr => &mut self.err,
        }
    }

    /// Points `stream` at `sink` until the returned guard is dropped.
    pub fn redirect(&mut self, stream: OutputStream, sink: Sink) -> Redirected<'_> {
        let saved = mem::replace(self.sink_mut(stream), sink);

        Redirected {
            streams: self,
            stream,
            saved: Some(saved),
        }
    }
}

pub struct Redirected<'a> {
    streams: &'a mut Streams,
    stream: OutputStream,
    saved: Option<Sink>,
}

impl Deref for Redirected<'_> {
    type Target = Streams;

    fn deref(&self) -> &Streams {
        self.streams
    }
}

impl DerefMut for Redirected<'_> {
    fn deref_mut(&mut self) -> &mut Streams {
        self.streams
    }
}

impl Drop for Redirected<'_> {
    fn drop(&mut self) {
        let Some(saved) = self.saved.take() else {
            return;
        };

        let mut substitute = mem::replace(self.streams.sink_mut(self.stream), saved);
        if let Err(err) = substitute.flush() {
            log::warn!("flush redirected {:?}: {err}", self.stream);
        }
    }
}

pub struct Dispatcher<'a> {
    index: &'a CommandIndex,
    config: &'a Config,
}

impl<'a> Dispatcher<'a> {
    pub fn new(index: &'a CommandIndex, config: &'a Config) -> Self {
        Self { index, config }
    }

    pub fn dispatch(&self, line: &CommandLine, streams: &mut Streams) -> anyhow::Result<Flow> {
        let Some(name) = line.name() else {
            return Ok(Flow::Continue);
        };
        let args = line.operands();

        let Some(redirect) = &line.redirect else {
            return self.run(name, &args, streams);
        };

        let file = match redirect.open_output() {
            Ok(file) => file,
            Err(err) => {
                print_to!(
                    streams.err,
                    "{}\n",
                    ShellError::Redirect {
                        path: redirect.path.clone(),
                        source: err,
                    }
                );
                return Ok(Flow::Continue);
            }
        };
        log::debug!("{:?} -> {} ({:?})", redirect.stream, redirect.path, redirect.mode);

        let mut redirected = streams.redirect(redirect.stream, Sink::File(file));
        self.run(name, &args, &mut redirected)
    }

    fn run(&self, name: &str, args: &[String], streams: &mut Streams) -> anyhow::Result<Flow> {
        let Some(entry) = self.index.get(name) else {
            log::debug!("{name} is not indexed");
            print_to!(streams.err, "{}\n", ShellError::CommandNotFound(String::from(name)));
            return Ok(Flow::Continue);
        };

        match &entry.kind {
            CommandKind::Builtin(builtin) => self.run_builtin(*builtin, args, streams),
            CommandKind::External(path) => {
                self.spawn(name, path, args, streams)?;
                Ok(Flow::Continue)
            }
        }
    }

    fn run_builtin(
        &self,
        builtin: Builtin,
        args: &[String],
        streams: &mut Streams,
    ) -> anyhow::Result<Flow> {
        log::debug!("builtin {builtin} {args:?}");

        match builtin {
            Builtin::Echo => builtin::echo(args, &mut streams.out)?,
            Builtin::Exit => return Ok(Flow::Exit(builtin::exit_code(args, &mut streams.err)?)),
            Builtin::Type => builtin::type_builtin(args, self.index, &mut streams.out)?,
            Builtin::Pwd => builtin::pwd(&mut streams.out)?,
            Builtin::Cd => builtin::cd(args, self.config, &mut streams.err)?,
        }

        Ok(Flow::Continue)
    }

    fn spawn(
        &self,
        name: &str,
        path: &Path,
        args: &[String],
        streams: &mut Streams,
    ) -> anyhow::Result<()> {
        streams.out.flush()?;
        streams.err.flush()?;

        let mut cmd = process::Command::new(path);
        cmd.args(args)
            .stdout(streams.out.stdio()?)
            .stderr(streams.err.stdio()?);
        log::debug!("spawn {cmd:?}");

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                print_to!(
                    streams.err,
                    "{}\n",
                    ShellError::Launch {
                        name: String::from(name),
                        source: err,
                    }
                );
                return Ok(());
            }
        };

        let output = child
            .wait_with_output()
            .with_context(|| format!("wait for {name}"))?;
        log::debug!("{name} exited with {}", output.status);

        // only piped streams carry anything here
        streams.out.write_all(&output.stdout)?;
        streams.err.write_all(&output.stderr)?;

        Ok(())
    }
}
