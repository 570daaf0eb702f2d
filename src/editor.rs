use crate::completion::{Completer, Completion, command_word};
use std::io::{self, IsTerminal, Read, Write};
use std::os::unix::io::{AsRawFd, RawFd};
use termios::{ECHO, ICANON, ISIG, TCSANOW, Termios, VMIN, VTIME, tcsetattr};

const BELL: &[u8] = b"\x07";
const ERASE: &[u8] = b"\x08 \x08";
const CLEAR_TO_EOL: &str = "\x1b[K";

const CTRL_C: u8 = 0x03;
const CTRL_D: u8 = 0x04;
const CTRL_H: u8 = 0x08;
const ESC: u8 = 0x1b;
const DEL: u8 = 0x7f;

/// Non-canonical, echo-free terminal mode for as long as the guard lives.
/// Ctrl-C arrives as a byte instead of a signal, so the guard always gets to
/// restore the terminal.
pub struct RawMode {
    fd: RawFd,
    original: Termios,
}

impl RawMode {
    pub fn enable(fd: RawFd) -> io::Result<Self> {
        let original = Termios::from_fd(fd)?;
        let mut raw = original;
        raw.c_lflag &= !(ICANON | ECHO | ISIG);
        raw.c_cc[VMIN] = 1;
        raw.c_cc[VTIME] = 0;
        tcsetattr(fd, TCSANOW, &raw)?;
        log::trace!("raw mode on for fd {fd}");

        Ok(Self { fd, original })
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Err(err) = tcsetattr(self.fd, TCSANOW, &self.original) {
            log::error!("restore terminal mode: {err}");
        }
        log::trace!("raw mode off for fd {}", self.fd);
    }
}

/// Reads one line a byte at a time, echoing and completing as it goes.
pub struct Editor<'a> {
    completer: &'a Completer,
    prompt: &'a str,
}

impl<'a> Editor<'a> {
    pub fn new(completer: &'a Completer, prompt: &'a str) -> Self {
        Self { completer, prompt }
    }

    /// Reads a line from the process terminal. `None` at end of input.
    pub fn readline(&self) -> io::Result<Option<String>> {
        let stdin = io::stdin();
        let _raw_mode = if stdin.is_terminal() {
            Some(RawMode::enable(stdin.as_raw_fd())?)
        } else {
            None
        };

        self.read_line(&mut stdin.lock(), &mut io::stdout().lock())
    }

    pub fn read_line<R: Read, W: Write>(
        &self,
        input: &mut R,
        output: &mut W,
    ) -> io::Result<Option<String>> {
        let mut buffer = String::new();
        let mut previous_tab = false;
        let mut pending: Option<u8> = None;

        output.write_all(self.prompt.as_bytes())?;
        output.flush()?;

        loop {
            let next = match pending.take() {
                Some(byte) => Some(byte),
                None => read_byte(input)?,
            };
            let Some(byte) = next else {
                if buffer.is_empty() {
                    return Ok(None);
                }
                output.write_all(b"\n")?;
                output.flush()?;
                return Ok(Some(buffer));
            };

            match byte {
                b'\n' | b'\r' => {
                    output.write_all(b"\n")?;
                    output.flush()?;
                    return Ok(Some(buffer));
                }
                DEL | CTRL_H => {
                    if buffer.pop().is_some() {
                        output.write_all(ERASE)?;
                    }
                }
                b'\t' => self.complete(&mut buffer, previous_tab, output)?,
                CTRL_C => {
                    buffer.clear();
                    output.write_all(b"^C\n")?;
                    output.write_all(self.prompt.as_bytes())?;
                }
                CTRL_D if buffer.is_empty() => {
                    output.write_all(b"\n")?;
                    output.flush()?;
                    return Ok(None);
                }
                ESC => skip_escape_sequence(input)?,
                byte if byte < b' ' => {}
                byte => match read_char(byte, input)? {
                    Decoded::Char(c) => {
                        buffer.push(c);
                        let mut encoded = [0; 4];
                        output.write_all(c.encode_utf8(&mut encoded).as_bytes())?;
                    }
                    Decoded::Invalid => {}
                    Decoded::Cut(byte) => pending = Some(byte),
                },
            }

            previous_tab = byte == b'\t';
            output.flush()?;
        }
    }

    fn complete<W: Write>(
        &self,
        buffer: &mut String,
        previous_tab: bool,
        output: &mut W,
    ) -> io::Result<()> {
        let span = command_word(buffer);
        let completion = self.completer.complete(&buffer[span.clone()]);
        log::debug!("complete {:?}: {completion:?}", &buffer[span.clone()]);

        match completion {
            Completion::NoMatch => output.write_all(BELL)?,
            Completion::Unique(candidate) => {
                let replacement = if span.end == buffer.len() {
                    candidate.as_str()
                } else {
                    candidate.trim_end()
                };
                buffer.replace_range(span, replacement);
                self.redraw(buffer, output)?;
            }
            Completion::Ambiguous { prefix, candidates } => {
                buffer.replace_range(span, &prefix);
                self.redraw(buffer, output)?;
                output.write_all(BELL)?;

                if previous_tab {
                    write!(output, "\n{}\n", candidates.join("  "))?;
                    self.redraw(buffer, output)?;
                }
            }
        }

        Ok(())
    }

    fn redraw<W: Write>(&self, buffer: &str, output: &mut W) -> io::Result<()> {
        write!(output, "\r{}{buffer}{CLEAR_TO_EOL}", self.prompt)
    }
}

fn read_byte<R: Read>(input: &mut R) -> io::Result<Option<u8>> {
    let mut byte = [0; 1];
    loop {
        match input.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
}

enum Decoded {
    Char(char),
    Invalid,
    /// The sequence ended early; this byte starts whatever comes next.
    Cut(u8),
}

/// Completes a UTF-8 sequence starting with `lead`.
fn read_char<R: Read>(lead: u8, input: &mut R) -> io::Result<Decoded> {
    let width = match lead {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => return Ok(Decoded::Invalid),
    };

    let mut bytes = [lead, 0, 0, 0];
    for slot in bytes.iter_mut().take(width).skip(1) {
        match read_byte(input)? {
            Some(byte @ 0x80..=0xbf) => *slot = byte,
            Some(byte) => return Ok(Decoded::Cut(byte)),
            None => return Ok(Decoded::Invalid),
        }
    }

    Ok(std::str::from_utf8(&bytes[..width])
        .ok()
        .and_then(|s| s.chars().next())
        .map_or(Decoded::Invalid, Decoded::Char))
}

/// Swallows a CSI (`ESC [ ... final`) or SS3 (`ESC O x`) sequence.
fn skip_escape_sequence<R: Read>(input: &mut R) -> io::Result<()> {
    match read_byte(input)? {
        Some(b'[') => {
            while let Some(byte) = read_byte(input)? {
                if (0x40..=0x7e).contains(&byte) {
                    break;
                }
            }
        }
        Some(b'O') => {
            read_byte(input)?;
        }
        _ => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::Trie;
    use nix::pty::{OpenptyResult, Winsize, openpty};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn run(words: &[&str], keys: &[u8]) -> (Option<String>, String) {
        let completer = Completer::from(words.iter().collect::<Trie>());
        let editor = Editor::new(&completer, "$ ");
        let mut output = Vec::new();
        let line = editor
            .read_line(&mut Cursor::new(keys.to_vec()), &mut output)
            .unwrap();

        (line, String::from_utf8(output).unwrap())
    }

    #[test]
    fn plain_line_is_echoed() {
        let (line, output) = run(&[], b"ls -la\n");
        assert_eq!(line.as_deref(), Some("ls -la"));
        assert_eq!(output, "$ ls -la\n");
    }

    #[test]
    fn carriage_return_ends_line() {
        let (line, _) = run(&[], b"pwd\rignored");
        assert_eq!(line.as_deref(), Some("pwd"));
    }

    #[test]
    fn backspace_erases() {
        let (line, output) = run(&[], b"lx\x7fs\n");
        assert_eq!(line.as_deref(), Some("ls"));
        assert_eq!(output, "$ lx\x08 \x08s\n");
    }

    #[test]
    fn backspace_on_empty_buffer_is_silent() {
        let (line, output) = run(&[], b"\x7f\x7fa\n");
        assert_eq!(line.as_deref(), Some("a"));
        assert_eq!(output, "$ a\n");
    }

    #[test]
    fn unique_completion_adds_space() {
        let (line, output) = run(&["echo", "exit", "cd"], b"ech\techo\n");
        assert_eq!(line.as_deref(), Some("echo echo"));
        assert_eq!(output, "$ ech\r$ echo \x1b[Kecho\n");
    }

    #[test]
    fn unique_completion_before_arguments_keeps_spacing() {
        let (line, _) = run(&["echo"], b"ech hi\t\n");
        assert_eq!(line.as_deref(), Some("echo hi"));

        let (line, _) = run(&["echo"], b"  ec\t\n");
        assert_eq!(line.as_deref(), Some("  echo "));
    }

    #[test]
    fn no_match_rings_bell() {
        let (line, output) = run(&["echo"], b"zz\t\n");
        assert_eq!(line.as_deref(), Some("zz"));
        assert_eq!(output, "$ zz\x07\n");
    }

    #[test]
    fn ambiguous_completion_extends_to_common_prefix() {
        let (line, output) = run(&["xyz_foo_bar", "xyz_foo_baz"], b"xy\t\n");
        assert_eq!(line.as_deref(), Some("xyz_foo_ba"));
        assert_eq!(output, "$ xy\r$ xyz_foo_ba\x1b[K\x07\n");
    }

    #[test]
    fn double_tab_lists_candidates() {
        let (line, output) = run(&["cat", "cd", "echo"], b"c\t\t\n");
        assert_eq!(line.as_deref(), Some("c"));
        assert_eq!(
            output,
            "$ c\r$ c\x1b[K\x07\r$ c\x1b[K\x07\ncat  cd\n\r$ c\x1b[K\n"
        );
    }

    #[test]
    fn tabs_separated_by_a_key_do_not_list() {
        let (_, output) = run(&["cat", "cd"], b"c\tx\x7f\t\n");
        assert!(!output.contains("cat  cd"));
    }

    #[test]
    fn end_of_input() {
        assert_eq!(run(&[], b"").0, None);
        assert_eq!(run(&[], b"\x04").0, None);
        assert_eq!(run(&[], b"partial").0.as_deref(), Some("partial"));
    }

    #[test]
    fn escape_sequences_are_ignored() {
        let (line, output) = run(&[], b"a\x1b[A\x1b[1;5Cb\n");
        assert_eq!(line.as_deref(), Some("ab"));
        assert_eq!(output, "$ ab\n");
    }

    #[test]
    fn truncated_sequence_does_not_swallow_newline() {
        let (line, output) = run(&[], b"ls\xc3\nsecond\n");
        assert_eq!(line.as_deref(), Some("ls"));
        assert_eq!(output, "$ ls\n");

        let (line, _) = run(&[], b"ab\xe2\x82\x7fc\n");
        assert_eq!(line.as_deref(), Some("ac"));

        let (line, _) = run(&[], b"x\xc3\xc3\xa9\n");
        assert_eq!(line.as_deref(), Some("x\u{e9}"));
    }

    #[test]
    fn ctrl_c_discards_buffer() {
        let (line, output) = run(&[], b"rm -rf\x03ls\n");
        assert_eq!(line.as_deref(), Some("ls"));
        assert_eq!(output, "$ rm -rf^C\n$ ls\n");
    }

    #[test]
    fn multibyte_characters() {
        let (line, output) = run(&[], "echo h\u{e9}llo \u{1f600}\n".as_bytes());
        assert_eq!(line.as_deref(), Some("echo h\u{e9}llo \u{1f600}"));
        assert_eq!(output, "$ echo h\u{e9}llo \u{1f600}\n");
    }

    fn open_terminal() -> OpenptyResult {
        openpty(None::<&Winsize>, None::<&nix::sys::termios::Termios>).unwrap()
    }

    fn local_flags(fd: RawFd) -> termios::tcflag_t {
        Termios::from_fd(fd).unwrap().c_lflag
    }

    #[test]
    fn raw_mode_is_restored_on_drop() {
        let pty = open_terminal();
        let fd = pty.slave.as_raw_fd();
        let before = local_flags(fd);

        {
            let _raw_mode = RawMode::enable(fd).unwrap();
            let flags = local_flags(fd);
            assert_eq!(flags & (ICANON | ECHO | ISIG), 0);
        }

        assert_eq!(local_flags(fd), before);
    }

    fn read_in_raw_mode(fd: RawFd, mut input: &[u8]) -> io::Result<u8> {
        let _raw_mode = RawMode::enable(fd)?;
        let mut byte = [0; 1];
        input.read_exact(&mut byte)?;

        Ok(byte[0])
    }

    #[test]
    fn raw_mode_is_restored_on_error() {
        let pty = open_terminal();
        let fd = pty.slave.as_raw_fd();
        let before = local_flags(fd);

        let err = read_in_raw_mode(fd, b"").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(local_flags(fd), before);

        assert_eq!(read_in_raw_mode(fd, b"q").unwrap(), b'q');
        assert_eq!(local_flags(fd), before);
    }
}
