use crate::lexer::{Argument, Lexer};
use std::fs;
use std::io;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RedirectMode {
    Truncate,
    Append,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Redirect {
    pub stream: OutputStream,
    pub mode: RedirectMode,
    pub path: String,
}

impl Redirect {
    /// Maps an operator token to its stream and mode.
    pub fn operator(token: &str) -> Option<(OutputStream, RedirectMode)> {
        match token {
            ">" | "1>" => Some((OutputStream::Stdout, RedirectMode::Truncate)),
            ">>" | "1>>" => Some((OutputStream::Stdout, RedirectMode::Append)),
            "2>" => Some((OutputStream::Stderr, RedirectMode::Truncate)),
            "2>>" => Some((OutputStream::Stderr, RedirectMode::Append)),
            _ => None,
        }
    }

    pub fn open_output(&self) -> io::Result<fs::File> {
        let mut options = fs::OpenOptions::new();
        options.create(true);

        match self.mode {
            RedirectMode::Truncate => options.write(true).truncate(true),
            RedirectMode::Append => options.append(true),
        };

        options.open(&self.path)
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct CommandLine {
    pub args: Vec<Argument>,
    pub redirect: Option<Redirect>,
}

impl CommandLine {
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn name(&self) -> Option<&str> {
        self.args.first().map(Argument::unquoted)
    }

    /// Operands after the command name, quote marks stripped.
    pub fn operands(&self) -> Vec<String> {
        self.args
            .iter()
            .skip(1)
            .map(|arg| String::from(arg.unquoted()))
            .collect()
    }
}

pub struct Parser {
    input: Vec<Argument>,
}

impl Parser {
    pub fn new(input: &str) -> Self {
        Self {
            input: Lexer::new(input).lex(),
        }
    }

    pub fn parse(self) -> CommandLine {
        let mut args = self.input;

        let found = args.iter().enumerate().find_map(|(position, arg)| {
            if !arg.is_plain() {
                return None;
            }
            Redirect::operator(arg.raw()).map(|op| (position, op))
        });

        let Some((position, (stream, mode))) = found else {
            return CommandLine {
                args,
                redirect: None,
            };
        };

        // a dangling operator stays a literal argument
        if position + 1 >= args.len() {
            log::warn!("redirect operator {} has no target", args[position].raw());
            return CommandLine {
                args,
                redirect: None,
            };
        }

        let redirect = Redirect {
            stream,
            mode,
            path: String::from(args[position + 1].unquoted()),
        };
        args.truncate(position);

        CommandLine {
            args,
            redirect: Some(redirect),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::io::Write;

    fn words(line: &CommandLine) -> Vec<&str> {
        line.args.iter().map(Argument::unquoted).collect()
    }

    #[rstest]
    #[case("ls > out.txt", OutputStream::Stdout, RedirectMode::Truncate)]
    #[case("ls 1> out.txt", OutputStream::Stdout, RedirectMode::Truncate)]
    #[case("ls >> out.txt", OutputStream::Stdout, RedirectMode::Append)]
    #[case("ls 1>> out.txt", OutputStream::Stdout, RedirectMode::Append)]
    #[case("ls 2> out.txt", OutputStream::Stderr, RedirectMode::Truncate)]
    #[case("ls 2>> out.txt", OutputStream::Stderr, RedirectMode::Append)]
    fn redirect_operators(
        #[case] input: &str,
        #[case] stream: OutputStream,
        #[case] mode: RedirectMode,
    ) {
        let line = Parser::new(input).parse();
        assert_eq!(words(&line), vec!["ls"]);
        assert_eq!(
            line.redirect,
            Some(Redirect {
                stream,
                mode,
                path: String::from("out.txt"),
            })
        );
    }

    #[test]
    fn no_redirect_keeps_all_arguments() {
        let line = Parser::new("echo 'a b' c").parse();
        assert_eq!(line.redirect, None);
        assert_eq!(line.name(), Some("echo"));
        assert_eq!(line.operands(), vec!["a b", "c"]);
        assert_eq!(line.args[1].raw(), "'a b'");
    }

    #[test]
    fn first_operator_wins_and_truncates() {
        let line = Parser::new("echo a 2> err.log b > out.log").parse();
        assert_eq!(words(&line), vec!["echo", "a"]);
        let redirect = line.redirect.unwrap();
        assert_eq!(redirect.stream, OutputStream::Stderr);
        assert_eq!(redirect.path, "err.log");
    }

    #[test]
    fn quoted_target_is_stripped() {
        let line = Parser::new("echo hi > 'my file.txt'").parse();
        assert_eq!(line.redirect.unwrap().path, "my file.txt");
    }

    #[test]
    fn dangling_operator_is_literal() {
        let line = Parser::new("echo hi >").parse();
        assert_eq!(line.redirect, None);
        assert_eq!(words(&line), vec!["echo", "hi", ">"]);
    }

    #[rstest]
    #[case(r#"echo \> x"#, vec!["echo", ">", "x"])]
    #[case(r#"echo '>' x"#, vec!["echo", ">", "x"])]
    #[case(r#"echo ">" x"#, vec!["echo", ">", "x"])]
    #[case("echo a>b", vec!["echo", "a>b"])]
    fn quoted_or_embedded_operator_is_literal(#[case] input: &str, #[case] expected: Vec<&str>) {
        let line = Parser::new(input).parse();
        assert_eq!(line.redirect, None);
        assert_eq!(words(&line), expected);
    }

    #[test]
    fn empty_line() {
        let line = Parser::new("   ").parse();
        assert!(line.is_empty());
        assert_eq!(line.name(), None);
    }

    #[test]
    fn truncate_and_append_modes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt").display().to_string();

        for (op, content) in [(">", "one\n"), (">>", "two\n")] {
            let redirect = Parser::new(&format!("echo > {path}")).parse().redirect.unwrap();
            let redirect = Redirect {
                mode: Redirect::operator(op).unwrap().1,
                ..redirect
            };
            redirect
                .open_output()
                .unwrap()
                .write_all(content.as_bytes())
                .unwrap();
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");

        let redirect = Parser::new(&format!("echo > {path}")).parse().redirect.unwrap();
        redirect.open_output().unwrap().write_all(b"three\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "three\n");
    }
}
