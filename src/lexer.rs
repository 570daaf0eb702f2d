use std::mem;

const DOUBLE_QUOTE_ESCAPES: &[char] = &['\\', '$', '"'];

#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub enum QuoteMode {
    #[default]
    None,
    Single,
    Double,
}

impl QuoteMode {
    fn from_mark(mark: char) -> Self {
        match mark {
            '\'' => QuoteMode::Single,
            '"' => QuoteMode::Double,
            _ => QuoteMode::None,
        }
    }

    pub fn mark(self) -> Option<char> {
        match self {
            QuoteMode::None => None,
            QuoteMode::Single => Some('\''),
            QuoteMode::Double => Some('"'),
        }
    }
}

/// One shell word after quote and escape processing.
///
/// A word written as a single quoted span keeps its scoping quote marks in
/// [`Argument::raw`]; [`Argument::unquoted`] strips them.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Argument {
    raw: String,
    scope: QuoteMode,
    plain: bool,
}

impl Argument {
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn scope(&self) -> QuoteMode {
        self.scope
    }

    /// True when the word was written without any quote or backslash.
    pub fn is_plain(&self) -> bool {
        self.plain
    }

    pub fn unquoted(&self) -> &str {
        match self.scope.mark() {
            Some(mark) => {
                let inner = self.raw.strip_prefix(mark).unwrap_or(&self.raw);
                inner.strip_suffix(mark).unwrap_or(inner)
            }
            None => &self.raw,
        }
    }
}

impl From<&str> for Argument {
    fn from(word: &str) -> Self {
        Self {
            raw: String::from(word),
            scope: QuoteMode::None,
            plain: true,
        }
    }
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    quote: QuoteMode,
    raw: String,
    scope: QuoteMode,
    plain: bool,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            quote: QuoteMode::None,
            raw: String::new(),
            scope: QuoteMode::None,
            plain: true,
        }
    }

    pub fn lex(&mut self) -> Vec<Argument> {
        let mut arguments = Vec::new();

        while self.peek().is_some_and(is_separator) {
            self.position += 1;
        }

        while let Some(c) = self.next_char() {
            match self.quote {
                QuoteMode::None => self.handle_unquoted(c, &mut arguments),
                QuoteMode::Single => self.handle_single_quoted(c),
                QuoteMode::Double => self.handle_double_quoted(c),
            }
        }

        // unterminated span closes at end of input
        if self.quote != QuoteMode::None {
            self.quote = QuoteMode::None;
            if let Some(mark) = self.scope.mark() {
                self.raw.push(mark);
            }
        }
        self.flush(&mut arguments);

        arguments
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.input.get(self.position).copied();
        self.position += 1;
        c
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn handle_unquoted(&mut self, c: char, arguments: &mut Vec<Argument>) {
        match c {
            c if is_separator(c) => self.flush(arguments),
            '\\' => {
                self.plain = false;
                let escaped = self.next_char().unwrap_or('\\');
                self.raw.push(escaped);
            }
            '\'' | '"' => self.open_quote(c),
            c => self.raw.push(c),
        }
    }

    fn handle_single_quoted(&mut self, c: char) {
        match c {
            '\'' => self.close_quote('\''),
            c => self.raw.push(c),
        }
    }

    fn handle_double_quoted(&mut self, c: char) {
        match c {
            '"' => self.close_quote('"'),
            '\\' => match self.peek() {
                Some(next) if DOUBLE_QUOTE_ESCAPES.contains(&next) => {
                    self.position += 1;
                    self.raw.push(next);
                }
                _ => self.raw.push('\\'),
            },
            c => self.raw.push(c),
        }
    }

    fn open_quote(&mut self, mark: char) {
        let mode = QuoteMode::from_mark(mark);
        self.plain = false;
        if self.raw.is_empty() && self.scope == QuoteMode::None {
            self.raw.push(mark);
            self.scope = mode;
        }
        self.quote = mode;
    }

    fn close_quote(&mut self, mark: char) {
        match self.peek() {
            // doubled mark: elide both, the span goes on
            Some(next) if next == mark => self.position += 1,
            Some(next) if !is_separator(next) => {
                self.quote = QuoteMode::None;
                if self.scope != QuoteMode::None {
                    self.raw.remove(0);
                    self.scope = QuoteMode::None;
                }
            }
            _ => {
                self.quote = QuoteMode::None;
                if self.scope != QuoteMode::None {
                    self.raw.push(mark);
                }
            }
        }
    }

    fn flush(&mut self, arguments: &mut Vec<Argument>) {
        if !self.raw.is_empty() {
            arguments.push(Argument {
                raw: mem::take(&mut self.raw),
                scope: self.scope,
                plain: self.plain,
            });
        }

        self.scope = QuoteMode::None;
        self.plain = true;
    }
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c.is_control()
}
