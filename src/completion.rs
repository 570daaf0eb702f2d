use crate::command_index::CommandIndex;
use crate::trie::{self, Trie};
use std::ops::Range;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Completion {
    NoMatch,
    /// The only candidate, with a trailing space appended.
    Unique(String),
    Ambiguous {
        prefix: String,
        candidates: Vec<String>,
    },
}

/// Completes command names from the trie built over a [`CommandIndex`].
pub struct Completer {
    trie: Trie,
}

impl Completer {
    pub fn new(index: &CommandIndex) -> Self {
        Self {
            trie: index.names().collect(),
        }
    }

    pub fn complete(&self, word: &str) -> Completion {
        let mut candidates = self.trie.complete(word);

        match candidates.len() {
            0 => Completion::NoMatch,
            1 => Completion::Unique(append_trailing_space(&candidates.remove(0))),
            _ => Completion::Ambiguous {
                prefix: trie::longest_common_prefix(&candidates),
                candidates,
            },
        }
    }
}

impl From<Trie> for Completer {
    fn from(trie: Trie) -> Self {
        Self { trie }
    }
}

/// Byte range of the command word: from the first printable character up to
/// the next space or the end of `line`.
pub fn command_word(line: &str) -> Range<usize> {
    let start = line
        .find(|c: char| !c.is_whitespace() && !c.is_control())
        .unwrap_or(line.len());
    let end = line[start..]
        .find(' ')
        .map_or(line.len(), |offset| start + offset);

    start..end
}

fn append_trailing_space(path: &str) -> String {
    let mut result = String::with_capacity(path.len() + 1);
    result.push_str(path);
    result.push(' ');

    result
}
