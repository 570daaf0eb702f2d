use std::collections::BTreeMap;

const ROOT: usize = 0;

#[derive(Default, Debug)]
struct Node {
    children: BTreeMap<char, usize>,
    terminal: bool,
}

/// Prefix tree over command names.
///
/// Nodes live in one arena and refer to their children by index, so neither
/// insertion nor traversal recurses.
#[derive(Debug)]
pub struct Trie {
    nodes: Vec<Node>,
    words: usize,
}

impl Default for Trie {
    fn default() -> Self {
        Self::new()
    }
}

impl Trie {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
            words: 0,
        }
    }

    pub fn insert(&mut self, word: &str) {
        let mut node = ROOT;

        for c in word.chars() {
            node = match self.nodes[node].children.get(&c) {
                Some(&child) => child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(Node::default());
                    self.nodes[node].children.insert(c, child);
                    child
                }
            };
        }

        if !self.nodes[node].terminal {
            self.nodes[node].terminal = true;
            self.words += 1;
        }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.find(word).is_some_and(|node| self.nodes[node].terminal)
    }

    pub fn len(&self) -> usize {
        self.words
    }

    pub fn is_empty(&self) -> bool {
        self.words == 0
    }

    /// Every inserted word starting with `prefix`, in lexicographic order.
    pub fn complete(&self, prefix: &str) -> Vec<String> {
        let Some(start) = self.find(prefix) else {
            return Vec::new();
        };

        let mut matches = Vec::new();
        let mut stack = vec![(start, String::from(prefix))];

        while let Some((node, word)) = stack.pop() {
            let node = &self.nodes[node];
            // reversed so the smallest child is popped first
            for (&c, &child) in node.children.iter().rev() {
                let mut next = word.clone();
                next.push(c);
                stack.push((child, next));
            }
            if node.terminal {
                matches.push(word);
            }
        }

        matches
    }

    fn find(&self, prefix: &str) -> Option<usize> {
        prefix
            .chars()
            .try_fold(ROOT, |node, c| self.nodes[node].children.get(&c).copied())
    }
}

impl<S: AsRef<str>> FromIterator<S> for Trie {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut trie = Trie::new();
        for word in iter {
            trie.insert(word.as_ref());
        }
        trie
    }
}

/// Longest prefix shared by all `words`.
///
/// Once sorted, whatever the first and last entries share is shared by every
/// entry between them.
pub fn longest_common_prefix<S: AsRef<str>>(words: &[S]) -> String {
    let mut sorted: Vec<&str> = words.iter().map(|word| word.as_ref()).collect();
    sorted.sort_unstable();

    let (Some(first), Some(last)) = (sorted.first(), sorted.last()) else {
        return String::new();
    };

    first
        .chars()
        .zip(last.chars())
        .take_while(|(a, b)| a == b)
        .map(|(c, _)| c)
        .collect()
}
