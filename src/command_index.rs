use crate::builtin::Builtin;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::vec;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum CommandKind {
    Builtin(Builtin),
    External(PathBuf),
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CommandEntry {
    pub name: String,
    pub kind: CommandKind,
}

/// Every command name the shell can run, built once at startup.
#[derive(Debug, Default)]
pub struct CommandIndex {
    entries: BTreeMap<String, CommandEntry>,
}

impl CommandIndex {
    /// Scans `path_var` and registers `builtins` on top.
    ///
    /// The first PATH directory providing a name wins, and builtins shadow
    /// any executable of the same name.
    pub fn build(path_var: Option<&str>, builtins: &[Builtin]) -> Self {
        let mut entries = BTreeMap::new();

        for bin in Bins::new(path_var.map(split_path).unwrap_or_default()) {
            let path = match bin {
                Ok(path) => path,
                Err(err) => {
                    log::warn!("{err:#}");
                    continue;
                }
            };
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };

            entries.entry(String::from(name)).or_insert_with(|| CommandEntry {
                name: String::from(name),
                kind: CommandKind::External(path.clone()),
            });
        }

        for &builtin in builtins {
            entries.insert(
                String::from(builtin.name()),
                CommandEntry {
                    name: String::from(builtin.name()),
                    kind: CommandKind::Builtin(builtin),
                },
            );
        }

        log::debug!("indexed {} commands", entries.len());
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&CommandEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        matches!(
            self.get(name),
            Some(CommandEntry {
                kind: CommandKind::Builtin(_),
                ..
            })
        )
    }

    /// Absolute path of an external command.
    pub fn resolve(&self, name: &str) -> Option<&Path> {
        match &self.get(name)?.kind {
            CommandKind::External(path) => Some(path),
            CommandKind::Builtin(_) => None,
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn split_path(path_var: &str) -> Vec<PathBuf> {
    path_var
        .split(':')
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Executables found in a list of directories, in directory order.
pub struct Bins {
    paths: vec::IntoIter<PathBuf>,
    dir_data: Option<fs::ReadDir>,
}

impl Bins {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths: paths.into_iter(),
            dir_data: None,
        }
    }
}

impl Iterator for Bins {
    type Item = anyhow::Result<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let dir_data = self.dir_data.take();
            match dir_data {
                Some(mut read_dir) => match read_dir.next() {
                    Some(Ok(dir_entry)) => {
                        self.dir_data = Some(read_dir);

                        let path = dir_entry.path();
                        match fs::metadata(&path) {
                            Ok(metadata) if is_executable(&metadata) => return Some(Ok(path)),
                            Ok(_) => {}
                            // dangling symlink
                            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                            Err(err) => {
                                return Some(Err(anyhow::anyhow!(
                                    "read {} metadata: {err}",
                                    path.display()
                                )));
                            }
                        }
                    }
                    Some(Err(err)) => {
                        self.dir_data = Some(read_dir);
                        return Some(Err(anyhow::anyhow!("read dir next: {err}")));
                    }
                    None => self.dir_data = None,
                },
                None => {
                    let dir = self.paths.next()?;

                    match fs::read_dir(&dir) {
                        Ok(data) => self.dir_data = Some(data),
                        // missing or not a directory
                        Err(err) => log::debug!("skip PATH entry {}: {err}", dir.display()),
                    };
                }
            }
        }
    }
}

fn is_executable(attr: &fs::Metadata) -> bool {
    attr.is_file() && attr.permissions().mode() & 0o111 != 0
}
