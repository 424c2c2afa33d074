use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use rustyline::{
    Helper,
    completion::Completer as RustylineCompleter,
    highlight::Highlighter,
    hint::Hinter,
    validate::Validator,
    completion::Pair,
    Context,
    Result,
};
use crate::builtins::BUILTINS;

/// Tab completion: command names for the first word, paths afterwards.
pub struct Completer {
    commands: Vec<String>,
}

impl Completer {
    pub fn new() -> Self {
        let path = std::env::var("PATH").unwrap_or_default();
        Self {
            commands: Self::find_commands(&path),
        }
    }

    fn find_commands(path: &str) -> Vec<String> {
        let mut commands: Vec<String> = BUILTINS.iter().map(|&cmd| cmd.to_string()).collect();

        for dir in path.split(':').filter(|d| !d.is_empty()) {
            let Ok(entries) = fs::read_dir(dir) else {
                continue;
            };
            for entry in entries.filter_map(|r| r.ok()) {
                let executable = entry
                    .metadata()
                    .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
                    .unwrap_or(false);
                if let (true, Some(name)) = (executable, entry.file_name().to_str()) {
                    commands.push(name.to_string());
                }
            }
        }

        commands.sort();
        commands.dedup();
        commands
    }

    /// Candidates for the word ending at the cursor; `first_word` selects
    /// command completion.
    pub fn candidates(&self, word: &str, first_word: bool) -> Vec<String> {
        if first_word && !word.contains('/') {
            self.complete_command(word)
        } else {
            complete_path(word)
        }
    }

    fn complete_command(&self, prefix: &str) -> Vec<String> {
        self.commands.iter()
            .filter(|cmd| cmd.starts_with(prefix))
            .cloned()
            .collect()
    }
}

impl Default for Completer {
    fn default() -> Self {
        Self::new()
    }
}

fn complete_path(prefix: &str) -> Vec<String> {
    let (dir, name_prefix) = match prefix.rfind('/') {
        Some(i) => (&prefix[..=i], &prefix[i + 1..]),
        None => ("", prefix),
    };
    let search = if dir.is_empty() { Path::new(".") } else { Path::new(dir) };

    let mut completions = Vec::new();
    if let Ok(entries) = fs::read_dir(search) {
        for entry in entries.filter_map(|r| r.ok()) {
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if !name.starts_with(name_prefix) || (name.starts_with('.') && !name_prefix.starts_with('.')) {
                continue;
            }
            let mut full = PathBuf::from(dir).join(&name).to_string_lossy().into_owned();
            if entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
                full.push('/');
            }
            completions.push(full);
        }
    }
    completions.sort();
    completions
}

impl Helper for Completer {}

impl RustylineCompleter for Completer {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> Result<(usize, Vec<Pair>)> {
        let start = line[..pos].rfind(char::is_whitespace).map_or(0, |i| i + 1);
        let first_word = line[..start].trim().is_empty();

        let pairs = self
            .candidates(&line[start..pos], first_word)
            .into_iter()
            .map(|s| Pair {
                display: s.clone(),
                replacement: s,
            })
            .collect();

        Ok((start, pairs))
    }
}

impl Highlighter for Completer {}
impl Hinter for Completer {
    type Hint = String;
}
impl Validator for Completer {}
