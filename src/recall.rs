use crate::history::HistoryStore;
use crate::types::{ShellError, ShellResult};

/// Resolves `!!`, `!<id>` and `!<prefix>` against `history`.
///
/// Lines that do not start with `!` come back unchanged. The result is
/// never expanded again.
pub fn expand(line: &str, history: &HistoryStore) -> ShellResult<String> {
    if line.starts_with("!!") {
        return history
            .last()
            .map(|entry| entry.line.clone())
            .ok_or(ShellError::NoLastEntry);
    }

    let Some(reference) = line.strip_prefix('!') else {
        return Ok(line.to_string());
    };
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(ShellError::EventNotFound("!".into()));
    }

    let entry = match command_id(reference) {
        Some(id) => history.get_by_id(id),
        None => history.get_by_prefix(reference),
    };
    entry
        .map(|entry| entry.line.clone())
        .ok_or_else(|| ShellError::EventNotFound(format!("!{reference}")))
}

fn command_id(reference: &str) -> Option<u64> {
    if !reference.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    reference.parse::<u64>().ok().filter(|&id| id > 0)
}
