use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::history::HistoryStore;
use crate::jobs::JobTable;

pub const BUILTINS: [&str; 5] = ["cd", "history", "setenv", "jobs", "exit"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Cd,
    History,
    Setenv,
    Jobs,
    Exit,
}

impl Builtin {
    /// Exact, case-sensitive match on the command name.
    pub fn lookup(name: &str) -> Option<Self> {
        match name {
            "cd" => Some(Builtin::Cd),
            "history" => Some(Builtin::History),
            "setenv" => Some(Builtin::Setenv),
            "jobs" => Some(Builtin::Jobs),
            "exit" => Some(Builtin::Exit),
            _ => None,
        }
    }
}

/// Changes directory to `args[0]`, or `home` without arguments. Returns the
/// new working directory; failures are reported and leave it unchanged.
pub fn cd(args: &[String], home: &Path) -> Option<PathBuf> {
    let target = args.first().map_or_else(|| home.to_path_buf(), PathBuf::from);

    if let Err(e) = env::set_current_dir(&target) {
        eprintln!("cd: {}: {}", target.display(), e);
        warn!(dir = %target.display(), error = %e, "cd failed");
        return None;
    }
    let cwd = env::current_dir().unwrap_or(target);
    debug!(cwd = %cwd.display(), "changed directory");
    Some(cwd)
}

/// `setenv NAME VALUE`; anything shorter is ignored.
pub fn setenv(args: &[String]) {
    let [name, value, ..] = args else {
        return;
    };
    if name.is_empty() || name.contains(['=', '\0']) || value.contains('\0') {
        warn!(%name, "refusing to set invalid variable");
        return;
    }
    env::set_var(name, value);
}

pub fn history<W: Write>(store: &HistoryStore, out: &mut W) -> io::Result<()> {
    for entry in store.iter() {
        writeln!(out, "{entry}")?;
    }
    Ok(())
}

pub fn jobs<W: Write>(table: &JobTable, out: &mut W) -> io::Result<()> {
    for job in table.list() {
        writeln!(out, "{job}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::unistd::Pid;

    fn args(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn lookup_is_exact() {
        assert_eq!(Builtin::lookup("cd"), Some(Builtin::Cd));
        assert_eq!(Builtin::lookup("exit"), Some(Builtin::Exit));
        assert_eq!(Builtin::lookup("CD"), None);
        assert_eq!(Builtin::lookup("echo"), None);
        assert!(BUILTINS.iter().all(|name| Builtin::lookup(name).is_some()));
    }

    #[test]
    fn setenv_needs_two_arguments() {
        setenv(&args(&["PIPESH_BUILTIN_ONE"]));
        assert!(env::var_os("PIPESH_BUILTIN_ONE").is_none());

        setenv(&args(&["PIPESH_BUILTIN_TWO", "yes"]));
        assert_eq!(env::var("PIPESH_BUILTIN_TWO").unwrap(), "yes");
    }

    #[test]
    fn cd_to_missing_dir_fails_softly() {
        let _cwd = crate::tests::cwd_guard();
        let before = env::current_dir().unwrap();
        assert!(cd(&args(&["/definitely/not/here"]), Path::new("/")).is_none());
        assert_eq!(env::current_dir().unwrap(), before);
    }

    #[test]
    fn history_and_jobs_listing() {
        let mut store = HistoryStore::default();
        store.append(0, "ls");
        store.append(1, "history");
        let mut out = Vec::new();
        history(&store, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "0 ls\n1 history\n");

        let mut table = JobTable::new();
        table.register(Pid::from_raw(321), "sleep 9 &");
        let mut out = Vec::new();
        jobs(&table, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "321 sleep 9 &\n");
    }
}
