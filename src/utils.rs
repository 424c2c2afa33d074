use std::path::Path;

use nix::unistd::{gethostname, getuid, User};

/// User and host shown in the prompt, looked up once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user: String,
    pub host: String,
}

impl Identity {
    pub fn lookup() -> Self {
        let user = User::from_uid(getuid())
            .ok()
            .flatten()
            .map(|u| u.name)
            .or_else(|| std::env::var("USER").ok())
            .unwrap_or_else(|| "?".to_string());
        let host = gethostname()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "localhost".to_string());
        Self { user, host }
    }
}

/// `cwd` with a leading `home` replaced by `~`.
pub fn tilde_path(cwd: &Path, home: &Path) -> String {
    if home != Path::new("/") {
        if let Ok(rest) = cwd.strip_prefix(home) {
            return if rest.as_os_str().is_empty() {
                "~".to_string()
            } else {
                format!("~/{}", rest.display())
            };
        }
    }
    cwd.display().to_string()
}

pub fn render_prompt(cmd_id: u64, identity: &Identity, cwd: &Path, home: &Path) -> String {
    format!(
        "--[{}|{}@{}:{}]--$ ",
        cmd_id,
        identity.user,
        identity.host,
        tilde_path(cwd, home)
    )
}
