//! Executable init-file discovery and process-group lifecycle, built on
//! `nix::unistd`/`nix::sys::signal` directly rather than smithay's
//! reexport, since this module has nothing else to do with a live display.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Child, Command};

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

/// The three places an init file is looked for, in order.
fn candidate_paths() -> Vec<PathBuf> {
    let mut candidates = Vec::with_capacity(3);
    if let Some(xdg_config) = env::var_os("XDG_CONFIG_HOME") {
        candidates.push(PathBuf::from(xdg_config).join("mosaic/init"));
    } else if let Some(home) = env::var_os("HOME") {
        candidates.push(PathBuf::from(home).join(".config/mosaic/init"));
    }
    candidates.push(PathBuf::from("/etc/mosaic/init"));
    candidates
}

fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Finds the first executable init file among the search paths, if any.
pub fn find_init_file() -> Option<PathBuf> {
    candidate_paths().into_iter().find(|p| is_executable(p))
}

/// A spawned init process, kept alive only long enough to remember its
/// process-group id so [`InitProcess::terminate`] can signal the whole
/// group on compositor exit.
pub struct InitProcess {
    child: Child,
}

/// Spawns `path` as a new process-group leader (`setsid`), so child
/// processes spawned by the user's init script are reachable by the same
/// signal.
pub fn spawn_init(path: &Path) -> std::io::Result<InitProcess> {
    use std::os::unix::process::CommandExt;

    let mut command = Command::new(path);
    // SAFETY: `setsid` only affects the child after `fork`, before `exec`;
    // it touches no state shared with the parent process.
    unsafe {
        command.pre_exec(|| {
            nix::unistd::setsid().map_err(std::io::Error::from)?;
            Ok(())
        });
    }
    let child = command.spawn()?;
    Ok(InitProcess { child })
}

impl InitProcess {
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Sends `SIGTERM` to the entire process group the init process leads,
    /// on compositor exit.
    pub fn terminate(&self) {
        let pgid = Pid::from_raw(-(self.child.id() as i32));
        if let Err(err) = signal::kill(pgid, Signal::SIGTERM) {
            tracing::warn!(?err, "failed to signal init process group");
        }
    }
}

/// Exports `XCURSOR_THEME`/`XCURSOR_SIZE` for XWayland clients once a
/// cursor theme has been loaded on the default seat.
pub fn export_xcursor_env(theme: &str, size: u32) {
    env::set_var("XCURSOR_THEME", OsString::from(theme));
    env::set_var("XCURSOR_SIZE", size.to_string());
}

/// XKB environment variables read (never set) by the keyboard init path,
/// named here so `state.rs` has one place to look them up rather than
/// repeating the five-variable list.
pub const XKB_ENV_VARS: [&str; 5] = [
    "XKB_DEFAULT_MODEL",
    "XKB_DEFAULT_LAYOUT",
    "XKB_DEFAULT_VARIANT",
    "XKB_DEFAULT_OPTIONS",
    "XKB_DEFAULT_RULES",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_paths_prefers_xdg_config_home() {
        env::set_var("XDG_CONFIG_HOME", "/tmp/xdg-test-config");
        let paths = candidate_paths();
        assert_eq!(paths[0], PathBuf::from("/tmp/xdg-test-config/mosaic/init"));
        assert_eq!(paths.last().unwrap(), &PathBuf::from("/etc/mosaic/init"));
        env::remove_var("XDG_CONFIG_HOME");
    }

    #[test]
    fn nonexistent_paths_are_never_executable() {
        assert!(!is_executable(Path::new("/nonexistent/mosaic/init")));
    }
}
