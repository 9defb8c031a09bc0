use std::{
    ffi::{OsStr, OsString},
    fmt, io,
    path::PathBuf,
    process::{Command, Stdio},
};

use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Browsers probed, in order, when the desktop opener is unavailable.
pub const CANDIDATE_BROWSERS: &[&str] =
    &["firefox", "chromium", "opera", "konqueror", "epiphany", "mozilla", "netscape"];

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const DESKTOP_OPENER: &str = "xdg-open";

/// The way a URL ended up being handed to a browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mechanism {
    /// The operating system's "open with default application" facility.
    SystemHandler,
    /// macOS `open`.
    MacOpen,
    /// The Windows `url.dll` protocol handler.
    ProtocolHandler,
    /// The freedesktop opener at the given path.
    DesktopOpener(PathBuf),
    /// A browser executable found on the search path.
    Browser(String),
}

impl fmt::Display for Mechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mechanism::SystemHandler => f.write_str("the system URL handler"),
            Mechanism::MacOpen => f.write_str("open"),
            Mechanism::ProtocolHandler => f.write_str("the URL protocol handler"),
            Mechanism::DesktopOpener(path) => write!(f, "{}", path.display()),
            Mechanism::Browser(name) => f.write_str(name),
        }
    }
}

#[derive(Error, Debug)]
pub enum OpenError {
    #[error("failed to launch {program}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("could not find web browser")]
    BrowserNotFound,
}

/// Opens `url` in a browser, logging instead of failing if nothing works.
pub fn open_url(url: &str) {
    Launcher::default().open(url)
}

/// Tries the available ways of opening a URL, in order of preference.
#[derive(Debug, Clone)]
pub struct Launcher {
    system_handler: bool,
    /// Overrides `PATH` when looking for executables.
    #[cfg_attr(any(target_os = "macos", target_os = "windows"), allow(dead_code))]
    search_path: Option<OsString>,
}

impl Default for Launcher {
    fn default() -> Self {
        Self { system_handler: true, search_path: None }
    }
}

impl Launcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skips the system URL handler and goes straight to the platform
    /// fallbacks.
    pub fn without_system_handler(mut self) -> Self {
        self.system_handler = false;
        self
    }

    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    /// Like [`Launcher::try_open`], but failures are only logged.
    pub fn open(&self, url: &str) {
        match self.try_open(url) {
            Ok(mechanism) => info!("Opened URL {} with {}", url, mechanism),
            Err(e) => error!("Error opening URL {}: {:#}", url, anyhow::Error::from(e)),
        }
    }

    /// Opens `url` with the first mechanism that works and reports which one
    /// it was. At most one mechanism is launched successfully.
    pub fn try_open(&self, url: &str) -> Result<Mechanism, OpenError> {
        if self.system_handler {
            match open::that(url) {
                Ok(()) => return Ok(Mechanism::SystemHandler),
                Err(e) => warn!("System URL handler failed for {}: {}; trying fallbacks", url, e),
            }
        }
        self.open_fallback(url)
    }

    #[cfg(target_os = "macos")]
    fn open_fallback(&self, url: &str) -> Result<Mechanism, OpenError> {
        launch("/usr/bin/open", &[url])?;
        Ok(Mechanism::MacOpen)
    }

    #[cfg(target_os = "windows")]
    fn open_fallback(&self, url: &str) -> Result<Mechanism, OpenError> {
        launch("rundll32", &["url.dll,FileProtocolHandler", url])?;
        Ok(Mechanism::ProtocolHandler)
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    fn open_fallback(&self, url: &str) -> Result<Mechanism, OpenError> {
        match self.locate(DESKTOP_OPENER) {
            Some(opener) => match launch(&opener, &[url]) {
                Ok(()) => return Ok(Mechanism::DesktopOpener(opener)),
                Err(e) => warn!("{}; looking for a browser instead", e),
            },
            None => debug!("{} not found; looking for a browser instead", DESKTOP_OPENER),
        }

        let (name, path) = CANDIDATE_BROWSERS
            .iter()
            .find_map(|name| self.locate(name).map(|path| (*name, path)))
            .ok_or(OpenError::BrowserNotFound)?;
        launch(&path, &[url])?;
        Ok(Mechanism::Browser(name.to_owned()))
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    fn locate(&self, program: &str) -> Option<PathBuf> {
        let found = match &self.search_path {
            Some(paths) => which::which_in(program, Some(paths), "."),
            None => which::which(program),
        };
        match found {
            Ok(path) => {
                debug!("Found {} at {}", program, path.display());
                Some(path)
            }
            Err(e) => {
                debug!("Did not find {}: {}", program, e);
                None
            }
        }
    }
}

/// Spawns `program` in the background. The child is not waited on, so only a
/// failure to start it is reported.
fn launch(program: impl AsRef<OsStr>, args: &[&str]) -> Result<(), OpenError> {
    let program = program.as_ref();
    debug!("Launching {:?} with {:?}", program, args);
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_child| ())
        .map_err(|source| OpenError::Launch {
            program: program.to_string_lossy().into_owned(),
            source,
        })
}

#[cfg(all(test, unix, not(target_os = "macos")))]
mod tests {
    use std::{fs, os::unix::fs::PermissionsExt as _, path::Path};

    use tempfile::TempDir;

    use super::*;

    const URL: &str = "https://example.com/";

    fn write_script(dir: &Path, name: &str, mode: u32) {
        write_file(dir, name, "#!/bin/sh\nexit 0\n", mode);
    }

    fn write_file(dir: &Path, name: &str, contents: &str, mode: u32) {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
    }

    fn isolated(dir: &TempDir) -> Launcher {
        Launcher::new().without_system_handler().with_search_path(dir.path())
    }

    #[test]
    fn reports_missing_browser() {
        let dir = TempDir::new().unwrap();

        let err = isolated(&dir).try_open(URL).unwrap_err();

        assert!(matches!(err, OpenError::BrowserNotFound));
        assert_eq!(err.to_string(), "could not find web browser");
    }

    #[test]
    fn open_returns_normally_without_any_browser() {
        let dir = TempDir::new().unwrap();
        isolated(&dir).open(URL);
    }

    #[test]
    fn desktop_opener_takes_priority() {
        let dir = TempDir::new().unwrap();
        write_script(dir.path(), "firefox", 0o755);
        write_script(dir.path(), "xdg-open", 0o755);

        let mechanism = isolated(&dir).try_open(URL).unwrap();

        assert!(matches!(mechanism, Mechanism::DesktopOpener(ref path) if path.ends_with("xdg-open")));
    }

    #[test]
    fn unlaunchable_desktop_opener_falls_back_to_browser() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "xdg-open", "#!/nonexistent/interpreter\n", 0o755);
        write_script(dir.path(), "opera", 0o755);

        let mechanism = isolated(&dir).try_open(URL).unwrap();

        assert_eq!(mechanism, Mechanism::Browser("opera".to_owned()));
    }

    #[test]
    fn first_candidate_in_order_wins() {
        let dir = TempDir::new().unwrap();
        write_script(dir.path(), "opera", 0o755);
        write_script(dir.path(), "chromium", 0o755);

        let mechanism = isolated(&dir).try_open(URL).unwrap();

        assert_eq!(mechanism, Mechanism::Browser("chromium".to_owned()));
    }

    #[test]
    fn non_executable_candidate_is_skipped() {
        let dir = TempDir::new().unwrap();
        write_script(dir.path(), "firefox", 0o644);
        write_script(dir.path(), "epiphany", 0o755);

        let mechanism = isolated(&dir).try_open(URL).unwrap();

        assert_eq!(mechanism, Mechanism::Browser("epiphany".to_owned()));
    }
}
