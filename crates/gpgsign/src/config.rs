//! Resolution of the signing tool, key ring and identity.
//!
//! Settings are read once, typically from the command line or
//! environment, and resolved into an immutable [`ResolvedGpg`] that is
//! passed explicitly to the transform.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::message::HeaderTemplate;
use crate::signing::SigningIdentity;

/// Executable names tried, in order, when no binary is configured.
pub const BINARY_CANDIDATES: [&str; 2] = ["gpg2", "gpg"];

/// Environment variable naming the GnuPG home directory.
pub const HOME_ENV: &str = "GNUPGHOME";

const PUBLIC_KEYRINGS: [&str; 2] = ["pubring.gpg", "pubring.kbx"];
const SECRET_KEYRINGS: [&str; 2] = ["secring.gpg", "private-keys-v1.d"];

/// Looks up an executable by name.
pub trait ExecutableLocator {
    /// Returns the first candidate found, trying candidates in order.
    fn locate(&self, candidates: &[&str]) -> Option<PathBuf>;
}

/// Searches the directories of a `PATH`-style variable.
#[derive(Debug, Clone, Default)]
pub struct PathLocator {
    search_path: Option<OsString>,
}

impl PathLocator {
    pub fn new(search_path: impl Into<OsString>) -> Self {
        Self {
            search_path: Some(search_path.into()),
        }
    }

    pub fn from_env() -> Self {
        Self {
            search_path: std::env::var_os("PATH"),
        }
    }
}

impl ExecutableLocator for PathLocator {
    fn locate(&self, candidates: &[&str]) -> Option<PathBuf> {
        let search_path = self.search_path.as_ref()?;
        candidates.iter().find_map(|name| {
            std::env::split_paths(search_path)
                .map(|dir| dir.join(name))
                .find(|candidate| is_executable(candidate))
        })
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Raw signing settings, every field optional.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct GpgSettings {
    /// Path to the gpg executable (default: gpg2, then gpg, on PATH)
    #[arg(long, env = "GNUPG_BINARY")]
    pub gpg_binary: Option<PathBuf>,

    /// GnuPG home directory (default: $GNUPGHOME, then ~/.gnupg)
    #[arg(long, env = "GNUPG_HOME")]
    pub gnupg_home: Option<PathBuf>,

    /// Key id to sign with; repeat or comma-separate to sign with several keys
    #[arg(long = "identity", env = "GNUPG_IDENTITY", value_delimiter = ',')]
    pub identity: Vec<String>,

    /// Header message template; must contain {identity} exactly once
    #[arg(long, env = "GNUPG_HEADER_MESSAGE")]
    pub header_message: Option<String>,

    /// Require the public and secret keyrings to exist in the home directory
    #[arg(long)]
    pub strict_keyring: bool,
}

/// Fully resolved signing configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGpg {
    pub binary: PathBuf,
    pub home: PathBuf,
    pub identity: SigningIdentity,
    pub header: HeaderTemplate,
}

impl GpgSettings {
    /// Resolves against the process environment.
    pub fn resolve(&self, locator: &dyn ExecutableLocator) -> Result<ResolvedGpg> {
        self.resolve_with(locator, std::env::var_os(HOME_ENV), dirs::home_dir())
    }

    /// Resolves with explicit values for `$GNUPGHOME` and the user's home
    /// directory. The identity is checked before any lookup happens.
    pub fn resolve_with(
        &self,
        locator: &dyn ExecutableLocator,
        gnupg_home_env: Option<OsString>,
        user_home: Option<PathBuf>,
    ) -> Result<ResolvedGpg> {
        let identity = SigningIdentity::from_keys(&self.identity)?;
        let header = match &self.header_message {
            Some(template) => HeaderTemplate::custom(template.as_str())?,
            None => HeaderTemplate::default(),
        };
        let binary = resolve_binary(self.gpg_binary.as_deref(), locator)?;
        let home = resolve_home(self.gnupg_home.as_deref(), gnupg_home_env, user_home)?;

        if self.strict_keyring {
            check_keyrings(&home)?;
        } else if !home.is_dir() {
            tracing::warn!(home = %home.display(), "gnupg home directory does not exist");
        }

        tracing::debug!(
            binary = %binary.display(),
            home = %home.display(),
            keys = ?identity.keys(),
            "resolved signing configuration"
        );

        Ok(ResolvedGpg {
            binary,
            home,
            identity,
            header,
        })
    }
}

fn resolve_binary(explicit: Option<&Path>, locator: &dyn ExecutableLocator) -> Result<PathBuf> {
    let found = match explicit {
        Some(path) => path.to_path_buf(),
        None => locator.locate(&BINARY_CANDIDATES).ok_or_else(|| {
            Error::Configuration(
                "could not find the `gpg2` or `gpg` executable; set GNUPG_BINARY".to_string(),
            )
        })?,
    };

    std::fs::canonicalize(&found).map_err(|e| {
        Error::Configuration(format!(
            "cannot resolve gpg executable {}: {e}",
            found.display()
        ))
    })
}

fn resolve_home(
    explicit: Option<&Path>,
    gnupg_home_env: Option<OsString>,
    user_home: Option<PathBuf>,
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = gnupg_home_env.filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    user_home
        .map(|home| home.join(".gnupg"))
        .ok_or_else(|| {
            Error::Configuration(format!(
                "no gnupg home directory: set GNUPG_HOME or {HOME_ENV}"
            ))
        })
}

fn check_keyrings(home: &Path) -> Result<()> {
    let has_any = |names: &[&str]| names.iter().any(|name| home.join(name).exists());
    if has_any(&PUBLIC_KEYRINGS) && has_any(&SECRET_KEYRINGS) {
        Ok(())
    } else {
        Err(Error::Configuration(format!(
            "the GnuPG public and secret keyrings do not exist in {}",
            home.display()
        )))
    }
}
