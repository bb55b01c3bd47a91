//! Path-template variables and their substitution.
//!
//! A rule template may reference at most one variable token (`$home`,
//! `$installdir`, ...).  At run time each discovered root binds one variable
//! to one concrete directory; substitution is plain single-token text
//! replacement that reports whether it changed anything, so callers can skip
//! rules that do not apply to the root at hand.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    let pattern = Regex::new(r"\$([a-z_]+)").expect("token pattern is valid");
    pattern
});

/// A placeholder in a rule path template, bound to a discovered root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Variable {
    /// A user home directory (marker-folder heuristic or `extra_homes`).
    Home,
    /// The `AppData` folder below a home.
    Appdata,
    /// A localized documents folder below a home.
    Documents,
    /// A per-application install directory from configuration.
    Installdir,
    /// A platform `Program Files`-equivalent near a home.
    ProgramFiles,
    /// A per-user Ubisoft savegame folder.
    Ubisoft,
}

impl Variable {
    /// Every supported variable, in driver-processing order.
    pub const ALL: [Self; 6] = [
        Self::Home,
        Self::Appdata,
        Self::Documents,
        Self::Installdir,
        Self::ProgramFiles,
        Self::Ubisoft,
    ];

    /// The token name as written in rule templates, without the `$`.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Appdata => "appdata",
            Self::Documents => "documents",
            Self::Installdir => "installdir",
            Self::ProgramFiles => "program_files",
            Self::Ubisoft => "ubisoft",
        }
    }

    /// Parse a bare token name (no `$`) into a variable.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.token() == token)
    }
}

impl std::fmt::Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${}", self.token())
    }
}

/// Extract the first `$token` occurrence from a template, if any.
///
/// # Examples
///
/// ```
/// use savegame_cli::vars::first_token;
///
/// assert_eq!(first_token("$home/.minecraft/saves"), Some("home".to_string()));
/// assert_eq!(first_token("relative/saves"), None);
/// ```
#[must_use]
pub fn first_token(template: &str) -> Option<String> {
    TOKEN
        .captures(template)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Substitute every occurrence of `var` in `template` with `value`.
///
/// Returns `None` when the token does not occur: the rule does not apply
/// to the root being processed and must be skipped.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use savegame_cli::vars::{Variable, substitute};
///
/// let resolved = substitute("$home/.minecraft/saves", Variable::Home, Path::new("/home/u"));
/// assert_eq!(resolved.as_deref(), Some("/home/u/.minecraft/saves"));
/// assert_eq!(substitute("$appdata/x", Variable::Home, Path::new("/home/u")), None);
/// ```
#[must_use]
pub fn substitute(template: &str, var: Variable, value: &Path) -> Option<String> {
    let token = format!("${}", var.token());
    let resolved = template.replace(&token, &value.display().to_string());
    if resolved == template {
        return None;
    }
    Some(resolved)
}
