//! Tool kind enum identifying the provisionable Clojure tools.

use serde::{Deserialize, Serialize};
use std::fmt;
use strum::IntoEnumIterator;

/// The type of tool being provisioned.
///
/// Each variant selects one source resolver and installer pair. The set is
/// closed: adding a tool means adding a variant and its tool definition.
///
/// # Example
///
/// ```rust
/// use clj_provision::ToolKind;
///
/// for kind in ToolKind::all() {
///     println!("{} (input `{}`)", kind.display_name(), kind.input_name());
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::EnumIter)]
pub enum ToolKind {
    /// Leiningen build tool (`lein` bootstrap script)
    Leiningen,
    /// Boot build tool (`boot` bootstrap script)
    Boot,
    /// Clojure CLI tools (`clojure` / `clj`)
    ClojureCli,
    /// Babashka script runner (`bb`)
    Babashka,
    /// clj-kondo linter
    CljKondo,
}

impl ToolKind {
    /// Human-readable display name for the tool.
    ///
    /// # Example
    ///
    /// ```rust
    /// use clj_provision::ToolKind;
    ///
    /// assert_eq!(ToolKind::Boot.display_name(), "Boot");
    /// assert_eq!(ToolKind::ClojureCli.display_name(), "Clojure CLI");
    /// ```
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Leiningen => "Leiningen",
            Self::Boot => "Boot",
            Self::ClojureCli => "Clojure CLI",
            Self::Babashka => "Babashka",
            Self::CljKondo => "clj-kondo",
        }
    }

    /// The tool name used as the first component of its cache key.
    ///
    /// These names are shared with installations cached by earlier runs, so
    /// they must not change.
    pub fn cache_name(&self) -> &'static str {
        match self {
            Self::Leiningen => "Leiningen",
            Self::Boot => "Boot",
            Self::ClojureCli => "ClojureToolsDeps",
            Self::Babashka => "Babashka",
            Self::CljKondo => "clj-kondo",
        }
    }

    /// The action input that requests this tool.
    ///
    /// # Example
    ///
    /// ```rust
    /// use clj_provision::ToolKind;
    ///
    /// assert_eq!(ToolKind::Babashka.input_name(), "bb");
    /// ```
    pub fn input_name(&self) -> &'static str {
        match self {
            Self::Leiningen => "lein",
            Self::Boot => "boot",
            Self::ClojureCli => "cli",
            Self::Babashka => "bb",
            Self::CljKondo => "clj-kondo",
        }
    }

    /// Iterator over all known tool kinds, in provisioning order.
    pub fn all() -> impl Iterator<Item = Self> {
        <Self as IntoEnumIterator>::iter()
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
