//! Closed, string-backed enums for the genglossary engine.
//!
//! Every enum here is a fixed, closed set: there is no custom/catch-all
//! variant. An unrecognized string is a validation error, not a new
//! variant.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Defines a closed string-backed enum with `as_str`, `Display`, `FromStr`
/// and serde support (serialized as the lowercase string form).
macro_rules! define_closed_enum {
    (
        $(#[$meta:meta])*
        $name:ident, default = $default:ident,
        variants: [ $( ($variant:ident, $str:expr) ),+ $(,)? ]
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $variant, )+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $str, )+
                }
            }

            pub const ALL: &'static [$name] = &[ $( Self::$variant, )+ ];
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $str => Ok(Self::$variant), )+
                    other => Err(other.to_owned()),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_str(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

define_closed_enum!(
    /// Which stages a run executes.
    RunScope, default = Full,
    variants: [
        (Full, "full"),
        (Extract, "extract"),
        (Generate, "generate"),
        (Review, "review"),
        (Refine, "refine"),
    ]
);

impl RunScope {
    /// Stages `full` actually drives, in order. `full` never includes extract.
    pub fn stages(&self) -> &'static [Stage] {
        match self {
            RunScope::Full => &[Stage::Generate, Stage::Review, Stage::Refine],
            RunScope::Extract => &[Stage::Extract],
            RunScope::Generate => &[Stage::Generate],
            RunScope::Review => &[Stage::Review],
            RunScope::Refine => &[Stage::Refine],
        }
    }
}

define_closed_enum!(
    /// A single pipeline stage.
    Stage, default = Extract,
    variants: [
        (Extract, "extract"),
        (Generate, "generate"),
        (Review, "review"),
        (Refine, "refine"),
    ]
);

define_closed_enum!(
    /// Lifecycle status of a run.
    RunStatus, default = Pending,
    variants: [
        (Pending, "pending"),
        (Running, "running"),
        (Completed, "completed"),
        (Failed, "failed"),
        (Cancelled, "cancelled"),
    ]
);

impl RunStatus {
    /// Non-terminal statuses are the ones counted by the single-active-run invariant.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled)
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

define_closed_enum!(
    /// Lifecycle status of a registered project.
    ProjectStatus, default = Created,
    variants: [
        (Created, "created"),
        (Running, "running"),
        (Completed, "completed"),
        (Error, "error"),
    ]
);

define_closed_enum!(
    /// How a term entered `terms_excluded` / `terms_required`.
    TermSource, default = Manual,
    variants: [
        (Auto, "auto"),
        (Manual, "manual"),
    ]
);

define_closed_enum!(
    /// Kind of issue raised against a provisional glossary entry.
    IssueType, default = Unclear,
    variants: [
        (Unclear, "unclear"),
        (Contradiction, "contradiction"),
        (MissingRelation, "missing_relation"),
        (Unnecessary, "unnecessary"),
    ]
);

define_closed_enum!(
    /// Severity of a log event published on the log bus.
    LogLevel, default = Info,
    variants: [
        (Info, "info"),
        (Warning, "warning"),
        (Error, "error"),
    ]
);

define_closed_enum!(
    /// Which wire protocol an LLM adapter speaks.
    LlmProvider, default = Ollama,
    variants: [
        (Ollama, "ollama"),
        (OpenAiCompatible, "openai_compatible"),
    ]
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_scope_round_trips() {
        for scope in RunScope::ALL {
            let s = scope.as_str();
            assert_eq!(RunScope::from_str(s).unwrap(), *scope);
        }
    }

    #[test]
    fn full_scope_excludes_extract() {
        assert!(!RunScope::Full.stages().contains(&Stage::Extract));
        assert_eq!(RunScope::Full.stages().len(), 3);
    }

    #[test]
    fn unknown_scope_is_rejected() {
        assert!(RunScope::from_str("bogus").is_err());
    }

    #[test]
    fn run_status_terminal_classification() {
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Cancelled.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(!RunStatus::Pending.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
    }

    #[test]
    fn serde_round_trip() {
        let json = serde_json::to_string(&RunStatus::Running).unwrap();
        assert_eq!(json, "\"running\"");
        let back: RunStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, RunStatus::Running);
    }
}
