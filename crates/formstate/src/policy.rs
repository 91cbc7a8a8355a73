#![forbid(unsafe_code)]

//! When a control re-runs its validators.
//!
//! Validation timing is an explicit construction parameter of every
//! [`FieldControl`](crate::FieldControl). Three presets cover the usual
//! workflows:
//!
//! | Preset | On init | On change | Typical use |
//! |--------|---------|-----------|-------------|
//! | [`UpdatePolicy::ON_CHANGE`] | no | yes | live validation while typing (default) |
//! | [`UpdatePolicy::ALWAYS`] | yes | yes | show errors for the initial value too |
//! | [`UpdatePolicy::MANUAL`] | no | no | validate only on an explicit `validate()` |
//!
//! The process-wide default can be picked from the environment with
//! [`UpdatePolicy::from_env`] (`FORMSTATE_UPDATE_POLICY=always`).

use std::fmt;
use std::str::FromStr;

/// Environment variable read by [`UpdatePolicy::from_env`].
pub const UPDATE_POLICY_ENV: &str = "FORMSTATE_UPDATE_POLICY";

/// Controls when a field control recomputes its validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UpdatePolicy {
    /// Validate once during construction.
    /// Default: false
    pub validate_on_init: bool,

    /// Validate after every committed value change.
    /// Default: true
    pub validate_on_change: bool,
}

impl UpdatePolicy {
    /// Validate on change only.
    pub const ON_CHANGE: Self = Self {
        validate_on_init: false,
        validate_on_change: true,
    };

    /// Validate on construction and on every change.
    pub const ALWAYS: Self = Self {
        validate_on_init: true,
        validate_on_change: true,
    };

    /// Never validate implicitly.
    pub const MANUAL: Self = Self {
        validate_on_init: false,
        validate_on_change: false,
    };

    /// Resolve the policy from `FORMSTATE_UPDATE_POLICY`.
    ///
    /// Unset or unparseable values fall back to [`UpdatePolicy::default`].
    #[must_use]
    pub fn from_env() -> Self {
        match std::env::var(UPDATE_POLICY_ENV) {
            Ok(raw) => raw.parse().unwrap_or_else(|_err: ParsePolicyError| {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    var = UPDATE_POLICY_ENV,
                    value = %raw,
                    error = %_err,
                    "ignoring unrecognised update policy"
                );
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Preset name, if this policy matches one.
    #[must_use]
    pub fn name(self) -> Option<&'static str> {
        match self {
            Self::ON_CHANGE => Some("on-change"),
            Self::ALWAYS => Some("always"),
            Self::MANUAL => Some("manual"),
            _ => None,
        }
    }
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        Self::ON_CHANGE
    }
}

impl fmt::Display for UpdatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => f.write_str("init-only"),
        }
    }
}

/// Error returned when parsing an [`UpdatePolicy`] name fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePolicyError {
    input: String,
}

impl ParsePolicyError {
    /// The rejected input.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl fmt::Display for ParsePolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown update policy {:?} (expected on-change, always, init-only or manual)",
            self.input
        )
    }
}

impl std::error::Error for ParsePolicyError {}

impl FromStr for UpdatePolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "on-change" | "onchange" | "change" | "default" => Ok(Self::ON_CHANGE),
            "always" | "eager" => Ok(Self::ALWAYS),
            "init-only" | "init" => Ok(Self {
                validate_on_init: true,
                validate_on_change: false,
            }),
            "manual" | "never" => Ok(Self::MANUAL),
            _ => Err(ParsePolicyError {
                input: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_validates_on_change_only() {
        let policy = UpdatePolicy::default();
        assert!(!policy.validate_on_init);
        assert!(policy.validate_on_change);
        assert_eq!(policy, UpdatePolicy::ON_CHANGE);
    }

    #[test]
    fn parse_presets() {
        assert_eq!("always".parse(), Ok(UpdatePolicy::ALWAYS));
        assert_eq!(" Manual ".parse(), Ok(UpdatePolicy::MANUAL));
        assert_eq!("onchange".parse(), Ok(UpdatePolicy::ON_CHANGE));
        let init: UpdatePolicy = "init-only".parse().unwrap();
        assert!(init.validate_on_init);
        assert!(!init.validate_on_change);
    }

    #[test]
    fn parse_rejects_unknown() {
        let err = "sometimes".parse::<UpdatePolicy>().unwrap_err();
        assert_eq!(err.input(), "sometimes");
        assert!(err.to_string().contains("sometimes"));
    }

    #[test]
    fn display_round_trips_through_parse() {
        for policy in [
            UpdatePolicy::ON_CHANGE,
            UpdatePolicy::ALWAYS,
            UpdatePolicy::MANUAL,
            UpdatePolicy {
                validate_on_init: true,
                validate_on_change: false,
            },
        ] {
            assert_eq!(policy.to_string().parse(), Ok(policy));
        }
    }
}
