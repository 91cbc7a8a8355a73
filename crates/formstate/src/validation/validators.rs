#![forbid(unsafe_code)]

//! Validator identities, the reference rule set, and rule composition.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

// ---------------------------------------------------------------------------
// ValidatorId
// ---------------------------------------------------------------------------

/// Stable identity of a validation rule.
///
/// Identities key the per-control [`ValidationErrors`](super::ValidationErrors)
/// map. Two validators sharing an identity are the same rule as far as error
/// reporting is concerned, whatever their parameters.
///
/// # Invariants
///
/// - Raw values below [`ValidatorId::FIRST_DYNAMIC`] belong to built-in rules.
/// - [`ValidatorId::fresh`] never returns the same value twice in a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ValidatorId(u64);

impl ValidatorId {
    /// Identity of [`Required`] (both whitespace variants).
    pub const REQUIRED: Self = Self(1);
    /// Identity of [`Email`].
    pub const EMAIL: Self = Self(2);
    /// Identity of every [`MinLength`], whatever its bound.
    pub const MIN_LENGTH: Self = Self(3);
    /// Identity of every [`MaxLength`], whatever its bound.
    pub const MAX_LENGTH: Self = Self(4);
    /// Identity of every [`Min`], whatever its bound.
    pub const MIN: Self = Self(5);
    /// Identity of every [`Max`], whatever its bound.
    pub const MAX: Self = Self(6);
    /// Identity of [`RequiredTrue`].
    pub const REQUIRED_TRUE: Self = Self(7);
    /// Identity of every [`Pattern`], whatever its expression.
    pub const PATTERN: Self = Self(8);

    /// First raw value handed out by [`ValidatorId::fresh`].
    pub const FIRST_DYNAMIC: u64 = 1024;

    /// Allocate a new process-unique identity.
    #[must_use]
    pub fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(ValidatorId::FIRST_DYNAMIC);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Create an identity from a raw value.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw identity value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Whether this identity belongs to one of the built-in rules.
    #[must_use]
    pub const fn is_builtin(self) -> bool {
        self.0 < Self::FIRST_DYNAMIC
    }
}

impl fmt::Display for ValidatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::REQUIRED => f.write_str("required"),
            Self::EMAIL => f.write_str("email"),
            Self::MIN_LENGTH => f.write_str("min_length"),
            Self::MAX_LENGTH => f.write_str("max_length"),
            Self::MIN => f.write_str("min"),
            Self::MAX => f.write_str("max"),
            Self::REQUIRED_TRUE => f.write_str("required_true"),
            Self::PATTERN => f.write_str("pattern"),
            Self(raw) => write!(f, "validator#{raw}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

type Predicate<V> = dyn Fn(&V) -> bool + Send + Sync;

/// A named, pure predicate over a value.
///
/// Predicates must be total. A predicate that panics is a programmer error
/// and the panic reaches whoever triggered the validity pass.
///
/// # Example
///
/// ```rust
/// use formstate::validation::Validator;
///
/// let no_spaces = Validator::<String>::new(|v| !v.contains(' '));
/// assert!(no_spaces.test(&"alice".to_string()));
/// assert!(!no_spaces.test(&"a b".to_string()));
///
/// // Parametrized built-ins share one identity per kind.
/// assert_eq!(Validator::min_length(3).id(), Validator::min_length(8).id());
/// ```
pub struct Validator<V: ?Sized> {
    id: ValidatorId,
    predicate: Arc<Predicate<V>>,
}

impl<V: ?Sized> Clone for Validator<V> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<V: ?Sized> fmt::Debug for Validator<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator").field("id", &self.id).finish()
    }
}

impl<V: ?Sized> Validator<V> {
    /// The identity used for error keying.
    #[must_use]
    pub fn id(&self) -> ValidatorId {
        self.id
    }

    /// Run the predicate. `true` means the value passed.
    #[must_use]
    pub fn test(&self, value: &V) -> bool {
        (self.predicate)(value)
    }
}

impl<V: ?Sized + 'static> Validator<V> {
    /// Create a validator with a fresh identity.
    #[must_use]
    pub fn new(predicate: impl Fn(&V) -> bool + Send + Sync + 'static) -> Self {
        Self::with_id(ValidatorId::fresh(), predicate)
    }

    /// Create a validator with an explicit identity.
    ///
    /// Reuse one identity across differently parametrized validators when they
    /// should replace each other's error entry.
    #[must_use]
    pub fn with_id(id: ValidatorId, predicate: impl Fn(&V) -> bool + Send + Sync + 'static) -> Self {
        Self {
            id,
            predicate: Arc::new(predicate),
        }
    }

    /// Both validators must pass. The result has a fresh identity.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::new(move |value| self.test(value) && other.test(value))
    }

    /// At least one validator must pass. The result has a fresh identity.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::new(move |value| self.test(value) || other.test(value))
    }

    /// Passes exactly when `self` fails. The result has a fresh identity.
    #[must_use]
    pub fn negate(self) -> Self {
        Self::new(move |value| !self.test(value))
    }

    /// Every validator must pass. An empty set always passes.
    #[must_use]
    pub fn all(validators: impl IntoIterator<Item = Self>) -> Self {
        let validators: Vec<Self> = validators.into_iter().collect();
        Self::new(move |value| validators.iter().all(|v| v.test(value)))
    }
}

impl Validator<String> {
    /// Non-empty after trimming whitespace. See [`Required`].
    #[must_use]
    pub fn required() -> Self {
        Required::new().into()
    }

    /// Practical e-mail address check. See [`Email`].
    #[must_use]
    pub fn email() -> Self {
        Email::new().into()
    }

    /// At least `min` UTF-16 code units (inclusive).
    #[must_use]
    pub fn min_length(min: usize) -> Self {
        MinLength::new(min).into()
    }

    /// At most `max` UTF-16 code units (inclusive).
    #[must_use]
    pub fn max_length(max: usize) -> Self {
        MaxLength::new(max).into()
    }

    /// The whole value must match `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] if `pattern` is not a valid regular expression.
    pub fn pattern(pattern: &str) -> Result<Self, PatternError> {
        Ok(Pattern::new(pattern)?.into())
    }
}

impl<T> Validator<T>
where
    T: PartialOrd + Send + Sync + 'static,
{
    /// Value must be `>= min`.
    #[must_use]
    pub fn min(min: T) -> Self {
        Min::new(min).into()
    }

    /// Value must be `<= max`.
    #[must_use]
    pub fn max(max: T) -> Self {
        Max::new(max).into()
    }
}

impl Validator<Option<bool>> {
    /// Value must be `Some(true)`. See [`RequiredTrue`].
    #[must_use]
    pub fn required_true() -> Self {
        RequiredTrue.into()
    }
}

// ---------------------------------------------------------------------------
// Built-in Rules
// ---------------------------------------------------------------------------

/// Validates that a string is not empty.
///
/// By default, whitespace-only strings are considered empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct Required {
    /// If `true`, whitespace-only strings are considered valid.
    pub allow_whitespace: bool,
}

impl Required {
    /// Create a new `Required` rule.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow whitespace-only strings to pass.
    #[must_use]
    pub fn allow_whitespace(mut self) -> Self {
        self.allow_whitespace = true;
        self
    }

    /// Returns `true` if `value` passes.
    #[must_use]
    pub fn check(&self, value: &str) -> bool {
        if self.allow_whitespace {
            !value.is_empty()
        } else {
            !value.trim().is_empty()
        }
    }
}

impl From<Required> for Validator<String> {
    fn from(rule: Required) -> Self {
        Self::with_id(ValidatorId::REQUIRED, move |value: &String| rule.check(value))
    }
}

/// How string length is measured by [`MinLength`] and [`MaxLength`].
///
/// The default counts UTF-16 code units, the unit HTML `minlength` and
/// `maxlength` use, so a bound agrees with the browser-side check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthUnit {
    /// UTF-16 code units.
    #[default]
    Utf16,
    /// Unicode scalar values.
    Chars,
    /// Extended grapheme clusters.
    Graphemes,
}

impl LengthUnit {
    /// Length of `value` in this unit.
    #[must_use]
    pub fn measure(self, value: &str) -> usize {
        match self {
            Self::Utf16 => value.encode_utf16().count(),
            Self::Chars => value.chars().count(),
            Self::Graphemes => value.graphemes(true).count(),
        }
    }
}

/// Validates that a string is at least `min` long.
#[derive(Debug, Clone, Copy)]
pub struct MinLength {
    /// Minimum length required.
    pub min: usize,
    /// Unit the length is measured in.
    pub unit: LengthUnit,
}

impl MinLength {
    /// Create a new `MinLength` rule counting UTF-16 code units.
    #[must_use]
    pub fn new(min: usize) -> Self {
        Self {
            min,
            unit: LengthUnit::default(),
        }
    }

    /// Measure in `unit` instead.
    #[must_use]
    pub fn unit(mut self, unit: LengthUnit) -> Self {
        self.unit = unit;
        self
    }

    /// Count grapheme clusters instead of code units.
    #[must_use]
    pub fn graphemes(self) -> Self {
        self.unit(LengthUnit::Graphemes)
    }

    /// Returns `true` if `value` passes.
    #[must_use]
    pub fn check(&self, value: &str) -> bool {
        self.unit.measure(value) >= self.min
    }
}

impl From<MinLength> for Validator<String> {
    fn from(rule: MinLength) -> Self {
        Self::with_id(ValidatorId::MIN_LENGTH, move |value: &String| {
            rule.check(value)
        })
    }
}

/// Validates that a string is at most `max` long.
#[derive(Debug, Clone, Copy)]
pub struct MaxLength {
    /// Maximum length allowed.
    pub max: usize,
    /// Unit the length is measured in.
    pub unit: LengthUnit,
}

impl MaxLength {
    /// Create a new `MaxLength` rule counting UTF-16 code units.
    #[must_use]
    pub fn new(max: usize) -> Self {
        Self {
            max,
            unit: LengthUnit::default(),
        }
    }

    /// Measure in `unit` instead.
    #[must_use]
    pub fn unit(mut self, unit: LengthUnit) -> Self {
        self.unit = unit;
        self
    }

    /// Count grapheme clusters instead of code units.
    #[must_use]
    pub fn graphemes(self) -> Self {
        self.unit(LengthUnit::Graphemes)
    }

    /// Returns `true` if `value` passes.
    #[must_use]
    pub fn check(&self, value: &str) -> bool {
        self.unit.measure(value) <= self.max
    }
}

impl From<MaxLength> for Validator<String> {
    fn from(rule: MaxLength) -> Self {
        Self::with_id(ValidatorId::MAX_LENGTH, move |value: &String| {
            rule.check(value)
        })
    }
}

/// Upper bound on the whole address.
const EMAIL_MAX_LEN: usize = 254;
/// Upper bound on the part before `@`.
const EMAIL_MAX_LOCAL_LEN: usize = 64;

// WHATWG valid-e-mail-address, tightened: no leading/trailing dot in the
// local part. Length limits are checked outside the expression.
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-zA-Z0-9!#$%&'*+/=?^_`{|}~-]+)*@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email pattern is a valid constant expression")
});

/// Validates that a string is a plausible e-mail address.
///
/// Based on the WHATWG definition of a valid e-mail address with a few RFC
/// rules added:
/// - the local part may not begin or end with `.`
/// - the local part is at most 64 characters
/// - the whole address is at most 254 characters
///
/// Unlike most rules the empty string fails; there is nothing to deliver to.
#[derive(Debug, Clone, Copy, Default)]
pub struct Email;

impl Email {
    /// Create a new `Email` rule.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns `true` if `value` passes.
    #[must_use]
    pub fn check(&self, value: &str) -> bool {
        if value.is_empty() || value.len() > EMAIL_MAX_LEN {
            return false;
        }
        match value.split_once('@') {
            Some((local, _)) if local.len() <= EMAIL_MAX_LOCAL_LEN => {}
            _ => return false,
        }
        EMAIL_PATTERN.is_match(value)
    }
}

impl From<Email> for Validator<String> {
    fn from(rule: Email) -> Self {
        Self::with_id(ValidatorId::EMAIL, move |value: &String| rule.check(value))
    }
}

/// Error returned when a [`Pattern`] expression does not compile.
#[derive(Debug, Clone)]
pub struct PatternError {
    source: regex::Error,
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid validation pattern: {}", self.source)
    }
}

impl std::error::Error for PatternError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Validates that a string matches a regular expression in full.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
}

impl Pattern {
    /// Compile `pattern`, anchored so the entire value has to match.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] if the expression is invalid.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let regex = Regex::new(&format!("^(?:{pattern})$"))
            .map_err(|source| PatternError { source })?;
        Ok(Self { regex })
    }

    /// Use a pre-built expression as is (no implicit anchoring).
    #[must_use]
    pub fn from_regex(regex: Regex) -> Self {
        Self { regex }
    }

    /// Returns `true` if `value` passes.
    #[must_use]
    pub fn check(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

impl From<Pattern> for Validator<String> {
    fn from(rule: Pattern) -> Self {
        Self::with_id(ValidatorId::PATTERN, move |value: &String| rule.check(value))
    }
}

/// Validates that a value is at least `min` (inclusive).
#[derive(Debug, Clone, Copy)]
pub struct Min<T> {
    /// Minimum value (inclusive).
    pub min: T,
}

impl<T: PartialOrd> Min<T> {
    /// Create a new `Min` rule.
    #[must_use]
    pub fn new(min: T) -> Self {
        Self { min }
    }

    /// Returns `true` if `value` passes.
    #[must_use]
    pub fn check(&self, value: &T) -> bool {
        *value >= self.min
    }
}

impl<T> From<Min<T>> for Validator<T>
where
    T: PartialOrd + Send + Sync + 'static,
{
    fn from(rule: Min<T>) -> Self {
        Self::with_id(ValidatorId::MIN, move |value: &T| rule.check(value))
    }
}

/// Validates that a value is at most `max` (inclusive).
#[derive(Debug, Clone, Copy)]
pub struct Max<T> {
    /// Maximum value (inclusive).
    pub max: T,
}

impl<T: PartialOrd> Max<T> {
    /// Create a new `Max` rule.
    #[must_use]
    pub fn new(max: T) -> Self {
        Self { max }
    }

    /// Returns `true` if `value` passes.
    #[must_use]
    pub fn check(&self, value: &T) -> bool {
        *value <= self.max
    }
}

impl<T> From<Max<T>> for Validator<T>
where
    T: PartialOrd + Send + Sync + 'static,
{
    fn from(rule: Max<T>) -> Self {
        Self::with_id(ValidatorId::MAX, move |value: &T| rule.check(value))
    }
}

/// Validates that an optional flag is exactly `Some(true)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequiredTrue;

impl RequiredTrue {
    /// Returns `true` if `value` passes.
    #[must_use]
    pub fn check(&self, value: Option<bool>) -> bool {
        value == Some(true)
    }
}

impl From<RequiredTrue> for Validator<Option<bool>> {
    fn from(rule: RequiredTrue) -> Self {
        Self::with_id(ValidatorId::REQUIRED_TRUE, move |value: &Option<bool>| {
            rule.check(*value)
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
