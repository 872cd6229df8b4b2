// crates/sqlite-steward-cli/src/i18n.rs
// ============================================================================
// Module: CLI Internationalization Helpers
// Description: Provides message catalog and translation utilities for the CLI.
// Purpose: Centralize user-facing strings for future localization support.
// Dependencies: Standard library collections and formatting utilities.
// ============================================================================

//! ## Overview
//! The SQLite Steward CLI stores user-facing strings in a small translation
//! catalog to enforce consistent messaging and to prepare for future
//! locales. All runtime output should be routed through the
//! [`t!`](crate::t) macro.
//!
//! ## Invariants
//! - The catalog is initialized once and read-only thereafter.
//! - Missing keys fall back to English and then to the key itself.
//! - Placeholder substitutions preserve deterministic order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Supported CLI locales.
///
/// # Invariants
/// - Variants are stable for CLI parsing and catalog lookup.
/// - [`Locale::En`] is the default fallback locale.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Locale {
    /// English (default).
    En,
    /// Catalan.
    Ca,
}

impl Locale {
    /// Returns the canonical locale label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ca => "ca",
        }
    }

    /// Attempts to parse a locale value (case-insensitive, tolerant of
    /// region tags).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        let normalized = value.to_ascii_lowercase();
        let lang = normalized.split(['-', '_']).next().unwrap_or("");
        match lang {
            "en" => Some(Self::En),
            "ca" => Some(Self::Ca),
            _ => None,
        }
    }
}

/// Ordered list of supported CLI locales.
///
/// # Invariants
/// - Ordering is stable for deterministic presentation.
pub const SUPPORTED_LOCALES: &[Locale] = &[Locale::En, Locale::Ca];

/// A formatted message argument captured by the [`macro@crate::t`] macro.
///
/// # Invariants
/// - `key` matches a placeholder name without braces (for example, `path`).
/// - `value` is preformatted and should be safe for display.
#[derive(Clone)]
pub struct MessageArg {
    /// The placeholder name used in message templates (e.g., `"path"`).
    pub key: &'static str,
    /// The formatted string value to substitute for this placeholder.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`] from a key and displayable value.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Locale Selection
// ============================================================================

/// Global locale selection for CLI output.
static CURRENT_LOCALE: OnceLock<Locale> = OnceLock::new();

/// Sets the CLI locale. Only the first call wins.
pub fn set_locale(locale: Locale) {
    let _ = CURRENT_LOCALE.set(locale);
}

/// Returns the current CLI locale (defaults to English).
#[must_use]
pub fn current_locale() -> Locale {
    CURRENT_LOCALE.get().copied().unwrap_or(Locale::En)
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Static English catalog entries loaded into the localized message bundle.
const CATALOG_EN: &[(&str, &str)] = &[
    ("main.version", "sqlite-steward {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("output.json_failed", "Failed to render JSON output: {error}"),
    (
        "query.pragma.invalid",
        "Invalid pragma override: {value}. Expected NAME=VALUE.",
    ),
    (
        "query.timeout.invalid",
        "Invalid timeout: {value}. Expected a non-negative number of seconds.",
    ),
    (
        "db.mode.invalid",
        "Invalid file mode: {value}. Expected an octal string such as 0640.",
    ),
    (
        "table.column.invalid",
        "Invalid column definition: {value}. Expected NAME:TYPE[:CONSTRAINTS].",
    ),
    ("backup.rotate.keep_invalid", "rotate-keep must be >= 1."),
    ("backup.rotate.pattern_required", "--rotate-keep requires --rotate-pattern."),
    (
        "i18n.lang.invalid_env",
        "Invalid value for {env}: {value}. Expected 'en' or 'ca'.",
    ),
    (
        "i18n.disclaimer.machine_translated",
        "Note: non-English output is machine-translated and may be inaccurate.",
    ),
];

/// Static Catalan catalog entries loaded into the localized message bundle.
const CATALOG_CA: &[(&str, &str)] = &[
    ("main.version", "sqlite-steward {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "sortida"),
    ("output.write_failed", "No s'ha pogut escriure a {stream}: {error}"),
    ("output.json_failed", "No s'ha pogut renderitzar la sortida JSON: {error}"),
    (
        "query.pragma.invalid",
        "Substitució de pragma no vàlida: {value}. S'esperava NOM=VALOR.",
    ),
    (
        "query.timeout.invalid",
        "Temps d'espera no vàlid: {value}. S'esperava un nombre no negatiu de segons.",
    ),
    (
        "db.mode.invalid",
        "Mode de fitxer no vàlid: {value}. S'esperava una cadena octal com ara 0640.",
    ),
    (
        "table.column.invalid",
        "Definició de columna no vàlida: {value}. S'esperava NOM:TIPUS[:RESTRICCIONS].",
    ),
    ("backup.rotate.keep_invalid", "rotate-keep ha de ser >= 1."),
    ("backup.rotate.pattern_required", "--rotate-keep requereix --rotate-pattern."),
    (
        "i18n.lang.invalid_env",
        "Valor no vàlid per a {env}: {value}. S'esperava 'en' o 'ca'.",
    ),
    (
        "i18n.disclaimer.machine_translated",
        "Nota: la sortida que no és en anglès està traduïda automàticament i pot ser inexacta.",
    ),
];

/// Returns the message catalog for the requested locale.
pub(crate) fn catalog_for(locale: Locale) -> &'static HashMap<&'static str, &'static str> {
    static CATALOG_EN_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    static CATALOG_CA_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    match locale {
        Locale::En => CATALOG_EN_MAP.get_or_init(|| CATALOG_EN.iter().copied().collect()),
        Locale::Ca => CATALOG_CA_MAP.get_or_init(|| CATALOG_CA.iter().copied().collect()),
    }
}

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Translates `key` using the selected locale while substituting `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    let locale = current_locale();
    let template = catalog_for(locale)
        .get(key)
        .copied()
        .or_else(|| catalog_for(Locale::En).get(key).copied())
        .unwrap_or(key);
    if args.is_empty() {
        return template.to_string();
    }

    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a localized message from a key and named arguments.
///
/// # Arguments
///
/// - `$key` must match a catalog entry.
/// - Named arguments are substituted into `{placeholder}` positions.
///
/// # Returns
///
/// A localized [`String`] with placeholders substituted.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::i18n::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::i18n::translate($key, args)
    }};
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]
mod tests {
    use super::CATALOG_CA;
    use super::CATALOG_EN;
    use super::Locale;
    use super::MessageArg;
    use super::catalog_for;
    use super::translate;

    #[test]
    fn catalogs_cover_the_same_keys() {
        let mut en_keys: Vec<&str> = CATALOG_EN.iter().map(|(key, _)| *key).collect();
        let mut ca_keys: Vec<&str> = CATALOG_CA.iter().map(|(key, _)| *key).collect();
        en_keys.sort_unstable();
        ca_keys.sort_unstable();
        assert_eq!(en_keys, ca_keys);
    }

    #[test]
    fn catalog_keys_are_unique() {
        for catalog in [CATALOG_EN, CATALOG_CA] {
            let mut keys: Vec<&str> = catalog.iter().map(|(key, _)| *key).collect();
            let total = keys.len();
            keys.sort_unstable();
            keys.dedup();
            assert_eq!(total, keys.len());
        }
    }

    #[test]
    fn translate_substitutes_placeholders_in_order() {
        let message = translate(
            "output.write_failed",
            vec![
                MessageArg::new("stream", "stdout"),
                MessageArg::new("error", "broken pipe"),
            ],
        );
        assert_eq!(message, "Failed to write to stdout: broken pipe");
    }

    #[test]
    fn translate_falls_back_to_the_key_for_unknown_entries() {
        assert_eq!(translate("no.such.key", Vec::new()), "no.such.key");
    }

    #[test]
    fn locale_parse_tolerates_region_tags() {
        assert_eq!(Locale::parse("ca-ES"), Some(Locale::Ca));
        assert_eq!(Locale::parse("EN_us"), Some(Locale::En));
        assert_eq!(Locale::parse("fr"), None);
        assert_eq!(Locale::parse(""), None);
    }

    #[test]
    fn catalog_lookup_matches_static_entries() {
        let catalog = catalog_for(Locale::En);
        assert_eq!(catalog.get("main.version"), Some(&"sqlite-steward {version}"));
    }
}
