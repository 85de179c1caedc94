//! Translation resolution and language switching.
//!
//! Each language ships as an embedded nested JSON bundle. Keys are
//! dot-separated paths (`"report.validation.title_required"`) resolved by
//! walking the table node by node. Lookup failures degrade softly: the raw
//! key is returned and a warning is logged, never an error.

use serde_json::Value;
use std::collections::BTreeSet;
use tracing::warn;

const EN_BUNDLE: &str = include_str!("locales/en.json");
const ES_BUNDLE: &str = include_str!("locales/es.json");
const HI_BUNDLE: &str = include_str!("locales/hi.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
    Spanish,
    Hindi,
}

pub const ALL_LANGUAGES: [Language; 3] = [Language::English, Language::Spanish, Language::Hindi];

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Spanish => "es",
            Language::Hindi => "hi",
        }
    }

    pub fn native_name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Spanish => "Español",
            Language::Hindi => "हिन्दी",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" | "en-us" | "en-gb" => Some(Language::English),
            "es" | "es-es" | "es-mx" => Some(Language::Spanish),
            "hi" | "hi-in" => Some(Language::Hindi),
            _ => None,
        }
    }

    fn bundle(&self) -> &'static str {
        match self {
            Language::English => EN_BUNDLE,
            Language::Spanish => ES_BUNDLE,
            Language::Hindi => HI_BUNDLE,
        }
    }
}

fn parse_bundle(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!(error = %e, "malformed embedded translation bundle");
        Value::Null
    })
}

/// Walk a nested table along a dot-separated key path.
fn resolve_in<'a>(table: &'a Value, key: &str) -> Option<&'a Value> {
    let mut node = table;
    for segment in key.split('.') {
        node = node.as_object()?.get(segment)?;
    }
    Some(node)
}

/// Replace every `{{name}}` occurrence with the supplied value. Placeholders
/// with no matching param are left literal.
fn interpolate(template: &str, params: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in params {
        out = out.replace(&format!("{{{{{}}}}}", name), value);
    }
    out
}

/// Collect the flattened dot-path key set of a table. Used for the
/// load-time parity check across language bundles.
pub fn flatten_keys(table: &Value) -> BTreeSet<String> {
    fn walk(prefix: &str, node: &Value, out: &mut BTreeSet<String>) {
        match node {
            Value::Object(map) => {
                for (k, v) in map {
                    let path = if prefix.is_empty() {
                        k.clone()
                    } else {
                        format!("{}.{}", prefix, k)
                    };
                    walk(&path, v, out);
                }
            }
            _ => {
                out.insert(prefix.to_string());
            }
        }
    }
    let mut out = BTreeSet::new();
    walk("", table, &mut out);
    out
}

/// Compare every bundled language's key set against the default language.
/// Returns human-readable discrepancies; empty means full parity.
pub fn verify_key_parity() -> Vec<String> {
    let reference = flatten_keys(&parse_bundle(Language::default().bundle()));
    let mut problems = Vec::new();
    for lang in ALL_LANGUAGES {
        if lang == Language::default() {
            continue;
        }
        let keys = flatten_keys(&parse_bundle(lang.bundle()));
        for missing in reference.difference(&keys) {
            problems.push(format!("{}: missing key {}", lang.code(), missing));
        }
        for extra in keys.difference(&reference) {
            problems.push(format!("{}: extra key {}", lang.code(), extra));
        }
    }
    problems
}

/// Holds the active language and its table, replaced wholesale on switch.
///
/// `version` increments on every effective switch so derived state can
/// detect "language changed" as a dependency.
pub struct LanguageStore {
    language: Language,
    table: Value,
    version: u64,
    is_changing: bool,
}

impl LanguageStore {
    /// Build a store for the requested code. Unrecognized codes fall back
    /// to the default language rather than erroring.
    pub fn new(code: Option<&str>) -> Self {
        let language = match code {
            Some(c) => Language::from_code(c).unwrap_or_else(|| {
                warn!(code = c, "unknown language code, falling back to default");
                Language::default()
            }),
            None => Language::default(),
        };
        Self {
            language,
            table: parse_bundle(language.bundle()),
            version: 0,
            is_changing: false,
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_changing(&self) -> bool {
        self.is_changing
    }

    /// Switch the active language. A no-op (no version bump) when `code`
    /// resolves to the already-active language. Returns whether a switch
    /// happened; the caller persists the new code.
    pub fn set_language(&mut self, code: &str) -> bool {
        let next = Language::from_code(code).unwrap_or_else(|| {
            warn!(code, "unknown language code, falling back to default");
            Language::default()
        });
        if next == self.language {
            return false;
        }
        // Vestigial guard flag: the swap is synchronous.
        self.is_changing = true;
        self.language = next;
        self.table = parse_bundle(next.bundle());
        self.version += 1;
        self.is_changing = false;
        true
    }

    /// Resolve a dot-path key against the active table.
    pub fn resolve(&self, key: &str) -> String {
        self.resolve_with(key, &[])
    }

    /// Resolve a key and interpolate `{{param}}` placeholders.
    pub fn resolve_with(&self, key: &str, params: &[(&str, &str)]) -> String {
        match resolve_in(&self.table, key) {
            Some(Value::String(s)) => interpolate(s, params),
            Some(_) => {
                warn!(key, "translation key resolves to a non-string node");
                key.to_string()
            }
            None => {
                warn!(key, language = self.language.code(), "missing translation key");
                key.to_string()
            }
        }
    }

    /// Raw subtree access for callers that want to walk nested groups.
    pub fn lookup(&self, key: &str) -> Option<&Value> {
        resolve_in(&self.table, key)
    }
}
