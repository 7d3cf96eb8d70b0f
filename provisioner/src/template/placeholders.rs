use crate::errors::{ProvisionError, ProvisionResult};
use std::collections::BTreeMap;
use zeroize::Zeroize;

/// Tokens recognised in parameter and environment-file templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Placeholder {
    InsightsKey,
    InsightsConnectionString,
    Suffix,
    DbUser,
    DbPassword,
    StorageConnectionString,
}

impl Placeholder {
    pub const ALL: [Placeholder; 6] = [
        Placeholder::InsightsKey,
        Placeholder::InsightsConnectionString,
        Placeholder::Suffix,
        Placeholder::DbUser,
        Placeholder::DbPassword,
        Placeholder::StorageConnectionString,
    ];

    /// Name without braces, as used in values files.
    pub fn name(&self) -> &'static str {
        match self {
            Placeholder::InsightsKey => "INSIGHTS_KEY",
            Placeholder::InsightsConnectionString => "INSIGHTS_CONNECTION_STRING",
            Placeholder::Suffix => "SUFFIX",
            Placeholder::DbUser => "DBUSER",
            Placeholder::DbPassword => "DBPASSWORD",
            Placeholder::StorageConnectionString => "STORAGE_CONNECTION_STRING",
        }
    }

    pub fn token(&self) -> String {
        format!("{{{}}}", self.name())
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim_start_matches('{').trim_end_matches('}');
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn is_secret(&self) -> bool {
        !matches!(self, Placeholder::Suffix | Placeholder::DbUser)
    }
}

impl std::fmt::Display for Placeholder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{}}}", self.name())
    }
}

/// Literal values for placeholders. Values are wiped from memory on drop.
#[derive(Clone, Default)]
pub struct SubstitutionValues {
    values: BTreeMap<Placeholder, String>,
}

impl SubstitutionValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value; empty values are rejected.
    pub fn insert(&mut self, placeholder: Placeholder, value: impl Into<String>) -> ProvisionResult<()> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ProvisionError::EmptyValue(placeholder.token()));
        }
        if let Some(mut previous) = self.values.insert(placeholder, value) {
            previous.zeroize();
        }
        Ok(())
    }

    pub fn with(mut self, placeholder: Placeholder, value: impl Into<String>) -> ProvisionResult<Self> {
        self.insert(placeholder, value)?;
        Ok(self)
    }

    pub fn get(&self, placeholder: Placeholder) -> Option<&str> {
        self.values.get(&placeholder).map(String::as_str)
    }

    pub fn placeholders(&self) -> impl Iterator<Item = Placeholder> + '_ {
        self.values.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Builds values from `NAME -> value` pairs such as a JSON values file.
    pub fn from_named<I, K, V>(pairs: I) -> ProvisionResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut values = Self::new();
        for (name, value) in pairs {
            let placeholder = Placeholder::from_name(name.as_ref()).ok_or_else(|| {
                ProvisionError::Configuration(format!(
                    "Unknown placeholder '{}'. Known placeholders: {}",
                    name.as_ref(),
                    Placeholder::ALL.map(|p| p.name()).join(", ")
                ))
            })?;
            values.insert(placeholder, value)?;
        }
        Ok(values)
    }
}

impl std::fmt::Debug for SubstitutionValues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (placeholder, value) in &self.values {
            if placeholder.is_secret() {
                map.entry(&placeholder.name(), &"<redacted>");
            } else {
                map.entry(&placeholder.name(), value);
            }
        }
        map.finish()
    }
}

impl Drop for SubstitutionValues {
    fn drop(&mut self) {
        for value in self.values.values_mut() {
            value.zeroize();
        }
    }
}

/// Replaces every known placeholder that has a value, in a single pass.
///
/// Substituted values are never scanned again, so a value that happens to
/// contain a token is written out literally.
pub fn substitute(text: &str, values: &SubstitutionValues) -> String {
    let mut output = String::with_capacity(text.len());
    let mut last = 0;

    for (start, end) in token_spans(text) {
        let value = Placeholder::from_name(&text[start..end]).and_then(|p| values.get(p));
        if let Some(value) = value {
            output.push_str(&text[last..start]);
            output.push_str(value);
            last = end;
        }
    }

    output.push_str(&text[last..]);
    output
}

/// Lists the placeholders present in `text`, known or not, in order of appearance.
///
/// A placeholder is `{` followed by one or more uppercase ASCII letters,
/// digits or underscores and a closing `}`. Duplicates are reported once.
pub fn unresolved_placeholders(text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for (start, end) in token_spans(text) {
        let token = &text[start..end];
        if !found.iter().any(|t| t == token) {
            found.push(token.to_string());
        }
    }
    found
}

/// Byte ranges of `{UPPER_SNAKE}` tokens, braces included.
fn token_spans(text: &str) -> Vec<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'{' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len()
                && (bytes[end].is_ascii_uppercase()
                    || bytes[end].is_ascii_digit()
                    || bytes[end] == b'_')
            {
                end += 1;
            }
            if end > start && end < bytes.len() && bytes[end] == b'}' {
                spans.push((i, end + 1));
                i = end + 1;
                continue;
            }
        }
        i += 1;
    }

    spans
}
