//! `${name[?options]}` placeholders in module templates.

use crate::constants::JANDEX_OPTION;

/// A parsed placeholder: lookup key plus its comma-separated options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub key: String,
    pub options: Vec<String>,
}

impl Placeholder {
    /// Parse `${key}` or `${key?opt1,opt2}`. Returns `None` for anything else.
    ///
    /// Everything after the first `?` is the options string.
    pub fn parse(value: &str) -> Option<Self> {
        let inner = value.trim().strip_prefix("${")?.strip_suffix('}')?;
        let (key, options) = match inner.split_once('?') {
            Some((key, options)) => (
                key,
                options.split(',').map(str::trim).filter(|o| !o.is_empty()).map(str::to_string).collect(),
            ),
            None => (inner, Vec::new()),
        };
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        Some(Self {
            key: key.to_string(),
            options,
        })
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }

    /// Whether the artifact is marked for annotation indexing by a later task.
    pub fn is_jandex(&self) -> bool {
        self.has_option(JANDEX_OPTION)
    }
}
