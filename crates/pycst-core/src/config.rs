//! Parser configuration
//!
//! Callers hand in a [`PartialParserConfig`] where every field is optional.
//! Missing values are inferred from the source being parsed and the result is
//! a fully resolved [`ParserConfig`] that the tokenizer, parser and tree
//! builder share. A parsed [`Module`](crate::nodes::Module) can hand back the
//! inferred values through `config_for_parsing()`, so a second snippet can be
//! parsed under the same formatting defaults.
//!
//! ```jsonc
//! {
//!   "python_version": "3.8",
//!   "default_indent": "  ",
//!   "default_newline": "\r\n"
//! }
//! ```

use crate::encoding::normalize_encoding;
use crate::{CstError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Language versions the grammar tables can be built for.
pub const SUPPORTED_VERSIONS: [PythonVersion; 3] = [
    PythonVersion::new(3, 6),
    PythonVersion::new(3, 7),
    PythonVersion::new(3, 8),
];

/// Version used when none is requested.
pub const DEFAULT_VERSION: PythonVersion = PythonVersion::new(3, 8);

pub const DEFAULT_INDENT: &str = "    ";
pub const DEFAULT_NEWLINE: &str = "\n";
pub const DEFAULT_ENCODING: &str = "utf-8";

/// A `major.minor` language version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PythonVersion {
    pub major: u8,
    pub minor: u8,
}

impl PythonVersion {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Returns the version if the grammar supports it.
    pub fn supported(self) -> Result<Self> {
        if SUPPORTED_VERSIONS.contains(&self) {
            Ok(self)
        } else {
            let names: Vec<String> = SUPPORTED_VERSIONS.iter().map(|v| v.to_string()).collect();
            Err(CstError::config(format!(
                "{self} is not a supported version; supported versions are {}",
                names.join(", ")
            )))
        }
    }
}

impl Default for PythonVersion {
    fn default() -> Self {
        DEFAULT_VERSION
    }
}

impl fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for PythonVersion {
    type Err = CstError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || CstError::config(format!("{s:?} is not a valid version string"));
        let mut parts = s.trim().split('.');
        let major = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let minor = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        // Micro versions are accepted and ignored.
        if let Some(micro) = parts.next()
            && micro.parse::<u16>().is_err()
        {
            return Err(invalid());
        }
        Ok(Self::new(major, minor))
    }
}

impl TryFrom<String> for PythonVersion {
    type Error = CstError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<PythonVersion> for String {
    fn from(value: PythonVersion) -> Self {
        value.to_string()
    }
}

/// Caller-supplied options; anything left out is inferred.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartialParserConfig {
    /// Target syntax version, e.g. `"3.7"`
    pub python_version: Option<String>,
    /// Source encoding, used when rendering bytes
    pub encoding: Option<String>,
    /// Indentation unit for blocks that do not record their own
    pub default_indent: Option<String>,
    /// Line ending used where nodes do not record their own
    pub default_newline: Option<String>,
}

impl PartialParserConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a JSON object.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CstError::config(format!("invalid parser configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_python_version(mut self, version: impl Into<String>) -> Self {
        self.python_version = Some(version.into());
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    pub fn with_default_indent(mut self, indent: impl Into<String>) -> Self {
        self.default_indent = Some(indent.into());
        self
    }

    pub fn with_default_newline(mut self, newline: impl Into<String>) -> Self {
        self.default_newline = Some(newline.into());
        self
    }

    /// Check every explicitly provided value.
    pub fn validate(&self) -> Result<()> {
        self.version()?;
        if let Some(encoding) = &self.encoding {
            normalize_encoding(encoding)?;
        }
        if let Some(indent) = &self.default_indent {
            validate_indent(indent)?;
        }
        if let Some(newline) = &self.default_newline {
            validate_newline(newline)?;
        }
        Ok(())
    }

    /// The requested version, or the default one.
    pub fn version(&self) -> Result<PythonVersion> {
        match &self.python_version {
            Some(version) => version.parse::<PythonVersion>()?.supported(),
            None => Ok(DEFAULT_VERSION),
        }
    }

    /// Fill the gaps from `source`.
    ///
    /// `detected_encoding` comes from byte-level detection and is only used
    /// when no encoding was requested. The indentation is refined later, once
    /// the tokenizer has seen the first indented block.
    pub fn resolve(&self, source: &str, detected_encoding: Option<&str>) -> Result<ParserConfig> {
        self.validate()?;
        let encoding = match (&self.encoding, detected_encoding) {
            (Some(encoding), _) => normalize_encoding(encoding)?,
            (None, Some(detected)) => normalize_encoding(detected)?,
            (None, None) => DEFAULT_ENCODING.to_string(),
        };
        Ok(ParserConfig {
            version: self.version()?,
            encoding,
            default_newline: self
                .default_newline
                .clone()
                .unwrap_or_else(|| detect_newline(source).to_string()),
            default_indent: self.default_indent.clone(),
        })
    }
}

/// Fully resolved configuration for a single parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    pub version: PythonVersion,
    pub encoding: String,
    pub default_newline: String,
    /// `None` until known; the tokenizer's first indent fills it in.
    pub default_indent: Option<String>,
}

impl ParserConfig {
    pub fn indent(&self) -> &str {
        self.default_indent.as_deref().unwrap_or(DEFAULT_INDENT)
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION,
            encoding: DEFAULT_ENCODING.to_string(),
            default_newline: DEFAULT_NEWLINE.to_string(),
            default_indent: None,
        }
    }
}

/// First line ending found in `source`, or `\n`.
pub fn detect_newline(source: &str) -> &'static str {
    let bytes = source.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        match b {
            b'\n' => return "\n",
            b'\r' if bytes.get(i + 1) == Some(&b'\n') => return "\r\n",
            b'\r' => return "\r",
            _ => {}
        }
    }
    DEFAULT_NEWLINE
}

fn validate_indent(indent: &str) -> Result<()> {
    if indent.is_empty() || !indent.chars().all(|c| c == ' ' || c == '\t') {
        return Err(CstError::config(format!(
            "default_indent must be a non-empty run of spaces or tabs, got {indent:?}"
        )));
    }
    Ok(())
}

fn validate_newline(newline: &str) -> Result<()> {
    if !matches!(newline, "\n" | "\r\n" | "\r") {
        return Err(CstError::config(format!(
            "default_newline must be one of \\n, \\r\\n or \\r, got {newline:?}"
        )));
    }
    Ok(())
}
