//! On-disk cache record format.
//!
//! ```text
//! <source hash>\n
//! <JSON array of dependency identities>\n
//! \n
//! <generated output, verbatim>
//! ```

use thiserror::Error;

/// A malformed record file.
#[derive(Debug, Error)]
pub enum RecordError {
    /// A header line or the separator is missing.
    #[error("truncated record")]
    Truncated,
    /// The dependency line is not a JSON string array.
    #[error("malformed dependency list: {0}")]
    Dependencies(#[from] serde_json::Error),
    /// The record is not UTF-8.
    #[error("record is not valid UTF-8")]
    Encoding,
}

/// Persisted result of assembling one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRecord {
    /// Hash of the exact source the output was generated from.
    pub source_hash: String,
    /// Identities of the module's dependencies, in edge order.
    pub dependencies: Vec<String>,
    /// Generated output text.
    pub output: String,
}

impl CacheRecord {
    /// Serialize to the on-disk format.
    pub fn encode(&self) -> Vec<u8> {
        // A string list always serializes.
        let deps = serde_json::to_string(&self.dependencies).unwrap_or_else(|_| "[]".to_owned());
        let mut out = String::with_capacity(self.source_hash.len() + deps.len() + self.output.len() + 3);
        out.push_str(&self.source_hash);
        out.push('\n');
        out.push_str(&deps);
        out.push_str("\n\n");
        out.push_str(&self.output);
        out.into_bytes()
    }

    /// Parse the on-disk format.
    pub fn decode(bytes: &[u8]) -> Result<Self, RecordError> {
        let text = std::str::from_utf8(bytes).map_err(|_| RecordError::Encoding)?;
        let (source_hash, rest) = text.split_once('\n').ok_or(RecordError::Truncated)?;
        let (deps, rest) = rest.split_once('\n').ok_or(RecordError::Truncated)?;
        let output = rest.strip_prefix('\n').ok_or(RecordError::Truncated)?;
        if source_hash.is_empty() {
            return Err(RecordError::Truncated);
        }

        Ok(Self {
            source_hash: source_hash.to_owned(),
            dependencies: serde_json::from_str(deps)?,
            output: output.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let record = CacheRecord {
            source_hash: "abc".into(),
            dependencies: vec!["/p/a.js".into(), "/p/b.js".into()],
            output: "line 1\n\nline 3\n".into(),
        };
        let bytes = record.encode();
        assert_eq!(
            std::str::from_utf8(&bytes).unwrap(),
            "abc\n[\"/p/a.js\",\"/p/b.js\"]\n\nline 1\n\nline 3\n"
        );
        assert_eq!(CacheRecord::decode(&bytes).unwrap(), record);
    }

    #[test]
    fn test_empty_output() {
        let record = CacheRecord::decode(b"abc\n[]\n\n").unwrap();
        assert!(record.dependencies.is_empty());
        assert_eq!(record.output, "");
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(CacheRecord::decode(b"abc"), Err(RecordError::Truncated)));
        assert!(matches!(CacheRecord::decode(b"abc\n[]\nx"), Err(RecordError::Truncated)));
        assert!(matches!(CacheRecord::decode(b"\n[]\n\n"), Err(RecordError::Truncated)));
        assert!(matches!(
            CacheRecord::decode(b"abc\n{oops\n\n"),
            Err(RecordError::Dependencies(_))
        ));
        assert!(matches!(CacheRecord::decode(&[0xff, b'\n']), Err(RecordError::Encoding)));
    }
}
