//! Error types for the co-occurrence engine.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoocError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("window parameter lists disagree in length: {0}")]
    WindowParamMismatch(String),

    #[error("invalid memory size '{0}'")]
    InvalidMemorySize(String),

    #[error("vocabulary is empty after pruning")]
    EmptyVocabulary,

    #[error("token dictionary override is not a contiguous id range: {0}")]
    InvalidDictionary(String),

    #[error("documents mix integer and text tokens")]
    MixedTokenTypes,

    #[error("documents mix input representations: expected {expected}, got {got}")]
    MixedDocumentKinds {
        expected: &'static str,
        got: &'static str,
    },

    #[error("timestamps must be non-decreasing in document {0}")]
    UnsortedTimestamps(usize),

    #[error("adjacency index {index} out of range for {nodes} nodes in document {doc}")]
    EdgeOutOfRange {
        doc: usize,
        index: usize,
        nodes: usize,
    },

    #[error("thread pool error: {0}")]
    ThreadPool(String),
}

pub type Result<T> = std::result::Result<T, CoocError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = CoocError::InvalidConfig("negative epsilon".into());
        assert_eq!(e.to_string(), "invalid configuration: negative epsilon");

        let e = CoocError::WindowParamMismatch("radii has 2 entries, kernels has 3".into());
        assert_eq!(
            e.to_string(),
            "window parameter lists disagree in length: radii has 2 entries, kernels has 3"
        );

        let e = CoocError::InvalidMemorySize("12Q".into());
        assert_eq!(e.to_string(), "invalid memory size '12Q'");

        let e = CoocError::EmptyVocabulary;
        assert_eq!(e.to_string(), "vocabulary is empty after pruning");
    }

    #[test]
    fn test_input_error_display() {
        let e = CoocError::MixedDocumentKinds {
            expected: "plain",
            got: "timed",
        };
        assert_eq!(
            e.to_string(),
            "documents mix input representations: expected plain, got timed"
        );

        let e = CoocError::EdgeOutOfRange {
            doc: 3,
            index: 9,
            nodes: 4,
        };
        assert_eq!(
            e.to_string(),
            "adjacency index 9 out of range for 4 nodes in document 3"
        );

        let e = CoocError::UnsortedTimestamps(1);
        assert_eq!(e.to_string(), "timestamps must be non-decreasing in document 1");
    }

    #[test]
    fn test_error_clone_eq() {
        let e1 = CoocError::MixedTokenTypes;
        let e2 = e1.clone();
        assert_eq!(e1, e2);
    }
}
