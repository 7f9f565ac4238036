use thiserror::Error;

/// Error type for index and query operations.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("query parse error: {0}")]
    QueryParse(String),

    #[error("corrupt index: {0}")]
    Corrupt(String),

    #[error("no .txt files found under: {0}")]
    EmptyCorpus(String),
}

/// Result type alias for index and query operations.
pub type Result<T> = std::result::Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_detail() {
        let err = SearchError::QueryParse("trailing tokens".into());
        assert_eq!(err.to_string(), "query parse error: trailing tokens");
    }
}
