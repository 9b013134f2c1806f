//! Per-item batch results.

use crate::{EngineError, EngineResult};

/// Outcome of one batch item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    /// Index of the input.
    pub item: usize,
    pub ok: bool,
    /// Error message when `ok` is false.
    pub error: Option<String>,
    /// Error category (see [`EngineError::kind`]).
    pub kind: Option<&'static str>,
    /// Encoded output when `ok` is true.
    pub output: Option<Vec<u8>>,
}

impl ItemReport {
    fn from_result(item: usize, result: EngineResult<Vec<u8>>) -> Self {
        match result {
            Ok(bytes) => Self {
                item,
                ok: true,
                error: None,
                kind: None,
                output: Some(bytes),
            },
            Err(e) => Self::failed(item, &e),
        }
    }

    fn failed(item: usize, error: &EngineError) -> Self {
        Self {
            item,
            ok: false,
            error: Some(error.to_string()),
            kind: Some(error.kind()),
            output: None,
        }
    }
}

/// Results covering every input of a batch, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub items: Vec<ItemReport>,
    /// Number of items with `ok == true`.
    pub succeeded: usize,
}

impl BatchReport {
    /// Builds a report from per-item results in input order.
    pub fn from_results(results: Vec<EngineResult<Vec<u8>>>) -> Self {
        let items: Vec<ItemReport> = results
            .into_iter()
            .enumerate()
            .map(|(i, r)| ItemReport::from_result(i, r))
            .collect();
        let succeeded = items.iter().filter(|i| i.ok).count();
        Self { items, succeeded }
    }

    /// Number of failed items.
    pub fn failed(&self) -> usize {
        self.items.len() - self.succeeded
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grade_io::IoError;

    #[test]
    fn mixed_results_keep_order() {
        let report = BatchReport::from_results(vec![
            Ok(vec![1]),
            Err(IoError::EmptyInput.into()),
            Ok(vec![2]),
        ]);
        assert_eq!(report.len(), 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.items[1].item, 1);
        assert!(!report.items[1].ok);
        assert_eq!(report.items[1].kind, Some("EmptyInput"));
        assert_eq!(report.items[2].output, Some(vec![2]));
    }
}
