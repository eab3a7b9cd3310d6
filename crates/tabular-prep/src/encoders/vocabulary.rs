//! Ordered category vocabularies.

use crate::error::{PreprocessingError, Result};
use crate::types::Cell;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Sorted, de-duplicated set of category keys.
///
/// Categories are ordered lexicographically (bytewise) by their key; a
/// category's code is its position in that order. The ordering does not
/// depend on the order rows were seen in, so the same data always yields the
/// same codes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct CategoryVocabulary {
    categories: Vec<String>,
}

impl CategoryVocabulary {
    /// Learn the vocabulary of one column. Absent cells are skipped.
    pub fn fit<'a>(cells: impl IntoIterator<Item = &'a Cell>, column: usize) -> Result<Self> {
        let keys: BTreeSet<String> = cells.into_iter().filter_map(Cell::category_key).collect();
        if keys.is_empty() {
            return Err(PreprocessingError::EmptyColumn { column });
        }
        Ok(Self {
            categories: keys.into_iter().collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Code of a category key.
    pub fn code(&self, key: &str) -> Option<usize> {
        self.categories
            .binary_search_by(|c| c.as_str().cmp(key))
            .ok()
    }

    /// Category key for a code.
    pub fn category(&self, code: usize) -> Option<&str> {
        self.categories.get(code).map(String::as_str)
    }
}

impl From<Vec<String>> for CategoryVocabulary {
    fn from(mut categories: Vec<String>) -> Self {
        categories.sort();
        categories.dedup();
        Self { categories }
    }
}

impl From<CategoryVocabulary> for Vec<String> {
    fn from(vocabulary: CategoryVocabulary) -> Self {
        vocabulary.categories
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_sorts_and_dedups() {
        let cells = [
            Cell::from("FR"),
            Cell::from("ES"),
            Cell::Missing,
            Cell::from("FR"),
            Cell::from("DE"),
        ];
        let vocabulary = CategoryVocabulary::fit(&cells, 0).unwrap();

        assert_eq!(vocabulary.categories(), &["DE", "ES", "FR"]);
        assert_eq!(vocabulary.code("ES"), Some(1));
        assert_eq!(vocabulary.code("IT"), None);
        assert_eq!(vocabulary.category(2), Some("FR"));
        assert_eq!(vocabulary.category(3), None);
    }

    #[test]
    fn test_fit_numeric_categories() {
        let cells = [Cell::from(3), Cell::from(1.0), Cell::from(1)];
        let vocabulary = CategoryVocabulary::fit(&cells, 0).unwrap();

        assert_eq!(vocabulary.categories(), &["1", "3"]);
    }

    #[test]
    fn test_fit_empty_column() {
        let cells = [Cell::Missing, Cell::Missing];
        let result = CategoryVocabulary::fit(&cells, 5);

        assert!(matches!(result, Err(PreprocessingError::EmptyColumn { column: 5 })));
    }

    #[test]
    fn test_deserialize_restores_order() {
        let vocabulary: CategoryVocabulary =
            serde_json::from_str(r#"["Yes","No","Yes"]"#).unwrap();

        assert_eq!(vocabulary.categories(), &["No", "Yes"]);
        assert_eq!(serde_json::to_string(&vocabulary).unwrap(), r#"["No","Yes"]"#);
    }
}
