//! Categorical encoding module.
//!
//! This module provides:
//! - Feature encoding (one-hot expansion, integer label codes)
//! - Target/label column encoding with inverse mapping
//! - Lexicographically ordered category vocabularies shared by both

mod categorical;
mod label;
mod vocabulary;

pub use categorical::{
    CategoricalEncoder, ColumnEncoding, Encoding, FittedEncoder, UnseenCategoryPolicy,
};
pub use label::{FittedLabelEncoder, LabelEncoder};
pub use vocabulary::CategoryVocabulary;
