//! A named, typed metadata value attached to a file or an image.

use xisf_value::Value;

/// `id` is a colon-separated path, e.g. `Observation:Center:RA`.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub id: String,
    pub value: Value,
    pub comment: String,
}

impl Property {
    pub fn new(id: impl Into<String>, value: Value) -> Self {
        Self {
            id: id.into(),
            value,
            comment: String::new(),
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }
}
