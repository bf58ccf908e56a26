//! Named values a block offers to its format templates.
//!
//! A block declares its fields once; templates are checked against that
//! list when the block is built, so a typo in `{pnig}` fails at startup
//! instead of rendering garbage.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    /// Free text such as an interface name or a version string
    Text,
    /// A number, formatted with `f`/`d` specs
    Numerical,
    /// A number in 0.0..=100.0
    Percentage,
}

/// Role of a field inside the rendered text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldPurpose {
    /// The headline measurement (usage, ping)
    Value,
    /// Unit label shown next to a value ("%", "KiB/s")
    Unit,
    SecondaryValue,
    /// Exit codes and similar state
    Status,
    Other,
}

/// One placeholder a block can fill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMetadata {
    /// Placeholder name, `ping` for `{ping}`
    pub id: String,
    pub description: String,
    pub field_type: FieldType,
    pub purpose: FieldPurpose,
}

impl FieldMetadata {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        field_type: FieldType,
        purpose: FieldPurpose,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            field_type,
            purpose,
        }
    }

    /// Headline numeric field
    pub fn value(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(id, description, FieldType::Numerical, FieldPurpose::Value)
    }

    pub fn percent(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(id, description, FieldType::Percentage, FieldPurpose::Value)
    }

    pub fn text(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(id, description, FieldType::Text, FieldPurpose::Other)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.field_type, FieldType::Numerical | FieldType::Percentage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shorthands() {
        let ping = FieldMetadata::value("ping", "Round trip");
        assert!(ping.is_numeric());
        assert_eq!(ping.purpose, FieldPurpose::Value);

        assert_eq!(
            FieldMetadata::percent("usage", "CPU usage").field_type,
            FieldType::Percentage
        );

        let version = FieldMetadata::text("version", "Server version");
        assert!(!version.is_numeric());
        assert_eq!(version.purpose, FieldPurpose::Other);
    }
}
