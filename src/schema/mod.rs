//! Entity kinds and per-kind column tables.
//!
//! The dashboard's original behavior keyed widget choice and coercion off
//! ad-hoc string matches on column names. Here that is a closed lookup: each
//! [`EntityKind`] owns a [`TargetSchema`] mapping column name to
//! `{widget, coercion, required}`, built once at startup and shared.
//!
//! Field-level validation rules (required set, unique column) are only
//! declared for [`EntityKind::Students`]; other kinds bulk-insert with type
//! coercion alone.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

// =============================================================================
// Entity Kind
// =============================================================================

/// A named category of records with its own schema and backing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Students,
    Educators,
    Employees,
    Courses,
    Centers,
    Programs,
}

impl EntityKind {
    /// Parse a kind from a request path segment or CLI argument.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "students" | "student" => Some(Self::Students),
            "educators" | "educator" => Some(Self::Educators),
            "employees" | "employee" => Some(Self::Employees),
            "courses" | "course" => Some(Self::Courses),
            "centers" | "center" => Some(Self::Centers),
            "programs" | "program" => Some(Self::Programs),
            _ => None,
        }
    }

    /// Backing table name in the hosted store.
    pub fn table(&self) -> &'static str {
        match self {
            Self::Students => "students",
            Self::Educators => "educators",
            Self::Employees => "employees",
            Self::Courses => "courses",
            Self::Centers => "centers",
            Self::Programs => "programs",
        }
    }

    /// All kinds, in dashboard navigation order.
    pub fn all() -> &'static [EntityKind] {
        &[
            Self::Centers,
            Self::Programs,
            Self::Students,
            Self::Educators,
            Self::Employees,
            Self::Courses,
        ]
    }

    /// The column table for this kind.
    pub fn schema(&self) -> &'static TargetSchema {
        match self {
            Self::Students => &STUDENTS,
            Self::Educators => &EDUCATORS,
            Self::Employees => &EMPLOYEES,
            Self::Courses => &COURSES,
            Self::Centers => &CENTERS,
            Self::Programs => &PROGRAMS,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}

// =============================================================================
// Column Specs
// =============================================================================

/// How a column's raw text is normalized before persisting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coercion {
    /// Pass through unchanged.
    Text,
    /// Parse as a number; unparseable values pass through.
    Numeric,
    /// Bracketed list, comma-separated list, or single value.
    List,
    /// Calendar date/time, canonicalized to RFC 3339.
    Date,
}

/// Which form widget the dashboard renders for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Widget {
    Text,
    LongText,
    Email,
    Number,
    Date,
    MultiSelect,
    /// Foreign reference to another kind (center, program).
    Reference,
}

/// One expected column of an entity kind.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpec {
    pub name: &'static str,
    pub widget: Widget,
    pub coercion: Coercion,
    pub required: bool,
}

impl ColumnSpec {
    const fn new(name: &'static str, widget: Widget, coercion: Coercion, required: bool) -> Self {
        Self { name, widget, coercion, required }
    }
}

// =============================================================================
// Target Schema
// =============================================================================

/// The fixed, entity-kind-specific column table.
///
/// Immutable after startup; unknown CSV columns are passed through as extra
/// record fields and treated as [`Coercion::Text`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSchema {
    pub kind: EntityKind,
    pub columns: Vec<ColumnSpec>,
    /// Designated unique-identifier column, if this kind has one.
    pub unique_column: Option<&'static str>,
    /// Timestamp column stamped at import time when absent.
    pub created_column: &'static str,
}

impl TargetSchema {
    /// Look up a column spec by name.
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Columns that must be present and non-blank.
    pub fn required_columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter().filter(|c| c.required)
    }

    /// Columns rendered with an email widget (each gets the format rule).
    pub fn email_columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter().filter(|c| c.widget == Widget::Email)
    }

    /// Columns designated numeric.
    pub fn numeric_columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter().filter(|c| c.coercion == Coercion::Numeric)
    }

    /// Coercion kind for a column; unknown columns pass through as text.
    pub fn coercion_for(&self, name: &str) -> Coercion {
        self.column(name).map(|c| c.coercion).unwrap_or(Coercion::Text)
    }

    /// Whether this kind carries field-level validation rules at all.
    pub fn has_field_rules(&self) -> bool {
        self.unique_column.is_some() || self.columns.iter().any(|c| c.required)
    }
}

// =============================================================================
// Static Registry
// =============================================================================

static STUDENTS: Lazy<TargetSchema> = Lazy::new(|| TargetSchema {
    kind: EntityKind::Students,
    columns: vec![
        ColumnSpec::new("student_id", Widget::Text, Coercion::Text, false),
        ColumnSpec::new("first_name", Widget::Text, Coercion::Text, true),
        ColumnSpec::new("last_name", Widget::Text, Coercion::Text, true),
        ColumnSpec::new("email", Widget::Email, Coercion::Text, true),
        ColumnSpec::new("guardian_email", Widget::Email, Coercion::Text, false),
        ColumnSpec::new("program_id", Widget::Reference, Coercion::Text, true),
        ColumnSpec::new("center_id", Widget::Reference, Coercion::Text, true),
        ColumnSpec::new("grade_level", Widget::Number, Coercion::Numeric, false),
        ColumnSpec::new("class_days", Widget::MultiSelect, Coercion::List, false),
        ColumnSpec::new("date_of_birth", Widget::Date, Coercion::Date, false),
        ColumnSpec::new("enrolled_on", Widget::Date, Coercion::Date, false),
        ColumnSpec::new("notes", Widget::LongText, Coercion::Text, false),
        ColumnSpec::new("created_at", Widget::Date, Coercion::Date, false),
    ],
    unique_column: Some("student_id"),
    created_column: "created_at",
});

static EDUCATORS: Lazy<TargetSchema> = Lazy::new(|| TargetSchema {
    kind: EntityKind::Educators,
    columns: vec![
        ColumnSpec::new("educator_id", Widget::Text, Coercion::Text, false),
        ColumnSpec::new("first_name", Widget::Text, Coercion::Text, false),
        ColumnSpec::new("last_name", Widget::Text, Coercion::Text, false),
        ColumnSpec::new("email", Widget::Email, Coercion::Text, false),
        ColumnSpec::new("subjects", Widget::MultiSelect, Coercion::List, false),
        ColumnSpec::new("program_id", Widget::Reference, Coercion::Text, false),
        ColumnSpec::new("center_id", Widget::Reference, Coercion::Text, false),
        ColumnSpec::new("hired_on", Widget::Date, Coercion::Date, false),
        ColumnSpec::new("created_at", Widget::Date, Coercion::Date, false),
    ],
    unique_column: None,
    created_column: "created_at",
});

static EMPLOYEES: Lazy<TargetSchema> = Lazy::new(|| TargetSchema {
    kind: EntityKind::Employees,
    columns: vec![
        ColumnSpec::new("employee_id", Widget::Text, Coercion::Text, false),
        ColumnSpec::new("first_name", Widget::Text, Coercion::Text, false),
        ColumnSpec::new("last_name", Widget::Text, Coercion::Text, false),
        ColumnSpec::new("email", Widget::Email, Coercion::Text, false),
        ColumnSpec::new("role", Widget::Text, Coercion::Text, false),
        ColumnSpec::new("salary", Widget::Number, Coercion::Numeric, false),
        ColumnSpec::new("center_id", Widget::Reference, Coercion::Text, false),
        ColumnSpec::new("hired_on", Widget::Date, Coercion::Date, false),
        ColumnSpec::new("created_at", Widget::Date, Coercion::Date, false),
    ],
    unique_column: None,
    created_column: "created_at",
});

static COURSES: Lazy<TargetSchema> = Lazy::new(|| TargetSchema {
    kind: EntityKind::Courses,
    columns: vec![
        ColumnSpec::new("course_id", Widget::Text, Coercion::Text, false),
        ColumnSpec::new("name", Widget::Text, Coercion::Text, false),
        ColumnSpec::new("program_id", Widget::Reference, Coercion::Text, false),
        ColumnSpec::new("schedule_days", Widget::MultiSelect, Coercion::List, false),
        ColumnSpec::new("capacity", Widget::Number, Coercion::Numeric, false),
        ColumnSpec::new("starts_on", Widget::Date, Coercion::Date, false),
        ColumnSpec::new("created_at", Widget::Date, Coercion::Date, false),
    ],
    unique_column: None,
    created_column: "created_at",
});

static CENTERS: Lazy<TargetSchema> = Lazy::new(|| TargetSchema {
    kind: EntityKind::Centers,
    columns: vec![
        ColumnSpec::new("center_id", Widget::Text, Coercion::Text, false),
        ColumnSpec::new("name", Widget::Text, Coercion::Text, false),
        ColumnSpec::new("address", Widget::LongText, Coercion::Text, false),
        ColumnSpec::new("created_at", Widget::Date, Coercion::Date, false),
    ],
    unique_column: None,
    created_column: "created_at",
});

static PROGRAMS: Lazy<TargetSchema> = Lazy::new(|| TargetSchema {
    kind: EntityKind::Programs,
    columns: vec![
        ColumnSpec::new("program_id", Widget::Text, Coercion::Text, false),
        ColumnSpec::new("name", Widget::Text, Coercion::Text, false),
        ColumnSpec::new("center_id", Widget::Reference, Coercion::Text, false),
        ColumnSpec::new("created_at", Widget::Date, Coercion::Date, false),
    ],
    unique_column: None,
    created_column: "created_at",
});

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_name() {
        assert_eq!(EntityKind::from_name("students"), Some(EntityKind::Students));
        assert_eq!(EntityKind::from_name("Student"), Some(EntityKind::Students));
        assert_eq!(EntityKind::from_name("  programs "), Some(EntityKind::Programs));
        assert_eq!(EntityKind::from_name("invoices"), None);
    }

    #[test]
    fn test_students_required_set() {
        let schema = EntityKind::Students.schema();
        let required: Vec<&str> = schema.required_columns().map(|c| c.name).collect();
        assert_eq!(
            required,
            vec!["first_name", "last_name", "email", "program_id", "center_id"]
        );
        assert_eq!(schema.unique_column, Some("student_id"));
    }

    #[test]
    fn test_students_email_columns() {
        let schema = EntityKind::Students.schema();
        let emails: Vec<&str> = schema.email_columns().map(|c| c.name).collect();
        assert_eq!(emails, vec!["email", "guardian_email"]);
    }

    #[test]
    fn test_only_students_carry_field_rules() {
        for kind in EntityKind::all() {
            let expected = *kind == EntityKind::Students;
            assert_eq!(kind.schema().has_field_rules(), expected, "kind {kind}");
        }
    }

    #[test]
    fn test_unknown_column_passes_through_as_text() {
        let schema = EntityKind::Students.schema();
        assert_eq!(schema.coercion_for("t_shirt_size"), Coercion::Text);
        assert_eq!(schema.coercion_for("grade_level"), Coercion::Numeric);
    }
}
