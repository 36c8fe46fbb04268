#![forbid(unsafe_code)]

//! Table configuration types.
//!
//! [`TableConfig`] is the all-optional initialization object consumed by
//! [`TableStore::new`](super::TableStore::new): every present value overwrites
//! the store default, every absent one keeps it. [`TableSettings`] is the
//! plain-data subset that can be written down (and, with the `serde` feature,
//! loaded from JSON or any other serde format).

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use tabula_core::{DerivedRecord, FieldDefinitions, Value};

use crate::error::TableError;

/// Table id used when none is configured.
pub const DEFAULT_TABLE_ID: &str = "AdaTable";

/// Renders the footer row from the derived (synthesized, sorted) records.
pub type FooterFn<T> = Rc<dyn Fn(&[DerivedRecord<T>]) -> Value>;

/// Active sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SortDirection {
    /// Smallest first.
    #[cfg_attr(feature = "serde", serde(rename = "asc", alias = "ascending"))]
    Ascending,
    /// Reverse of the ascending order.
    #[cfg_attr(feature = "serde", serde(rename = "desc", alias = "descending"))]
    Descending,
    /// No sorting; records keep their original order.
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "na", alias = "none"))]
    None,
}

impl SortDirection {
    /// Short name: `"asc"`, `"desc"` or `"na"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
            Self::None => "na",
        }
    }

    /// Next state of a header sort control: asc, desc, none, asc, ...
    #[must_use]
    pub const fn cycle(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::None,
            Self::None => Self::Ascending,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Ascending),
            "desc" | "descending" => Ok(Self::Descending),
            "na" | "none" | "" => Ok(Self::None),
            _ => Err(TableError::InvalidSortDirection(s.to_owned())),
        }
    }
}

/// Column-group metadata, passed through to the renderer untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColGroup {
    /// Number of columns the group spans.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub span: Option<u32>,
    /// Styling class for the group.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub class: Option<String>,
}

impl ColGroup {
    /// A group spanning `span` columns with styling class `class`.
    #[must_use]
    pub fn new(span: u32, class: impl Into<String>) -> Self {
        Self {
            span: Some(span),
            class: Some(class.into()),
        }
    }
}

/// Serializable table settings (everything but columns, records and footer).
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct TableSettings {
    /// Stable identifier used by external styling.
    pub table_id: Option<String>,
    /// Caption shown above the table.
    pub caption: Option<Value>,
    /// Column-group metadata.
    pub col_groups: Option<Vec<ColGroup>>,
    /// Key of the column to sort by.
    pub sort_field: Option<String>,
    /// Sort direction.
    pub sort_direction: Option<SortDirection>,
    /// Whether the heading row is shown.
    pub show_header: Option<bool>,
}

/// Initialization object for a [`TableStore`](super::TableStore).
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
/// use tabula_core::{FieldDefinition, FieldDefinitions, Value, numeric};
/// use tabula_runtime::{SortDirection, TableConfig, TableStore};
///
/// type Row = BTreeMap<String, Value>;
///
/// let store: TableStore<Row> = TableStore::new(
///     TableConfig::new()
///         .table_id("simple")
///         .field_defs(FieldDefinitions::new().with("b1", FieldDefinition::new("2^1").sorted_by(numeric)))
///         .sort_field("b1")
///         .sort_direction(SortDirection::Descending)
///         .show_header(true),
/// );
/// assert_eq!(store.table_id(), "simple");
/// assert!(store.show_header());
/// ```
pub struct TableConfig<T> {
    /// Stable identifier; defaults to [`DEFAULT_TABLE_ID`].
    pub table_id: Option<String>,
    /// Column definitions; defaults to none.
    pub field_defs: Option<FieldDefinitions<T>>,
    /// Base records; defaults to none.
    pub records: Option<Rc<[T]>>,
    /// Caption; defaults to none.
    pub caption: Option<Value>,
    /// Column groups; defaults to none.
    pub col_groups: Option<Vec<ColGroup>>,
    /// Sort column; defaults to `""` (no sort).
    pub sort_field: Option<String>,
    /// Sort direction; defaults to [`SortDirection::None`].
    pub sort_direction: Option<SortDirection>,
    /// Heading row visibility; defaults to `false`.
    pub show_header: Option<bool>,
    /// Footer renderer; defaults to none.
    pub footer_function: Option<FooterFn<T>>,
}

impl<T> TableConfig<T> {
    /// An empty configuration: every field takes its default.
    #[must_use]
    pub fn new() -> Self {
        Self {
            table_id: None,
            field_defs: None,
            records: None,
            caption: None,
            col_groups: None,
            sort_field: None,
            sort_direction: None,
            show_header: None,
            footer_function: None,
        }
    }

    /// Seed a configuration from serializable settings.
    #[must_use]
    pub fn from_settings(settings: TableSettings) -> Self {
        Self {
            table_id: settings.table_id,
            caption: settings.caption,
            col_groups: settings.col_groups,
            sort_field: settings.sort_field,
            sort_direction: settings.sort_direction,
            show_header: settings.show_header,
            ..Self::new()
        }
    }

    /// Set the table id.
    #[must_use]
    pub fn table_id(mut self, id: impl Into<String>) -> Self {
        self.table_id = Some(id.into());
        self
    }

    /// Set the column definitions.
    #[must_use]
    pub fn field_defs(mut self, defs: FieldDefinitions<T>) -> Self {
        self.field_defs = Some(defs);
        self
    }

    /// Set the base records.
    #[must_use]
    pub fn records(mut self, records: impl Into<Rc<[T]>>) -> Self {
        self.records = Some(records.into());
        self
    }

    /// Set the caption.
    #[must_use]
    pub fn caption(mut self, caption: impl Into<Value>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Set the column groups.
    #[must_use]
    pub fn col_groups(mut self, groups: Vec<ColGroup>) -> Self {
        self.col_groups = Some(groups);
        self
    }

    /// Set the sort column key.
    #[must_use]
    pub fn sort_field(mut self, field: impl Into<String>) -> Self {
        self.sort_field = Some(field.into());
        self
    }

    /// Set the sort direction.
    #[must_use]
    pub fn sort_direction(mut self, direction: SortDirection) -> Self {
        self.sort_direction = Some(direction);
        self
    }

    /// Show or hide the heading row.
    #[must_use]
    pub fn show_header(mut self, show: bool) -> Self {
        self.show_header = Some(show);
        self
    }

    /// Set the footer renderer.
    #[must_use]
    pub fn footer_function(
        mut self,
        footer: impl Fn(&[DerivedRecord<T>]) -> Value + 'static,
    ) -> Self {
        self.footer_function = Some(Rc::new(footer));
        self
    }
}

impl<T> Default for TableConfig<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for TableConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableConfig")
            .field("table_id", &self.table_id)
            .field("field_defs", &self.field_defs)
            .field("records", &self.records.as_ref().map(|r| r.len()))
            .field("caption", &self.caption)
            .field("col_groups", &self.col_groups)
            .field("sort_field", &self.sort_field)
            .field("sort_direction", &self.sort_direction)
            .field("show_header", &self.show_header)
            .field("footer_function", &self.footer_function.is_some())
            .finish()
    }
}
