//! Audit dataset rows and column mapping.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::parser::Parser;
use super::source::{DataTable, DatasetSource};
use crate::error::{AllowlistError, Result};
use crate::exception::normalize_label;

/// A known dataset column and the header spellings accepted for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    ObjectId,
    DisplayName,
    ScopeObjectId,
    ScopeDisplayName,
    ScopeType,
    Role,
    OwningAppId,
    Tenant,
}

impl Column {
    const ALL: [Column; 8] = [
        Column::ObjectId,
        Column::DisplayName,
        Column::ScopeObjectId,
        Column::ScopeDisplayName,
        Column::ScopeType,
        Column::Role,
        Column::OwningAppId,
        Column::Tenant,
    ];

    /// Accepted header spellings, normalized. The first is the canonical name.
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Column::ObjectId => &["objectid", "principalid", "spnobjectid"],
            Column::DisplayName => &[
                "displayname",
                "objectname",
                "principalname",
                "principaldisplayname",
            ],
            Column::ScopeObjectId => &["scopeobjectid", "scopeid", "scope"],
            Column::ScopeDisplayName => &["scopedisplayname", "scopename"],
            Column::ScopeType => &["scopetype"],
            Column::Role => &["role", "rolename", "roledefinitionname"],
            Column::OwningAppId => &["eonid", "owningappid", "owningapplicationid"],
            Column::Tenant => &["tenant", "tenantname"],
        }
    }

    fn is_required(&self) -> bool {
        matches!(
            self,
            Column::ObjectId | Column::DisplayName | Column::ScopeType | Column::Role
        )
    }

    fn name(&self) -> &'static str {
        match self {
            Column::ObjectId => "objectId",
            Column::DisplayName => "displayName",
            Column::ScopeObjectId => "scopeObjectId",
            Column::ScopeDisplayName => "scopeDisplayName",
            Column::ScopeType => "scopeType",
            Column::Role => "role",
            Column::OwningAppId => "eonId",
            Column::Tenant => "tenant",
        }
    }

    fn for_header(header: &str) -> Option<Column> {
        Self::resolve(header).map(|(column, _)| column)
    }

    /// The column a header names, and whether it is the canonical spelling.
    fn resolve(header: &str) -> Option<(Column, bool)> {
        let normalized = normalize_label(header);
        Column::ALL.into_iter().find_map(|column| {
            let aliases = column.aliases();
            aliases
                .contains(&normalized.as_str())
                .then(|| (column, aliases[0] == normalized))
        })
    }
}

/// What a header position holds in a [`DatasetRow`].
#[derive(Debug, Clone, PartialEq, Eq)]
enum Field {
    Known(Column),
    /// Key into [`DatasetRow::extra`].
    Extra(String),
}

/// Binding of file headers to row fields.
///
/// Each known column binds to at most one header. A canonical spelling wins
/// over an alias, then the leftmost header wins. Every other header is kept
/// as an extra column; extra headers that repeat are keyed `<header>#<n>`
/// with `n` their 1-based position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    fields: Vec<Field>,
}

impl ColumnLayout {
    pub fn for_headers(headers: &[String]) -> Self {
        let resolved: Vec<Option<(Column, bool)>> =
            headers.iter().map(|h| Column::resolve(h)).collect();

        let winner = |column: Column| {
            resolved
                .iter()
                .enumerate()
                .filter_map(|(i, r)| match r {
                    Some((c, canonical)) if *c == column => Some((!canonical, i)),
                    _ => None,
                })
                .min()
                .map(|(_, i)| i)
        };
        let mut bound: Vec<Option<Column>> = vec![None; headers.len()];
        for column in Column::ALL {
            if let Some(index) = winner(column) {
                bound[index] = Some(column);
            }
        }

        let unbound_count = |header: &String| {
            headers
                .iter()
                .zip(&bound)
                .filter(|(h, b)| b.is_none() && *h == header)
                .count()
        };
        let fields = headers
            .iter()
            .zip(&bound)
            .enumerate()
            .map(|(index, (header, column))| match column {
                Some(column) => Field::Known(*column),
                None if unbound_count(header) > 1 => {
                    Field::Extra(format!("{}#{}", header, index + 1))
                }
                None => Field::Extra(header.clone()),
            })
            .collect();

        Self { fields }
    }

    fn binds(&self, column: Column) -> bool {
        self.fields.contains(&Field::Known(column))
    }

    /// Build a row from cells in header order.
    fn row(&self, values: Vec<String>) -> DatasetRow {
        let mut row = DatasetRow::default();
        for (field, value) in self.fields.iter().zip(values) {
            match field {
                Field::Known(column) => row.set(*column, value.trim().to_string()),
                Field::Extra(key) => {
                    row.extra.insert(key.clone(), value);
                }
            }
        }
        row
    }

    /// A row's cells in header order.
    pub fn values(&self, row: &DatasetRow) -> Vec<String> {
        self.fields
            .iter()
            .map(|field| match field {
                Field::Known(column) => row.get(*column).to_string(),
                Field::Extra(key) => row.extra.get(key).cloned().unwrap_or_default(),
            })
            .collect()
    }
}

/// One audited over-privileged assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetRow {
    pub object_id: String,
    pub display_name: String,
    pub scope_object_id: String,
    pub scope_display_name: String,
    pub scope_type: String,
    pub role: String,
    /// EonID of the application owning the object.
    #[serde(rename = "eonId")]
    pub owning_app_id: String,
    pub tenant: String,
    /// Columns not used for matching, in their original order.
    #[serde(flatten)]
    pub extra: IndexMap<String, String>,
}

impl DatasetRow {
    pub fn new(object_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            object_id: object_id.into(),
            display_name: display_name.into(),
            ..Self::default()
        }
    }

    pub fn with_scope(
        mut self,
        scope_type: impl Into<String>,
        scope_object_id: impl Into<String>,
        scope_display_name: impl Into<String>,
    ) -> Self {
        self.scope_type = scope_type.into();
        self.scope_object_id = scope_object_id.into();
        self.scope_display_name = scope_display_name.into();
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    pub fn with_owner(mut self, owning_app_id: impl Into<String>, tenant: impl Into<String>) -> Self {
        self.owning_app_id = owning_app_id.into();
        self.tenant = tenant.into();
        self
    }

    fn set(&mut self, column: Column, value: String) {
        match column {
            Column::ObjectId => self.object_id = value,
            Column::DisplayName => self.display_name = value,
            Column::ScopeObjectId => self.scope_object_id = value,
            Column::ScopeDisplayName => self.scope_display_name = value,
            Column::ScopeType => self.scope_type = value,
            Column::Role => self.role = value,
            Column::OwningAppId => self.owning_app_id = value,
            Column::Tenant => self.tenant = value,
        }
    }

    fn get(&self, column: Column) -> &str {
        match column {
            Column::ObjectId => &self.object_id,
            Column::DisplayName => &self.display_name,
            Column::ScopeObjectId => &self.scope_object_id,
            Column::ScopeDisplayName => &self.scope_display_name,
            Column::ScopeType => &self.scope_type,
            Column::Role => &self.role,
            Column::OwningAppId => &self.owning_app_id,
            Column::Tenant => &self.tenant,
        }
    }

    /// Values in the order of [`Dataset::headers`].
    pub fn values(&self, headers: &[String]) -> Vec<String> {
        ColumnLayout::for_headers(headers).values(self)
    }
}

/// A loaded audit dataset.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Where the rows came from, when read from a file.
    pub source: Option<DatasetSource>,
    /// Original column headers, in file order.
    pub headers: Vec<String>,
    pub rows: Vec<DatasetRow>,
}

impl Dataset {
    /// Build a dataset in memory, with the canonical column headers.
    pub fn from_rows(rows: Vec<DatasetRow>) -> Self {
        Self {
            source: None,
            headers: Column::ALL.iter().map(|c| c.name().to_string()).collect(),
            rows,
        }
    }

    /// Load a CSV/TSV dataset export.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let (table, source) = Parser::new().parse_file(path)?;
        let mut dataset = Self::from_table(table)?;
        tracing::info!(
            file = %source.file,
            rows = dataset.rows.len(),
            format = %source.format,
            "loaded dataset"
        );
        dataset.source = Some(source);
        Ok(dataset)
    }

    /// Map a parsed table onto dataset rows.
    pub fn from_table(table: DataTable) -> Result<Self> {
        let layout = ColumnLayout::for_headers(&table.headers);

        let missing: Vec<&str> = Column::ALL
            .iter()
            .filter(|c| c.is_required() && !layout.binds(**c))
            .map(|c| c.name())
            .collect();
        if !missing.is_empty() {
            return Err(AllowlistError::EmptyData(format!(
                "dataset is missing required columns: {}",
                missing.join(", ")
            )));
        }

        let rows = table.rows.into_iter().map(|values| layout.row(values)).collect();

        Ok(Self {
            source: None,
            headers: table.headers,
            rows,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
