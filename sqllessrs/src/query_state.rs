//! The editable description of one in-progress query.
//!
//! `QueryState` is mutated through small, independent operations. None of
//! them consult the catalog: a state may reference tables and columns that
//! no longer exist, and the validator is what reports it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Default number of rows a fresh query asks for.
pub const DEFAULT_ROW_LIMIT: u64 = 1000;

/// A warehouse table identified by database, schema and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub database: String,
    pub schema: String,
    pub table: String,
}

impl TableRef {
    pub fn new(
        database: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// A sibling table in the same database and schema.
    pub fn sibling(&self, table: impl Into<String>) -> Self {
        Self::new(self.database.clone(), self.schema.clone(), table)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum JoinType {
    #[default]
    #[serde(rename = "INNER JOIN")]
    Inner,
    #[serde(rename = "LEFT JOIN")]
    Left,
    #[serde(rename = "RIGHT JOIN")]
    Right,
    #[serde(rename = "FULL OUTER JOIN")]
    FullOuter,
}

impl JoinType {
    pub fn keyword(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::FullOuter => "FULL OUTER JOIN",
        }
    }
}

/// Join from the main table to another table of the same schema.
///
/// `left_column` belongs to the main table and `right_column` to
/// `target_table`. Field names on the wire follow the saved-query format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinSpec {
    #[serde(rename = "table")]
    pub target_table: String,
    #[serde(rename = "type", default)]
    pub join_type: JoinType,
    #[serde(rename = "left_col", default)]
    pub left_column: String,
    #[serde(rename = "right_col", default)]
    pub right_column: String,
}

impl JoinSpec {
    pub fn new(
        target_table: impl Into<String>,
        join_type: JoinType,
        left_column: impl Into<String>,
        right_column: impl Into<String>,
    ) -> Self {
        Self {
            target_table: target_table.into(),
            join_type,
            left_column: left_column.into(),
            right_column: right_column.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    ValueSet,
    Range,
    Pattern,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Prefix,
    Suffix,
    #[default]
    Substring,
}

/// Bounds of a range filter.
///
/// Numeric bounds equal to `0` are treated as unset, so a literal zero bound
/// cannot be expressed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RangeBounds {
    Date {
        #[serde(default)]
        from: Option<NaiveDate>,
        #[serde(default)]
        to: Option<NaiveDate>,
    },
    Numeric {
        #[serde(default)]
        min: f64,
        #[serde(default)]
        max: f64,
    },
}

/// Payload of a filter, tagged by its condition kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterValue {
    ValueSet {
        #[serde(default)]
        values: Vec<String>,
    },
    Range {
        bounds: RangeBounds,
    },
    Pattern {
        #[serde(default)]
        match_type: MatchType,
        #[serde(default)]
        value: String,
    },
    Custom {
        #[serde(default)]
        raw_expression: String,
    },
}

impl FilterValue {
    /// The payload a freshly added filter of `kind` starts with; renders no predicate.
    pub fn empty(kind: ConditionKind) -> Self {
        match kind {
            ConditionKind::ValueSet => FilterValue::ValueSet { values: Vec::new() },
            ConditionKind::Range => FilterValue::Range {
                bounds: RangeBounds::Date {
                    from: None,
                    to: None,
                },
            },
            ConditionKind::Pattern => FilterValue::Pattern {
                match_type: MatchType::default(),
                value: String::new(),
            },
            ConditionKind::Custom => FilterValue::Custom {
                raw_expression: String::new(),
            },
        }
    }

    pub fn kind(&self) -> ConditionKind {
        match self {
            FilterValue::ValueSet { .. } => ConditionKind::ValueSet,
            FilterValue::Range { .. } => ConditionKind::Range,
            FilterValue::Pattern { .. } => ConditionKind::Pattern,
            FilterValue::Custom { .. } => ConditionKind::Custom,
        }
    }

    /// Value set from picked values; blanks are dropped and duplicates keep their first position.
    pub fn value_set<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for value in values {
            let value = value.into();
            if value.trim().is_empty() || out.contains(&value) {
                continue;
            }
            out.push(value);
        }
        FilterValue::ValueSet { values: out }
    }

    /// Value set from free-typed text such as `"A, B ,C"`.
    pub fn parse_value_list(input: &str) -> Self {
        Self::value_set(input.split(',').map(str::trim))
    }

    pub fn date_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        FilterValue::Range {
            bounds: RangeBounds::Date { from, to },
        }
    }

    pub fn numeric_range(min: f64, max: f64) -> Self {
        FilterValue::Range {
            bounds: RangeBounds::Numeric { min, max },
        }
    }

    pub fn pattern(match_type: MatchType, value: impl Into<String>) -> Self {
        FilterValue::Pattern {
            match_type,
            value: value.into(),
        }
    }

    pub fn custom(raw_expression: impl Into<String>) -> Self {
        FilterValue::Custom {
            raw_expression: raw_expression.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub column: String,
    pub condition: FilterValue,
}

impl FilterSpec {
    pub fn new(column: impl Into<String>, condition: FilterValue) -> Self {
        Self {
            column: column.into(),
            condition,
        }
    }

    pub fn kind(&self) -> ConditionKind {
        self.condition.kind()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "ASC")]
    Asc,
    #[default]
    #[serde(rename = "DESC")]
    Desc,
}

impl SortDirection {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Grouping, ordering and row limit of the query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationSpec {
    #[serde(rename = "group_by")]
    pub group_by_columns: Vec<String>,
    pub sort_column: Option<String>,
    #[serde(rename = "sort_order")]
    pub sort_direction: SortDirection,
    #[serde(rename = "limit_rows")]
    pub row_limit: Option<u64>,
}

impl Default for AggregationSpec {
    fn default() -> Self {
        Self {
            group_by_columns: Vec::new(),
            sort_column: None,
            sort_direction: SortDirection::default(),
            row_limit: Some(DEFAULT_ROW_LIMIT),
        }
    }
}

impl AggregationSpec {
    pub fn with_row_limit(mut self, row_limit: Option<u64>) -> Self {
        self.row_limit = row_limit;
        self
    }

    pub fn group_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn sort_by(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.sort_column = Some(column.into());
        self.sort_direction = direction;
        self
    }
}

/// Aggregate root for one interactive session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryState {
    pub main_table: Option<TableRef>,
    pub joins: Vec<JoinSpec>,
    pub filters: Vec<FilterSpec>,
    pub aggregation: AggregationSpec,
}

impl QueryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a main table with default aggregation settings.
    pub fn for_table(table: TableRef) -> Self {
        Self {
            main_table: Some(table),
            ..Self::default()
        }
    }

    /// Select the main table. Joins and filters are kept even if they no
    /// longer fit the new table.
    pub fn set_main_table(&mut self, table: TableRef) {
        tracing::debug!(
            database = %table.database,
            schema = %table.schema,
            table = %table.table,
            "main table selected"
        );
        self.main_table = Some(table);
    }

    pub fn clear_main_table(&mut self) {
        self.main_table = None;
    }

    /// Append a filter on `column` with an empty payload of `kind`.
    pub fn add_filter(&mut self, column: impl Into<String>, kind: ConditionKind) -> usize {
        self.filters
            .push(FilterSpec::new(column, FilterValue::empty(kind)));
        self.filters.len() - 1
    }

    /// Replace the payload of the filter at `index`. Returns `false` and
    /// leaves the state untouched when `index` is out of range.
    pub fn update_filter(&mut self, index: usize, value: FilterValue) -> bool {
        match self.filters.get_mut(index) {
            Some(filter) => {
                filter.condition = value;
                true
            }
            None => {
                out_of_range("update_filter", index, self.filters.len());
                false
            }
        }
    }

    pub fn remove_filter(&mut self, index: usize) -> Option<FilterSpec> {
        if index < self.filters.len() {
            Some(self.filters.remove(index))
        } else {
            out_of_range("remove_filter", index, self.filters.len());
            None
        }
    }

    pub fn add_join(&mut self, spec: JoinSpec) -> usize {
        self.joins.push(spec);
        self.joins.len() - 1
    }

    pub fn update_join(&mut self, index: usize, spec: JoinSpec) -> bool {
        match self.joins.get_mut(index) {
            Some(join) => {
                *join = spec;
                true
            }
            None => {
                out_of_range("update_join", index, self.joins.len());
                false
            }
        }
    }

    pub fn remove_join(&mut self, index: usize) -> Option<JoinSpec> {
        if index < self.joins.len() {
            Some(self.joins.remove(index))
        } else {
            out_of_range("remove_join", index, self.joins.len());
            None
        }
    }

    pub fn update_aggregation(&mut self, spec: AggregationSpec) {
        self.aggregation = spec;
    }

    /// Forget everything, including the main table.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn out_of_range(op: &'static str, index: usize, len: usize) {
    tracing::warn!(op, index, len, "index out of range, ignoring mutation");
}
