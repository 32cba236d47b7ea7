use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("schema has no fields")]
    Empty,
    #[error("duplicate field {0}")]
    DuplicateField(String),
    #[error("identifier field {0} is not part of the schema")]
    MissingIdField(String),
}

/// Fixed, ordered list of output fields plus the identifier column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<String>,
    id_index: usize,
}

impl Schema {
    pub fn new<S: Into<String>>(
        fields: impl IntoIterator<Item = S>,
        id_field: &str,
    ) -> Result<Arc<Self>, SchemaError> {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        if fields.is_empty() {
            return Err(SchemaError::Empty);
        }
        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.as_str()) {
                return Err(SchemaError::DuplicateField(field.clone()));
            }
        }
        let id_index = fields
            .iter()
            .position(|f| f == id_field)
            .ok_or_else(|| SchemaError::MissingIdField(id_field.to_string()))?;
        Ok(Arc::new(Self { fields, id_index }))
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn id_field(&self) -> &str {
        &self.fields[self.id_index]
    }

    pub fn index_of(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == field)
    }
}

/// One output record. Always carries exactly one cell per schema field;
/// `None` is a null value and serializes as an empty field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    schema: Arc<Schema>,
    cells: Vec<Option<String>>,
}

impl Row {
    /// An all-null row.
    pub fn empty(schema: &Arc<Schema>) -> Self {
        Self {
            schema: Arc::clone(schema),
            cells: vec![None; schema.len()],
        }
    }

    /// An all-null row with only the identifier set.
    pub fn with_id(schema: &Arc<Schema>, id: impl ToString) -> Self {
        let mut row = Self::empty(schema);
        row.cells[schema.id_index] = Some(id.to_string());
        row
    }

    /// Builds a row from `(field, value)` pairs of another layout. Fields the
    /// schema does not know are dropped; fields not supplied stay null.
    pub fn project<'a>(
        schema: &Arc<Schema>,
        pairs: impl IntoIterator<Item = (&'a str, Option<String>)>,
    ) -> Self {
        let mut row = Self::empty(schema);
        for (field, value) in pairs {
            row.set(field, value);
        }
        row
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Sets a cell by field name. Returns `false` if the field is unknown.
    pub fn set(&mut self, field: &str, value: Option<String>) -> bool {
        match self.schema.index_of(field) {
            Some(idx) => {
                self.cells[idx] = value;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.schema
            .index_of(field)
            .and_then(|idx| self.cells[idx].as_deref())
    }

    pub fn id(&self) -> Option<&str> {
        self.cells[self.schema.id_index].as_deref()
    }

    pub fn cells(&self) -> &[Option<String>] {
        &self.cells
    }

    /// Cells rendered for a CSV record.
    pub fn to_record(&self) -> Vec<&str> {
        self.cells
            .iter()
            .map(|cell| cell.as_deref().unwrap_or(""))
            .collect()
    }
}
