//! Row mapper: semantic field → column index, resolved once per sheet.

use std::collections::HashMap;

use sadomap_core::{ColumnLayout, Field};

use crate::types::RawRow;

/// Column positions for one sheet.
///
/// Built once from the area's [`ColumnLayout`] (and the header row, for
/// header layouts) and then reused for every row of that sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    indices: HashMap<Field, usize>,
    unresolved: Vec<Field>,
}

impl ColumnMap {
    /// Resolve `layout` against `headers`.
    ///
    /// Header names match exactly after trimming; when a header appears more
    /// than once the leftmost column wins. Fields whose header is absent are
    /// recorded in [`ColumnMap::unresolved`] and read as empty.
    #[must_use]
    pub fn resolve(layout: &ColumnLayout, headers: &[String]) -> Self {
        match layout {
            ColumnLayout::Fixed { fields } => Self {
                indices: fields.iter().map(|(f, i)| (*f, *i)).collect(),
                unresolved: Vec::new(),
            },
            ColumnLayout::Headers { fields } => {
                let mut positions: HashMap<&str, usize> = HashMap::with_capacity(headers.len());
                for (idx, header) in headers.iter().enumerate() {
                    positions.entry(header.trim()).or_insert(idx);
                }

                let mut indices = HashMap::with_capacity(fields.len());
                let mut unresolved = Vec::new();
                for (field, header) in fields {
                    match positions.get(header.trim()) {
                        Some(idx) => {
                            indices.insert(*field, *idx);
                        }
                        None => unresolved.push(*field),
                    }
                }
                Self {
                    indices,
                    unresolved,
                }
            }
        }
    }

    /// Trimmed cell for `field`, or `""` when the field is unmapped or the
    /// row is too short.
    #[must_use]
    pub fn get<'r>(&self, row: &'r RawRow, field: Field) -> &'r str {
        self.indices
            .get(&field)
            .map_or("", |idx| row.cell(*idx).trim())
    }

    /// Like [`ColumnMap::get`], with blank cells as `None`.
    #[must_use]
    pub fn get_opt(&self, row: &RawRow, field: Field) -> Option<String> {
        let value = self.get(row, field);
        (!value.is_empty()).then(|| value.to_owned())
    }

    #[must_use]
    pub fn has(&self, field: Field) -> bool {
        self.indices.contains_key(&field)
    }

    /// Fields named by the layout but missing from the header row.
    #[must_use]
    pub fn unresolved(&self) -> &[Field] {
        &self.unresolved
    }
}
