//! Typed per-box attribute columns ("extras").

use crate::error::BoxListError;

/// A column of per-box values, parallel to a box list's boxes.
///
/// Scalars are stored as `Int` or `Float`; per-box vectors (e.g. keypoints or
/// class probability rows) use `Vector`.
#[derive(Clone, Debug, PartialEq)]
pub enum Field {
    Int(Vec<i64>),
    Float(Vec<f64>),
    Vector(Vec<Vec<f64>>),
}

impl Field {
    /// Number of entries in the column.
    pub fn len(&self) -> usize {
        match self {
            Field::Int(v) => v.len(),
            Field::Float(v) => v.len(),
            Field::Vector(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Human-readable name of the column kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Field::Int(_) => "int",
            Field::Float(_) => "float",
            Field::Vector(_) => "vector",
        }
    }

    pub fn as_ints(&self) -> Option<&[i64]> {
        match self {
            Field::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_floats(&self) -> Option<&[f64]> {
        match self {
            Field::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vectors(&self) -> Option<&[Vec<f64>]> {
        match self {
            Field::Vector(v) => Some(v),
            _ => None,
        }
    }

    /// Gathers the entries at `indices`. Callers must bounds-check first.
    pub(crate) fn gather(&self, indices: &[usize]) -> Field {
        match self {
            Field::Int(v) => Field::Int(indices.iter().map(|&i| v[i]).collect()),
            Field::Float(v) => Field::Float(indices.iter().map(|&i| v[i]).collect()),
            Field::Vector(v) => Field::Vector(indices.iter().map(|&i| v[i].clone()).collect()),
        }
    }

    /// Appends `other` to this column. Both must be of the same kind.
    pub(crate) fn append(&mut self, name: &str, other: &Field) -> Result<(), BoxListError> {
        match (self, other) {
            (Field::Int(a), Field::Int(b)) => a.extend_from_slice(b),
            (Field::Float(a), Field::Float(b)) => a.extend_from_slice(b),
            (Field::Vector(a), Field::Vector(b)) => a.extend(b.iter().cloned()),
            (this, other) => {
                return Err(BoxListError::FieldType {
                    name: name.to_string(),
                    expected: this.kind(),
                    found: other.kind(),
                })
            }
        }
        Ok(())
    }

    /// Pushes the values of row `i` onto `out`, widened to `f64`.
    pub(crate) fn extend_row(&self, i: usize, out: &mut Vec<f64>) {
        match self {
            Field::Int(v) => out.push(v[i] as f64),
            Field::Float(v) => out.push(v[i]),
            Field::Vector(v) => out.extend_from_slice(&v[i]),
        }
    }
}

impl From<Vec<i64>> for Field {
    fn from(v: Vec<i64>) -> Self {
        Field::Int(v)
    }
}

impl From<Vec<f64>> for Field {
    fn from(v: Vec<f64>) -> Self {
        Field::Float(v)
    }
}

impl From<Vec<Vec<f64>>> for Field {
    fn from(v: Vec<Vec<f64>>) -> Self {
        Field::Vector(v)
    }
}
