use serde::{Deserialize, Serialize};

/// A finite enumerated sort, e.g. a control-mode domain `{off, on}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumSort {
    pub name: String,
    pub variants: Vec<String>,
}

impl EnumSort {
    pub fn new<I, V>(name: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }

    /// Position of `variant` within the domain.
    pub fn index_of(&self, variant: &str) -> Option<usize> {
        self.variants.iter().position(|v| v == variant)
    }
}

/// SMT sorts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SmtSort {
    Bool,
    Int,
    /// Fixed-width bit-vector; arithmetic wraps and comparisons are unsigned.
    BitVec(u32),
    Enum(EnumSort),
}

impl std::fmt::Display for SmtSort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SmtSort::Bool => write!(f, "Bool"),
            SmtSort::Int => write!(f, "Int"),
            SmtSort::BitVec(width) => write!(f, "(_ BitVec {width})"),
            SmtSort::Enum(sort) => write!(f, "{}", sort.name),
        }
    }
}
