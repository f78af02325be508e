use crate::consts::BYTES_PER_LENGTH_OFFSET;

/// Size of the SSZ encoding of a type.
///
/// Variable-size types occupy [`BYTES_PER_LENGTH_OFFSET`] bytes in the fixed part of their parent.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Size {
    Fixed { size: usize },
    Variable { minimum_size: usize },
}

impl Size {
    #[must_use]
    pub const fn fixed_part(self) -> usize {
        match self {
            Self::Fixed { size } => size,
            Self::Variable { .. } => BYTES_PER_LENGTH_OFFSET,
        }
    }

    #[must_use]
    pub const fn minimum(self) -> usize {
        match self {
            Self::Fixed { size } => size,
            Self::Variable { minimum_size } => minimum_size,
        }
    }

    #[must_use]
    pub const fn is_variable(self) -> bool {
        matches!(self, Self::Variable { .. })
    }

    /// Size of a vector containing `length` elements of size `self`.
    #[must_use]
    pub const fn mul(self, length: usize) -> Self {
        match self {
            Self::Fixed { size } => Self::Fixed {
                size: size * length,
            },
            Self::Variable { minimum_size } => Self::Variable {
                minimum_size: (BYTES_PER_LENGTH_OFFSET + minimum_size) * length,
            },
        }
    }

    /// Size of a container with fields of the given sizes.
    #[must_use]
    pub const fn for_container(fields: &[Self]) -> Self {
        let mut fixed_part = 0;
        let mut variable_part = 0;
        let mut variable = false;
        let mut index = 0;

        while index < fields.len() {
            match fields[index] {
                Self::Fixed { size } => fixed_part += size,
                Self::Variable { minimum_size } => {
                    fixed_part += BYTES_PER_LENGTH_OFFSET;
                    variable_part += minimum_size;
                    variable = true;
                }
            }

            index += 1;
        }

        if variable {
            Self::Variable {
                minimum_size: fixed_part + variable_part,
            }
        } else {
            Self::Fixed { size: fixed_part }
        }
    }
}
