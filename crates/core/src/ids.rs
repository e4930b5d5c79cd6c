use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppError;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID value.
            #[must_use]
            pub fn from_uuid(value: Uuid) -> Self {
                Self(value)
            }

            /// Returns the underlying UUID value.
            #[must_use]
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
                write!(formatter, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(value.trim()).map(Self).map_err(|error| {
                    AppError::Validation(format!("invalid {} '{value}': {error}", $label))
                })
            }
        }
    };
}

uuid_identifier!(
    /// Identifier of an employee record owned by the HR system.
    EmployeeId,
    "employee id"
);
uuid_identifier!(
    /// Identifier of one node in the organizational tree.
    OrgNodeId,
    "org node id"
);
uuid_identifier!(
    /// Identifier of a named permission bundle.
    RoleId,
    "role id"
);
uuid_identifier!(
    /// Identifier of an atomic capability.
    PermissionId,
    "permission id"
);
uuid_identifier!(
    /// Identifier of one employee placement.
    AssignmentId,
    "assignment id"
);

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{EmployeeId, OrgNodeId};

    #[test]
    fn identifiers_parse_their_display_form() {
        let employee_id = EmployeeId::new();
        let parsed = EmployeeId::from_str(employee_id.to_string().as_str());
        assert_eq!(parsed.ok(), Some(employee_id));
    }

    #[test]
    fn malformed_identifier_is_a_validation_error() {
        let parsed = OrgNodeId::from_str("not-a-uuid");
        assert!(parsed.is_err());
    }
}
