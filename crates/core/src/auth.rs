use serde::{Deserialize, Serialize};

use crate::EmployeeId;

/// Already-authenticated caller resolved by the gateway in front of the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorIdentity {
    employee_id: EmployeeId,
    display_name: String,
    email: Option<String>,
}

impl ActorIdentity {
    /// Creates an actor identity from authenticated employee data.
    #[must_use]
    pub fn new(
        employee_id: EmployeeId,
        display_name: impl Into<String>,
        email: Option<String>,
    ) -> Self {
        Self {
            employee_id,
            display_name: display_name.into(),
            email,
        }
    }

    /// Creates the identity used by background processes such as the status sweep.
    #[must_use]
    pub fn system(employee_id: EmployeeId) -> Self {
        Self::new(employee_id, "system", None)
    }

    /// Returns the employee acting.
    #[must_use]
    pub fn employee_id(&self) -> EmployeeId {
        self.employee_id
    }

    /// Returns the display name for the current actor.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the email, if the gateway forwarded one.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the audit subject string for this actor.
    #[must_use]
    pub fn subject(&self) -> String {
        self.employee_id.to_string()
    }
}
