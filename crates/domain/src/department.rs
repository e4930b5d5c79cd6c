use std::str::FromStr;

use orgauth_core::AppError;
use serde::{Deserialize, Serialize};

/// Department an org node, assignment or permission belongs to.
///
/// `All` is the organization-wide wildcard held by executive positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DepartmentCode {
    /// Wildcard meaning every department.
    #[serde(rename = "ALL")]
    All,
    /// Board and executive office.
    #[serde(rename = "EXECUTIVE")]
    Executive,
    /// Finance and accounting.
    #[serde(rename = "FINANCE")]
    Finance,
    /// Human resources.
    #[serde(rename = "HR")]
    HumanResources,
    /// Operations.
    #[serde(rename = "OPERATIONS")]
    Operations,
    /// Information technology.
    #[serde(rename = "IT")]
    Technology,
    /// Legal and compliance.
    #[serde(rename = "LEGAL")]
    Legal,
    /// Marketing.
    #[serde(rename = "MARKETING")]
    Marketing,
    /// Sales.
    #[serde(rename = "SALES")]
    Sales,
}

impl DepartmentCode {
    /// Returns a stable storage value for this department.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Executive => "EXECUTIVE",
            Self::Finance => "FINANCE",
            Self::HumanResources => "HR",
            Self::Operations => "OPERATIONS",
            Self::Technology => "IT",
            Self::Legal => "LEGAL",
            Self::Marketing => "MARKETING",
            Self::Sales => "SALES",
        }
    }

    /// Returns whether this is the organization-wide wildcard.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Returns whether an actor in this department may touch data of `other`.
    ///
    /// The wildcard covers everything; a concrete department covers itself and
    /// data explicitly tagged with the wildcard.
    #[must_use]
    pub fn covers(&self, other: Self) -> bool {
        self.is_wildcard() || other.is_wildcard() || *self == other
    }

    /// Returns all known departments, wildcard first.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[DepartmentCode] = &[
            DepartmentCode::All,
            DepartmentCode::Executive,
            DepartmentCode::Finance,
            DepartmentCode::HumanResources,
            DepartmentCode::Operations,
            DepartmentCode::Technology,
            DepartmentCode::Legal,
            DepartmentCode::Marketing,
            DepartmentCode::Sales,
        ];

        ALL
    }
}

impl FromStr for DepartmentCode {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ALL" | "*" => Ok(Self::All),
            "EXECUTIVE" => Ok(Self::Executive),
            "FINANCE" => Ok(Self::Finance),
            "HR" => Ok(Self::HumanResources),
            "OPERATIONS" => Ok(Self::Operations),
            "IT" => Ok(Self::Technology),
            "LEGAL" => Ok(Self::Legal),
            "MARKETING" => Ok(Self::Marketing),
            "SALES" => Ok(Self::Sales),
            _ => Err(AppError::Validation(format!(
                "unknown department code '{value}'"
            ))),
        }
    }
}
