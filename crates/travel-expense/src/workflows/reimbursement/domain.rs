use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::allowance::EstimatedExpenses;

/// Money in minor currency units.
pub type Amount = i64;

/// Identifier issued by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

record_id!(
    /// Identifier of a business-trip application row.
    BusinessTripId
);
record_id!(
    /// Identifier of an expense application row.
    ExpenseApplicationId
);
record_id!(ExpenseItemId);
record_id!(RegulationId);

/// Workflow role attached to a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Approver,
    Admin,
}

impl Role {
    /// Approvers and admins decide pending applications.
    pub const fn can_decide(self) -> bool {
        matches!(self, Role::Approver | Role::Admin)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Approver => "approver",
            Role::Admin => "admin",
        }
    }
}

/// Profile supplied by the identity collaborator; read-only to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub full_name: Option<String>,
    pub company_name: Option<String>,
    pub position: Option<String>,
    pub department: Option<String>,
    pub role: Role,
}

/// Position-derived reimbursement class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Executive,
    Manager,
    General,
}

impl Tier {
    pub const fn label(self) -> &'static str {
        match self {
            Tier::Executive => "executive",
            Tier::Manager => "manager",
            Tier::General => "general",
        }
    }
}

/// Per-diem amounts keyed by tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierRates {
    pub executive: Amount,
    pub manager: Amount,
    pub general: Amount,
}

impl TierRates {
    pub const fn rate(&self, tier: Tier) -> Amount {
        match tier {
            Tier::Executive => self.executive,
            Tier::Manager => self.manager,
            Tier::General => self.general,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegulationStatus {
    Draft,
    Active,
    Archived,
}

/// Company travel policy. At most one regulation per company is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelRegulation {
    pub id: RegulationId,
    pub company_id: String,
    pub company_name: String,
    pub version: String,
    pub status: RegulationStatus,
    pub domestic_allowance: TierRates,
    pub overseas_allowance: TierRates,
    /// Domestic/overseas boundary in kilometres. Not read by the calculator.
    pub distance_threshold: u32,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle state shared by trip and expense applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
    Returned,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Draft => "draft",
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Returned => "returned",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, ApplicationStatus::Approved | ApplicationStatus::Rejected)
    }

    /// The owner may edit or (re)submit.
    pub const fn is_owner_editable(self) -> bool {
        matches!(self, ApplicationStatus::Draft | ApplicationStatus::Returned)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Status and decision columns common to both application kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalTrail {
    pub status: ApplicationStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approver_id: Option<UserId>,
    pub approval_comment: Option<String>,
}

impl ApprovalTrail {
    pub const fn draft() -> Self {
        Self {
            status: ApplicationStatus::Draft,
            submitted_at: None,
            approved_at: None,
            approver_id: None,
            approval_comment: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessTripApplication {
    pub id: BusinessTripId,
    pub user_id: UserId,
    pub title: String,
    pub purpose: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(flatten)]
    pub estimate: EstimatedExpenses,
    #[serde(flatten)]
    pub approval: ApprovalTrail,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Marker for the two-phase expense creation protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemsState {
    /// Application row written, item rows not yet confirmed.
    PendingItems,
    #[default]
    Attached,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseApplication {
    pub id: ExpenseApplicationId,
    pub user_id: UserId,
    pub title: String,
    pub total_amount: Amount,
    #[serde(flatten)]
    pub approval: ApprovalTrail,
    #[serde(default)]
    pub items_state: ItemsState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    #[serde(alias = "交通費")]
    Transportation,
    #[serde(alias = "宿泊費")]
    Lodging,
    #[serde(alias = "日当")]
    PerDiem,
    #[serde(alias = "雑費")]
    Miscellaneous,
}

/// Versioned, schema-tagged receipt recognition output. Opaque to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionPayload {
    pub schema: String,
    pub version: u32,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseItem {
    pub id: ExpenseItemId,
    pub expense_application_id: ExpenseApplicationId,
    pub category: ExpenseCategory,
    pub date: NaiveDate,
    pub amount: Amount,
    pub description: String,
    pub receipt_url: Option<String>,
    pub ocr_data: Option<RecognitionPayload>,
    pub created_at: DateTime<Utc>,
}

/// Owner-supplied trip fields. Dates stay optional until the form is complete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripDraft {
    pub title: String,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub destination: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Line item as submitted with a new expense application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseItemDraft {
    pub category: ExpenseCategory,
    pub date: NaiveDate,
    pub amount: Amount,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub receipt_url: Option<String>,
    #[serde(default)]
    pub ocr_data: Option<RecognitionPayload>,
}

/// Admin-supplied fields for a new regulation version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegulationDraft {
    pub version: String,
    pub domestic_allowance: TierRates,
    pub overseas_allowance: TierRates,
    pub distance_threshold: u32,
}
