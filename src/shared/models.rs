use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::shared::schema::{
    activities, contacts, deals, organization_members, organizations, tasks, users,
};

/// Role of a user inside one organization. Ordering follows authority:
/// member < manager < admin < owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Member,
    Manager,
    Admin,
    Owner,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Manager => "manager",
            Self::Admin => "admin",
            Self::Owner => "owner",
        }
    }
}

impl FromStr for MemberRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(Self::Member),
            "manager" => Ok(Self::Manager),
            "admin" => Ok(Self::Admin),
            "owner" => Ok(Self::Owner),
            other => Err(format!("unknown member role '{other}'")),
        }
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deal outcome state. `won` and `lost` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    New,
    InProgress,
    Won,
    Lost,
}

impl DealStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::InProgress => "in_progress",
            Self::Won => "won",
            Self::Lost => "lost",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

impl FromStr for DealStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "in_progress" => Ok(Self::InProgress),
            "won" => Ok(Self::Won),
            "lost" => Ok(Self::Lost),
            other => Err(format!("unknown deal status '{other}'")),
        }
    }
}

impl fmt::Display for DealStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position in the sales funnel: qualification → proposal → negotiation → closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStage {
    Qualification,
    Proposal,
    Negotiation,
    Closed,
}

impl DealStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Qualification => "qualification",
            Self::Proposal => "proposal",
            Self::Negotiation => "negotiation",
            Self::Closed => "closed",
        }
    }

    /// Canonical funnel position, lower = earlier.
    pub fn order(&self) -> u8 {
        match self {
            Self::Qualification => 1,
            Self::Proposal => 2,
            Self::Negotiation => 3,
            Self::Closed => 4,
        }
    }

    pub fn all_in_order() -> [DealStage; 4] {
        [
            Self::Qualification,
            Self::Proposal,
            Self::Negotiation,
            Self::Closed,
        ]
    }
}

impl FromStr for DealStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "qualification" => Ok(Self::Qualification),
            "proposal" => Ok(Self::Proposal),
            "negotiation" => Ok(Self::Negotiation),
            "closed" => Ok(Self::Closed),
            other => Err(format!("unknown deal stage '{other}'")),
        }
    }
}

impl fmt::Display for DealStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Comment,
    StatusChanged,
    StageChanged,
    TaskCreated,
    System,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::StatusChanged => "status_changed",
            Self::StageChanged => "stage_changed",
            Self::TaskCreated => "task_created",
            Self::System => "system",
        }
    }
}

impl FromStr for ActivityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "comment" => Ok(Self::Comment),
            "status_changed" => Ok(Self::StatusChanged),
            "stage_changed" => Ok(Self::StageChanged),
            "task_created" => Ok(Self::TaskCreated),
            "system" => Ok(Self::System),
            other => Err(format!("unknown activity kind '{other}'")),
        }
    }
}

/// Timeline entry payload, one fixed shape per activity kind. The kind
/// column is the tag; the JSONB column stores only the variant body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActivityPayload {
    StatusChanged { from: DealStatus, to: DealStatus },
    StageChanged { from: DealStage, to: DealStage },
    Comment { text: String },
    TaskCreated {
        task_id: Uuid,
        title: String,
        due_date: Option<NaiveDate>,
    },
    System { message: String },
}

impl ActivityPayload {
    pub fn kind(&self) -> ActivityKind {
        match self {
            Self::Comment { .. } => ActivityKind::Comment,
            Self::StatusChanged { .. } => ActivityKind::StatusChanged,
            Self::StageChanged { .. } => ActivityKind::StageChanged,
            Self::TaskCreated { .. } => ActivityKind::TaskCreated,
            Self::System { .. } => ActivityKind::System,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }
}

#[derive(Debug, Clone, Queryable, Insertable, Identifiable, Selectable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable, Identifiable, Selectable, Serialize)]
#[diesel(table_name = organizations)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub default_currency: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable, Identifiable, Selectable)]
#[diesel(table_name = organization_members)]
pub struct OrganizationMember {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl OrganizationMember {
    pub fn member_role(&self) -> MemberRole {
        self.role.parse().unwrap_or(MemberRole::Member)
    }
}

#[derive(Debug, Clone, Queryable, Insertable, Identifiable, Selectable, Serialize)]
#[diesel(table_name = contacts)]
pub struct Contact {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable, Identifiable, Selectable, Serialize)]
#[diesel(table_name = deals)]
pub struct Deal {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub contact_id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub amount: BigDecimal,
    pub currency: String,
    pub status: String,
    pub stage: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deal {
    pub fn deal_status(&self) -> DealStatus {
        self.status.parse().unwrap_or(DealStatus::New)
    }

    pub fn deal_stage(&self) -> DealStage {
        self.stage.parse().unwrap_or(DealStage::Qualification)
    }
}

#[derive(Debug, Clone, Queryable, Insertable, Identifiable, Selectable, Serialize)]
#[diesel(table_name = tasks)]
pub struct Task {
    pub id: Uuid,
    pub deal_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub is_done: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable, Identifiable, Selectable, Serialize)]
#[diesel(table_name = activities)]
pub struct Activity {
    pub id: Uuid,
    pub deal_id: Uuid,
    pub author_id: Option<Uuid>,
    pub kind: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Uniform list envelope for paginated endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: i64, limit: i64, offset: i64) -> Self {
        let has_more = (offset + items.len() as i64) < total;
        Self {
            items,
            total,
            limit,
            offset,
            has_more,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_ordering_follows_authority() {
        assert!(MemberRole::Owner > MemberRole::Admin);
        assert!(MemberRole::Admin > MemberRole::Manager);
        assert!(MemberRole::Manager > MemberRole::Member);
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [
            MemberRole::Member,
            MemberRole::Manager,
            MemberRole::Admin,
            MemberRole::Owner,
        ] {
            assert_eq!(role.as_str().parse::<MemberRole>().unwrap(), role);
        }
        assert!("superuser".parse::<MemberRole>().is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(DealStatus::Won.is_terminal());
        assert!(DealStatus::Lost.is_terminal());
        assert!(!DealStatus::New.is_terminal());
        assert!(!DealStatus::InProgress.is_terminal());
    }

    #[test]
    fn stage_order_is_canonical() {
        let stages = DealStage::all_in_order();
        for pair in stages.windows(2) {
            assert!(pair[0].order() < pair[1].order());
        }
    }

    #[test]
    fn payload_kind_matches_variant() {
        let payload = ActivityPayload::StatusChanged {
            from: DealStatus::New,
            to: DealStatus::Won,
        };
        assert_eq!(payload.kind(), ActivityKind::StatusChanged);

        let value = payload.to_json();
        assert_eq!(value["from"], "new");
        assert_eq!(value["to"], "won");
    }

    #[test]
    fn paginated_has_more() {
        let page = Paginated::new(vec![1, 2, 3], 10, 3, 0);
        assert!(page.has_more);
        let last = Paginated::new(vec![1], 4, 3, 3);
        assert!(!last.has_more);
    }
}
