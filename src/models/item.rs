use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Whether an item was lost or found by the reporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Lost,
    Found,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Lost => "lost",
            ItemKind::Found => "found",
        }
    }
}

impl FromStr for ItemKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lost" => Ok(ItemKind::Lost),
            "found" => Ok(ItemKind::Found),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of an item. Only the owner may move it between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Active,
    Resolved,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Active => "active",
            ItemStatus::Resolved => "resolved",
        }
    }
}

impl FromStr for ItemStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ItemStatus::Active),
            "resolved" => Ok(ItemStatus::Resolved),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed category set for item posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Electronics,
    Clothing,
    Accessories,
    Documents,
    Keys,
    Books,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Electronics => "Electronics",
            Category::Clothing => "Clothing",
            Category::Accessories => "Accessories",
            Category::Documents => "Documents",
            Category::Keys => "Keys",
            Category::Books => "Books",
            Category::Other => "Other",
        }
    }
}

impl FromStr for Category {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Electronics" => Ok(Category::Electronics),
            "Clothing" => Ok(Category::Clothing),
            "Accessories" => Ok(Category::Accessories),
            "Documents" => Ok(Category::Documents),
            "Keys" => Ok(Category::Keys),
            "Books" => Ok(Category::Books),
            "Other" => Ok(Category::Other),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One item row joined with the live owner projection (name/email/phone
/// fetched from the users table at query time, distinct from the frozen
/// contact_* snapshot taken at creation).
#[derive(Debug, Clone, FromRow)]
pub struct ItemRecord {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub kind: String,
    pub location: String,
    pub date: NaiveDate,
    pub image: Option<String>,
    pub contact_name: String,
    pub contact_phone: String,
    pub contact_email: String,
    pub status: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner_name: String,
    pub owner_email: String,
    pub owner_phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: String,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerProjection {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Wire shape for an item, matching the JSON the clients consume.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub kind: String,
    pub location: String,
    pub date: NaiveDate,
    pub image: Option<String>,
    pub contact_info: ContactInfo,
    pub status: String,
    pub owner: OwnerProjection,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ItemRecord> for ItemResponse {
    fn from(r: ItemRecord) -> Self {
        ItemResponse {
            id: r.id,
            title: r.title,
            description: r.description,
            category: r.category,
            kind: r.kind,
            location: r.location,
            date: r.date,
            image: r.image,
            contact_info: ContactInfo {
                name: r.contact_name,
                phone: r.contact_phone,
                email: r.contact_email,
            },
            status: r.status,
            owner: OwnerProjection {
                id: r.owner_id,
                name: r.owner_name,
                email: r.owner_email,
                phone: r.owner_phone,
            },
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}
