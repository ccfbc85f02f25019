use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Category, ItemKind, ItemRecord, ItemStatus};
use crate::storage::{check_image, generate_filename, ImageStore};

/// Columns selected for every item read, including the live owner projection.
const ITEM_COLUMNS: &str = "i.id, i.title, i.description, i.category, i.kind, i.location, \
     i.date, i.image, i.contact_name, i.contact_phone, i.contact_email, i.status, \
     i.owner_id, i.created_at, i.updated_at, \
     u.name AS owner_name, u.email AS owner_email, u.phone AS owner_phone";

/// Optional narrowing for the public listing.
#[derive(Debug, Default, Clone)]
pub struct ItemFilter {
    pub kind: Option<ItemKind>,
    pub category: Option<Category>,
    pub search: Option<String>,
}

/// Raw creation fields as they arrive from the multipart form.
#[derive(Debug, Default)]
pub struct NewItemParams {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub kind: Option<String>,
    pub location: Option<String>,
    pub date: Option<String>,
}

/// A validated item submission, safe to persist.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub kind: ItemKind,
    pub location: String,
    pub date: NaiveDate,
}

/// Image attachment carried alongside a creation request.
#[derive(Debug)]
pub struct UploadedImage {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

fn required<'a>(value: &'a Option<String>, field: &str) -> AppResult<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::Validation(format!("{} is required", field))),
    }
}

/// Check every required field and parse the enumerated ones before anything
/// touches the store. Titles are trimmed here.
pub fn validate_new_item(params: &NewItemParams) -> AppResult<NewItem> {
    let title = required(&params.title, "title")?;
    let description = required(&params.description, "description")?;
    let category = required(&params.category, "category")?;
    let kind = required(&params.kind, "kind")?;
    let location = required(&params.location, "location")?;
    let date = required(&params.date, "date")?;

    let category = Category::from_str(category).map_err(|_| {
        AppError::Validation(
            "category must be one of Electronics, Clothing, Accessories, Documents, Keys, Books, Other"
                .to_string(),
        )
    })?;
    let kind = ItemKind::from_str(kind)
        .map_err(|_| AppError::Validation("kind must be 'lost' or 'found'".to_string()))?;
    let date = parse_event_date(date)
        .ok_or_else(|| AppError::Validation("date must be a valid calendar date".to_string()))?;

    Ok(NewItem {
        title: title.to_string(),
        description: description.to_string(),
        category,
        kind,
        location: location.to_string(),
        date,
    })
}

fn parse_event_date(s: &str) -> Option<NaiveDate> {
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    // Clients sometimes send a full RFC 3339 timestamp for the date picker value
    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.date_naive())
}

/// Escape LIKE wildcards so user input only ever matches as a literal substring.
pub fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if c == '\\' || c == '%' || c == '_' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[derive(Clone)]
pub struct ItemsService {
    pool: PgPool,
    store: Arc<dyn ImageStore>,
}

impl ItemsService {
    pub fn new(pool: PgPool, store: Arc<dyn ImageStore>) -> Self {
        Self { pool, store }
    }

    /// Active items, newest first, optionally narrowed by kind, category, and
    /// a case-insensitive substring search over title, description, location.
    pub async fn list(&self, filter: &ItemFilter) -> AppResult<Vec<ItemRecord>> {
        let mut conditions = vec!["i.status = 'active'".to_string()];
        let mut param_idx = 1u32;

        let kind_filter = filter.kind.map(|k| {
            conditions.push(format!("i.kind = ${}", param_idx));
            param_idx += 1;
            k.as_str()
        });

        let category_filter = filter.category.map(|c| {
            conditions.push(format!("i.category = ${}", param_idx));
            param_idx += 1;
            c.as_str()
        });

        let search_filter = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                conditions.push(format!(
                    "(i.title ILIKE ${n} OR i.description ILIKE ${n} OR i.location ILIKE ${n})",
                    n = param_idx
                ));
                format!("%{}%", escape_like(s))
            });

        let sql = format!(
            "SELECT {} FROM items i JOIN users u ON u.id = i.owner_id \
             WHERE {} ORDER BY i.created_at DESC",
            ITEM_COLUMNS,
            conditions.join(" AND ")
        );

        let mut query = sqlx::query_as::<_, ItemRecord>(&sql);
        if let Some(v) = kind_filter {
            query = query.bind(v);
        }
        if let Some(v) = category_filter {
            query = query.bind(v);
        }
        if let Some(v) = search_filter {
            query = query.bind(v);
        }

        Ok(query.fetch_all(&self.pool).await?)
    }

    /// Single item by id, any status.
    pub async fn get(&self, id: Uuid) -> AppResult<ItemRecord> {
        let sql = format!(
            "SELECT {} FROM items i JOIN users u ON u.id = i.owner_id WHERE i.id = $1",
            ITEM_COLUMNS
        );
        sqlx::query_as::<_, ItemRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Item not found".to_string()))
    }

    /// Everything the caller has posted, any status, newest first.
    pub async fn list_mine(&self, owner_id: Uuid) -> AppResult<Vec<ItemRecord>> {
        let sql = format!(
            "SELECT {} FROM items i JOIN users u ON u.id = i.owner_id \
             WHERE i.owner_id = $1 ORDER BY i.created_at DESC",
            ITEM_COLUMNS
        );
        Ok(sqlx::query_as::<_, ItemRecord>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Persist a new item for the caller. The contact fields are copied from
    /// the caller's current profile and frozen on the row. An attached image
    /// is staged in the blob store before the insert; if the insert fails the
    /// staged blob is removed again.
    pub async fn create(
        &self,
        owner_id: Uuid,
        params: &NewItemParams,
        image: Option<UploadedImage>,
    ) -> AppResult<ItemRecord> {
        let item = validate_new_item(params)?;

        let contact: Option<(String, String, String)> =
            sqlx::query_as("SELECT name, phone, email FROM users WHERE id = $1")
                .bind(owner_id)
                .fetch_optional(&self.pool)
                .await?;
        let (contact_name, contact_phone, contact_email) =
            contact.ok_or_else(|| AppError::Unauthorized("Unknown user".to_string()))?;

        let stored_image = match image {
            Some(upload) => {
                check_image(&upload.filename, &upload.content_type, upload.data.len())?;
                let filename = generate_filename(&upload.filename);
                self.store.save(&filename, &upload.data).await?;
                Some(filename)
            }
            None => None,
        };

        let inserted: Result<(Uuid,), sqlx::Error> = sqlx::query_as(
            "INSERT INTO items (title, description, category, kind, location, date, image, \
             contact_name, contact_phone, contact_email, status, owner_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'active', $11) \
             RETURNING id",
        )
        .bind(&item.title)
        .bind(&item.description)
        .bind(item.category.as_str())
        .bind(item.kind.as_str())
        .bind(&item.location)
        .bind(item.date)
        .bind(stored_image.as_deref())
        .bind(&contact_name)
        .bind(&contact_phone)
        .bind(&contact_email)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await;

        let (id,) = match inserted {
            Ok(row) => row,
            Err(e) => {
                if let Some(filename) = &stored_image {
                    if let Err(cleanup) = self.store.delete(filename).await {
                        tracing::warn!("Failed to remove staged image {}: {}", filename, cleanup);
                    }
                }
                return Err(e.into());
            }
        };

        tracing::info!("Created item {} for user {}", id, owner_id);
        self.get(id).await
    }

    /// Flip an item between active and resolved. The owner filter doubles as
    /// the existence check: a mismatch is reported as NotFound so non-owners
    /// cannot probe for other users' records.
    pub async fn update_status(
        &self,
        id: Uuid,
        owner_id: Uuid,
        status: ItemStatus,
    ) -> AppResult<ItemRecord> {
        let updated: Option<(Uuid,)> = sqlx::query_as(
            "UPDATE items SET status = $1, updated_at = NOW() \
             WHERE id = $2 AND owner_id = $3 RETURNING id",
        )
        .bind(status.as_str())
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        if updated.is_none() {
            return Err(AppError::NotFound("Item not found".to_string()));
        }
        self.get(id).await
    }

    /// Remove an item. Same merged NotFound policy as update_status. The
    /// associated blob is deleted after the row, best-effort only.
    pub async fn delete(&self, id: Uuid, owner_id: Uuid) -> AppResult<()> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT image FROM items WHERE id = $1 AND owner_id = $2")
                .bind(id)
                .bind(owner_id)
                .fetch_optional(&self.pool)
                .await?;
        let (image,) = row.ok_or_else(|| AppError::NotFound("Item not found".to_string()))?;

        let rows_affected = sqlx::query("DELETE FROM items WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if rows_affected == 0 {
            return Err(AppError::NotFound("Item not found".to_string()));
        }

        if let Some(filename) = image {
            if let Err(e) = self.store.delete(&filename).await {
                tracing::warn!("Failed to delete image {} for item {}: {}", filename, id, e);
            }
        }

        tracing::info!("Deleted item {} for user {}", id, owner_id);
        Ok(())
    }
}
