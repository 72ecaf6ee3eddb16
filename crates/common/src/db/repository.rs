//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::pipeline::{DocumentStore, KnowledgeContext};
use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbBackend, EntityTrait, QueryFilter, Statement,
};
use uuid::Uuid;

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Listing / Issuer Operations
    // ========================================================================

    /// Find listing by ID
    pub async fn find_listing_by_id(&self, id: Uuid) -> Result<Option<Listing>> {
        ListingEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find issuer by ID
    pub async fn find_issuer_by_id(&self, id: Uuid) -> Result<Option<Issuer>> {
        IssuerEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Listing Document Operations
    // ========================================================================

    /// Find the document record for a listing and document type
    pub async fn find_listing_document(
        &self,
        listing_id: Uuid,
        document_type: &str,
    ) -> Result<Option<ListingDocument>> {
        ListingDocumentEntity::find()
            .filter(ListingDocumentColumn::ListingId.eq(listing_id))
            .filter(ListingDocumentColumn::DocumentType.eq(document_type))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Upsert generated section content into the listing's document record.
    ///
    /// All destination columns are written in one statement so a failure
    /// never leaves a partially updated row. Column names must come from the
    /// entity schema; anything else is rejected before SQL is built.
    pub async fn upsert_document_sections(
        &self,
        listing_id: Uuid,
        document_type: &str,
        entries: &[(String, String)],
    ) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let known = section_column_names();
        for (column, _) in entries {
            if !known.contains(column) {
                return Err(AppError::Internal {
                    message: format!("Unknown destination column: {}", column),
                });
            }
        }

        // Columns are interpolated into the SQL text, which is safe only
        // because of the schema check above.
        let columns: Vec<&str> = entries.iter().map(|(c, _)| c.as_str()).collect();
        let insert_columns = columns.join(", ");
        let insert_placeholders: Vec<String> =
            (0..columns.len()).map(|i| format!("${}", i + 4)).collect();
        let update_assignments: Vec<String> = columns
            .iter()
            .map(|c| format!("{} = EXCLUDED.{}", c, c))
            .collect();

        let sql = format!(
            r#"
            INSERT INTO listing_documents (id, listing_id, document_type, {}, created_at, updated_at)
            VALUES ($1, $2, $3, {}, NOW(), NOW())
            ON CONFLICT (listing_id, document_type) DO UPDATE SET
                {},
                updated_at = NOW()
            "#,
            insert_columns,
            insert_placeholders.join(", "),
            update_assignments.join(",\n                "),
        );

        let mut values: Vec<sea_orm::Value> = vec![
            Uuid::new_v4().into(),
            listing_id.into(),
            document_type.into(),
        ];
        for (_, content) in entries {
            values.push(content.clone().into());
        }

        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, &sql, values);
        use sea_orm::ConnectionTrait;
        self.write_conn().execute(stmt).await?;

        Ok(())
    }

    // ========================================================================
    // Knowledge Document Operations
    // ========================================================================

    /// Fetch knowledge documents by id, preserving the request order
    pub async fn find_knowledge_documents(&self, ids: &[Uuid]) -> Result<Vec<KnowledgeDocument>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut docs = KnowledgeDocumentEntity::find()
            .filter(KnowledgeDocumentColumn::Id.is_in(ids.to_vec()))
            .all(self.read_conn())
            .await?;

        // The database returns rows in arbitrary order; callers supplied the
        // ids in a meaningful order, so restore it.
        docs.sort_by_key(|d| ids.iter().position(|id| *id == d.id).unwrap_or(usize::MAX));

        Ok(docs)
    }
}

#[async_trait]
impl DocumentStore for Repository {
    async fn listing_exists(&self, id: Uuid) -> Result<bool> {
        Ok(self.find_listing_by_id(id).await?.is_some())
    }

    async fn issuer_exists(&self, id: Uuid) -> Result<bool> {
        Ok(self.find_issuer_by_id(id).await?.is_some())
    }

    async fn fetch_knowledge_documents(&self, ids: &[Uuid]) -> Result<Vec<KnowledgeContext>> {
        let docs = self.find_knowledge_documents(ids).await?;
        Ok(docs
            .into_iter()
            .map(|d| KnowledgeContext {
                id: d.id,
                title: d.title,
                content: d.content,
            })
            .collect())
    }

    async fn save_document_sections(
        &self,
        listing_id: Uuid,
        document_type: &str,
        entries: &[(String, String)],
    ) -> Result<()> {
        self.upsert_document_sections(listing_id, document_type, entries)
            .await
    }
}
