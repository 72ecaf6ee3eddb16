//! Listing document entity - one row per (listing, document type)
//!
//! Each generatable section has a dedicated nullable TEXT column. The set of
//! section columns is derived from the entity at runtime so template
//! pre-validation stays in sync with the schema.

use sea_orm::entity::prelude::*;
use sea_orm::{IdenStatic, Iterable};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "listing_documents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub listing_id: Uuid,

    /// Document type tag, e.g. "listing_particulars"
    #[sea_orm(column_type = "Text")]
    pub document_type: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub business_description: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub risk_factors: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub use_of_proceeds: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub management_discussion: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub financial_summary: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub regulatory_compliance: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub corporate_governance: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub shareholder_information: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

/// Columns that are not section content destinations
const RESERVED_COLUMNS: &[&str] = &["id", "listing_id", "document_type", "created_at", "updated_at"];

/// Names of all section destination columns on this table
pub fn section_column_names() -> HashSet<String> {
    Column::iter()
        .map(|c| c.as_str().to_owned())
        .filter(|name| !RESERVED_COLUMNS.contains(&name.as_str()))
        .collect()
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::listing::Entity",
        from = "Column::ListingId",
        to = "super::listing::Column::Id"
    )]
    Listing,
}

impl Related<super::listing::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Listing.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
