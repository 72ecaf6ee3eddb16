//! SeaORM entity models
//!
//! Database entities for the listing document generation service

mod issuer;
mod knowledge_document;
mod listing;
mod listing_document;

pub use issuer::{
    Entity as IssuerEntity,
    Model as Issuer,
    ActiveModel as IssuerActiveModel,
    Column as IssuerColumn,
};

pub use listing::{
    Entity as ListingEntity,
    Model as Listing,
    ActiveModel as ListingActiveModel,
    Column as ListingColumn,
};

pub use listing_document::{
    section_column_names,
    Entity as ListingDocumentEntity,
    Model as ListingDocument,
    ActiveModel as ListingDocumentActiveModel,
    Column as ListingDocumentColumn,
};

pub use knowledge_document::{
    Entity as KnowledgeDocumentEntity,
    Model as KnowledgeDocument,
    ActiveModel as KnowledgeDocumentActiveModel,
    Column as KnowledgeDocumentColumn,
};
