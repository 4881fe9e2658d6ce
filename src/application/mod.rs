pub mod comments;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod likes;
pub mod listing;
pub mod pagination;
pub mod repos;
pub mod search;
pub mod sort;
