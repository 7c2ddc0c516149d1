pub mod bucket_listing;
pub mod discord;
pub mod notifier;
pub mod s3_listing;
pub mod state_store;
