pub mod accounts;
pub mod catalog;
pub mod filters;
pub mod import;
pub mod movie_detail;
pub mod reviews;
pub mod sessions;
pub mod watchlist;

pub use sessions::SessionKeys;
