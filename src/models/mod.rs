pub mod movie;
pub mod rating;
pub mod user;
pub mod watchlist;

pub use movie::{mean_stars, Genre, Movie, MovieSummary, NewMovie};
pub use rating::{Rating, Review, Stars};
pub use user::{User, UserAccount};
pub use watchlist::{WatchlistChange, WatchlistEntry};
