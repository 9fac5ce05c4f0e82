//! Page view-models.
//!
//! One struct per page, built from service results and serialized as the
//! response body. They carry no query logic of their own.

use serde::Serialize;

use crate::{
    models::{Movie, MovieSummary, Rating, Review, User},
    services::{
        catalog::{Page, PAGE_SIZE},
        filters::ListingParams,
        movie_detail::MovieDetail,
    },
};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PageInfo {
    pub number: i64,
    pub num_pages: i64,
    pub total: i64,
    pub page_size: i64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> From<&Page<T>> for PageInfo {
    fn from(page: &Page<T>) -> Self {
        Self {
            number: page.number,
            num_pages: page.num_pages,
            total: page.total,
            page_size: PAGE_SIZE,
            has_next: page.has_next(),
            has_previous: page.has_previous(),
        }
    }
}

/// `GET /`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MovieListPage {
    pub movies: Vec<MovieSummary>,
    pub page: PageInfo,
    /// Active filters, echoed for building links to other pages
    pub filters: ListingParams,
    pub top_picks_this_week: Vec<MovieSummary>,
    pub viewer: Option<User>,
}

impl MovieListPage {
    pub fn new(
        page: Page<MovieSummary>,
        params: &ListingParams,
        top_picks_this_week: Vec<MovieSummary>,
        viewer: Option<User>,
    ) -> Self {
        let info = PageInfo::from(&page);
        Self {
            movies: page.items,
            page: info,
            filters: ListingParams {
                page: None,
                ..params.clone()
            },
            top_picks_this_week,
            viewer,
        }
    }
}

/// Editable review form, pre-filled with the viewer's existing review
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ReviewFormView {
    pub stars: Option<i32>,
    pub comment: Option<String>,
}

impl From<Option<Rating>> for ReviewFormView {
    fn from(rating: Option<Rating>) -> Self {
        match rating {
            Some(rating) => Self {
                stars: Some(rating.stars),
                comment: rating.comment,
            },
            None => Self::default(),
        }
    }
}

/// `GET /movies/{id}/`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MovieDetailPage {
    pub movie: Movie,
    pub reviews: Vec<Review>,
    /// `null` when the movie has no reviews yet
    pub average_rating: Option<f64>,
    pub review_count: usize,
    pub in_watchlist: bool,
    /// `null` for anonymous visitors
    pub review_form: Option<ReviewFormView>,
}

impl From<MovieDetail> for MovieDetailPage {
    fn from(detail: MovieDetail) -> Self {
        let (in_watchlist, review_form) = match detail.viewer {
            Some(viewer) => (
                viewer.in_watchlist,
                Some(ReviewFormView::from(viewer.own_rating)),
            ),
            None => (false, None),
        };
        Self {
            review_count: detail.reviews.len(),
            movie: detail.movie,
            reviews: detail.reviews,
            average_rating: detail.average_rating,
            in_watchlist,
            review_form,
        }
    }
}

/// `GET /watchlist/`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WatchlistPage {
    pub movies: Vec<MovieSummary>,
    pub count: usize,
}

impl From<Vec<MovieSummary>> for WatchlistPage {
    fn from(movies: Vec<MovieSummary>) -> Self {
        Self {
            count: movies.len(),
            movies,
        }
    }
}

/// `GET /login/`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LoginPage {
    pub next: Option<String>,
}
