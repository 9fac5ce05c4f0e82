use std::path::Path;

use crate::{db::Store, error::AppResult, models::NewMovie};

/// Counts from one import run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub created: usize,
    pub skipped: usize,
}

/// Reads a JSON array of movie definitions
pub fn load_seed_file(path: &Path) -> anyhow::Result<Vec<NewMovie>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read catalog seed {}: {}", path.display(), e))?;
    let movies = serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("Invalid catalog seed {}: {}", path.display(), e))?;
    Ok(movies)
}

/// Adds movies to the catalog, creating genres as needed
///
/// A movie whose title and release date already exist is skipped, so the
/// same seed can be imported on every start.
pub async fn import_catalog(store: &dyn Store, movies: &[NewMovie]) -> AppResult<ImportReport> {
    let mut report = ImportReport::default();

    for movie in movies {
        if store
            .find_movie_by_title_and_date(&movie.title, movie.release_date)
            .await?
            .is_some()
        {
            report.skipped += 1;
            continue;
        }

        let mut genre_ids = Vec::with_capacity(movie.genres.len());
        for name in movie.genres.iter().map(|g| g.trim()).filter(|g| !g.is_empty()) {
            genre_ids.push(store.ensure_genre(name).await?.id);
        }
        genre_ids.sort_unstable();
        genre_ids.dedup();

        let created = store.create_movie(movie, genre_ids).await?;
        tracing::debug!(movie_id = created.id, title = %created.title, "Imported movie");
        report.created += 1;
    }

    tracing::info!(
        created = report.created,
        skipped = report.skipped,
        "Catalog import finished"
    );
    Ok(report)
}
