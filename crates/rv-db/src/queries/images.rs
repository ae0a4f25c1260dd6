//! Generated image operations.

use rusqlite::Connection;
use rv_core::{Error, ImageId, Result, VideoId};

use crate::models::{Image, VideoImage};

const COLS: &str = "id, path, width, height, created_at";

/// Create a new image record.
pub fn create_image(conn: &Connection, path: &str, width: i64, height: i64) -> Result<Image> {
    let id = ImageId::new();
    let created_at = crate::now();

    conn.execute(
        "INSERT INTO images (id, path, width, height, created_at) VALUES (?1,?2,?3,?4,?5)",
        rusqlite::params![id.to_string(), path, width, height, created_at],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(Image {
        id,
        path: path.to_string(),
        width,
        height,
        created_at,
    })
}

/// Get an image by ID.
pub fn get_image(conn: &Connection, id: ImageId) -> Result<Option<Image>> {
    let q = format!("SELECT {COLS} FROM images WHERE id = ?1");
    let result = conn.query_row(&q, [id.to_string()], Image::from_row);
    match result {
        Ok(img) => Ok(Some(img)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Relate an image to the video it was captured from.
pub fn link_video_image(
    conn: &Connection,
    video_id: VideoId,
    image_id: ImageId,
    kind: &str,
    timestamp_secs: f64,
) -> Result<VideoImage> {
    let created_at = crate::now();

    conn.execute(
        "INSERT INTO video_images (video_id, image_id, kind, timestamp_secs, created_at)
         VALUES (?1,?2,?3,?4,?5)",
        rusqlite::params![
            video_id.to_string(),
            image_id.to_string(),
            kind,
            timestamp_secs,
            created_at
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(VideoImage {
        video_id,
        image_id,
        kind: kind.to_string(),
        timestamp_secs,
        created_at,
    })
}

/// Create an image and relate it to `video_id` in one transaction.
pub fn create_linked_image(
    conn: &Connection,
    video_id: VideoId,
    path: &str,
    width: i64,
    height: i64,
    kind: &str,
    timestamp_secs: f64,
) -> Result<(Image, VideoImage)> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;
    let image = create_image(&tx, path, width, height)?;
    let link = link_video_image(&tx, video_id, image.id, kind, timestamp_secs)?;
    tx.commit().map_err(|e| Error::database(e.to_string()))?;
    Ok((image, link))
}

/// List a video's image relations, optionally restricted to one kind,
/// ordered by capture timestamp.
pub fn list_video_images(
    conn: &Connection,
    video_id: VideoId,
    kind: Option<&str>,
) -> Result<Vec<VideoImage>> {
    let mut stmt = conn
        .prepare(
            "SELECT video_id, image_id, kind, timestamp_secs, created_at FROM video_images
             WHERE video_id = ?1 AND (?2 IS NULL OR kind = ?2)
             ORDER BY timestamp_secs ASC",
        )
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(rusqlite::params![video_id.to_string(), kind], VideoImage::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}
