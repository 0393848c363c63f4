//! Processed track record operations
//!
//! Tracks are only ever inserted and read; there is no update or delete.

use audiofilter_common::db::{NewProcessedTrack, ProcessedTrack};
use audiofilter_common::{time, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// Insert a track; the caller must have checked that the parent exists
pub async fn insert(pool: &SqlitePool, new_track: &NewProcessedTrack) -> Result<ProcessedTrack> {
    let processed_at = time::to_db(&time::now());

    let result = sqlx::query(
        r#"
        INSERT INTO processed_tracks (audio_file_id, instrument_type, storage_key, processed_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(new_track.audio_file_id)
    .bind(&new_track.instrument_type)
    .bind(&new_track.storage_key)
    .bind(&processed_at)
    .execute(pool)
    .await?;

    Ok(ProcessedTrack {
        id: result.last_insert_rowid(),
        audio_file_id: new_track.audio_file_id,
        instrument_type: new_track.instrument_type.clone(),
        storage_key: new_track.storage_key.clone(),
        processed_at: time::from_db("processed_at", &processed_at)?,
    })
}

/// All tracks derived from one audio file, in id order
pub async fn list_for_audio_file(pool: &SqlitePool, audio_file_id: i64) -> Result<Vec<ProcessedTrack>> {
    let rows = sqlx::query(
        r#"
        SELECT id, audio_file_id, instrument_type, storage_key, processed_at
        FROM processed_tracks
        WHERE audio_file_id = ?
        ORDER BY id ASC
        "#,
    )
    .bind(audio_file_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(track_from_row).collect()
}

fn track_from_row(row: &SqliteRow) -> Result<ProcessedTrack> {
    let processed_at: String = row.try_get("processed_at")?;

    Ok(ProcessedTrack {
        id: row.try_get("id")?,
        audio_file_id: row.try_get("audio_file_id")?,
        instrument_type: row.try_get("instrument_type")?,
        storage_key: row.try_get("storage_key")?,
        processed_at: time::from_db("processed_at", &processed_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::audio_files;
    use audiofilter_common::db::{init_database, NewAudioFile};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_tracks_listed_per_parent() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("test.db")).await.unwrap();

        let mut parents = Vec::new();
        for key in ["a", "b"] {
            let file = audio_files::insert(
                &pool,
                &NewAudioFile {
                    original_file_name: format!("{}.wav", key),
                    storage_key: key.to_string(),
                    content_type: "audio/wav".to_string(),
                    file_size: None,
                },
            )
            .await
            .unwrap();
            parents.push(file.id);
        }

        for instrument in ["vocals", "drums"] {
            insert(
                &pool,
                &NewProcessedTrack {
                    audio_file_id: parents[0],
                    instrument_type: instrument.to_string(),
                    storage_key: format!("stems/a/{}.wav", instrument),
                },
            )
            .await
            .unwrap();
        }

        let tracks = list_for_audio_file(&pool, parents[0]).await.unwrap();
        let instruments: Vec<&str> = tracks.iter().map(|t| t.instrument_type.as_str()).collect();
        assert_eq!(instruments, vec!["vocals", "drums"]);
        assert!(tracks.iter().all(|t| t.audio_file_id == parents[0]));

        assert!(list_for_audio_file(&pool, parents[1]).await.unwrap().is_empty());
        assert!(list_for_audio_file(&pool, 999_999).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_for_missing_parent_fails() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("test.db")).await.unwrap();

        let result = insert(
            &pool,
            &NewProcessedTrack {
                audio_file_id: 7,
                instrument_type: "bass".to_string(),
                storage_key: "stems/bass.wav".to_string(),
            },
        )
        .await;
        assert!(result.is_err());
    }
}
