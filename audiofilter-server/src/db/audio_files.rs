//! Audio file record operations
//!
//! Status changes go through [`transition_status`], a compare-and-set update
//! that only succeeds when the row is still in the expected state.

use audiofilter_common::db::{AudioFile, NewAudioFile, ProcessingStatus};
use audiofilter_common::{time, Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

const SELECT_COLUMNS: &str = r#"
    SELECT id, original_file_name, storage_key, content_type, file_size,
           uploaded_at, status
    FROM audio_files
"#;

/// Insert a new record in `PENDING` state; assigns id and upload timestamp
pub async fn insert(pool: &SqlitePool, new_file: &NewAudioFile) -> Result<AudioFile> {
    // Round-trip through the stored form so the returned record equals a later read
    let uploaded_at = time::to_db(&time::now());
    let status = ProcessingStatus::Pending;

    let result = sqlx::query(
        r#"
        INSERT INTO audio_files (
            original_file_name, storage_key, content_type, file_size,
            uploaded_at, status
        ) VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&new_file.original_file_name)
    .bind(&new_file.storage_key)
    .bind(&new_file.content_type)
    .bind(new_file.file_size)
    .bind(&uploaded_at)
    .bind(status.as_str())
    .execute(pool)
    .await?;

    Ok(AudioFile {
        id: result.last_insert_rowid(),
        original_file_name: new_file.original_file_name.clone(),
        storage_key: new_file.storage_key.clone(),
        content_type: new_file.content_type.clone(),
        file_size: new_file.file_size,
        uploaded_at: time::from_db("uploaded_at", &uploaded_at)?,
        status,
    })
}

/// Load one record
pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<AudioFile>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(audio_file_from_row).transpose()
}

/// Load all records in id order
pub async fn list_all(pool: &SqlitePool) -> Result<Vec<AudioFile>> {
    let rows = sqlx::query(&format!("{} ORDER BY id ASC", SELECT_COLUMNS))
        .fetch_all(pool)
        .await?;

    rows.iter().map(audio_file_from_row).collect()
}

/// Move a record from `from` to `to`.
///
/// Fails with `InvalidInput` for a transition the state machine forbids,
/// `NotFound` for a missing record and `Conflict` when the stored status is
/// no longer `from`.
pub async fn transition_status(
    pool: &SqlitePool,
    id: i64,
    from: ProcessingStatus,
    to: ProcessingStatus,
) -> Result<()> {
    if !from.can_transition_to(to) {
        return Err(Error::InvalidInput(format!(
            "Illegal status transition {} -> {}",
            from, to
        )));
    }

    let result = sqlx::query("UPDATE audio_files SET status = ? WHERE id = ? AND status = ?")
        .bind(to.as_str())
        .bind(id)
        .bind(from.as_str())
        .execute(pool)
        .await?;

    if result.rows_affected() == 1 {
        tracing::debug!(audio_file_id = id, from = %from, to = %to, "Status updated");
        return Ok(());
    }

    match get(pool, id).await? {
        None => Err(Error::NotFound(format!("Audio file not found: {}", id))),
        Some(current) if current.status.is_terminal() => Err(Error::Conflict(format!(
            "Audio file {} already finished as {}",
            id, current.status
        ))),
        Some(current) => Err(Error::Conflict(format!(
            "Audio file {} is {}, expected {}",
            id, current.status, from
        ))),
    }
}

fn audio_file_from_row(row: &SqliteRow) -> Result<AudioFile> {
    let uploaded_at: String = row.try_get("uploaded_at")?;
    let status: String = row.try_get("status")?;

    Ok(AudioFile {
        id: row.try_get("id")?,
        original_file_name: row.try_get("original_file_name")?,
        storage_key: row.try_get("storage_key")?,
        content_type: row.try_get("content_type")?,
        file_size: row.try_get("file_size")?,
        uploaded_at: time::from_db("uploaded_at", &uploaded_at)?,
        status: status.parse()?,
    })
}
