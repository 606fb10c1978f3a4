use crate::error::{EngineError, Result};
use crate::models::{StoredFingerprint, Track, TrackMetadata};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::Path;

/// The durable fingerprint store: one `tracks` row and a batch of
/// `fingerprints` rows per ingested song, as laid out in spec.md §6.
///
/// A single writer connection, serialized by `write_conn`, performs
/// every mutation; `lookup` and `get_track` each open their own
/// short-lived read connection so concurrent queries never wait on
/// ingestion or on each other. WAL mode is what makes that safe.
pub struct Index {
    db_path: String,
    write_conn: Mutex<Connection>,
}

impl Index {
    pub fn open(db_path: &str) -> Result<Self> {
        let write_conn = open_connection(db_path)?;
        init_schema(&write_conn)?;
        Ok(Self { db_path: db_path.to_string(), write_conn: Mutex::new(write_conn) })
    }

    fn read_conn(&self) -> Result<Connection> {
        open_connection(&self.db_path)
    }

    /// Insert a track and its fingerprints atomically. Returns
    /// `EngineError::DuplicateTrack` if `(source_type, source_id)`
    /// already has a row.
    pub fn put_track(&self, metadata: &TrackMetadata, fingerprints: &[StoredFingerprint]) -> Result<u64> {
        let mut conn = self.write_conn.lock();
        let tx = conn.transaction().map_err(sql_err)?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT song_id FROM tracks WHERE source_type = ?1 AND source_id = ?2",
                params![metadata.source_type, metadata.source_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(sql_err)?;
        if existing.is_some() {
            return Err(EngineError::DuplicateTrack);
        }

        tx.execute(
            "INSERT INTO tracks (
                title, artist, album, duration_ms, source_type, source_id,
                cover_url, release_date, spotify_url, youtube_url, youtube_id
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                metadata.title,
                metadata.artist,
                metadata.album,
                metadata.duration_ms,
                metadata.source_type,
                metadata.source_id,
                metadata.cover_url,
                metadata.release_date,
                metadata.spotify_url,
                metadata.youtube_url,
                metadata.youtube_id,
            ],
        )
        .map_err(sql_err)?;
        let song_id = tx.last_insert_rowid() as u64;

        {
            let mut stmt = tx
                .prepare("INSERT INTO fingerprints (hash, song_id, anchor_t_idx) VALUES (?1, ?2, ?3)")
                .map_err(sql_err)?;
            for fp in fingerprints {
                stmt.execute(params![fp.hash, song_id as i64, fp.anchor_t_idx])
                    .map_err(sql_err)?;
            }
        }

        tx.commit().map_err(sql_err)?;
        Ok(song_id)
    }

    pub fn delete_track(&self, song_id: u64) -> Result<()> {
        let conn = self.write_conn.lock();
        let changed = conn
            .execute("DELETE FROM tracks WHERE song_id = ?1", params![song_id as i64])
            .map_err(sql_err)?;
        if changed == 0 {
            return Err(EngineError::NotFound(song_id));
        }
        Ok(())
    }

    pub fn get_track(&self, song_id: u64) -> Result<Track> {
        let conn = self.read_conn()?;
        conn.query_row(
            "SELECT song_id, title, artist, album, duration_ms, source_type, source_id,
                    cover_url, release_date, spotify_url, youtube_url, youtube_id, created_at
             FROM tracks WHERE song_id = ?1",
            params![song_id as i64],
            row_to_track,
        )
        .optional()
        .map_err(sql_err)?
        .ok_or(EngineError::NotFound(song_id))
    }

    pub fn song_count(&self) -> Result<u64> {
        let conn = self.read_conn()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM tracks", [], |row| row.get(0))
            .map_err(sql_err)?;
        Ok(count as u64)
    }

    /// For each `hash` in `hashes`, return every `(song_id, anchor_t_idx)`
    /// pair stored under it. The matcher pairs each row against the
    /// query fingerprint that produced the hash.
    pub fn lookup(&self, hashes: &[u32]) -> Result<Vec<(u32, u64, u32)>> {
        if hashes.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.read_conn()?;
        let mut stmt = conn
            .prepare("SELECT song_id, anchor_t_idx FROM fingerprints WHERE hash = ?1")
            .map_err(sql_err)?;

        let mut out = Vec::new();
        for &hash in hashes {
            let rows = stmt
                .query_map(params![hash], |row| {
                    Ok((row.get::<_, i64>(0)? as u64, row.get::<_, u32>(1)?))
                })
                .map_err(sql_err)?;
            for row in rows {
                let (song_id, anchor_t_idx) = row.map_err(sql_err)?;
                out.push((hash, song_id, anchor_t_idx));
            }
        }
        Ok(out)
    }
}

fn row_to_track(row: &rusqlite::Row) -> rusqlite::Result<Track> {
    Ok(Track {
        song_id: row.get::<_, i64>(0)? as u64,
        metadata: TrackMetadata {
            title: row.get(1)?,
            artist: row.get(2)?,
            album: row.get(3)?,
            duration_ms: row.get(4)?,
            source_type: row.get(5)?,
            source_id: row.get(6)?,
            cover_url: row.get(7)?,
            release_date: row.get(8)?,
            spotify_url: row.get(9)?,
            youtube_url: row.get(10)?,
            youtube_id: row.get(11)?,
        },
        created_at: row.get(12)?,
    })
}

fn open_connection(db_path: &str) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        Path::new(db_path),
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
    )
    .map_err(sql_err)?;
    conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")
        .map_err(sql_err)?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS tracks (
            song_id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            artist TEXT,
            album TEXT,
            duration_ms INTEGER,
            source_type TEXT NOT NULL,
            source_id TEXT NOT NULL,
            cover_url TEXT,
            release_date TEXT,
            spotify_url TEXT,
            youtube_url TEXT,
            youtube_id TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(source_type, source_id)
         );
         CREATE TABLE IF NOT EXISTS fingerprints (
            hash INTEGER NOT NULL,
            song_id INTEGER NOT NULL,
            anchor_t_idx INTEGER NOT NULL,
            FOREIGN KEY (song_id) REFERENCES tracks(song_id) ON DELETE CASCADE
         );
         CREATE INDEX IF NOT EXISTS idx_fingerprints_hash ON fingerprints (hash);
         CREATE INDEX IF NOT EXISTS idx_fingerprints_song_id ON fingerprints (song_id);",
    )
    .map_err(sql_err)
}

fn sql_err(e: rusqlite::Error) -> EngineError {
    EngineError::IndexUnavailable(e.to_string())
}
