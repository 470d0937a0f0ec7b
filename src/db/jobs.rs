//! Job rows: keyed reads, partial updates, operator listing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::model::{Job, JobId, JobStatus, JobUpdate};
use crate::store::JobStore;

const JOB_COLUMNS: &str = "id, status, script, voiceover_text, title, audio_url, video_url, \
     published_video_id, error_message, created_at, updated_at";

impl super::Db {
    /// List jobs, newest first, optionally filtered by status.
    pub async fn list_jobs(&self, status: Option<JobStatus>, limit: u32) -> Result<Vec<Job>> {
        let rows: Vec<JobRow> = sqlx::query_as(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs
             WHERE ($1::text IS NULL OR status = $1)
             ORDER BY created_at DESC
             LIMIT $2"
        ))
        .bind(status.map(JobStatus::as_str))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(JobRow::try_into_job).collect()
    }
}

#[async_trait]
impl JobStore for super::Db {
    async fn get(&self, id: &JobId) -> Result<Option<Job>> {
        let row: Option<JobRow> =
            sqlx::query_as(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"))
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await?;

        row.map(JobRow::try_into_job).transpose()
    }

    async fn update(&self, id: &JobId, update: &JobUpdate) -> Result<()> {
        // One statement, so status and fields commit together. COALESCE keeps
        // any field the update does not carry.
        let rows_affected = sqlx::query(
            "UPDATE jobs SET
                 status = $1,
                 script = COALESCE($2, script),
                 voiceover_text = COALESCE($3, voiceover_text),
                 title = COALESCE($4, title),
                 audio_url = COALESCE($5, audio_url),
                 video_url = COALESCE($6, video_url),
                 published_video_id = COALESCE($7, published_video_id),
                 error_message = COALESCE($8, error_message),
                 updated_at = now()
             WHERE id = $9",
        )
        .bind(update.status.as_str())
        .bind(&update.script)
        .bind(&update.voiceover_text)
        .bind(&update.title)
        .bind(&update.audio_url)
        .bind(&update.video_url)
        .bind(&update.published_video_id)
        .bind(&update.error_message)
        .bind(id.as_str())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows_affected == 0 {
            return Err(Error::JobNotFound(id.clone()));
        }
        Ok(())
    }

    async fn create(&self, job: Job) -> Result<Job> {
        let row: JobRow = sqlx::query_as(&format!(
            "INSERT INTO jobs (id, status, script, voiceover_text, title, audio_url, video_url,
                               published_video_id, error_message, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(job.id.as_str())
        .bind(job.status.as_str())
        .bind(&job.script)
        .bind(&job.voiceover_text)
        .bind(&job.title)
        .bind(&job.audio_url)
        .bind(&job.video_url)
        .bind(&job.published_video_id)
        .bind(&job.error_message)
        .bind(job.created_at)
        .fetch_one(&self.pool)
        .await?;

        row.try_into_job()
    }
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct JobRow {
    id: String,
    status: String,
    script: Option<String>,
    voiceover_text: Option<String>,
    title: Option<String>,
    audio_url: Option<String>,
    video_url: Option<String>,
    published_video_id: Option<String>,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl JobRow {
    fn try_into_job(self) -> Result<Job> {
        Ok(Job {
            id: JobId(self.id),
            status: self.status.parse()?,
            script: self.script,
            voiceover_text: self.voiceover_text,
            title: self.title,
            audio_url: self.audio_url,
            video_url: self.video_url,
            published_video_id: self.published_video_id,
            error_message: self.error_message,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
