//! SQLite storage backed by a sqlx pool
//!
//! Rows are mapped by hand (`try_get` per column). Partial updates load the
//! row, apply the patch in Rust and write every mutable column back inside
//! one transaction, so patch semantics match the in-memory backend exactly.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use leadwell_common::models::{
    AiInsight, Attendee, Call, CallDraft, CallPatch, FormSubmission, FormSubmissionUpdate,
    IntakeCommit, IntakeRecords, InsightType, Lead, LeadPatch, MarketingChannel,
    NewAiInsight, NewCall, NewFormSubmission, NewLead, NewMarketingChannel, NewProjectType,
    NewStat, NewUser, ProjectType, Stat, StatPatch, User, submission_status,
};
use leadwell_common::scoring::clamp_score;
use leadwell_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

use super::{page_offset, Page, Storage};

/// Storage over a SQLite database
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Wrap a pool whose schema is already in place (see [`crate::db`])
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

// ============================================================================
// Column helpers
// ============================================================================

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Invalid stored timestamp '{}': {}", value, e)))
}

fn timestamp_column(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    let value: String = row.try_get(column)?;
    parse_timestamp(&value)
}

fn optional_timestamp_column(row: &SqliteRow, column: &str) -> Result<Option<DateTime<Utc>>> {
    let value: Option<String> = row.try_get(column)?;
    value.as_deref().map(parse_timestamp).transpose()
}

/// Map a unique-constraint violation to `InvalidInput`, pass anything else through
fn unique_violation(err: sqlx::Error, message: String) -> Error {
    match err.as_database_error() {
        Some(db_err) if db_err.is_unique_violation() => Error::InvalidInput(message),
        _ => Error::Database(err),
    }
}

// ============================================================================
// Row mapping
// ============================================================================

fn user_from_row(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        name: row.try_get("name")?,
        role: row.try_get("role")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        job_title: row.try_get("job_title")?,
        created_at: timestamp_column(row, "created_at")?,
    })
}

fn lead_from_row(row: &SqliteRow) -> Result<Lead> {
    Ok(Lead {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        company: row.try_get("company")?,
        project_type: row.try_get("project_type")?,
        budget: row.try_get("budget")?,
        timeline: row.try_get("timeline")?,
        source: row.try_get("source")?,
        source_icon: row.try_get("source_icon")?,
        score: row.try_get("score")?,
        status: row.try_get("status")?,
        notes: row.try_get("notes")?,
        ai_qualified: row.try_get("ai_qualified")?,
        ai_qualification_reason: row.try_get("ai_qualification_reason")?,
        ai_processed: row.try_get("ai_processed")?,
        assigned_to: row.try_get("assigned_to")?,
        created_at: timestamp_column(row, "created_at")?,
        updated_at: timestamp_column(row, "updated_at")?,
    })
}

fn call_from_row(row: &SqliteRow) -> Result<Call> {
    let attendees: String = row.try_get("attendees")?;
    let attendees: Vec<Attendee> = serde_json::from_str(&attendees)?;

    Ok(Call {
        id: row.try_get("id")?,
        lead_id: row.try_get("lead_id")?,
        scheduled_at: timestamp_column(row, "scheduled_at")?,
        duration: row.try_get("duration")?,
        title: row.try_get("title")?,
        notes: row.try_get("notes")?,
        completed: row.try_get("completed")?,
        attendees,
        ai_scheduled: row.try_get("ai_scheduled")?,
        ai_summary: row.try_get("ai_summary")?,
        follow_up_needed: row.try_get("follow_up_needed")?,
        follow_up_date: optional_timestamp_column(row, "follow_up_date")?,
        created_at: timestamp_column(row, "created_at")?,
        updated_at: timestamp_column(row, "updated_at")?,
    })
}

fn project_type_from_row(row: &SqliteRow) -> Result<ProjectType> {
    Ok(ProjectType {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        min_budget: row.try_get("min_budget")?,
        average_timeline: row.try_get("average_timeline")?,
        created_at: timestamp_column(row, "created_at")?,
    })
}

fn marketing_channel_from_row(row: &SqliteRow) -> Result<MarketingChannel> {
    Ok(MarketingChannel {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        icon: row.try_get("icon")?,
        active: row.try_get("active")?,
        conversion_rate: row.try_get("conversion_rate")?,
        created_at: timestamp_column(row, "created_at")?,
    })
}

fn insight_from_row(row: &SqliteRow) -> Result<AiInsight> {
    let insight_type: String = row.try_get("type")?;
    let insight_type: InsightType = insight_type.parse().map_err(Error::Internal)?;
    let related_leads: String = row.try_get("related_leads")?;

    Ok(AiInsight {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        insight_type,
        icon: row.try_get("icon")?,
        action: row.try_get("action")?,
        action_url: row.try_get("action_url")?,
        related_leads: serde_json::from_str(&related_leads)?,
        priority: row.try_get("priority")?,
        created_at: timestamp_column(row, "created_at")?,
        read: row.try_get("read")?,
    })
}

fn stat_from_row(row: &SqliteRow) -> Result<Stat> {
    Ok(Stat {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        value: row.try_get("value")?,
        change_percentage: row.try_get("change_percentage")?,
        icon: row.try_get("icon")?,
        period: row.try_get("period")?,
        created_at: timestamp_column(row, "created_at")?,
        updated_at: timestamp_column(row, "updated_at")?,
    })
}

fn form_submission_from_row(row: &SqliteRow) -> Result<FormSubmission> {
    let raw_data: String = row.try_get("raw_data")?;
    let ai_response: Option<String> = row.try_get("ai_response")?;

    Ok(FormSubmission {
        id: row.try_get("id")?,
        form_type: row.try_get("form_type")?,
        source: row.try_get("source")?,
        content: row.try_get("content")?,
        raw_data: serde_json::from_str(&raw_data)?,
        lead_id: row.try_get("lead_id")?,
        ip_address: row.try_get("ip_address")?,
        user_agent: row.try_get("user_agent")?,
        ai_processed: row.try_get("ai_processed")?,
        ai_response: ai_response
            .as_deref()
            .map(serde_json::from_str::<serde_json::Value>)
            .transpose()?,
        status: row.try_get("status")?,
        is_scam: row.try_get("is_scam")?,
        created_at: timestamp_column(row, "created_at")?,
        updated_at: timestamp_column(row, "updated_at")?,
    })
}

// ============================================================================
// Connection-level statements (usable inside or outside a transaction)
// ============================================================================

async fn fetch_lead(conn: &mut SqliteConnection, id: i64) -> Result<Option<Lead>> {
    sqlx::query("SELECT * FROM leads WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .as_ref()
        .map(lead_from_row)
        .transpose()
}

async fn fetch_call(conn: &mut SqliteConnection, id: i64) -> Result<Option<Call>> {
    sqlx::query("SELECT * FROM calls WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .as_ref()
        .map(call_from_row)
        .transpose()
}

async fn fetch_form_submission(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<FormSubmission>> {
    sqlx::query("SELECT * FROM form_submissions WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .as_ref()
        .map(form_submission_from_row)
        .transpose()
}

async fn lead_exists(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM leads WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

async fn insert_lead(conn: &mut SqliteConnection, lead: &NewLead, now: &str) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO leads (
            name, email, phone, company, project_type, budget, timeline,
            source, source_icon, score, status, notes, ai_qualified,
            ai_qualification_reason, ai_processed, assigned_to,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&lead.name)
    .bind(&lead.email)
    .bind(&lead.phone)
    .bind(&lead.company)
    .bind(&lead.project_type)
    .bind(lead.budget)
    .bind(&lead.timeline)
    .bind(&lead.source)
    .bind(&lead.source_icon)
    .bind(clamp_score(lead.score))
    .bind(&lead.status)
    .bind(&lead.notes)
    .bind(lead.ai_qualified)
    .bind(&lead.ai_qualification_reason)
    .bind(lead.ai_processed)
    .bind(lead.assigned_to)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

async fn insert_call(
    conn: &mut SqliteConnection,
    lead_id: i64,
    details: &CallDraft,
    now: &str,
) -> Result<i64> {
    if !lead_exists(conn, lead_id).await? {
        return Err(Error::InvalidInput(format!("Lead {} does not exist", lead_id)));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO calls (
            lead_id, scheduled_at, duration, title, notes, completed,
            attendees, ai_scheduled, follow_up_needed, follow_up_date,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(lead_id)
    .bind(format_timestamp(&details.scheduled_at))
    .bind(details.duration)
    .bind(&details.title)
    .bind(&details.notes)
    .bind(details.completed)
    .bind(serde_json::to_string(&details.attendees)?)
    .bind(details.ai_scheduled)
    .bind(details.follow_up_needed)
    .bind(details.follow_up_date.as_ref().map(format_timestamp))
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

async fn write_lead(conn: &mut SqliteConnection, lead: &Lead) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE leads SET
            name = ?, email = ?, phone = ?, company = ?, project_type = ?,
            budget = ?, timeline = ?, source = ?, source_icon = ?, score = ?,
            status = ?, notes = ?, ai_qualified = ?, ai_qualification_reason = ?,
            ai_processed = ?, assigned_to = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&lead.name)
    .bind(&lead.email)
    .bind(&lead.phone)
    .bind(&lead.company)
    .bind(&lead.project_type)
    .bind(lead.budget)
    .bind(&lead.timeline)
    .bind(&lead.source)
    .bind(&lead.source_icon)
    .bind(clamp_score(lead.score))
    .bind(&lead.status)
    .bind(&lead.notes)
    .bind(lead.ai_qualified)
    .bind(&lead.ai_qualification_reason)
    .bind(lead.ai_processed)
    .bind(lead.assigned_to)
    .bind(format_timestamp(&lead.updated_at))
    .bind(lead.id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn write_call(conn: &mut SqliteConnection, call: &Call) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE calls SET
            scheduled_at = ?, duration = ?, title = ?, notes = ?, completed = ?,
            attendees = ?, ai_scheduled = ?, ai_summary = ?, follow_up_needed = ?,
            follow_up_date = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(format_timestamp(&call.scheduled_at))
    .bind(call.duration)
    .bind(&call.title)
    .bind(&call.notes)
    .bind(call.completed)
    .bind(serde_json::to_string(&call.attendees)?)
    .bind(call.ai_scheduled)
    .bind(&call.ai_summary)
    .bind(call.follow_up_needed)
    .bind(call.follow_up_date.as_ref().map(format_timestamp))
    .bind(format_timestamp(&call.updated_at))
    .bind(call.id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn write_form_submission(
    conn: &mut SqliteConnection,
    submission: &FormSubmission,
) -> Result<()> {
    let ai_response = submission
        .ai_response
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    sqlx::query(
        r#"
        UPDATE form_submissions SET
            lead_id = ?, ai_processed = ?, ai_response = ?, status = ?,
            is_scam = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(submission.lead_id)
    .bind(submission.ai_processed)
    .bind(ai_response)
    .bind(&submission.status)
    .bind(submission.is_scam)
    .bind(format_timestamp(&submission.updated_at))
    .bind(submission.id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

fn missing_row(kind: &str, id: i64) -> Error {
    Error::Internal(format!("{} {} missing right after insert", kind, id))
}

#[async_trait]
impl Storage for SqliteStorage {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, name, role, email, phone, job_title, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.username)
        .bind(&user.name)
        .bind(&user.role)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.job_title)
        .bind(format_timestamp(&Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            unique_violation(e, format!("Username '{}' is already taken", user.username))
        })?;

        let id = result.last_insert_rowid();
        self.get_user(id).await?.ok_or_else(|| missing_row("User", id))
    }

    async fn list_leads(&self, page: i64, limit: i64) -> Result<Page<Lead>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM leads")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query("SELECT * FROM leads ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?")
            .bind(limit)
            .bind(page_offset(page, limit))
            .fetch_all(&self.pool)
            .await?;

        let items = rows.iter().map(lead_from_row).collect::<Result<Vec<_>>>()?;
        Ok(Page { items, total })
    }

    async fn get_lead(&self, id: i64) -> Result<Option<Lead>> {
        let mut conn = self.pool.acquire().await?;
        fetch_lead(&mut conn, id).await
    }

    async fn create_lead(&self, lead: NewLead) -> Result<Lead> {
        let mut conn = self.pool.acquire().await?;
        let id = insert_lead(&mut conn, &lead, &format_timestamp(&Utc::now())).await?;
        fetch_lead(&mut conn, id).await?.ok_or_else(|| missing_row("Lead", id))
    }

    async fn update_lead(&self, id: i64, patch: LeadPatch) -> Result<Option<Lead>> {
        let mut tx = self.pool.begin().await?;

        let Some(mut lead) = fetch_lead(&mut tx, id).await? else {
            return Ok(None);
        };
        patch.apply_to(&mut lead);
        lead.updated_at = Utc::now();
        write_lead(&mut tx, &lead).await?;

        let updated = fetch_lead(&mut tx, id).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn list_calls(&self, upcoming_after: Option<DateTime<Utc>>) -> Result<Vec<Call>> {
        let rows = match upcoming_after {
            Some(now) => {
                sqlx::query(
                    "SELECT * FROM calls WHERE completed = 0 AND scheduled_at >= ? ORDER BY scheduled_at, id",
                )
                .bind(format_timestamp(&now))
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query("SELECT * FROM calls ORDER BY scheduled_at, id")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter().map(call_from_row).collect()
    }

    async fn get_call(&self, id: i64) -> Result<Option<Call>> {
        let mut conn = self.pool.acquire().await?;
        fetch_call(&mut conn, id).await
    }

    async fn create_call(&self, call: NewCall) -> Result<Call> {
        let mut conn = self.pool.acquire().await?;
        let id = insert_call(
            &mut conn,
            call.lead_id,
            &call.details,
            &format_timestamp(&Utc::now()),
        )
        .await?;
        fetch_call(&mut conn, id).await?.ok_or_else(|| missing_row("Call", id))
    }

    async fn update_call(&self, id: i64, patch: CallPatch) -> Result<Option<Call>> {
        let mut tx = self.pool.begin().await?;

        let Some(mut call) = fetch_call(&mut tx, id).await? else {
            return Ok(None);
        };
        patch.apply_to(&mut call);
        call.updated_at = Utc::now();
        write_call(&mut tx, &call).await?;

        let updated = fetch_call(&mut tx, id).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn list_project_types(&self) -> Result<Vec<ProjectType>> {
        let rows = sqlx::query("SELECT * FROM project_types ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(project_type_from_row).collect()
    }

    async fn create_project_type(&self, project_type: NewProjectType) -> Result<ProjectType> {
        let result = sqlx::query(
            r#"
            INSERT INTO project_types (name, description, min_budget, average_timeline, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&project_type.name)
        .bind(&project_type.description)
        .bind(project_type.min_budget)
        .bind(&project_type.average_timeline)
        .bind(format_timestamp(&Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            unique_violation(e, format!("Project type '{}' already exists", project_type.name))
        })?;

        let id = result.last_insert_rowid();
        sqlx::query("SELECT * FROM project_types WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(project_type_from_row)
            .transpose()?
            .ok_or_else(|| missing_row("Project type", id))
    }

    async fn list_marketing_channels(&self) -> Result<Vec<MarketingChannel>> {
        let rows = sqlx::query("SELECT * FROM marketing_channels ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(marketing_channel_from_row).collect()
    }

    async fn create_marketing_channel(&self, channel: NewMarketingChannel) -> Result<MarketingChannel> {
        let result = sqlx::query(
            r#"
            INSERT INTO marketing_channels (name, icon, active, conversion_rate, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&channel.name)
        .bind(&channel.icon)
        .bind(channel.active)
        .bind(channel.conversion_rate)
        .bind(format_timestamp(&Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            unique_violation(e, format!("Marketing channel '{}' already exists", channel.name))
        })?;

        let id = result.last_insert_rowid();
        sqlx::query("SELECT * FROM marketing_channels WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(marketing_channel_from_row)
            .transpose()?
            .ok_or_else(|| missing_row("Marketing channel", id))
    }

    async fn list_insights(&self) -> Result<Vec<AiInsight>> {
        let rows = sqlx::query("SELECT * FROM ai_insights ORDER BY created_at DESC, id DESC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(insight_from_row).collect()
    }

    async fn create_insight(&self, insight: NewAiInsight) -> Result<AiInsight> {
        let result = sqlx::query(
            r#"
            INSERT INTO ai_insights (
                title, description, type, icon, action, action_url,
                related_leads, priority, created_at, read
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
            "#,
        )
        .bind(&insight.title)
        .bind(&insight.description)
        .bind(insight.insight_type.as_str())
        .bind(&insight.icon)
        .bind(&insight.action)
        .bind(&insight.action_url)
        .bind(serde_json::to_string(&insight.related_leads)?)
        .bind(&insight.priority)
        .bind(format_timestamp(&Utc::now()))
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.fetch_insight(id).await?.ok_or_else(|| missing_row("Insight", id))
    }

    async fn mark_insight_read(&self, id: i64) -> Result<Option<AiInsight>> {
        let result = sqlx::query("UPDATE ai_insights SET read = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.fetch_insight(id).await
    }

    async fn list_stats(&self, period: &str) -> Result<Vec<Stat>> {
        let rows = sqlx::query("SELECT * FROM stats WHERE period = ? ORDER BY id")
            .bind(period)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(stat_from_row).collect()
    }

    async fn create_stat(&self, stat: NewStat) -> Result<Stat> {
        let now = format_timestamp(&Utc::now());
        let result = sqlx::query(
            r#"
            INSERT INTO stats (name, value, change_percentage, icon, period, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&stat.name)
        .bind(&stat.value)
        .bind(stat.change_percentage)
        .bind(&stat.icon)
        .bind(&stat.period)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.fetch_stat(id).await?.ok_or_else(|| missing_row("Stat", id))
    }

    async fn update_stat(&self, id: i64, patch: StatPatch) -> Result<Option<Stat>> {
        let Some(mut stat) = self.fetch_stat(id).await? else {
            return Ok(None);
        };
        patch.apply_to(&mut stat);

        sqlx::query(
            r#"
            UPDATE stats SET
                name = ?, value = ?, change_percentage = ?, icon = ?, period = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&stat.name)
        .bind(&stat.value)
        .bind(stat.change_percentage)
        .bind(&stat.icon)
        .bind(&stat.period)
        .bind(format_timestamp(&Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.fetch_stat(id).await
    }

    async fn list_form_submissions(&self, page: i64, limit: i64) -> Result<Page<FormSubmission>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM form_submissions")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query(
            "SELECT * FROM form_submissions ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(page_offset(page, limit))
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .iter()
            .map(form_submission_from_row)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page { items, total })
    }

    async fn get_form_submission(&self, id: i64) -> Result<Option<FormSubmission>> {
        let mut conn = self.pool.acquire().await?;
        fetch_form_submission(&mut conn, id).await
    }

    async fn create_form_submission(&self, submission: NewFormSubmission) -> Result<FormSubmission> {
        let now = format_timestamp(&Utc::now());
        let mut conn = self.pool.acquire().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO form_submissions (
                form_type, source, content, raw_data, ip_address, user_agent,
                ai_processed, status, is_scam, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, 0, ?, 0, ?, ?)
            "#,
        )
        .bind(&submission.form_type)
        .bind(&submission.source)
        .bind(&submission.content)
        .bind(serde_json::to_string(&submission.raw_data)?)
        .bind(&submission.ip_address)
        .bind(&submission.user_agent)
        .bind(submission_status::NEW)
        .bind(&now)
        .bind(&now)
        .execute(&mut *conn)
        .await?;

        let id = result.last_insert_rowid();
        fetch_form_submission(&mut conn, id)
            .await?
            .ok_or_else(|| missing_row("Form submission", id))
    }

    async fn update_form_submission(
        &self,
        id: i64,
        update: FormSubmissionUpdate,
    ) -> Result<Option<FormSubmission>> {
        let mut tx = self.pool.begin().await?;

        let Some(mut submission) = fetch_form_submission(&mut tx, id).await? else {
            return Ok(None);
        };
        update.apply_to(&mut submission);
        submission.updated_at = Utc::now();
        write_form_submission(&mut tx, &submission).await?;

        let updated = fetch_form_submission(&mut tx, id).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn commit_intake(&self, commit: IntakeCommit) -> Result<IntakeRecords> {
        let now = Utc::now();
        let now_text = format_timestamp(&now);

        // Dropping `tx` on any early return rolls everything back
        let mut tx = self.pool.begin().await?;

        let Some(mut submission) = fetch_form_submission(&mut tx, commit.submission_id).await?
        else {
            return Err(Error::NotFound(format!(
                "Form submission {}",
                commit.submission_id
            )));
        };

        let lead_id = insert_lead(&mut tx, &commit.lead, &now_text).await?;
        let call_id = match &commit.call {
            Some(details) => Some(insert_call(&mut tx, lead_id, details, &now_text).await?),
            None => None,
        };

        FormSubmissionUpdate {
            status: Some(submission_status::PROCESSED.to_string()),
            ai_processed: Some(true),
            ai_response: Some(commit.ai_response),
            is_scam: Some(false),
            lead_id: Some(lead_id),
        }
        .apply_to(&mut submission);
        submission.updated_at = now;
        write_form_submission(&mut tx, &submission).await?;

        let lead = fetch_lead(&mut tx, lead_id)
            .await?
            .ok_or_else(|| missing_row("Lead", lead_id))?;
        let call = match call_id {
            Some(id) => Some(
                fetch_call(&mut tx, id)
                    .await?
                    .ok_or_else(|| missing_row("Call", id))?,
            ),
            None => None,
        };
        let submission = fetch_form_submission(&mut tx, commit.submission_id)
            .await?
            .ok_or_else(|| missing_row("Form submission", commit.submission_id))?;

        tx.commit().await?;

        Ok(IntakeRecords {
            submission,
            lead,
            call,
        })
    }
}

impl SqliteStorage {
    async fn fetch_insight(&self, id: i64) -> Result<Option<AiInsight>> {
        sqlx::query("SELECT * FROM ai_insights WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(insight_from_row)
            .transpose()
    }

    async fn fetch_stat(&self, id: i64) -> Result<Option<Stat>> {
        sqlx::query("SELECT * FROM stats WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(stat_from_row)
            .transpose()
    }
}
