use std::collections::HashSet;

use anyhow::Context;
use chrono::NaiveDate;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{
    AnswerSet, BadgeDefinition, ChildBadge, ChildRecord, ChildStats, GoalRecord, ScreeningRecord,
    ScreeningResult, SessionLog,
};
use crate::{badges, progress};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let parent_id = Uuid::parse_str("6f1c2a4e-8d3b-4f0a-9c7e-2b5d8e1f4a90")?;

    sqlx::query(
        r#"
        INSERT INTO therapy_progress.parents (id, full_name, email)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO UPDATE SET full_name = EXCLUDED.full_name
        "#,
    )
    .bind(parent_id)
    .bind("Morgan Rivera")
    .bind("morgan.rivera@example.com")
    .execute(pool)
    .await?;

    let children = vec![
        (
            Uuid::parse_str("a3e4c1d2-7b8f-4e6a-9d0c-1f2e3a4b5c6d")?,
            "Sam Rivera",
            NaiveDate::from_ymd_opt(2024, 5, 14).context("invalid date")?,
        ),
        (
            Uuid::parse_str("b7d9e2f1-3c4a-4b5d-8e6f-0a1b2c3d4e5f")?,
            "Riley Rivera",
            NaiveDate::from_ymd_opt(2022, 11, 3).context("invalid date")?,
        ),
    ];

    for (id, name, birth_date) in &children {
        sqlx::query(
            r#"
            INSERT INTO therapy_progress.children (id, parent_id, full_name, birth_date)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET full_name = EXCLUDED.full_name, birth_date = EXCLUDED.birth_date
            "#,
        )
        .bind(*id)
        .bind(parent_id)
        .bind(*name)
        .bind(*birth_date)
        .execute(pool)
        .await?;
    }

    let sessions = vec![
        ("seed-001", 0, (2026, 2, 1), 3, "Practiced /s/ blends with picture cards"),
        ("seed-002", 0, (2026, 2, 2), 4, "Named six farm animals unprompted"),
        ("seed-003", 1, (2026, 2, 2), 2, "Two-word requests during snack time"),
    ];

    for (source_key, child_index, (year, month, day), stars, note) in sessions {
        let (child_id, _, _) = children[child_index];
        let logged_on = NaiveDate::from_ymd_opt(year, month, day).context("invalid date")?;
        insert_session(pool, child_id, logged_on, stars, note, source_key).await?;
    }

    let (first_child, _, _) = children[0];
    sqlx::query(
        r#"
        INSERT INTO therapy_progress.goals (id, child_id, title)
        SELECT $1, $2, $3
        WHERE NOT EXISTS (
            SELECT 1 FROM therapy_progress.goals WHERE child_id = $2 AND title = $3
        )
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(first_child)
    .bind("Use three-word phrases at mealtime")
    .execute(pool)
    .await?;

    Ok(())
}

/// Stores a screening against the child and the child's own parent.
pub async fn insert_screening(
    pool: &PgPool,
    child_id: Uuid,
    answers: &AnswerSet,
    result: &ScreeningResult,
) -> anyhow::Result<(Uuid, Uuid)> {
    let id = Uuid::new_v4();

    let row = sqlx::query(
        r#"
        INSERT INTO therapy_progress.screenings
        (id, child_id, parent_id, answers, total_score, risk_level, critical_count,
         requires_follow_up, message)
        SELECT $1, c.id, c.parent_id, $3, $4, $5, $6, $7, $8
        FROM therapy_progress.children c
        WHERE c.id = $2
        RETURNING parent_id
        "#,
    )
    .bind(id)
    .bind(child_id)
    .bind(Json(answers))
    .bind(i16::from(result.total_score))
    .bind(result.risk_level.as_str())
    .bind(i16::from(result.critical_count))
    .bind(result.requires_follow_up)
    .bind(result.message)
    .fetch_optional(pool)
    .await
    .context("failed to store screening")?
    .with_context(|| format!("no child with id {child_id}"))?;

    Ok((id, row.get("parent_id")))
}

/// Inserts a session log and adds its stars to the child's running total.
/// Returns false when `source_key` was already imported.
pub async fn insert_session(
    pool: &PgPool,
    child_id: Uuid,
    logged_on: NaiveDate,
    stars_earned: i32,
    note: &str,
    source_key: &str,
) -> anyhow::Result<bool> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        INSERT INTO therapy_progress.sessions
        (id, child_id, logged_on, stars_earned, note, source_key)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(child_id)
    .bind(logged_on)
    .bind(stars_earned)
    .bind(note)
    .bind(source_key)
    .execute(&mut *tx)
    .await?;

    let inserted = result.rows_affected() > 0;
    if inserted {
        sqlx::query(
            "UPDATE therapy_progress.children SET total_stars = total_stars + $1 WHERE id = $2",
        )
        .bind(stars_earned)
        .bind(child_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(inserted)
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct SessionRow {
    pub child_id: Uuid,
    pub logged_on: NaiveDate,
    pub stars_earned: i32,
    pub note: String,
    pub source_key: Option<String>,
}

/// Parses session rows, rejecting negative star counts.
pub fn read_session_rows<R: std::io::Read>(reader: R) -> anyhow::Result<Vec<SessionRow>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut rows = Vec::new();

    for (index, result) in reader.deserialize::<SessionRow>().enumerate() {
        let line = index + 2;
        let row = result.with_context(|| format!("invalid session row at line {line}"))?;
        anyhow::ensure!(
            row.stars_earned >= 0,
            "line {line}: stars_earned must not be negative (got {})",
            row.stars_earned
        );
        rows.push(row);
    }

    Ok(rows)
}

pub async fn import_sessions_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<(usize, HashSet<Uuid>)> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let rows = read_session_rows(file)?;
    let mut inserted = 0usize;
    let mut touched = HashSet::new();

    for row in rows {
        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        if insert_session(
            pool,
            row.child_id,
            row.logged_on,
            row.stars_earned,
            &row.note,
            &source_key,
        )
        .await?
        {
            inserted += 1;
            touched.insert(row.child_id);
        }
    }

    Ok((inserted, touched))
}

pub async fn add_goal(pool: &PgPool, child_id: Uuid, title: &str) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO therapy_progress.goals (id, child_id, title) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(child_id)
        .bind(title)
        .execute(pool)
        .await?;
    Ok(id)
}

/// Marks an active goal completed and returns its child, or `None` when the
/// goal does not exist or was already completed.
pub async fn complete_goal(
    pool: &PgPool,
    goal_id: Uuid,
    completed_on: NaiveDate,
) -> anyhow::Result<Option<Uuid>> {
    let row = sqlx::query(
        r#"
        UPDATE therapy_progress.goals
        SET status = 'completed', completed_on = $2
        WHERE id = $1 AND status = 'active'
        RETURNING child_id
        "#,
    )
    .bind(goal_id)
    .bind(completed_on)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| row.get("child_id")))
}

pub async fn fetch_child(pool: &PgPool, child_id: Uuid) -> anyhow::Result<ChildRecord> {
    let row = sqlx::query(
        r#"
        SELECT c.id, c.full_name, c.birth_date, c.total_stars, p.email
        FROM therapy_progress.children c
        JOIN therapy_progress.parents p ON p.id = c.parent_id
        WHERE c.id = $1
        "#,
    )
    .bind(child_id)
    .fetch_optional(pool)
    .await?
    .with_context(|| format!("no child with id {child_id}"))?;

    Ok(ChildRecord {
        id: row.get("id"),
        full_name: row.get("full_name"),
        birth_date: row.get("birth_date"),
        parent_email: row.get("email"),
        total_stars: row.get("total_stars"),
    })
}

pub async fn fetch_child_stats(
    pool: &PgPool,
    child_id: Uuid,
    today: NaiveDate,
) -> anyhow::Result<ChildStats> {
    let child = fetch_child(pool, child_id).await?;

    let goals_completed: i64 = sqlx::query(
        "SELECT COUNT(*) AS completed FROM therapy_progress.goals \
         WHERE child_id = $1 AND status = 'completed'",
    )
    .bind(child_id)
    .fetch_one(pool)
    .await?
    .get("completed");

    let dates: Vec<NaiveDate> = sqlx::query(
        "SELECT DISTINCT logged_on FROM therapy_progress.sessions \
         WHERE child_id = $1 AND logged_on <= $2",
    )
    .bind(child_id)
    .bind(today)
    .fetch_all(pool)
    .await?
    .iter()
    .map(|row| row.get("logged_on"))
    .collect();

    Ok(progress::child_stats(
        i64::from(child.total_stars),
        goals_completed,
        &dates,
        today,
    ))
}

pub async fn fetch_earned_badge_ids(
    pool: &PgPool,
    child_id: Uuid,
) -> anyhow::Result<HashSet<String>> {
    let rows = sqlx::query("SELECT badge_id FROM therapy_progress.child_badges WHERE child_id = $1")
        .bind(child_id)
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(|row| row.get("badge_id")).collect())
}

/// Evaluates the child's current stats and stores any newly qualifying
/// badges. Returns the badges that were actually inserted.
pub async fn refresh_badges(
    pool: &PgPool,
    child_id: Uuid,
    today: NaiveDate,
) -> anyhow::Result<Vec<&'static BadgeDefinition>> {
    let stats = fetch_child_stats(pool, child_id, today).await?;
    let earned = fetch_earned_badge_ids(pool, child_id).await?;
    let qualifying = badges::evaluate(&stats, &earned);

    if qualifying.is_empty() {
        tracing::debug!(child = %child_id, ?stats, "no new badges");
        return Ok(Vec::new());
    }

    let mut awarded = Vec::new();
    for badge in qualifying {
        if award_badges(pool, child_id, &[badge]).await? > 0 {
            awarded.push(badge);
        }
    }

    tracing::info!(child = %child_id, awarded = awarded.len(), "badges awarded");
    Ok(awarded)
}

pub async fn award_badges(
    pool: &PgPool,
    child_id: Uuid,
    badges: &[&BadgeDefinition],
) -> anyhow::Result<usize> {
    let mut inserted = 0usize;

    for badge in badges {
        let result = sqlx::query(
            r#"
            INSERT INTO therapy_progress.child_badges (id, child_id, badge_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (child_id, badge_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(child_id)
        .bind(badge.id)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}

pub async fn fetch_child_badges(pool: &PgPool, child_id: Uuid) -> anyhow::Result<Vec<ChildBadge>> {
    let rows = sqlx::query(
        "SELECT badge_id, earned_at FROM therapy_progress.child_badges \
         WHERE child_id = $1 ORDER BY earned_at",
    )
    .bind(child_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| ChildBadge {
            badge_id: row.get("badge_id"),
            earned_at: row.get("earned_at"),
        })
        .collect())
}

pub async fn fetch_screenings(
    pool: &PgPool,
    child_id: Uuid,
) -> anyhow::Result<Vec<ScreeningRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT id, total_score, risk_level, critical_count,
               requires_follow_up, message, created_at
        FROM therapy_progress.screenings
        WHERE child_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(child_id)
    .fetch_all(pool)
    .await?;

    let mut screenings = Vec::new();

    for row in rows {
        screenings.push(ScreeningRecord {
            id: row.get("id"),
            total_score: row.get("total_score"),
            risk_level: row.get("risk_level"),
            critical_count: row.get("critical_count"),
            requires_follow_up: row.get("requires_follow_up"),
            message: row.get("message"),
            created_at: row.get("created_at"),
        });
    }

    Ok(screenings)
}

pub async fn fetch_goals(pool: &PgPool, child_id: Uuid) -> anyhow::Result<Vec<GoalRecord>> {
    let rows = sqlx::query(
        "SELECT id, title, status, completed_on FROM therapy_progress.goals \
         WHERE child_id = $1 ORDER BY created_at",
    )
    .bind(child_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| GoalRecord {
            id: row.get("id"),
            title: row.get("title"),
            status: row.get("status"),
            completed_on: row.get("completed_on"),
        })
        .collect())
}

pub async fn fetch_recent_sessions(
    pool: &PgPool,
    child_id: Uuid,
    limit: i64,
) -> anyhow::Result<Vec<SessionLog>> {
    let rows = sqlx::query(
        "SELECT logged_on, stars_earned, note FROM therapy_progress.sessions \
         WHERE child_id = $1 ORDER BY logged_on DESC LIMIT $2",
    )
    .bind(child_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| SessionLog {
            logged_on: row.get("logged_on"),
            stars_earned: row.get("stars_earned"),
            note: row.get("note"),
        })
        .collect())
}
