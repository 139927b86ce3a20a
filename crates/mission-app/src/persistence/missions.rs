//! Mission persistence operations.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use mission_core::{Mission, MissionId, MissionPoint, PointId};
use sqlx::SqlitePool;
use std::collections::HashMap;

/// Fixed-width timestamps so text ordering matches time ordering.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Write a mission and replace its stored points.
pub async fn save_mission(pool: &SqlitePool, mission: &Mission) -> Result<()> {
    let mission_id = mission.id.to_string();
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO missions (mission_id, name, created_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(mission_id) DO UPDATE SET
            name = ?2
        "#,
    )
    .bind(&mission_id)
    .bind(&mission.name)
    .bind(timestamp(&mission.created_at))
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM mission_points WHERE mission_id = ?1")
        .bind(&mission_id)
        .execute(&mut *tx)
        .await?;

    for (seq, point) in mission.points.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO mission_points (point_id, mission_id, seq, lat, lon)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(point.id.to_string())
        .bind(&mission_id)
        .bind(seq as i64)
        .bind(point.coordinate.latitude)
        .bind(point.coordinate.longitude)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Load all missions, oldest first.
pub async fn load_missions(pool: &SqlitePool) -> Result<Vec<Mission>> {
    let rows = sqlx::query_as::<_, MissionRow>(
        "SELECT mission_id, name, created_at FROM missions ORDER BY created_at ASC, mission_id ASC",
    )
    .fetch_all(pool)
    .await?;

    let point_rows = sqlx::query_as::<_, PointRow>(
        "SELECT point_id, mission_id, lat, lon FROM mission_points ORDER BY mission_id, seq",
    )
    .fetch_all(pool)
    .await?;

    let mut points: HashMap<String, Vec<MissionPoint>> = HashMap::new();
    for row in point_rows {
        let owner = row.mission_id.clone();
        points.entry(owner).or_default().push(row.try_into()?);
    }

    rows.into_iter()
        .map(|row| {
            let owned = points.remove(&row.mission_id).unwrap_or_default();
            let mission: Mission = row.try_into()?;
            Ok(mission.with_points(owned))
        })
        .collect()
}

/// Load a single mission by ID.
pub async fn load_mission(pool: &SqlitePool, id: MissionId) -> Result<Option<Mission>> {
    let mission_id = id.to_string();
    let row = sqlx::query_as::<_, MissionRow>(
        "SELECT mission_id, name, created_at FROM missions WHERE mission_id = ?1",
    )
    .bind(&mission_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let point_rows = sqlx::query_as::<_, PointRow>(
        "SELECT point_id, mission_id, lat, lon FROM mission_points WHERE mission_id = ?1 ORDER BY seq",
    )
    .bind(&mission_id)
    .fetch_all(pool)
    .await?;
    let points = point_rows
        .into_iter()
        .map(MissionPoint::try_from)
        .collect::<Result<Vec<_>>>()?;

    let mission: Mission = row.try_into()?;
    Ok(Some(mission.with_points(points)))
}

/// Delete a mission and its points.
pub async fn delete_mission(pool: &SqlitePool, id: MissionId) -> Result<bool> {
    let mission_id = id.to_string();
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM mission_points WHERE mission_id = ?1")
        .bind(&mission_id)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM missions WHERE mission_id = ?1")
        .bind(&mission_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}

// Internal row types for SQLx
#[derive(sqlx::FromRow)]
struct MissionRow {
    mission_id: String,
    name: Option<String>,
    created_at: String,
}

#[derive(sqlx::FromRow)]
struct PointRow {
    point_id: String,
    mission_id: String,
    lat: f64,
    lon: f64,
}

impl TryFrom<MissionRow> for Mission {
    type Error = anyhow::Error;

    fn try_from(row: MissionRow) -> Result<Self> {
        let id: MissionId = row
            .mission_id
            .parse()
            .with_context(|| format!("invalid mission id {:?}", row.mission_id))?;
        let created_at = DateTime::parse_from_rfc3339(&row.created_at)
            .with_context(|| format!("invalid created_at {:?}", row.created_at))?
            .with_timezone(&Utc);

        Ok(Mission {
            id,
            name: row.name,
            created_at,
            points: Vec::new(),
        })
    }
}

impl TryFrom<PointRow> for MissionPoint {
    type Error = anyhow::Error;

    fn try_from(row: PointRow) -> Result<Self> {
        let id: PointId = row
            .point_id
            .parse()
            .with_context(|| format!("invalid point id {:?}", row.point_id))?;
        let mut point = MissionPoint::new(row.lat, row.lon);
        point.id = id;
        Ok(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::init_database;

    #[tokio::test]
    async fn test_save_replaces_points() {
        let db = init_database(":memory:", 1).await.unwrap();
        let mut mission = Mission::new().with_points(vec![
            MissionPoint::new(40.6892, -74.0445),
            MissionPoint::new(40.6901, -74.0450),
            MissionPoint::new(40.6910, -74.0460),
        ]);
        save_mission(db.pool(), &mission).await.unwrap();

        let removed = mission.points[1].id;
        mission.remove(removed);
        save_mission(db.pool(), &mission).await.unwrap();

        let loaded = load_mission(db.pool(), mission.id).await.unwrap().unwrap();
        assert_eq!(loaded.points, mission.points);
        assert!(!loaded.contains(removed));
    }

    #[tokio::test]
    async fn test_load_missing_mission() {
        let db = init_database(":memory:", 1).await.unwrap();
        assert!(load_mission(db.pool(), MissionId::new()).await.unwrap().is_none());
        assert!(!delete_mission(db.pool(), MissionId::new()).await.unwrap());
    }
}
