//! Mission storage integration tests against an in-memory SQLite database.

use chrono::{Duration, Utc};
use mission_app::persistence::{init_database, missions, Database};
use mission_app::state::AppState;
use mission_core::{Mission, MissionPoint};
use sqlx::Row;

async fn memory_db() -> Database {
    init_database(":memory:", 1).await.unwrap()
}

fn liberty_island() -> Mission {
    Mission::new().with_name("Liberty Island").with_points(vec![
        MissionPoint::new(40.6892, -74.0445),
        MissionPoint::new(40.6880, -74.0470),
        MissionPoint::new(40.6904, -74.0460),
        MissionPoint::new(40.6909, -74.0433),
    ])
}

#[tokio::test]
async fn test_point_order_survives_reload() {
    let db = memory_db().await;
    let mut mission = liberty_island();
    // Reorder so stored order differs from creation order.
    let last = mission.points.pop().unwrap();
    mission.insert_at(0, last);
    missions::save_mission(db.pool(), &mission).await.unwrap();

    let loaded = missions::load_mission(db.pool(), mission.id)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(loaded.points, mission.points);
    assert_eq!(loaded.name.as_deref(), Some("Liberty Island"));
    assert_eq!(loaded.created_at, mission.created_at);
}

#[tokio::test]
async fn test_missions_load_oldest_first() {
    let db = memory_db().await;
    let base = Utc::now();

    let mut newest = Mission::new().with_name("newest");
    newest.created_at = base + Duration::minutes(5);
    let mut oldest = Mission::new().with_name("oldest");
    oldest.created_at = base - Duration::days(1);
    let mut middle = Mission::new().with_name("middle");
    middle.created_at = base;

    for mission in [&newest, &oldest, &middle] {
        missions::save_mission(db.pool(), mission).await.unwrap();
    }

    let names: Vec<String> = missions::load_missions(db.pool())
        .await
        .unwrap()
        .into_iter()
        .filter_map(|m| m.name)
        .collect();
    assert_eq!(names, vec!["oldest", "middle", "newest"]);
}

#[tokio::test]
async fn test_delete_removes_points() {
    let db = memory_db().await;
    let doomed = liberty_island();
    let kept = liberty_island();
    missions::save_mission(db.pool(), &doomed).await.unwrap();
    missions::save_mission(db.pool(), &kept).await.unwrap();

    assert!(missions::delete_mission(db.pool(), doomed.id).await.unwrap());

    let row = sqlx::query("SELECT COUNT(*) AS n FROM mission_points WHERE mission_id = ?1")
        .bind(doomed.id.to_string())
        .fetch_one(db.pool())
        .await
        .unwrap();
    let orphans: i64 = row.get("n");
    assert_eq!(orphans, 0);

    let remaining = missions::load_missions(db.pool()).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].points.len(), kept.points.len());
}

#[tokio::test]
async fn test_state_writes_through() {
    let db = memory_db().await;
    let state = AppState::with_database(db.clone()).await.unwrap();

    let mut mission = state.create_mission(Some("survey".to_string())).await;
    mission.append(MissionPoint::new(51.5007, -0.1246));
    mission.append(MissionPoint::new(51.5014, -0.1419));
    state.persist_mission(&mission).await;

    let reloaded = AppState::with_database(db).await.unwrap();
    let listed = reloaded.list_missions();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, mission.id);
    assert_eq!(listed[0].points, mission.points);
}
