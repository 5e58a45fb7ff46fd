//! Player accounts and win/loss records

use serde::{Deserialize, Serialize};
use tracing::info;

use super::supabase::{StoreError, SupabaseClient};

/// Leaderboard size served by the HTTP API
pub const LEADERBOARD_SIZE: usize = 10;

/// Row in the `users` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub wins: i32,
    pub losses: i32,
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// New user for insertion
#[derive(Debug, Clone, Serialize)]
struct NewUser<'a> {
    username: &'a str,
}

/// One leaderboard row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub username: String,
    pub wins: i32,
    pub losses: i32,
}

/// Counter bump written after a finished match
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wins: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub losses: Option<i32>,
}

impl StatsUpdate {
    pub fn for_result(user: &UserRecord, won: bool) -> Self {
        if won {
            Self {
                wins: Some(user.wins + 1),
                losses: None,
            }
        } else {
            Self {
                wins: None,
                losses: Some(user.losses + 1),
            }
        }
    }
}

fn by_username(username: &str) -> [(&'static str, String); 1] {
    [("username", format!("eq.{username}"))]
}

fn by_id(user_id: i64) -> [(&'static str, String); 1] {
    [("id", format!("eq.{user_id}"))]
}

fn top_query(limit: usize) -> [(&'static str, String); 3] {
    [
        ("select", "username,wins,losses".to_string()),
        ("order", "wins.desc".to_string()),
        ("limit", limit.to_string()),
    ]
}

/// User store operations
#[derive(Clone)]
pub struct UserStore {
    client: SupabaseClient,
}

impl UserStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    /// Look a user up by name, creating the account on first login
    pub async fn get_or_create_user(&self, username: &str) -> Result<UserRecord, StoreError> {
        if let Some(user) = self.client.get_one("users", &by_username(username)).await? {
            return Ok(user);
        }
        let user: UserRecord = self.client.insert("users", &NewUser { username }).await?;
        info!(user_id = user.id, username = %user.username, "Created user");
        Ok(user)
    }

    /// Add one win or one loss to a user's record
    pub async fn record_result(&self, user_id: i64, won: bool) -> Result<(), StoreError> {
        let user: UserRecord = self
            .client
            .get_one("users", &by_id(user_id))
            .await?
            .ok_or(StoreError::UserNotFound(user_id))?;

        self.client
            .update("users", &by_id(user_id), &StatsUpdate::for_result(&user, won))
            .await?;
        info!(user_id, won, "Recorded match result");
        Ok(())
    }

    /// Users with the most wins, best first
    pub async fn top_players(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StoreError> {
        self.client.get("users", &top_query(limit)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserRecord {
        UserRecord {
            id: 7,
            username: "neo".to_string(),
            wins: 3,
            losses: 1,
            created_at: None,
        }
    }

    #[test]
    fn win_bumps_only_wins() {
        let update = StatsUpdate::for_result(&user(), true);
        assert_eq!(update.wins, Some(4));
        assert_eq!(update.losses, None);
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({ "wins": 4 }));
    }

    #[test]
    fn loss_bumps_only_losses() {
        let json = serde_json::to_value(StatsUpdate::for_result(&user(), false)).unwrap();
        assert_eq!(json, serde_json::json!({ "losses": 2 }));
    }

    #[test]
    fn filters_use_postgrest_syntax() {
        assert_eq!(by_username("neo")[0], ("username", "eq.neo".to_string()));
        assert_eq!(by_id(42)[0], ("id", "eq.42".to_string()));
        let top = top_query(LEADERBOARD_SIZE);
        assert_eq!(top[1].1, "wins.desc");
        assert_eq!(top[2].1, "10");
    }

    #[test]
    fn user_row_without_timestamp_parses() {
        let row: UserRecord =
            serde_json::from_str(r#"{"id":1,"username":"trinity","wins":0,"losses":0}"#).unwrap();
        assert_eq!(row.username, "trinity");
        assert!(row.created_at.is_none());
    }
}
