// Roster data structures and raw-record field extraction

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::lcu::GamePhase;

pub const UNSELECTED: &str = "Unselected";
pub const UNKNOWN_PLAYER: &str = "Unknown Player";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatStats {
  pub kills: u32,
  pub deaths: u32,
  pub assists: u32,
  pub cs: u32,
  pub gold: u32,
  pub level: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Runes {
  pub primary_style: Option<i64>,
  pub sub_style: Option<i64>,
  pub perk_ids: Vec<i64>,
}

/// One resolved player. `summoner_id` is the identity; everything else is
/// derived from the raw record and replaced wholesale on the next pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
  pub summoner_id: u64,
  pub display_name: String,
  pub cell_id: Option<i64>,
  pub team_id: Option<i64>,
  pub champion_id: Option<i64>,
  pub champion_name: String,
  pub assigned_position: Option<String>,
  pub spell1_id: Option<i64>,
  pub spell2_id: Option<i64>,
  pub spell1_name: String,
  pub spell2_name: String,
  pub stats: Option<CombatStats>,
  pub runes: Option<Runes>,
  #[serde(default)]
  pub items: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterSnapshot {
  pub phase: GamePhase,
  pub their_team: Vec<PlayerView>,
  pub my_team: Vec<PlayerView>,
  /// Payload the rosters were computed from, kept for diagnostics.
  pub raw_source: Option<Value>,
  pub captured_at: DateTime<Utc>,
}

impl RosterSnapshot {
  pub fn empty(phase: GamePhase) -> Self {
    Self {
      phase,
      their_team: Vec::new(),
      my_team: Vec::new(),
      raw_source: None,
      captured_at: Utc::now(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.their_team.is_empty() && self.my_team.is_empty()
  }

  pub fn players(&self) -> impl Iterator<Item = &PlayerView> {
    self.my_team.iter().chain(self.their_team.iter())
  }

  pub fn find_player(&self, summoner_id: u64) -> Option<&PlayerView> {
    self.players().find(|p| p.summoner_id == summoner_id)
  }
}

// Field helpers for raw player records. The client omits, nulls or zeroes
// fields depending on phase and queue, so zero is treated as absent.

pub fn positive_i64(record: &Value, key: &str) -> Option<i64> {
  record.get(key).and_then(|v| v.as_i64()).filter(|v| *v > 0)
}

pub fn summoner_id_of(record: &Value) -> u64 {
  record
    .get("summonerId")
    .and_then(|v| v.as_u64())
    .unwrap_or_default()
}

pub fn display_name_of(record: &Value) -> String {
  let field = |key: &str| {
    record
      .get(key)
      .and_then(|v| v.as_str())
      .map(str::trim)
      .filter(|s| !s.is_empty())
  };

  match (field("gameName"), field("tagLine")) {
    (Some(name), Some(tag)) => format!("{}#{}", name, tag),
    (Some(name), None) => name.to_string(),
    _ => field("summonerName")
      .or_else(|| field("displayName"))
      .map(|s| s.to_string())
      .unwrap_or_else(|| UNKNOWN_PLAYER.to_string()),
  }
}

pub fn position_of(record: &Value) -> Option<String> {
  ["assignedPosition", "selectedPosition", "position"]
    .iter()
    .filter_map(|key| record.get(*key).and_then(|v| v.as_str()))
    .map(|s| s.trim())
    .find(|s| !s.is_empty() && !s.eq_ignore_ascii_case("NONE"))
    .map(|s| s.to_string())
}

pub fn stats_of(record: &Value) -> Option<CombatStats> {
  let stats = record.get("stats")?.as_object()?;
  let field = |key: &str| {
    stats
      .get(key)
      .and_then(|v| v.as_u64())
      .map(saturating_u32)
      .unwrap_or_default()
  };
  Some(CombatStats {
    kills: field("kills"),
    deaths: field("deaths"),
    assists: field("assists"),
    cs: field("cs"),
    gold: field("gold"),
    level: stats
      .get("level")
      .and_then(|v| v.as_u64())
      .map(saturating_u32)
      .unwrap_or(1),
  })
}

fn saturating_u32(value: u64) -> u32 {
  u32::try_from(value).unwrap_or(u32::MAX)
}

pub fn runes_of(record: &Value) -> Option<Runes> {
  let perks = record.get("perks")?;
  let perk_ids: Vec<i64> = perks
    .get("perkIds")
    .and_then(|v| v.as_array())
    .map(|ids| ids.iter().filter_map(|id| id.as_i64()).collect())
    .unwrap_or_default();

  let primary_style = positive_i64(perks, "perkStyle").or_else(|| perk_ids.first().copied());
  let sub_style = positive_i64(perks, "perkSubStyle").or_else(|| perk_ids.get(5).copied());

  if perk_ids.is_empty() && primary_style.is_none() && sub_style.is_none() {
    return None;
  }
  Some(Runes {
    primary_style,
    sub_style,
    perk_ids,
  })
}

pub fn items_of(record: &Value) -> Vec<i64> {
  record
    .get("items")
    .and_then(|v| v.as_array())
    .map(|items| {
      items
        .iter()
        .filter_map(|item| item.as_i64().or_else(|| item.get("itemID").and_then(|v| v.as_i64())))
        .filter(|id| *id > 0)
        .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_display_name_prefers_riot_id() {
    assert_eq!(display_name_of(&json!({"gameName": "Faker", "tagLine": "KR1"})), "Faker#KR1");
    assert_eq!(display_name_of(&json!({"gameName": "Faker"})), "Faker");
    assert_eq!(display_name_of(&json!({"gameName": "", "summonerName": "Old"})), "Old");
    assert_eq!(display_name_of(&json!({})), UNKNOWN_PLAYER);
  }

  #[test]
  fn test_zero_ids_are_absent() {
    let record = json!({"championId": 0, "spell1Id": 4});
    assert_eq!(positive_i64(&record, "championId"), None);
    assert_eq!(positive_i64(&record, "spell1Id"), Some(4));
    assert_eq!(positive_i64(&record, "spell2Id"), None);
  }

  #[test]
  fn test_position_skips_empty_values() {
    assert_eq!(position_of(&json!({"assignedPosition": "", "selectedPosition": "JUNGLE"})), Some("JUNGLE".into()));
    assert_eq!(position_of(&json!({"selectedPosition": "NONE"})), None);
  }

  #[test]
  fn test_runes_from_perk_ids() {
    let runes = runes_of(&json!({"perks": {"perkIds": [8005, 9111, 9104, 8299, 8473, 8400, 5008]}})).unwrap();
    assert_eq!(runes.primary_style, Some(8005));
    assert_eq!(runes.sub_style, Some(8400));
    assert_eq!(runes.perk_ids.len(), 7);
    assert!(runes_of(&json!({})).is_none());
  }

  #[test]
  fn test_stats_default_level_is_one() {
    let stats = stats_of(&json!({"stats": {"kills": 3, "deaths": 1}})).unwrap();
    assert_eq!(stats.kills, 3);
    assert_eq!(stats.level, 1);
    assert!(stats_of(&json!({"championId": 1})).is_none());
  }

  #[test]
  fn test_oversized_stats_saturate() {
    let stats = stats_of(&json!({"stats": {"gold": 4_294_967_296u64, "kills": 2}})).unwrap();
    assert_eq!(stats.gold, u32::MAX);
    assert_eq!(stats.kills, 2);
  }

  #[test]
  fn test_snapshot_find_player_searches_both_teams() {
    let mut snapshot = RosterSnapshot::empty(GamePhase::ChampSelect);
    assert!(snapshot.is_empty());
    snapshot.their_team.push(PlayerView {
      summoner_id: 7,
      display_name: "x".into(),
      cell_id: None,
      team_id: None,
      champion_id: None,
      champion_name: UNSELECTED.into(),
      assigned_position: None,
      spell1_id: None,
      spell2_id: None,
      spell1_name: UNSELECTED.into(),
      spell2_name: UNSELECTED.into(),
      stats: None,
      runes: None,
      items: Vec::new(),
    });
    assert!(snapshot.find_player(7).is_some());
    assert!(!snapshot.is_empty());
  }
}
