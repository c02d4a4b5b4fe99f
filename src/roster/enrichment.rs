// Enrichment: raw player records -> PlayerView

use futures_util::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};

use super::champions::champion_name;
use super::sources::{champ_select_cascade, in_game_cascade, PassContext, SpellPair, SpellSource};
use super::spells::spell_name;
use super::types::{
  display_name_of, items_of, position_of, positive_i64, runes_of, stats_of, summoner_id_of,
  PlayerView,
};
use crate::error::LcuError;

/// Resolves one team at a time. Players are enriched concurrently; each
/// player's spell cascade runs its stages in order.
pub struct Enricher {
  sources: Vec<Box<dyn SpellSource>>,
  with_match_details: bool,
}

impl Enricher {
  pub fn new(sources: Vec<Box<dyn SpellSource>>) -> Self {
    Self {
      sources,
      with_match_details: false,
    }
  }

  pub fn champ_select() -> Self {
    Self::new(champ_select_cascade())
  }

  /// Participant records: inline spells only, plus stats, runes and items.
  pub fn in_game() -> Self {
    Self {
      sources: in_game_cascade(),
      with_match_details: true,
    }
  }

  pub async fn enrich_team(&self, team: &[Value], ctx: &PassContext) -> Vec<PlayerView> {
    join_all(team.iter().map(|record| self.enrich_player(record, ctx))).await
  }

  pub async fn enrich_player(&self, record: &Value, ctx: &PassContext) -> PlayerView {
    let summoner_id = summoner_id_of(record);
    let champion_id = positive_i64(record, "championId");
    let spells = self.resolve_spells(record, summoner_id, ctx).await;

    let mut view = PlayerView {
      summoner_id,
      display_name: display_name_of(record),
      cell_id: record.get("cellId").and_then(|v| v.as_i64()),
      team_id: record
        .get("teamId")
        .or_else(|| record.get("team"))
        .and_then(|v| v.as_i64()),
      champion_id,
      champion_name: champion_name(champion_id),
      assigned_position: position_of(record),
      spell1_id: spells.spell1,
      spell2_id: spells.spell2,
      spell1_name: spell_name(spells.spell1),
      spell2_name: spell_name(spells.spell2),
      stats: None,
      runes: None,
      items: Vec::new(),
    };

    if self.with_match_details {
      view.stats = stats_of(record);
      view.runes = runes_of(record);
      view.items = items_of(record);
    }
    view
  }

  /// Walk the sources until one of them yields an id for either slot.
  /// Failing stages count as "no answer".
  pub async fn resolve_spells(&self, record: &Value, summoner_id: u64, ctx: &PassContext) -> SpellPair {
    let mut resolved = SpellPair::default();

    for source in &self.sources {
      if resolved.any() {
        break;
      }
      match source.lookup(record, summoner_id, ctx).await {
        Ok(pair) => {
          if pair.any() {
            debug!(
              target: "lcu::enrichment",
              "[LCU Enrichment] summoner {} spells from {}: {:?}/{:?}",
              summoner_id,
              source.name(),
              pair.spell1,
              pair.spell2
            );
          }
          resolved.fill_from(pair);
        }
        Err(err) => {
          let err = LcuError::Enrichment {
            stage: source.name(),
            summoner_id,
            reason: err.to_string(),
          };
          warn!(target: "lcu::enrichment", "[LCU Enrichment] {}", err);
        }
      }
    }
    resolved
  }
}
