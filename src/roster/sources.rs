// Ordered summoner spell sources tried per player

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::OnceCell;

use super::types::positive_i64;
use crate::error::LcuError;
use crate::lcu::types::{summoner_path, CHAMP_SELECT_SESSION_PATH, CURRENT_SUMMONER_PATH};
use crate::lcu::LcuApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpellPair {
  pub spell1: Option<i64>,
  pub spell2: Option<i64>,
}

impl SpellPair {
  pub fn from_record(record: &Value) -> Self {
    Self {
      spell1: positive_i64(record, "spell1Id"),
      spell2: positive_i64(record, "spell2Id"),
    }
  }

  pub fn any(&self) -> bool {
    self.spell1.is_some() || self.spell2.is_some()
  }

  /// Fill unresolved slots from `other`; resolved slots keep their value.
  pub fn fill_from(&mut self, other: SpellPair) {
    self.spell1 = self.spell1.or(other.spell1);
    self.spell2 = self.spell2.or(other.spell2);
  }
}

/// Shared state for one enrichment pass. Lookups that several players (or
/// several stages) need are fetched at most once per pass.
pub struct PassContext {
  api: LcuApi,
  champ_select: OnceCell<Result<Value, LcuError>>,
  current_summoner: OnceCell<Result<Value, LcuError>>,
}

impl PassContext {
  pub fn new(api: LcuApi) -> Self {
    Self {
      api,
      champ_select: OnceCell::new(),
      current_summoner: OnceCell::new(),
    }
  }

  pub fn api(&self) -> &LcuApi {
    &self.api
  }

  pub async fn champ_select_session(&self) -> Result<&Value, LcuError> {
    self
      .champ_select
      .get_or_init(|| self.api.get_json(CHAMP_SELECT_SESSION_PATH))
      .await
      .as_ref()
      .map_err(Clone::clone)
  }

  pub async fn current_summoner(&self) -> Result<&Value, LcuError> {
    self
      .current_summoner
      .get_or_init(|| self.api.get_json(CURRENT_SUMMONER_PATH))
      .await
      .as_ref()
      .map_err(Clone::clone)
  }
}

#[async_trait]
pub trait SpellSource: Send + Sync {
  /// Short stage name used in logs.
  fn name(&self) -> &'static str;

  async fn lookup(
    &self,
    record: &Value,
    summoner_id: u64,
    ctx: &PassContext,
  ) -> Result<SpellPair, LcuError>;
}

/// Stage 1: ids carried on the player record itself.
pub struct InlineSpells;

#[async_trait]
impl SpellSource for InlineSpells {
  fn name(&self) -> &'static str {
    "inline"
  }

  async fn lookup(&self, record: &Value, _: u64, _: &PassContext) -> Result<SpellPair, LcuError> {
    Ok(SpellPair::from_record(record))
  }
}

/// Stage 2: the same summoner inside the live champ select session.
pub struct ChampSelectSessionSpells;

#[async_trait]
impl SpellSource for ChampSelectSessionSpells {
  fn name(&self) -> &'static str {
    "champ-select-session"
  }

  async fn lookup(
    &self,
    _: &Value,
    summoner_id: u64,
    ctx: &PassContext,
  ) -> Result<SpellPair, LcuError> {
    if summoner_id == 0 {
      return Ok(SpellPair::default());
    }
    let session = ctx.champ_select_session().await?;
    let found = ["myTeam", "theirTeam"]
      .iter()
      .filter_map(|team| session.get(*team).and_then(|v| v.as_array()))
      .flatten()
      .find(|p| p.get("summonerId").and_then(|v| v.as_u64()) == Some(summoner_id));
    Ok(found.map(SpellPair::from_record).unwrap_or_default())
  }
}

/// Stage 3: the summoner's profile fetched by id.
pub struct SummonerProfileSpells;

#[async_trait]
impl SpellSource for SummonerProfileSpells {
  fn name(&self) -> &'static str {
    "summoner-profile"
  }

  async fn lookup(
    &self,
    _: &Value,
    summoner_id: u64,
    ctx: &PassContext,
  ) -> Result<SpellPair, LcuError> {
    if summoner_id == 0 {
      return Ok(SpellPair::default());
    }
    let profile = ctx.api().get_json(&summoner_path(summoner_id)).await?;
    Ok(SpellPair::from_record(&profile))
  }
}

/// Stage 4: the first champ select action that belongs to the summoner.
pub struct PendingActionSpells;

#[async_trait]
impl SpellSource for PendingActionSpells {
  fn name(&self) -> &'static str {
    "pending-actions"
  }

  async fn lookup(
    &self,
    _: &Value,
    summoner_id: u64,
    ctx: &PassContext,
  ) -> Result<SpellPair, LcuError> {
    if summoner_id == 0 {
      return Ok(SpellPair::default());
    }
    let session = ctx.champ_select_session().await?;
    let Some(groups) = session.get("actions").and_then(|v| v.as_array()) else {
      return Ok(SpellPair::default());
    };

    for group in groups {
      for action in group.as_array().into_iter().flatten() {
        if action.get("summonerId").and_then(|v| v.as_u64()) == Some(summoner_id) {
          let pair = SpellPair::from_record(action);
          if pair.any() {
            return Ok(pair);
          }
        }
      }
    }
    Ok(SpellPair::default())
  }
}

/// Stage 5: the local player's own profile. Only applies to the local player.
pub struct CurrentSummonerSpells;

#[async_trait]
impl SpellSource for CurrentSummonerSpells {
  fn name(&self) -> &'static str {
    "current-summoner"
  }

  async fn lookup(
    &self,
    _: &Value,
    summoner_id: u64,
    ctx: &PassContext,
  ) -> Result<SpellPair, LcuError> {
    if summoner_id == 0 {
      return Ok(SpellPair::default());
    }
    let me = ctx.current_summoner().await?;
    if me.get("summonerId").and_then(|v| v.as_u64()) != Some(summoner_id) {
      return Ok(SpellPair::default());
    }
    Ok(SpellPair::from_record(me))
  }
}

/// Full champ select cascade, in priority order.
pub fn champ_select_cascade() -> Vec<Box<dyn SpellSource>> {
  vec![
    Box::new(InlineSpells),
    Box::new(ChampSelectSessionSpells),
    Box::new(SummonerProfileSpells),
    Box::new(PendingActionSpells),
    Box::new(CurrentSummonerSpells),
  ]
}

/// In game only the participant record is authoritative.
pub fn in_game_cascade() -> Vec<Box<dyn SpellSource>> {
  vec![Box::new(InlineSpells)]
}
