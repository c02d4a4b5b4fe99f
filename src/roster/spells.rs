// Static summoner spell id -> name table

use super::types::UNSELECTED;

pub fn lookup_spell(spell_id: i64) -> Option<&'static str> {
  let name = match spell_id {
    1 => "Cleanse",
    3 => "Exhaust",
    4 => "Flash",
    6 => "Ghost",
    7 => "Heal",
    11 => "Smite",
    12 => "Teleport",
    13 => "Clarity",
    14 => "Ignite",
    21 => "Barrier",
    30 => "To the King!",
    31 => "Poro Toss",
    32 => "Mark",
    39 => "Mark",
    54 => "Placeholder",
    55 => "Placeholder and Attack-Smite",
    2201 => "Flee",
    2202 => "Flash",
    _ => return None,
  };
  Some(name)
}

/// Display name for a spell slot. Never empty.
pub fn spell_name(spell_id: Option<i64>) -> String {
  match spell_id {
    None => UNSELECTED.to_string(),
    Some(id) => lookup_spell(id)
      .map(|name| name.to_string())
      .unwrap_or_else(|| format!("Spell {}", id)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_common_spells_resolve() {
    assert_eq!(spell_name(Some(4)), "Flash");
    assert_eq!(spell_name(Some(14)), "Ignite");
    assert_eq!(spell_name(Some(11)), "Smite");
  }

  #[test]
  fn test_unknown_spell_is_labeled_generic() {
    for id in [2, 99, 4242] {
      let name = spell_name(Some(id));
      assert_eq!(name, format!("Spell {}", id));
    }
  }

  #[test]
  fn test_missing_spell_is_unselected() {
    assert_eq!(spell_name(None), "Unselected");
  }
}
