//! Namespace merge combinator.
//!
//! A namespace is a name → value mapping. Producers are applied in sequence
//! order and merged with shallow override: when two producers contribute the
//! same name, the one processed last wins.

use std::collections::BTreeMap;

use mlua::prelude::*;
use tracing::trace;

/// Name → Lua value mapping produced by one or more components.
pub type Namespace = BTreeMap<String, LuaValue>;

/// Apply `to_namespace` to every item and merge the results, last wins.
pub fn union_for<T, V, E, F>(items: impl IntoIterator<Item = T>, mut to_namespace: F) -> Result<BTreeMap<String, V>, E>
where
  F: FnMut(T) -> Result<BTreeMap<String, V>, E>,
{
  let mut merged = BTreeMap::new();
  for item in items {
    for (name, value) in to_namespace(item)? {
      if merged.insert(name.clone(), value).is_some() {
        trace!(%name, "shadowed by later producer");
      }
    }
  }
  Ok(merged)
}

/// Build `key → f(key)` for every key.
pub fn dict<K, V, F>(keys: impl IntoIterator<Item = K>, mut f: F) -> BTreeMap<K, V>
where
  K: Ord + Clone,
  F: FnMut(&K) -> V,
{
  keys.into_iter().map(|k| (k.clone(), f(&k))).collect()
}

/// Merge `overlay` over `base`, overlay wins.
pub fn merge_over<V: Clone>(base: &BTreeMap<String, V>, overlay: &BTreeMap<String, V>) -> BTreeMap<String, V> {
  let mut merged = base.clone();
  merged.extend(overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
  merged
}

/// Read the string-keyed entries of a Lua table. Non-string keys are ignored.
pub fn from_table(table: &LuaTable) -> LuaResult<Namespace> {
  let mut ns = Namespace::new();
  for pair in table.pairs::<LuaValue, LuaValue>() {
    let (key, value) = pair?;
    if let LuaValue::String(key) = key {
      ns.insert(key.to_string_lossy(), value);
    }
  }
  Ok(ns)
}

pub fn to_table(lua: &Lua, ns: &Namespace) -> LuaResult<LuaTable> {
  let table = lua.create_table()?;
  for (name, value) in ns {
    table.set(name.as_str(), value.clone())?;
  }
  Ok(table)
}
