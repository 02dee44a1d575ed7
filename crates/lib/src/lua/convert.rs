//! Conversions between Lua values and JSON.
//!
//! Used to render output trees and to carry package resolver configuration
//! as plain data. Functions and userdata have no JSON form and render as
//! `"<function>"` / `"<userdata>"`.

use mlua::prelude::*;
use serde_json::{Map, Number, Value};

/// Tables nested deeper than this render as `"<...>"`, which also stops cycles.
const MAX_DEPTH: usize = 32;

pub fn to_json(value: &LuaValue) -> Value {
  to_json_depth(value, 0)
}

fn to_json_depth(value: &LuaValue, depth: usize) -> Value {
  match value {
    LuaValue::Nil => Value::Null,
    LuaValue::Boolean(b) => Value::Bool(*b),
    LuaValue::Integer(i) => Value::Number((*i).into()),
    LuaValue::Number(n) => Number::from_f64(*n).map(Value::Number).unwrap_or(Value::Null),
    LuaValue::String(s) => Value::String(s.to_string_lossy()),
    LuaValue::Table(_) if depth >= MAX_DEPTH => Value::String("<...>".to_string()),
    LuaValue::Table(t) => table_to_json(t, depth),
    LuaValue::Function(_) => Value::String("<function>".to_string()),
    LuaValue::UserData(_) | LuaValue::LightUserData(_) => Value::String("<userdata>".to_string()),
    other => Value::String(format!("<{}>", other.type_name())),
  }
}

fn table_to_json(table: &LuaTable, depth: usize) -> Value {
  let len = table.raw_len();
  let pairs: Vec<(LuaValue, LuaValue)> = table.pairs::<LuaValue, LuaValue>().filter_map(Result::ok).collect();

  if len > 0 && pairs.len() == len {
    let items = (1..=len)
      .map(|i| {
        let item = table.raw_get::<LuaValue>(i).unwrap_or(LuaValue::Nil);
        to_json_depth(&item, depth + 1)
      })
      .collect();
    return Value::Array(items);
  }

  // serde_json's Map is ordered by key, which keeps the output stable.
  let mut map = Map::new();
  for (k, v) in pairs {
    let key = match &k {
      LuaValue::String(s) => s.to_string_lossy(),
      LuaValue::Integer(i) => i.to_string(),
      LuaValue::Number(n) => n.to_string(),
      LuaValue::Boolean(b) => b.to_string(),
      other => format!("<{}>", other.type_name()),
    };
    map.insert(key, to_json_depth(&v, depth + 1));
  }
  Value::Object(map)
}

pub fn from_json(lua: &Lua, value: &Value) -> LuaResult<LuaValue> {
  Ok(match value {
    Value::Null => LuaValue::Nil,
    Value::Bool(b) => LuaValue::Boolean(*b),
    Value::Number(n) => match n.as_i64() {
      Some(i) => LuaValue::Integer(i),
      None => LuaValue::Number(n.as_f64().unwrap_or_default()),
    },
    Value::String(s) => LuaValue::String(lua.create_string(s)?),
    Value::Array(items) => {
      let table = lua.create_table()?;
      for (i, item) in items.iter().enumerate() {
        table.raw_set(i + 1, from_json(lua, item)?)?;
      }
      LuaValue::Table(table)
    }
    Value::Object(map) => {
      let table = lua.create_table()?;
      for (k, v) in map {
        table.raw_set(k.as_str(), from_json(lua, v)?)?;
      }
      LuaValue::Table(table)
    }
  })
}
