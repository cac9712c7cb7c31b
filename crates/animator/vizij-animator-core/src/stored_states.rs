use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::AnimatorError;
use crate::state::{Next, StateDef, StateTable, Transition};

/// Public API: parse the data-only part of a state table from JSON.
///
/// ```json
/// {
///   "initial": { "duration": 300, "transition": "idle" },
///   "idle":    { "duration": 1200, "loop": true, "delayAfter": 100 },
///   "exit":    { "duration": 200, "overflow": false, "transition": "stop" }
/// }
/// ```
///
/// Notes:
/// - Keys are camelCase (`delayBefore`, `delayAfter`); snake_case aliases are accepted.
/// - `transition`/`interrupt` are a state name, `"stop"`, `"pause"`, or `false`.
/// - Callbacks cannot be expressed in JSON; attach them to the returned defs
///   (`def.on_animation(..)`) before building the table.
/// - Entries keep file order.
pub fn parse_stored_states_json<P>(s: &str) -> Result<Vec<(String, StateDef<P>)>, AnimatorError> {
    let stored: IndexMap<String, StoredState> = serde_json::from_str(s)?;
    stored
        .into_iter()
        .map(|(name, st)| {
            let def = to_state_def(&name, st)?;
            Ok((name, def))
        })
        .collect()
}

/// Parse and normalize in one go, for tables that need no callbacks.
pub fn parse_stored_state_table_json<P>(s: &str) -> Result<StateTable<P>, AnimatorError> {
    StateTable::new(parse_stored_states_json(s)?)
}

fn to_state_def<P>(name: &str, st: StoredState) -> Result<StateDef<P>, AnimatorError> {
    Ok(StateDef {
        duration: st.duration,
        delay_before: st.delay_before,
        delay_after: st.delay_after,
        looped: st.looped,
        overflow: st.overflow,
        transition: st
            .transition
            .map(|t| to_transition(name, "transition", t))
            .transpose()?,
        interrupt: st
            .interrupt
            .map(|t| to_transition(name, "interrupt", t))
            .transpose()?,
        animation: None,
        setup: None,
    })
}

fn to_transition<P>(
    state: &str,
    field: &str,
    t: StoredTransition,
) -> Result<Transition<P>, AnimatorError> {
    match t {
        StoredTransition::Name(target) => Ok(Transition::from(target)),
        StoredTransition::Flag(false) => Ok(Transition::Fixed(Next::Stay)),
        StoredTransition::Flag(true) => Err(AnimatorError::Parse {
            reason: format!("state '{state}': {field} must be a state name or false, got true"),
        }),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct StoredState {
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default, alias = "delay_before")]
    delay_before: Option<f64>,
    #[serde(default, alias = "delay_after")]
    delay_after: Option<f64>,
    #[serde(default, rename = "loop")]
    looped: Option<bool>,
    #[serde(default)]
    overflow: Option<bool>,
    #[serde(default)]
    transition: Option<StoredTransition>,
    #[serde(default)]
    interrupt: Option<StoredTransition>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredTransition {
    Name(String),
    Flag(bool),
}
