//! The game engine contract.
//!
//! A session actor drives an engine but never looks inside it. State and
//! actions cross this boundary as opaque [`serde_json::Value`]s, so one
//! server can host many kinds of games behind a single [`EngineFactory`].
//!
//! Game developers usually implement the typed [`GameLogic`] trait and wrap
//! it in a [`LogicEngine`]; the wrapper does the JSON conversions.

use std::collections::HashMap;
use std::marker::PhantomData;

use plank_protocol::ParticipantId;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

/// Errors raised while constructing an engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No engine is registered under this game name.
    #[error("unknown game: {0}")]
    UnknownGame(String),
}

/// One live engine instance, owned by exactly one session actor.
///
/// The actor calls it strictly one call at a time.
pub trait GameEngine: Send + 'static {
    /// Produces the starting state of a brand-new session.
    ///
    /// Only called on creation, never on rehydration: the engine is the
    /// authority on what a fresh game looks like.
    fn initial_state(&mut self) -> Value;

    /// Applies one action by `participant` to `state`.
    ///
    /// Returns the emitted states in order; the last one becomes the
    /// session's current state. An empty vector means "nothing changed"
    /// (for example, an illegal move). Every emission is broadcast verbatim
    /// to all participants, so it must not contain private fields.
    fn apply(&mut self, state: &Value, participant: &ParticipantId, action: Value) -> Vec<Value>;
}

impl GameEngine for Box<dyn GameEngine> {
    fn initial_state(&mut self) -> Value {
        (**self).initial_state()
    }

    fn apply(&mut self, state: &Value, participant: &ParticipantId, action: Value) -> Vec<Value> {
        (**self).apply(state, participant, action)
    }
}

/// Builds engines for session actors.
///
/// `display_name` is the game kind the session was created with, e.g.
/// `"tictactoe"`.
pub trait EngineFactory: Send + Sync + 'static {
    type Engine: GameEngine;

    fn create(&self, display_name: &str) -> Result<Self::Engine, EngineError>;
}

type Constructor = Box<dyn Fn() -> Box<dyn GameEngine> + Send + Sync>;

/// An [`EngineFactory`] that maps game names to constructors.
///
/// ```rust
/// use plank_game::{EngineFactory, EngineRegistry, GameLogic, LogicEngine};
/// use plank_protocol::ParticipantId;
///
/// struct Counter;
///
/// impl GameLogic for Counter {
///     type State = u32;
///     type Action = u32;
///
///     fn init() -> u32 { 0 }
///
///     fn apply(state: &mut u32, _by: &ParticipantId, add: u32) -> bool {
///         *state += add;
///         add > 0
///     }
/// }
///
/// let engines = EngineRegistry::new().register("counter", LogicEngine::<Counter>::new);
/// assert!(engines.create("counter").is_ok());
/// assert!(engines.create("chess").is_err());
/// ```
#[derive(Default)]
pub struct EngineRegistry {
    constructors: HashMap<String, Constructor>,
}

impl EngineRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `constructor` under `name`, replacing any previous entry.
    pub fn register<E, C>(mut self, name: impl Into<String>, constructor: C) -> Self
    where
        E: GameEngine,
        C: Fn() -> E + Send + Sync + 'static,
    {
        self.constructors.insert(
            name.into(),
            Box::new(move || Box::new(constructor()) as Box<dyn GameEngine>),
        );
        self
    }

    /// Returns the registered game names, sorted.
    pub fn games(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl EngineFactory for EngineRegistry {
    type Engine = Box<dyn GameEngine>;

    fn create(&self, display_name: &str) -> Result<Self::Engine, EngineError> {
        self.constructors
            .get(display_name)
            .map(|constructor| constructor())
            .ok_or_else(|| EngineError::UnknownGame(display_name.to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Typed game logic
// ---------------------------------------------------------------------------

/// Typed game rules. Wrap in [`LogicEngine`] to get a [`GameEngine`].
pub trait GameLogic: Send + 'static {
    /// The full game state. Broadcast to every participant as-is.
    type State: Serialize + DeserializeOwned + Send;

    /// What participants send (e.g. "place marker at row 1, col 2").
    type Action: DeserializeOwned + Send;

    /// Creates the starting state of a new session.
    fn init() -> Self::State;

    /// Rejects an action before it touches the state. Default: accept all.
    fn validate(
        _state: &Self::State,
        _participant: &ParticipantId,
        _action: &Self::Action,
    ) -> Result<(), String> {
        Ok(())
    }

    /// Applies a validated action. Returns `true` if the state changed and
    /// should be emitted.
    fn apply(state: &mut Self::State, participant: &ParticipantId, action: Self::Action) -> bool;
}

/// Adapts a [`GameLogic`] to the untyped [`GameEngine`] contract.
///
/// Actions that don't deserialize into `G::Action`, or that fail
/// validation, produce no emission.
pub struct LogicEngine<G: GameLogic> {
    _logic: PhantomData<fn() -> G>,
}

impl<G: GameLogic> LogicEngine<G> {
    pub fn new() -> Self {
        Self {
            _logic: PhantomData,
        }
    }
}

impl<G: GameLogic> Default for LogicEngine<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: GameLogic> GameEngine for LogicEngine<G> {
    fn initial_state(&mut self) -> Value {
        serde_json::to_value(G::init()).unwrap_or_else(|e| {
            tracing::error!(error = %e, "initial state does not serialize");
            Value::Null
        })
    }

    fn apply(&mut self, state: &Value, participant: &ParticipantId, action: Value) -> Vec<Value> {
        let mut typed: G::State = match serde_json::from_value(state.clone()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "stored state does not match game state type");
                return Vec::new();
            }
        };
        let action: G::Action = match serde_json::from_value(action) {
            Ok(a) => a,
            Err(e) => {
                tracing::debug!(%participant, error = %e, "action does not parse, ignoring");
                return Vec::new();
            }
        };
        if let Err(reason) = G::validate(&typed, participant, &action) {
            tracing::debug!(%participant, %reason, "action rejected");
            return Vec::new();
        }
        if !G::apply(&mut typed, participant, action) {
            return Vec::new();
        }
        match serde_json::to_value(&typed) {
            Ok(next) => vec![next],
            Err(e) => {
                tracing::error!(error = %e, "game state does not serialize");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Serialize, Deserialize)]
    struct Tally {
        total: i64,
        last: Option<String>,
    }

    #[derive(Deserialize)]
    struct Add {
        n: i64,
    }

    struct Adder;

    impl GameLogic for Adder {
        type State = Tally;
        type Action = Add;

        fn init() -> Tally {
            Tally { total: 0, last: None }
        }

        fn validate(_state: &Tally, _by: &ParticipantId, action: &Add) -> Result<(), String> {
            if action.n < 0 {
                return Err("negative".into());
            }
            Ok(())
        }

        fn apply(state: &mut Tally, by: &ParticipantId, action: Add) -> bool {
            if action.n == 0 {
                return false;
            }
            state.total += action.n;
            state.last = Some(by.to_string());
            true
        }
    }

    fn pid() -> ParticipantId {
        ParticipantId::from("user_1")
    }

    #[test]
    fn test_logic_engine_initial_state_is_serialized_init() {
        let mut engine = LogicEngine::<Adder>::new();
        assert_eq!(engine.initial_state(), json!({ "total": 0, "last": null }));
    }

    #[test]
    fn test_logic_engine_apply_emits_new_state() {
        let mut engine = LogicEngine::<Adder>::new();
        let state = engine.initial_state();

        let emissions = engine.apply(&state, &pid(), json!({ "n": 3 }));

        assert_eq!(emissions, vec![json!({ "total": 3, "last": "user_1" })]);
    }

    #[test]
    fn test_logic_engine_unchanged_state_emits_nothing() {
        let mut engine = LogicEngine::<Adder>::new();
        let state = engine.initial_state();
        assert!(engine.apply(&state, &pid(), json!({ "n": 0 })).is_empty());
    }

    #[test]
    fn test_logic_engine_invalid_action_emits_nothing() {
        let mut engine = LogicEngine::<Adder>::new();
        let state = engine.initial_state();
        assert!(engine.apply(&state, &pid(), json!({ "n": -1 })).is_empty());
    }

    #[test]
    fn test_logic_engine_unparseable_action_emits_nothing() {
        let mut engine = LogicEngine::<Adder>::new();
        let state = engine.initial_state();
        assert!(engine.apply(&state, &pid(), json!("jump")).is_empty());
    }

    #[test]
    fn test_registry_unknown_game_is_error() {
        let engines = EngineRegistry::new().register("adder", LogicEngine::<Adder>::new);
        assert!(matches!(
            engines.create("chess"),
            Err(EngineError::UnknownGame(name)) if name == "chess"
        ));
    }

    #[test]
    fn test_registry_builds_registered_engine() {
        let engines = EngineRegistry::new().register("adder", LogicEngine::<Adder>::new);
        let mut engine = engines.create("adder").unwrap();
        assert_eq!(engine.initial_state(), json!({ "total": 0, "last": null }));
    }

    #[test]
    fn test_registry_games_are_sorted() {
        let engines = EngineRegistry::new()
            .register("b", LogicEngine::<Adder>::new)
            .register("a", LogicEngine::<Adder>::new);
        assert_eq!(engines.games(), vec!["a", "b"]);
    }
}
