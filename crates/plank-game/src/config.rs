//! Actor configuration and lifecycle phases.

use std::time::Duration;

// ---------------------------------------------------------------------------
// ActorConfig
// ---------------------------------------------------------------------------

/// Tuning for every session actor spawned by one registry.
#[derive(Debug, Clone)]
pub struct ActorConfig {
    /// Capacity of each actor's command queue. Senders wait when it is full.
    pub channel_size: usize,

    /// Evict an actor after this long with no connections and no commands.
    /// `None` keeps actors resident until explicitly evicted.
    pub idle_timeout: Option<Duration>,

    /// Frames that may wait on one connection's writer. A connection whose
    /// backlog reaches this is dropped from the broadcast set.
    pub outbound_buffer: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            channel_size: 64,
            idle_timeout: None,
            outbound_buffer: 256,
        }
    }
}

// ---------------------------------------------------------------------------
// ActorPhase
// ---------------------------------------------------------------------------

/// The lifecycle phase of a session actor instance.
///
/// ```text
///        ┌──────────────┐ fail
///        ▼              │
///      Cold ──► Initializing ──► Ready
///        │                         │
///        └─────────► Evicted ◄─────┘
/// ```
///
/// - **Cold**: no engine resident. The actor may not know yet whether its
///   session exists in storage.
/// - **Initializing**: building the engine and loading or writing state.
///   Commands arriving now wait in the queue.
/// - **Ready**: the engine is resident and the current state is loaded.
/// - **Evicted**: the instance has stopped. A fresh one will rehydrate
///   from storage on the next request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorPhase {
    Cold,
    Initializing,
    Ready,
    Evicted,
}

impl ActorPhase {
    /// Returns `true` once an engine is resident.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Returns `true` if moving to `target` is a legal transition.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Cold, Self::Initializing)
                | (Self::Cold, Self::Evicted)
                | (Self::Initializing, Self::Ready)
                | (Self::Initializing, Self::Cold)
                | (Self::Initializing, Self::Evicted)
                | (Self::Ready, Self::Evicted)
        )
    }
}

impl std::fmt::Display for ActorPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cold => write!(f, "Cold"),
            Self::Initializing => write!(f, "Initializing"),
            Self::Ready => write!(f, "Ready"),
            Self::Evicted => write!(f, "Evicted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_phase_happy_path_transitions() {
        assert!(ActorPhase::Cold.can_transition_to(ActorPhase::Initializing));
        assert!(ActorPhase::Initializing.can_transition_to(ActorPhase::Ready));
        assert!(ActorPhase::Ready.can_transition_to(ActorPhase::Evicted));
    }

    #[test]
    fn test_actor_phase_failed_initialization_returns_to_cold() {
        assert!(ActorPhase::Initializing.can_transition_to(ActorPhase::Cold));
    }

    #[test]
    fn test_actor_phase_rejects_skips_and_reversals() {
        assert!(!ActorPhase::Cold.can_transition_to(ActorPhase::Ready));
        assert!(!ActorPhase::Ready.can_transition_to(ActorPhase::Initializing));
        assert!(!ActorPhase::Ready.can_transition_to(ActorPhase::Cold));
        assert!(!ActorPhase::Evicted.can_transition_to(ActorPhase::Cold));
        assert!(!ActorPhase::Evicted.can_transition_to(ActorPhase::Ready));
    }

    #[test]
    fn test_actor_phase_is_ready() {
        assert!(!ActorPhase::Cold.is_ready());
        assert!(!ActorPhase::Initializing.is_ready());
        assert!(ActorPhase::Ready.is_ready());
        assert!(!ActorPhase::Evicted.is_ready());
    }

    #[test]
    fn test_actor_phase_display() {
        assert_eq!(ActorPhase::Cold.to_string(), "Cold");
        assert_eq!(ActorPhase::Initializing.to_string(), "Initializing");
    }

    #[test]
    fn test_actor_config_default() {
        let config = ActorConfig::default();
        assert_eq!(config.channel_size, 64);
        assert!(config.idle_timeout.is_none());
        assert_eq!(config.outbound_buffer, 256);
    }
}
