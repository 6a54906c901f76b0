use serde::{Deserialize, Serialize};

use crate::models::{IntentKind, ModerationState};
use crate::replies;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModerationVerdict {
    Pass,
    Violation { term: String },
    StillBlocked,
    Apologized,
}

impl ModerationVerdict {
    pub fn reply(&self) -> Option<&'static str> {
        match self {
            Self::Pass => None,
            Self::Violation { .. } => Some(replies::MODERATION_NOTICE),
            Self::StillBlocked => Some(replies::BLOCKED_REFUSAL),
            Self::Apologized => Some(replies::APOLOGY_ACCEPTED),
        }
    }

    pub fn intent_kind(&self) -> Option<IntentKind> {
        match self {
            Self::Pass => None,
            Self::Violation { .. } | Self::StillBlocked => Some(IntentKind::Abuse),
            Self::Apologized => Some(IntentKind::Apology),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationPolicy {
    pub abusive_terms: Vec<String>,
    pub apology_marker: String,
}

impl Default for ModerationPolicy {
    fn default() -> Self {
        Self {
            abusive_terms: ["idiot", "stupid", "dumb", "nonsense", "fool"]
                .iter()
                .map(|term| term.to_string())
                .collect(),
            apology_marker: "sorry".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModerationGate {
    policy: ModerationPolicy,
}

impl ModerationGate {
    pub fn new(policy: ModerationPolicy) -> Self {
        let policy = ModerationPolicy {
            abusive_terms: policy
                .abusive_terms
                .into_iter()
                .map(|term| term.trim().to_lowercase())
                .filter(|term| !term.is_empty())
                .collect(),
            apology_marker: policy.apology_marker.trim().to_lowercase(),
        };
        Self { policy }
    }

    /// Plain substring matching: "stupidity" trips "stupid".
    pub fn screen(&self, state: &mut ModerationState, text: &str) -> ModerationVerdict {
        let lower = text.to_lowercase();

        if state.is_blocked() {
            if !self.policy.apology_marker.is_empty() && lower.contains(&self.policy.apology_marker)
            {
                state.set_blocked(false);
                return ModerationVerdict::Apologized;
            }
            return ModerationVerdict::StillBlocked;
        }

        if let Some(term) = self
            .policy
            .abusive_terms
            .iter()
            .find(|term| lower.contains(term.as_str()))
        {
            state.set_blocked(true);
            return ModerationVerdict::Violation { term: term.clone() };
        }

        ModerationVerdict::Pass
    }
}

impl Default for ModerationGate {
    fn default() -> Self {
        Self::new(ModerationPolicy::default())
    }
}
