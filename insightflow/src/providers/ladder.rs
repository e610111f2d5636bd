//! The escalation ladder: a total order over (provider, model) pairs.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::registry::{ProviderKind, ProviderRegistry};

/// One rung of the ladder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LadderEntry {
    /// Provider serving this rung.
    pub provider: ProviderKind,
    /// Model requested on this rung.
    pub model: String,
}

impl fmt::Display for LadderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

/// A position on the ladder.
///
/// `SafeMode` sits past the last real entry; the derived ordering puts it
/// after every `Entry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LadderPosition {
    /// Index of a real ladder entry.
    Entry(usize),
    /// The terminal static reply.
    SafeMode,
}

impl LadderPosition {
    /// The first rung.
    pub const START: Self = Self::Entry(0);

    /// The entry index, or `None` for safe mode.
    #[must_use]
    pub const fn index(self) -> Option<usize> {
        match self {
            Self::Entry(i) => Some(i),
            Self::SafeMode => None,
        }
    }

    /// True for the safe-mode sentinel.
    #[must_use]
    pub const fn is_safe_mode(self) -> bool {
        matches!(self, Self::SafeMode)
    }
}

impl Default for LadderPosition {
    fn default() -> Self {
        Self::START
    }
}

impl fmt::Display for LadderPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entry(i) => write!(f, "#{i}"),
            Self::SafeMode => f.write_str("safe-mode"),
        }
    }
}

/// Finite ordered list of rungs, followed implicitly by safe mode.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EscalationLadder {
    entries: Vec<LadderEntry>,
}

impl EscalationLadder {
    /// Wraps an explicit list of entries.
    #[must_use]
    pub fn from_entries(entries: Vec<LadderEntry>) -> Self {
        Self { entries }
    }

    /// All real entries, in escalation order.
    #[must_use]
    pub fn entries(&self) -> &[LadderEntry] {
        &self.entries
    }

    /// Number of real entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when only safe mode remains.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry at `position`, if it is a real one.
    #[must_use]
    pub fn entry(&self, position: LadderPosition) -> Option<&LadderEntry> {
        position.index().and_then(|i| self.entries.get(i))
    }

    /// Maps any index past the end onto `SafeMode`.
    #[must_use]
    pub fn normalize(&self, position: LadderPosition) -> LadderPosition {
        match position {
            LadderPosition::Entry(i) if i < self.entries.len() => position,
            _ => LadderPosition::SafeMode,
        }
    }

    /// The position after `position`. Safe mode is a fixed point.
    #[must_use]
    pub fn advance(&self, position: LadderPosition) -> LadderPosition {
        match position {
            LadderPosition::Entry(i) => self.normalize(LadderPosition::Entry(i.saturating_add(1))),
            LadderPosition::SafeMode => LadderPosition::SafeMode,
        }
    }

    /// Finds the position of a (provider, model) pair.
    #[must_use]
    pub fn position_of(&self, provider: ProviderKind, model: &str) -> Option<LadderPosition> {
        self.entries
            .iter()
            .position(|e| e.provider == provider && e.model == model)
            .map(LadderPosition::Entry)
    }
}

/// Concatenates every provider's models in provider-priority order.
#[must_use]
pub fn build_ladder(registry: &ProviderRegistry) -> EscalationLadder {
    let entries = registry
        .providers()
        .iter()
        .flat_map(|provider| {
            provider.models.iter().map(move |model| LadderEntry {
                provider: provider.kind,
                model: model.clone(),
            })
        })
        .collect();
    EscalationLadder { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::Provider;
    use pretty_assertions::assert_eq;

    fn pairs(ladder: &EscalationLadder) -> Vec<(ProviderKind, &str)> {
        ladder
            .entries()
            .iter()
            .map(|e| (e.provider, e.model.as_str()))
            .collect()
    }

    #[test]
    fn test_build_ladder_concatenates_in_priority_order() {
        let registry = ProviderRegistry::new(vec![
            Provider::new(ProviderKind::Groq, ["m1", "m2"]),
            Provider::new(ProviderKind::OpenRouter, ["m1"]),
        ])
        .unwrap();

        let ladder = build_ladder(&registry);
        assert_eq!(
            pairs(&ladder),
            vec![
                (ProviderKind::Groq, "m1"),
                (ProviderKind::Groq, "m2"),
                (ProviderKind::OpenRouter, "m1"),
            ]
        );
    }

    #[test]
    fn test_reordering_providers_reorders_ladder() {
        let registry = ProviderRegistry::new(vec![
            Provider::new(ProviderKind::OpenRouter, ["m1"]),
            Provider::new(ProviderKind::Groq, ["m1", "m2"]),
        ])
        .unwrap();

        let ladder = build_ladder(&registry);
        assert_eq!(ladder.entries()[0].provider, ProviderKind::OpenRouter);
        assert_eq!(ladder.position_of(ProviderKind::Groq, "m2"), Some(LadderPosition::Entry(2)));
    }

    #[test]
    fn test_reordering_models_reorders_ladder() {
        let registry =
            ProviderRegistry::new(vec![Provider::new(ProviderKind::Groq, ["m2", "m1"])]).unwrap();
        let ladder = build_ladder(&registry);
        assert_eq!(pairs(&ladder), vec![(ProviderKind::Groq, "m2"), (ProviderKind::Groq, "m1")]);
    }

    #[test]
    fn test_build_ladder_is_deterministic() {
        let registry = ProviderRegistry::builtin();
        assert_eq!(build_ladder(&registry), build_ladder(&registry));
        assert_eq!(build_ladder(&registry).len(), 18);
    }

    #[test]
    fn test_advance_and_normalize() {
        let ladder = EscalationLadder::from_entries(vec![
            LadderEntry { provider: ProviderKind::Groq, model: "a".into() },
            LadderEntry { provider: ProviderKind::Groq, model: "b".into() },
        ]);

        assert_eq!(ladder.advance(LadderPosition::START), LadderPosition::Entry(1));
        assert_eq!(ladder.advance(LadderPosition::Entry(1)), LadderPosition::SafeMode);
        assert_eq!(ladder.advance(LadderPosition::SafeMode), LadderPosition::SafeMode);
        assert_eq!(ladder.normalize(LadderPosition::Entry(7)), LadderPosition::SafeMode);
        assert_eq!(ladder.entry(LadderPosition::Entry(1)).unwrap().model, "b");
        assert!(ladder.entry(LadderPosition::SafeMode).is_none());
    }

    #[test]
    fn test_safe_mode_orders_after_every_entry() {
        assert!(LadderPosition::Entry(usize::MAX) < LadderPosition::SafeMode);
        assert!(LadderPosition::Entry(0) < LadderPosition::Entry(1));
    }
}
