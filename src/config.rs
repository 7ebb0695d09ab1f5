use crate::unify::UnifyMode;

/// Evaluation settings for an [`Engine`](crate::Engine)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// How unification treats a variable bound twice within one call
    pub unify_mode: UnifyMode,
    /// Maximum number of fact-adding rounds for each fixpoint loop: every
    /// per-rule fixpoint and every saturation over all rules gets its own count.
    /// A round that adds nothing is free. `None` runs until the store stops growing.
    pub max_rounds: Option<usize>,
}

impl EngineConfig {
    /// Sets the unification mode
    #[must_use]
    pub fn unify_mode(mut self, mode: UnifyMode) -> Self {
        self.unify_mode = mode;
        self
    }

    /// Bounds the number of fact-adding rounds per fixpoint loop
    #[must_use]
    pub fn max_rounds(mut self, limit: usize) -> Self {
        self.max_rounds = Some(limit);
        self
    }

    /// Reads a config from JSON; missing fields take their defaults
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error for malformed input
    #[cfg(feature = "serde")]
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}
