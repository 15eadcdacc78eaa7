use crate::types::{
    IntentMode, ShadowMode, Strategy, StrategyContext, StrategyHostError, StrategyIntents,
    StrategySpec, StrategyState,
};

/// Enforces exactly one registered strategy, a single matching timeframe,
/// and shadow-mode gating — a strategy registered under shadow mode still
/// runs `on_bar` (so its internal state and metrics stay live) but its
/// intents are marked `Shadow` and the event loop must not execute them.
pub struct StrategyHost {
    strategy: Option<Box<dyn Strategy>>,
    spec: Option<StrategySpec>,
    shadow: ShadowMode,
}

impl StrategyHost {
    pub fn new(shadow: ShadowMode) -> Self {
        Self {
            strategy: None,
            spec: None,
            shadow,
        }
    }

    pub fn shadow_mode(&self) -> ShadowMode {
        self.shadow
    }

    pub fn set_shadow_mode(&mut self, shadow: ShadowMode) {
        self.shadow = shadow;
    }

    pub fn register(&mut self, s: Box<dyn Strategy>) -> Result<(), StrategyHostError> {
        if self.strategy.is_some() {
            return Err(StrategyHostError::MultiStrategyNotAllowed);
        }
        let spec = s.spec();
        self.spec = Some(spec);
        self.strategy = Some(s);
        Ok(())
    }

    pub fn spec(&self) -> Result<StrategySpec, StrategyHostError> {
        self.spec.clone().ok_or(StrategyHostError::NoStrategyRegistered)
    }

    pub fn warmup_requirement(&self) -> Result<usize, StrategyHostError> {
        self.strategy
            .as_ref()
            .map(|s| s.warmup_requirement())
            .ok_or(StrategyHostError::NoStrategyRegistered)
    }

    /// The registered strategy's current queryable state (cell, trend/vol
    /// state, target weights) — used for snapshot attribution and
    /// persistence, not for control flow.
    pub fn current_state(&self) -> Result<StrategyState, StrategyHostError> {
        self.strategy
            .as_ref()
            .map(|s| s.current_state())
            .ok_or(StrategyHostError::NoStrategyRegistered)
    }

    pub fn on_bar(&mut self, ctx: &StrategyContext) -> Result<StrategyIntents, StrategyHostError> {
        let spec = self.spec()?;
        if ctx.timeframe_secs != spec.timeframe_secs {
            return Err(StrategyHostError::TimeframeMismatch {
                expected_secs: spec.timeframe_secs,
                got_secs: ctx.timeframe_secs,
            });
        }

        let s = self
            .strategy
            .as_mut()
            .ok_or(StrategyHostError::NoStrategyRegistered)?;
        let output = s.on_bar(ctx);

        let mode = match self.shadow {
            ShadowMode::Off => IntentMode::Live,
            ShadowMode::On => IntentMode::Shadow,
        };

        Ok(StrategyIntents { mode, output })
    }
}
