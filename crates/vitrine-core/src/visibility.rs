//! Click-driven visibility cycle

use serde::{Deserialize, Serialize};

/// Which stages an exhibit cycles through on click
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleMode {
    /// Shown -> Hidden -> Shown ...
    ShowHide,
    /// Shown -> Translucent -> Hidden -> Shown ...
    ShowFadeHide,
}

impl CycleMode {
    /// Cycle stages in click order, starting from the initial state
    pub fn states(self) -> &'static [VisibilityState] {
        match self {
            CycleMode::ShowHide => &[VisibilityState::Shown, VisibilityState::Hidden],
            CycleMode::ShowFadeHide => &[
                VisibilityState::Shown,
                VisibilityState::Translucent,
                VisibilityState::Hidden,
            ],
        }
    }
}

/// Visibility of an exhibit's controlled nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityState {
    #[default]
    Shown,
    Translucent,
    Hidden,
}

impl VisibilityState {
    /// Next stage in the click cycle, wrapping back to Shown
    pub fn next(self, mode: CycleMode) -> VisibilityState {
        match (mode, self) {
            (CycleMode::ShowHide, VisibilityState::Shown) => VisibilityState::Hidden,
            (CycleMode::ShowHide, _) => VisibilityState::Shown,
            (CycleMode::ShowFadeHide, VisibilityState::Shown) => VisibilityState::Translucent,
            (CycleMode::ShowFadeHide, VisibilityState::Translucent) => VisibilityState::Hidden,
            (CycleMode::ShowFadeHide, VisibilityState::Hidden) => VisibilityState::Shown,
        }
    }

    /// State reached after `clicks` clicks from the initial state
    pub fn after_clicks(clicks: usize, mode: CycleMode) -> VisibilityState {
        let states = mode.states();
        states[clicks % states.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_stage_cycle_order() {
        let mode = CycleMode::ShowFadeHide;
        let mut state = VisibilityState::default();
        let mut seen = Vec::new();
        for _ in 0..4 {
            state = state.next(mode);
            seen.push(state);
        }
        assert_eq!(
            seen,
            vec![
                VisibilityState::Translucent,
                VisibilityState::Hidden,
                VisibilityState::Shown,
                VisibilityState::Translucent,
            ]
        );
    }

    #[test]
    fn test_state_is_click_count_modulo_cycle_length() {
        let expected = [
            VisibilityState::Shown,
            VisibilityState::Translucent,
            VisibilityState::Hidden,
            VisibilityState::Shown,
            VisibilityState::Translucent,
        ];
        for (clicks, want) in expected.iter().enumerate() {
            assert_eq!(
                VisibilityState::after_clicks(clicks, CycleMode::ShowFadeHide),
                *want
            );
        }
    }

    #[test]
    fn test_two_stage_cycle_skips_translucent() {
        let mode = CycleMode::ShowHide;
        assert_eq!(
            VisibilityState::Shown.next(mode),
            VisibilityState::Hidden
        );
        assert_eq!(
            VisibilityState::Hidden.next(mode),
            VisibilityState::Shown
        );
        assert_eq!(
            VisibilityState::after_clicks(7, mode),
            VisibilityState::Hidden
        );
    }
}
