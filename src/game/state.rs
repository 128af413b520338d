use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::board::{Board, Mark, Outcome, WinLine};
use super::rules::evaluate_outcome;
use crate::ai::AiDifficulty;

/// 对战模式。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    /// 人机对战，AI 执 O。
    Pve,
    Pvp,
}

impl Default for GameMode {
    fn default() -> Self {
        GameMode::Pve
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameMode::Pve => f.write_str("pve"),
            GameMode::Pvp => f.write_str("pvp"),
        }
    }
}

impl FromStr for GameMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pve" | "ai" | "single" => Ok(GameMode::Pve),
            "pvp" | "local" | "versus" => Ok(GameMode::Pvp),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(default)]
    pub mode: GameMode,
    #[serde(default)]
    pub difficulty: AiDifficulty,
}

/// 累计比分，跨局保留，只在 `reset_scores` 时清零。
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Scoreboard {
    pub x: u32,
    pub o: u32,
    pub draws: u32,
}

impl Scoreboard {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Won { winner: Mark::X } => self.x += 1,
            Outcome::Won { winner: Mark::O } => self.o += 1,
            Outcome::Draw => self.draws += 1,
            Outcome::InProgress => {}
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 游戏事件流。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameEvent {
    MarkPlaced { index: usize, mark: Mark },
    GameWon { winner: Mark, line: WinLine },
    GameDrawn,
    GameReset,
    ScoresReset,
    SettingsChanged { settings: Settings },
}

/// 一局对局的会话状态。结果始终由 `board` 推导。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameState {
    #[serde(default)]
    pub board: Board,
    #[serde(default)]
    pub current_player: Mark,
    pub active: bool,
    #[serde(default)]
    pub scores: Scoreboard,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_log: Vec<GameEvent>,
}

impl GameState {
    pub fn new(settings: Settings) -> Self {
        Self {
            board: Board::empty(),
            current_player: Mark::X,
            active: true,
            scores: Scoreboard::default(),
            settings,
            event_log: Vec::new(),
        }
    }

    pub fn outcome(&self) -> Outcome {
        evaluate_outcome(&self.board)
    }

    pub fn is_finished(&self) -> bool {
        !self.active || self.outcome().is_terminal()
    }

    /// 人机模式下轮到 O 时由 AI 落子。
    pub fn ai_to_move(&self) -> bool {
        self.settings.mode == GameMode::Pve && self.current_player == Mark::O && !self.is_finished()
    }

    pub fn record_event(&mut self, event: GameEvent) {
        self.event_log.push(event);
    }

    pub(crate) fn finish(&mut self, outcome: Outcome) {
        self.active = false;
        self.scores.record(outcome);
    }

    /// 清空棋盘并由 X 重新先手，比分保留。
    pub fn reset_game(&mut self) {
        self.board.clear();
        self.current_player = Mark::X;
        self.active = true;
        self.event_log.clear();
        self.record_event(GameEvent::GameReset);
    }

    pub fn reset_scores(&mut self) {
        self.scores.reset();
        self.record_event(GameEvent::ScoresReset);
    }

    /// 切换模式或难度会开始新的一局，与前端行为一致。
    pub fn apply_settings(&mut self, settings: Settings) {
        self.settings = settings;
        self.reset_game();
        self.record_event(GameEvent::SettingsChanged { settings });
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoreboard_tallies_outcomes() {
        let mut scores = Scoreboard::default();
        scores.record(Outcome::Won { winner: Mark::X });
        scores.record(Outcome::Won { winner: Mark::O });
        scores.record(Outcome::Draw);
        scores.record(Outcome::Draw);
        scores.record(Outcome::InProgress);
        assert_eq!(scores, Scoreboard { x: 1, o: 1, draws: 2 });
        scores.reset();
        assert_eq!(scores, Scoreboard::default());
    }

    #[test]
    fn outcome_follows_board() {
        let mut state = GameState::default();
        state.board = "XXX/OO_/___".parse().expect("board should parse");
        assert_eq!(state.outcome(), Outcome::Won { winner: Mark::X });
        assert!(state.is_finished());
    }

    #[test]
    fn changing_settings_starts_a_new_round() {
        let mut state = GameState::default();
        state.board.place(4, Mark::X);
        state.current_player = Mark::O;
        state.scores.x = 2;

        let settings = Settings {
            mode: GameMode::Pvp,
            difficulty: AiDifficulty::Easy,
        };
        state.apply_settings(settings);

        assert_eq!(state.board, Board::empty());
        assert_eq!(state.current_player, Mark::X);
        assert_eq!(state.scores.x, 2);
        assert_eq!(state.settings, settings);
        assert_eq!(
            state.event_log.last(),
            Some(&GameEvent::SettingsChanged { settings })
        );
    }

    #[test]
    fn ai_moves_only_in_pve_on_o_turn() {
        let mut state = GameState::default();
        assert!(!state.ai_to_move());
        state.current_player = Mark::O;
        assert!(state.ai_to_move());
        state.settings.mode = GameMode::Pvp;
        assert!(!state.ai_to_move());
    }

    #[test]
    fn settings_json_uses_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"mode":"pvp"}"#)
            .expect("settings should deserialize");
        assert_eq!(settings.mode, GameMode::Pvp);
        assert_eq!(settings.difficulty, AiDifficulty::Hard);
        assert_eq!("PVE".parse::<GameMode>(), Ok(GameMode::Pve));
    }
}
