use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    board::{Board, Mark, Outcome, WinLine, CELL_COUNT},
    state::{GameEvent, GameMode, GameState},
};
use crate::ai::{AiAgent, AiDecision};

/// 判定棋盘结果。多条线同时成立时（只可能出现在注入的非法棋盘上），
/// 取规范顺序中的第一条。
pub fn evaluate_outcome(board: &Board) -> Outcome {
    if let Some(line) = winning_line(board) {
        if let Some(winner) = line.owner(board) {
            return Outcome::Won { winner };
        }
    }
    if board.is_full() {
        Outcome::Draw
    } else {
        Outcome::InProgress
    }
}

/// 返回 `evaluate_outcome` 判胜所依据的那条线。
pub fn winning_line(board: &Board) -> Option<WinLine> {
    WinLine::ALL
        .into_iter()
        .find(|line| line.owner(board).is_some())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoveAction {
    pub mark: Mark,
    pub index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum RuleError {
    /// 在已结束的棋盘上请求 AI 落子。
    #[error("no legal moves: board is already decided ({outcome})")]
    InvalidState { outcome: Outcome },
    /// 目标格已被占用。
    #[error("cell {index} is already occupied")]
    InvalidMove { index: usize },
    #[error("cell {index} is outside the board (0-{})", CELL_COUNT - 1)]
    CellOutOfRange { index: usize },
    #[error("the round is over; reset to play again")]
    GameFinished,
    #[error("it is {expected}'s turn, not {actual}'s")]
    NotPlayerTurn { expected: Mark, actual: Mark },
    /// 只有人机模式下才由 AI 落子。
    #[error("AI moves are disabled in {mode} mode")]
    AiDisabled { mode: GameMode },
    #[error("invalid board: {reason}")]
    InvalidBoard { reason: String },
    #[error("invalid mark '{value}', expected X or O")]
    InvalidMark { value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleResolution {
    pub state: GameState,
    pub events: Vec<GameEvent>,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<WinLine>,
}

impl RuleResolution {
    pub fn new(state: GameState, events: Vec<GameEvent>) -> Self {
        let outcome = state.outcome();
        let line = winning_line(&state.board);
        Self {
            state,
            events,
            outcome,
            line,
        }
    }
}

#[derive(Debug, Default)]
pub struct RuleEngine;

impl RuleEngine {
    pub fn new() -> Self {
        Self
    }

    fn ensure_active(state: &GameState) -> Result<(), RuleError> {
        if !state.active || state.outcome().is_terminal() {
            return Err(RuleError::GameFinished);
        }
        Ok(())
    }

    fn ensure_ai_mode(state: &GameState) -> Result<(), RuleError> {
        match state.settings.mode {
            GameMode::Pve => Ok(()),
            mode => Err(RuleError::AiDisabled { mode }),
        }
    }

    fn ensure_turn_owner(state: &GameState, mark: Mark) -> Result<(), RuleError> {
        if state.current_player != mark {
            return Err(RuleError::NotPlayerTurn {
                expected: state.current_player,
                actual: mark,
            });
        }
        Ok(())
    }

    fn ensure_free_cell(board: &Board, index: usize) -> Result<(), RuleError> {
        if index >= CELL_COUNT {
            return Err(RuleError::CellOutOfRange { index });
        }
        if !board.is_empty_cell(index) {
            return Err(RuleError::InvalidMove { index });
        }
        Ok(())
    }

    /// 落子并推进回合；终局时记分并冻结本局，直到 `reset_game`。
    pub fn play_move(
        &mut self,
        state: &mut GameState,
        action: MoveAction,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_active(state)?;
        Self::ensure_turn_owner(state, action.mark)?;
        Self::ensure_free_cell(&state.board, action.index)?;

        let mut events = Vec::new();
        state.board.place(action.index, action.mark);
        events.push(GameEvent::MarkPlaced {
            index: action.index,
            mark: action.mark,
        });

        let outcome = evaluate_outcome(&state.board);
        match (outcome, winning_line(&state.board)) {
            (Outcome::Won { winner }, Some(line)) => {
                info!("{winner} wins on {line:?}");
                state.finish(outcome);
                events.push(GameEvent::GameWon { winner, line });
            }
            (Outcome::Draw, _) => {
                info!("round ended in a draw");
                state.finish(outcome);
                events.push(GameEvent::GameDrawn);
            }
            _ => {
                state.current_player = state.current_player.opponent();
            }
        }

        for event in &events {
            state.record_event(event.clone());
        }
        Ok(events)
    }

    /// 让 AI 以其配置的标记走一步，返回决策与产生的事件。
    pub fn apply_ai_move(
        &mut self,
        state: &mut GameState,
        agent: &mut AiAgent,
    ) -> Result<(AiDecision, Vec<GameEvent>), RuleError> {
        Self::ensure_ai_mode(state)?;
        Self::ensure_active(state)?;
        let mark = agent.config().mark;
        Self::ensure_turn_owner(state, mark)?;

        let decision = agent.decide_move(&state.board)?;
        debug!(
            "ai {mark} picked cell {} (evaluation {:?}, {} nodes)",
            decision.index, decision.evaluation, decision.nodes
        );
        let events = self.play_move(
            state,
            MoveAction {
                mark,
                index: decision.index,
            },
        )?;
        Ok((decision, events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AiConfig, AiDifficulty};
    use crate::game::state::{GameMode, Settings};

    fn board(s: &str) -> Board {
        s.parse().expect("test board should parse")
    }

    #[test]
    fn full_board_without_line_is_draw() {
        assert_eq!(evaluate_outcome(&board("XOX/OXO/OXO")), Outcome::Draw);
    }

    #[test]
    fn detects_each_kind_of_line() {
        assert_eq!(
            evaluate_outcome(&board("OOO/XX_/X__")),
            Outcome::Won { winner: Mark::O }
        );
        assert_eq!(
            evaluate_outcome(&board("XO_/XO_/X__")),
            Outcome::Won { winner: Mark::X }
        );
        assert_eq!(
            evaluate_outcome(&board("__O/XO_/OX_")),
            Outcome::Won { winner: Mark::O }
        );
        assert_eq!(winning_line(&board("__O/XO_/OX_")), Some(WinLine::AntiDiagonal));
    }

    #[test]
    fn win_on_full_board_beats_draw() {
        let full = board("XXX/OOX/XOO");
        assert_eq!(evaluate_outcome(&full), Outcome::Won { winner: Mark::X });
    }

    #[test]
    fn injected_double_win_uses_canonical_order() {
        let rows = board("OOO/XXX/___");
        assert_eq!(evaluate_outcome(&rows), Outcome::Won { winner: Mark::O });
        assert_eq!(winning_line(&rows), Some(WinLine::TopRow));

        let columns = board("XO_/XO_/XO_");
        assert_eq!(evaluate_outcome(&columns), Outcome::Won { winner: Mark::X });
        assert_eq!(winning_line(&columns), Some(WinLine::LeftColumn));
    }

    #[test]
    fn in_progress_until_decided() {
        assert_eq!(evaluate_outcome(&Board::empty()), Outcome::InProgress);
        assert_eq!(evaluate_outcome(&board("XO_/___/___")), Outcome::InProgress);
    }

    #[test]
    fn evaluation_is_idempotent() {
        let b = board("XOX/_O_/___");
        assert_eq!(evaluate_outcome(&b), evaluate_outcome(&b));
    }

    #[test]
    fn play_move_swaps_turns() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::default();
        let events = engine
            .play_move(&mut state, MoveAction { mark: Mark::X, index: 4 })
            .expect("first move should succeed");
        assert_eq!(events, vec![GameEvent::MarkPlaced { index: 4, mark: Mark::X }]);
        assert_eq!(state.current_player, Mark::O);
        assert_eq!(state.board.get(4), Some(Mark::X));
    }

    #[test]
    fn play_move_rejects_bad_input() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::default();
        engine
            .play_move(&mut state, MoveAction { mark: Mark::X, index: 0 })
            .expect("first move should succeed");

        let occupied = engine.play_move(&mut state, MoveAction { mark: Mark::O, index: 0 });
        assert_eq!(occupied, Err(RuleError::InvalidMove { index: 0 }));

        let out_of_range = engine.play_move(&mut state, MoveAction { mark: Mark::O, index: 9 });
        assert_eq!(out_of_range, Err(RuleError::CellOutOfRange { index: 9 }));

        let wrong_turn = engine.play_move(&mut state, MoveAction { mark: Mark::X, index: 1 });
        assert_eq!(
            wrong_turn,
            Err(RuleError::NotPlayerTurn {
                expected: Mark::O,
                actual: Mark::X
            })
        );
    }

    #[test]
    fn winning_move_scores_and_freezes_round() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::new(Settings {
            mode: GameMode::Pvp,
            ..Settings::default()
        });
        for (mark, index) in [(Mark::X, 0), (Mark::O, 3), (Mark::X, 1), (Mark::O, 4)] {
            engine
                .play_move(&mut state, MoveAction { mark, index })
                .expect("setup move should succeed");
        }
        let events = engine
            .play_move(&mut state, MoveAction { mark: Mark::X, index: 2 })
            .expect("winning move should succeed");

        assert!(events.contains(&GameEvent::GameWon {
            winner: Mark::X,
            line: WinLine::TopRow
        }));
        assert!(!state.active);
        assert_eq!(state.scores.x, 1);
        assert_eq!(
            engine.play_move(&mut state, MoveAction { mark: Mark::O, index: 8 }),
            Err(RuleError::GameFinished)
        );

        state.reset_game();
        assert!(state.active);
        assert_eq!(state.board, Board::empty());
        assert_eq!(state.current_player, Mark::X);
        assert_eq!(state.scores.x, 1);
    }

    #[test]
    fn ai_blocks_after_human_threat() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::default();
        let mut agent = AiAgent::with_seed(AiConfig::from_difficulty(AiDifficulty::Hard), 7);

        engine
            .play_move(&mut state, MoveAction { mark: Mark::X, index: 0 })
            .expect("human move should succeed");
        engine
            .apply_ai_move(&mut state, &mut agent)
            .expect("ai move should succeed");
        engine
            .play_move(&mut state, MoveAction { mark: Mark::X, index: 1 })
            .expect("human move should succeed");

        let (decision, _) = engine
            .apply_ai_move(&mut state, &mut agent)
            .expect("ai move should succeed");
        assert_eq!(decision.index, 2);
        assert_eq!(state.board.get(2), Some(Mark::O));
    }

    #[test]
    fn ai_refuses_to_move_out_of_turn() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::default();
        let mut agent = AiAgent::with_seed(AiConfig::default(), 1);
        let result = engine.apply_ai_move(&mut state, &mut agent);
        assert_eq!(
            result.map(|(decision, _)| decision.index),
            Err(RuleError::NotPlayerTurn {
                expected: Mark::X,
                actual: Mark::O
            })
        );
    }

    #[test]
    fn ai_stays_out_of_two_player_rounds() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::new(Settings {
            mode: GameMode::Pvp,
            ..Settings::default()
        });
        engine
            .play_move(&mut state, MoveAction { mark: Mark::X, index: 0 })
            .expect("human move should succeed");
        assert_eq!(state.current_player, Mark::O);

        let mut agent = AiAgent::with_seed(AiConfig::default(), 5);
        let result = engine.apply_ai_move(&mut state, &mut agent);
        assert_eq!(
            result.map(|(decision, _)| decision.index),
            Err(RuleError::AiDisabled { mode: GameMode::Pvp })
        );
        assert_eq!(state.board.count(Mark::O), 0);
        assert_eq!(state.current_player, Mark::O);
    }

    #[test]
    fn errors_render_readable_messages() {
        assert_eq!(
            RuleError::CellOutOfRange { index: 9 }.to_string(),
            "cell 9 is outside the board (0-8)"
        );
        assert_eq!(
            RuleError::NotPlayerTurn {
                expected: Mark::O,
                actual: Mark::X
            }
            .to_string(),
            "it is O's turn, not X's"
        );
        assert_eq!(
            RuleError::InvalidState {
                outcome: Outcome::Draw
            }
            .to_string(),
            "no legal moves: board is already decided (draw)"
        );
        assert_eq!(
            RuleError::AiDisabled { mode: GameMode::Pvp }.to_string(),
            "AI moves are disabled in pvp mode"
        );
        let boxed: Box<dyn std::error::Error> = Box::new(RuleError::GameFinished);
        assert_eq!(boxed.to_string(), "the round is over; reset to play again");
    }
}
