//! 游戏核心逻辑模块（棋盘、规则引擎、对局状态）。

pub mod board;
pub mod rules;
pub mod state;

pub use board::{Board, BoardParseError, Mark, Outcome, WinLine, CELL_COUNT};
pub use rules::{evaluate_outcome, winning_line, MoveAction, RuleEngine, RuleError, RuleResolution};
pub use state::{GameEvent, GameMode, GameState, Scoreboard, Settings};
