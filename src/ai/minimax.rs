use std::str::FromStr;

use rand::rngs::SmallRng;
use rand::seq::IteratorRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::game::{evaluate_outcome, Board, Mark, Outcome, RuleError};

/// 终局分值。不按深度折算：同为必胜时不区分快慢，保持与前端原版一致的走法偏好。
pub const WIN_SCORE: i32 = 10;
pub const LOSS_SCORE: i32 = -10;
pub const DRAW_SCORE: i32 = 0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AiDifficulty {
    /// 随机选择空格。
    Easy,
    /// 完整的极小化极大搜索。
    Hard,
}

impl Default for AiDifficulty {
    fn default() -> Self {
        AiDifficulty::Hard
    }
}

impl FromStr for AiDifficulty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" | "random" => Ok(AiDifficulty::Easy),
            "hard" | "expert" | "minimax" => Ok(AiDifficulty::Hard),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiConfig {
    pub difficulty: AiDifficulty,
    /// AI 执子；默认 O（后手）。
    pub mark: Mark,
}

impl AiConfig {
    pub fn from_difficulty(difficulty: AiDifficulty) -> Self {
        Self {
            difficulty,
            mark: Mark::O,
        }
    }

    pub fn with_mark(mut self, mark: Mark) -> Self {
        self.mark = mark;
        self
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        AiConfig::from_difficulty(AiDifficulty::default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiDecision {
    pub index: usize,
    pub mark: Mark,
    /// 随机落子不做搜索，没有评估值。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<i32>,
    pub nodes: u64,
    pub difficulty: AiDifficulty,
}

struct SearchStats {
    nodes: u64,
}

impl SearchStats {
    fn new() -> Self {
        Self { nodes: 0 }
    }
}

/// 为 `maximizing` 方选出最优落点。
///
/// 按 0→8 扫描空格，取第一个分值最高者；同分取最小索引，结果可复现。
/// 终局分值不含深度，所以同为必胜时未必选立即获胜的格子。
///
/// 棋盘已分出结果（包括有人获胜但仍有空格）时返回 `RuleError::InvalidState`。
pub fn best_move(board: &Board, maximizing: Mark) -> Result<usize, RuleError> {
    search_best_move(board, maximizing, &mut SearchStats::new()).map(|(index, _)| index)
}

/// 对棋盘做完整博弈树搜索，返回从 `maximizing_mark` 视角看的分值。
///
/// `maximizing_turn` 表示下一手是否由 `maximizing_mark` 落子。
/// 每个分支都在棋盘副本上展开，调用方的棋盘不会被修改。
pub fn minimax_score(board: &Board, maximizing_mark: Mark, maximizing_turn: bool) -> i32 {
    minimax_rec(board, maximizing_mark, maximizing_turn, &mut SearchStats::new())
}

fn search_best_move(
    board: &Board,
    maximizing: Mark,
    stats: &mut SearchStats,
) -> Result<(usize, i32), RuleError> {
    let outcome = evaluate_outcome(board);
    if outcome.is_terminal() {
        return Err(RuleError::InvalidState { outcome });
    }

    let mut best: Option<(usize, i32)> = None;
    for index in board.empty_cells() {
        let child = board.with_mark(index, maximizing);
        let score = minimax_rec(&child, maximizing, false, stats);
        // 严格大于：同分保留较小索引。
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((index, score));
        }
    }

    best.ok_or(RuleError::InvalidState { outcome })
}

fn terminal_score(outcome: Outcome, maximizing_mark: Mark) -> Option<i32> {
    match outcome {
        Outcome::Won { winner } if winner == maximizing_mark => Some(WIN_SCORE),
        Outcome::Won { .. } => Some(LOSS_SCORE),
        Outcome::Draw => Some(DRAW_SCORE),
        Outcome::InProgress => None,
    }
}

fn minimax_rec(
    board: &Board,
    maximizing_mark: Mark,
    maximizing_turn: bool,
    stats: &mut SearchStats,
) -> i32 {
    stats.nodes += 1;

    if let Some(score) = terminal_score(evaluate_outcome(board), maximizing_mark) {
        return score;
    }

    let actor = if maximizing_turn {
        maximizing_mark
    } else {
        maximizing_mark.opponent()
    };

    let children = board.empty_cells().map(|index| {
        let child = board.with_mark(index, actor);
        minimax_rec(&child, maximizing_mark, !maximizing_turn, stats)
    });

    let value = if maximizing_turn {
        children.max()
    } else {
        children.min()
    };
    // 非终局棋盘至少有一个空格。
    value.unwrap_or(DRAW_SCORE)
}

pub struct AiAgent {
    config: AiConfig,
    rng: SmallRng,
}

impl AiAgent {
    pub fn new(config: AiConfig) -> Self {
        Self {
            config,
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn with_seed(config: AiConfig, seed: u64) -> Self {
        Self {
            config,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    fn random_decision(&mut self, board: &Board) -> Result<AiDecision, RuleError> {
        let outcome = evaluate_outcome(board);
        if outcome.is_terminal() {
            return Err(RuleError::InvalidState { outcome });
        }

        let index = board
            .empty_cells()
            .choose(&mut self.rng)
            .ok_or(RuleError::InvalidState { outcome })?;

        Ok(AiDecision {
            index,
            mark: self.config.mark,
            evaluation: None,
            nodes: 0,
            difficulty: AiDifficulty::Easy,
        })
    }

    pub fn decide_move(&mut self, board: &Board) -> Result<AiDecision, RuleError> {
        match self.config.difficulty {
            AiDifficulty::Easy => self.random_decision(board),
            AiDifficulty::Hard => {
                let mut stats = SearchStats::new();
                let (index, evaluation) = search_best_move(board, self.config.mark, &mut stats)?;
                Ok(AiDecision {
                    index,
                    mark: self.config.mark,
                    evaluation: Some(evaluation),
                    nodes: stats.nodes,
                    difficulty: AiDifficulty::Hard,
                })
            }
        }
    }
}
