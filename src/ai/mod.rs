//! AI 算法模块（极小化极大搜索与随机策略）。

pub mod minimax;

pub use minimax::{
    best_move, minimax_score, AiAgent, AiConfig, AiDecision, AiDifficulty, DRAW_SCORE, LOSS_SCORE,
    WIN_SCORE,
};
