pub mod ai;
pub mod game;
pub mod utils;

use gloo_timers::future::TimeoutFuture;
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use std::str::FromStr;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::Promise;

pub use ai::{
    best_move, minimax_score, AiAgent, AiConfig, AiDecision, AiDifficulty, DRAW_SCORE, LOSS_SCORE,
    WIN_SCORE,
};
pub use game::{
    evaluate_outcome, winning_line, Board, BoardParseError, GameEvent, GameMode, GameState, Mark,
    MoveAction, Outcome, RuleEngine, RuleError, RuleResolution, Scoreboard, Settings, WinLine,
    CELL_COUNT,
};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    utils::set_panic_hook();
    utils::init_logging(log::LevelFilter::Info);
}

fn to_js_error(error: RuleError) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn make_resolution_json(resolution: RuleResolution) -> Result<String, JsValue> {
    serde_json::to_string(&resolution).map_err(serde_to_js_error)
}

fn resolution_from_events(state: &GameState, events: Vec<GameEvent>) -> RuleResolution {
    RuleResolution::new(state.clone(), events)
}

/// 接受 `[null, "X", ...]` 数组或 `"XX_/OO_/___"` 形式的字符串。
fn board_from_js(value: JsValue) -> Result<Board, JsValue> {
    if let Some(text) = value.as_string() {
        return Board::from_str(&text).map_err(|error| {
            to_js_error(RuleError::InvalidBoard {
                reason: error.to_string(),
            })
        });
    }
    from_value(value).map_err(|error| {
        to_js_error(RuleError::InvalidBoard {
            reason: error.to_string(),
        })
    })
}

fn mark_from_str(value: &str) -> Result<Mark, JsValue> {
    Mark::from_str(value).map_err(|_| {
        to_js_error(RuleError::InvalidMark {
            value: value.to_string(),
        })
    })
}

fn difficulty_or_default(value: Option<&str>) -> AiDifficulty {
    value
        .and_then(|value| AiDifficulty::from_str(value).ok())
        .unwrap_or_default()
}

#[derive(Serialize)]
struct AiMoveResponse {
    decision: AiDecision,
    applied: RuleResolution,
}

#[wasm_bindgen]
pub struct GameEngine {
    state: GameState,
    agent: AiAgent,
}

#[wasm_bindgen]
impl GameEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(settings_json: Option<String>) -> Result<GameEngine, JsValue> {
        let settings = if let Some(json) = settings_json {
            serde_json::from_str(&json).map_err(serde_to_js_error)?
        } else {
            Settings::default()
        };
        Ok(GameEngine {
            state: GameState::new(settings),
            agent: AiAgent::new(AiConfig::from_difficulty(settings.difficulty)),
        })
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state).map_err(serde_to_js_error)
    }

    pub fn set_state_json(&mut self, json: &str) -> Result<(), JsValue> {
        let state: GameState = serde_json::from_str(json).map_err(serde_to_js_error)?;
        self.agent = AiAgent::new(AiConfig::from_difficulty(state.settings.difficulty));
        self.state = state;
        Ok(())
    }

    pub fn outcome_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state.outcome()).map_err(serde_to_js_error)
    }

    pub fn ai_to_move(&self) -> bool {
        self.state.ai_to_move()
    }

    /// 当前玩家在 `index` 落子。
    pub fn play_move(&mut self, index: usize) -> Result<String, JsValue> {
        let action = MoveAction {
            mark: self.state.current_player,
            index,
        };
        let mut engine = RuleEngine::new();
        let events = engine
            .play_move(&mut self.state, action)
            .map_err(to_js_error)?;
        make_resolution_json(resolution_from_events(&self.state, events))
    }

    pub fn play_move_json(&mut self, action_json: &str) -> Result<String, JsValue> {
        let action: MoveAction = serde_json::from_str(action_json).map_err(serde_to_js_error)?;
        let mut engine = RuleEngine::new();
        let events = engine
            .play_move(&mut self.state, action)
            .map_err(to_js_error)?;
        make_resolution_json(resolution_from_events(&self.state, events))
    }

    pub fn apply_ai_move(&mut self) -> Result<String, JsValue> {
        let mut engine = RuleEngine::new();
        let (decision, events) = engine
            .apply_ai_move(&mut self.state, &mut self.agent)
            .map_err(to_js_error)?;
        let response = AiMoveResponse {
            decision,
            applied: resolution_from_events(&self.state, events),
        };
        serde_json::to_string(&response).map_err(serde_to_js_error)
    }

    /// 延迟 `delay_ms` 后计算 AI 的落点，不修改棋局。
    pub fn think_ai(&self, delay_ms: Option<u32>) -> Promise {
        let board = self.state.board;
        let config = *self.agent.config();
        let delay = delay_ms.unwrap_or(0);

        future_to_promise(async move {
            if delay > 0 {
                TimeoutFuture::new(delay).await;
            }
            let mut agent = AiAgent::new(config);
            let decision = agent.decide_move(&board).map_err(to_js_error)?;
            let json = serde_json::to_string(&decision).map_err(serde_to_js_error)?;
            Ok(JsValue::from_str(&json))
        })
    }

    pub fn reset_game(&mut self) -> Result<String, JsValue> {
        self.state.reset_game();
        make_resolution_json(resolution_from_events(&self.state, vec![GameEvent::GameReset]))
    }

    pub fn reset_scores(&mut self) -> Result<String, JsValue> {
        self.state.reset_scores();
        make_resolution_json(resolution_from_events(&self.state, vec![GameEvent::ScoresReset]))
    }

    pub fn set_mode(&mut self, mode: &str) -> Result<String, JsValue> {
        let settings = Settings {
            mode: GameMode::from_str(mode).unwrap_or_default(),
            ..self.state.settings
        };
        self.apply_settings(settings)
    }

    pub fn set_difficulty(&mut self, difficulty: &str) -> Result<String, JsValue> {
        let settings = Settings {
            difficulty: difficulty_or_default(Some(difficulty)),
            ..self.state.settings
        };
        self.apply_settings(settings)
    }

    fn apply_settings(&mut self, settings: Settings) -> Result<String, JsValue> {
        self.state.apply_settings(settings);
        self.agent = AiAgent::new(AiConfig::from_difficulty(settings.difficulty));
        make_resolution_json(resolution_from_events(
            &self.state,
            vec![GameEvent::SettingsChanged { settings }],
        ))
    }
}

/// 返回一个新的空白对局状态。
#[wasm_bindgen(js_name = "createGameState")]
pub fn create_game_state(settings: JsValue) -> Result<JsValue, JsValue> {
    let settings: Settings = if settings.is_undefined() || settings.is_null() {
        Settings::default()
    } else {
        from_value(settings).map_err(JsValue::from)?
    };
    to_value(&GameState::new(settings)).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "evaluateOutcome")]
pub fn evaluate_outcome_js(board: JsValue) -> Result<JsValue, JsValue> {
    let board = board_from_js(board)?;
    to_value(&evaluate_outcome(&board)).map_err(JsValue::from)
}

/// 返回获胜线的三个格子索引，未分胜负时返回 `null`。
#[wasm_bindgen(js_name = "winningLine")]
pub fn winning_line_js(board: JsValue) -> Result<JsValue, JsValue> {
    let board = board_from_js(board)?;
    to_value(&winning_line(&board).map(WinLine::cells)).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "bestMove")]
pub fn best_move_js(board: JsValue, maximizing_mark: &str) -> Result<usize, JsValue> {
    let board = board_from_js(board)?;
    let mark = mark_from_str(maximizing_mark)?;
    best_move(&board, mark).map_err(to_js_error)
}

#[wasm_bindgen(js_name = "minimaxScore")]
pub fn minimax_score_js(
    board: JsValue,
    maximizing_mark: &str,
    maximizing: bool,
) -> Result<i32, JsValue> {
    let board = board_from_js(board)?;
    let mark = mark_from_str(maximizing_mark)?;
    Ok(minimax_score(&board, mark, maximizing))
}

#[wasm_bindgen(js_name = "computeAiMove")]
pub fn compute_ai_move(
    board: JsValue,
    mark: &str,
    difficulty: Option<String>,
) -> Result<JsValue, JsValue> {
    let board = board_from_js(board)?;
    let mark = mark_from_str(mark)?;
    let config = AiConfig::from_difficulty(difficulty_or_default(difficulty.as_deref()))
        .with_mark(mark);
    let mut agent = AiAgent::new(config);
    let decision = agent.decide_move(&board).map_err(to_js_error)?;
    to_value(&decision).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "playMove")]
pub fn play_move(state: JsValue, action: JsValue) -> Result<JsValue, JsValue> {
    let mut state: GameState = from_value(state).map_err(JsValue::from)?;
    let action: MoveAction = from_value(action).map_err(JsValue::from)?;
    let mut engine = RuleEngine::new();
    match engine.play_move(&mut state, action) {
        Ok(events) => to_value(&RuleResolution::new(state, events)).map_err(JsValue::from),
        Err(error) => Err(to_js_error(error)),
    }
}
