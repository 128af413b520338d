use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 棋盘格子数量（固定 3×3）。
pub const CELL_COUNT: usize = 9;

/// 落子标记。X 为先手（PlayerA），O 为后手（PlayerB）。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    pub fn opponent(self) -> Mark {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Mark::X => 'X',
            Mark::O => 'O',
        }
    }
}

impl Default for Mark {
    fn default() -> Self {
        Mark::X
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for Mark {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "X" | "A" => Ok(Mark::X),
            "O" | "B" => Ok(Mark::O),
            _ => Err(()),
        }
    }
}

/// 三连线：3 行、3 列、2 条对角线，按固定顺序排列。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum WinLine {
    TopRow,
    MiddleRow,
    BottomRow,
    LeftColumn,
    CenterColumn,
    RightColumn,
    MainDiagonal,
    AntiDiagonal,
}

impl WinLine {
    /// 规范顺序：先行、再列、最后对角线。
    pub const ALL: [WinLine; 8] = [
        WinLine::TopRow,
        WinLine::MiddleRow,
        WinLine::BottomRow,
        WinLine::LeftColumn,
        WinLine::CenterColumn,
        WinLine::RightColumn,
        WinLine::MainDiagonal,
        WinLine::AntiDiagonal,
    ];

    pub fn cells(self) -> [usize; 3] {
        match self {
            WinLine::TopRow => [0, 1, 2],
            WinLine::MiddleRow => [3, 4, 5],
            WinLine::BottomRow => [6, 7, 8],
            WinLine::LeftColumn => [0, 3, 6],
            WinLine::CenterColumn => [1, 4, 7],
            WinLine::RightColumn => [2, 5, 8],
            WinLine::MainDiagonal => [0, 4, 8],
            WinLine::AntiDiagonal => [2, 4, 6],
        }
    }

    /// 若三格被同一方占满，返回该方。
    pub fn owner(self, board: &Board) -> Option<Mark> {
        let [a, b, c] = self.cells();
        match board.get(a) {
            Some(mark) if board.get(b) == Some(mark) && board.get(c) == Some(mark) => Some(mark),
            _ => None,
        }
    }
}

/// 由棋盘推导出的对局结果，不单独存储。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Outcome {
    Won { winner: Mark },
    Draw,
    InProgress,
}

impl Outcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::InProgress)
    }

    pub fn winner(&self) -> Option<Mark> {
        match self {
            Outcome::Won { winner } => Some(*winner),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Won { winner } => write!(f, "{winner} wins"),
            Outcome::Draw => f.write_str("draw"),
            Outcome::InProgress => f.write_str("in progress"),
        }
    }
}

/// 3×3 棋盘，按行优先存储，索引 0–8。
///
/// 序列化为 9 个元素的数组，空格为 `null`，与前端的 `Array(9).fill(null)` 一致。
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Board {
    cells: [Option<Mark>; CELL_COUNT],
}

impl Board {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_cells(cells: [Option<Mark>; CELL_COUNT]) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[Option<Mark>; CELL_COUNT] {
        &self.cells
    }

    /// 越界索引同样返回 `None`。
    pub fn get(&self, index: usize) -> Option<Mark> {
        self.cells.get(index).copied().flatten()
    }

    pub fn is_empty_cell(&self, index: usize) -> bool {
        index < CELL_COUNT && self.cells[index].is_none()
    }

    /// 升序返回所有空格索引。
    pub fn empty_cells(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_none())
            .map(|(index, _)| index)
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    pub fn count(&self, mark: Mark) -> usize {
        self.cells.iter().filter(|cell| **cell == Some(mark)).count()
    }

    pub fn place(&mut self, index: usize, mark: Mark) {
        self.cells[index] = Some(mark);
    }

    pub fn clear(&mut self) {
        self.cells = [None; CELL_COUNT];
    }

    /// 在副本上落子，原棋盘保持不变。
    pub fn with_mark(&self, index: usize, mark: Mark) -> Board {
        let mut next = *self;
        next.place(index, mark);
        next
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, cell) in self.cells.iter().enumerate() {
            if index > 0 && index % 3 == 0 {
                f.write_str("/")?;
            }
            let symbol = cell.map(Mark::as_char).unwrap_or('_');
            write!(f, "{symbol}")?;
        }
        Ok(())
    }
}

/// 字符串棋盘的解析错误。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BoardParseError {
    #[error("unexpected character '{0}'")]
    UnexpectedCharacter(char),
    #[error("expected {} cells, found more", CELL_COUNT)]
    TooManyCells,
    #[error("expected {} cells, found {found}", CELL_COUNT)]
    TooFewCells { found: usize },
}

impl FromStr for Board {
    type Err = BoardParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut cells = [None; CELL_COUNT];
        let mut index = 0;
        for ch in s.chars() {
            let cell = match ch {
                '/' | ',' | '\n' | '\r' | '\t' => continue,
                'X' | 'x' => Some(Mark::X),
                'O' | 'o' => Some(Mark::O),
                '_' | '.' | '-' | ' ' => None,
                other => return Err(BoardParseError::UnexpectedCharacter(other)),
            };
            if index >= CELL_COUNT {
                return Err(BoardParseError::TooManyCells);
            }
            cells[index] = cell;
            index += 1;
        }
        if index != CELL_COUNT {
            return Err(BoardParseError::TooFewCells { found: index });
        }
        Ok(Board { cells })
    }
}
