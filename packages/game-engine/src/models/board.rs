use serde::{Deserialize, Serialize};

pub const ROWS: usize = 8;
pub const COLUMNS: usize = 8;

/// A square on the canonical board. Row 0 is the top edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub column: usize,
}

impl Position {
    pub fn new(row: usize, column: usize) -> Self {
        Position { row, column }
    }

    /// Builds a position from untrusted signed coordinates.
    pub fn from_signed(row: i64, column: i64) -> Option<Self> {
        if (0..ROWS as i64).contains(&row) && (0..COLUMNS as i64).contains(&column) {
            Some(Position::new(row as usize, column as usize))
        } else {
            None
        }
    }

    pub fn offset(self, d_row: isize, d_column: isize) -> Option<Self> {
        Position::from_signed(
            self.row as i64 + d_row as i64,
            self.column as i64 + d_column as i64,
        )
    }

    pub fn index(self) -> usize {
        self.row * COLUMNS + self.column
    }

    pub fn mirrored(self) -> Self {
        Position::new(ROWS - 1 - self.row, COLUMNS - 1 - self.column)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// Anything that can sit on a board cell.
pub trait BoardPiece: Clone + std::fmt::Debug + PartialEq + Send + Sync {
    fn player_index(&self) -> usize;

    /// Called whenever the piece is placed, so pieces that track their own
    /// coordinates stay in sync with the cell holding them.
    fn relocate(&mut self, _position: Position) {}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell<P> {
    pub index: usize,
    pub row: usize,
    pub column: usize,
    pub piece: Option<P>,
}

impl<P> Cell<P> {
    pub fn position(&self) -> Position {
        Position::new(self.row, self.column)
    }
}

/// Fixed ROWS x COLUMNS grid stored row-major. Cells never move; only their
/// pieces do.
#[derive(Debug, Clone, PartialEq)]
pub struct Board<P> {
    cells: Vec<Cell<P>>,
}

impl<P: BoardPiece> Default for Board<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: BoardPiece> Board<P> {
    pub fn new() -> Self {
        let cells = (0..ROWS)
            .flat_map(|row| (0..COLUMNS).map(move |column| (row, column)))
            .map(|(row, column)| Cell {
                index: row * COLUMNS + column,
                row,
                column,
                piece: None,
            })
            .collect();
        Board { cells }
    }

    pub fn cells(&self) -> &[Cell<P>] {
        &self.cells
    }

    pub fn piece_at(&self, position: Position) -> Option<&P> {
        self.cells[position.index()].piece.as_ref()
    }

    pub fn is_empty(&self, position: Position) -> bool {
        self.piece_at(position).is_none()
    }

    pub fn place(&mut self, mut piece: P, position: Position) {
        piece.relocate(position);
        self.cells[position.index()].piece = Some(piece);
    }

    pub fn remove(&mut self, position: Position) -> Option<P> {
        self.cells[position.index()].piece.take()
    }

    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.piece = None;
        }
    }

    /// Positions holding a piece owned by `player_index`, in row-major order.
    pub fn positions_of(&self, player_index: usize) -> Vec<Position> {
        self.cells
            .iter()
            .filter(|cell| {
                cell.piece
                    .as_ref()
                    .is_some_and(|piece| piece.player_index() == player_index)
            })
            .map(Cell::position)
            .collect()
    }

    pub fn piece_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.piece.is_some()).count()
    }

    /// View with rows and columns reversed, so the player sitting on the top
    /// edge sees their own pieces at the bottom. The canonical board is left
    /// untouched.
    pub fn mirror(&self) -> Board<P> {
        let mut mirrored = Board::new();
        for cell in &self.cells {
            if let Some(piece) = &cell.piece {
                mirrored.place(piece.clone(), cell.position().mirrored());
            }
        }
        mirrored
    }

    pub fn rows(&self) -> Vec<Vec<Cell<P>>> {
        self.cells
            .chunks(COLUMNS)
            .map(|row| row.to_vec())
            .collect()
    }

    /// Rebuilds a board from a row-major grid, checking that every cell sits
    /// where its coordinates say it does.
    pub fn from_rows(rows: Vec<Vec<Cell<P>>>) -> Result<Self, String> {
        if rows.len() != ROWS {
            return Err(format!("expected {} rows, found {}", ROWS, rows.len()));
        }

        let mut board = Board::new();
        for (row_index, row) in rows.into_iter().enumerate() {
            if row.len() != COLUMNS {
                return Err(format!(
                    "row {} has {} cells, expected {}",
                    row_index,
                    row.len(),
                    COLUMNS
                ));
            }
            for (column_index, cell) in row.into_iter().enumerate() {
                let position = Position::new(row_index, column_index);
                if cell.row != row_index
                    || cell.column != column_index
                    || cell.index != position.index()
                {
                    return Err(format!(
                        "cell {} is stored at {} but claims index {} at ({}, {})",
                        position.index(),
                        position,
                        cell.index,
                        cell.row,
                        cell.column
                    ));
                }
                if let Some(piece) = cell.piece {
                    board.cells[position.index()].piece = Some(piece);
                }
            }
        }

        Ok(board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Token {
        owner: usize,
        at: Option<Position>,
    }

    impl BoardPiece for Token {
        fn player_index(&self) -> usize {
            self.owner
        }

        fn relocate(&mut self, position: Position) {
            self.at = Some(position);
        }
    }

    fn token(owner: usize) -> Token {
        Token { owner, at: None }
    }

    #[test]
    fn test_new_board_has_stable_indices() {
        let board: Board<Token> = Board::new();

        assert_eq!(board.cells().len(), ROWS * COLUMNS);
        for (index, cell) in board.cells().iter().enumerate() {
            assert_eq!(cell.index, index);
            assert_eq!(cell.row, index / COLUMNS);
            assert_eq!(cell.column, index % COLUMNS);
            assert!(cell.piece.is_none());
        }
    }

    #[test]
    fn test_place_and_remove() {
        let mut board = Board::new();
        let position = Position::new(3, 5);

        board.place(token(1), position);
        assert_eq!(board.piece_at(position).unwrap().at, Some(position));
        assert_eq!(board.positions_of(1), vec![position]);
        assert!(board.positions_of(0).is_empty());

        let removed = board.remove(position);
        assert!(removed.is_some());
        assert!(board.is_empty(position));
        assert!(board.remove(position).is_none());
    }

    #[test]
    fn test_place_replaces_existing_piece() {
        let mut board = Board::new();
        let position = Position::new(0, 0);

        board.place(token(0), position);
        board.place(token(1), position);

        assert_eq!(board.piece_count(), 1);
        assert_eq!(board.piece_at(position).unwrap().owner, 1);
    }

    #[test]
    fn test_offset_stays_on_board() {
        let corner = Position::new(0, 7);

        assert_eq!(corner.offset(1, -1), Some(Position::new(1, 6)));
        assert_eq!(corner.offset(-1, 0), None);
        assert_eq!(corner.offset(0, 1), None);
        assert_eq!(Position::from_signed(-1, 3), None);
        assert_eq!(Position::from_signed(8, 3), None);
    }

    #[test]
    fn test_mirror_reverses_rows_and_columns() {
        let mut board = Board::new();
        board.place(token(0), Position::new(7, 1));

        let mirrored = board.mirror();

        assert!(mirrored.is_empty(Position::new(7, 1)));
        let piece = mirrored.piece_at(Position::new(0, 6)).unwrap();
        assert_eq!(piece.at, Some(Position::new(0, 6)));
        // canonical board is untouched
        assert!(board.piece_at(Position::new(7, 1)).is_some());
    }

    #[test]
    fn test_rows_round_trip() {
        let mut board = Board::new();
        board.place(token(0), Position::new(2, 3));

        let rebuilt = Board::from_rows(board.rows()).unwrap();

        assert_eq!(rebuilt, board);
    }

    #[test]
    fn test_from_rows_rejects_misplaced_cell() {
        let board: Board<Token> = Board::new();
        let mut rows = board.rows();
        rows[4][2].column = 6;

        assert!(Board::from_rows(rows).is_err());
    }

    #[test]
    fn test_from_rows_rejects_short_grid() {
        let board: Board<Token> = Board::new();
        let mut rows = board.rows();
        rows.pop();

        assert!(Board::from_rows(rows).is_err());
    }
}
