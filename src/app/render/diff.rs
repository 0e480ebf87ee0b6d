use super::canvas::{Canvas, Cell};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellChange {
    pub x: u16,
    pub y: u16,
    pub cell: Cell,
}

/// Cells of `next` that differ from `previous`. Without a previous frame of
/// the same size every non-blank cell is emitted and the second value is
/// `true`, meaning the host should clear before applying the changes.
pub fn diff_frames(previous: Option<&Canvas>, next: &Canvas) -> (Vec<CellChange>, bool) {
    let Some(previous) = previous.filter(|previous| previous.size() == next.size()) else {
        let changes = next
            .cells()
            .filter(|(_, _, cell)| !cell.is_blank())
            .map(|(x, y, cell)| CellChange { x, y, cell })
            .collect();
        return (changes, true);
    };

    let changes = previous
        .cells()
        .zip(next.cells())
        .filter(|((_, _, before), (_, _, after))| before != after)
        .map(|(_, (x, y, cell))| CellChange { x, y, cell })
        .collect();
    (changes, false)
}
