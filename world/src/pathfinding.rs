//! A* search used to route pieces across the play grid.

use std::collections::{HashMap, HashSet};

use combine_rush_core::{CellCoord, CARDINAL_DIRECTIONS};

/// Transient search node; lives only for the duration of one query.
struct SearchNode {
    cell: CellCoord,
    cost: u32,
    estimate: u32,
    parent: Option<usize>,
}

impl SearchNode {
    /// Extraction rank: total cost first, then heuristic, then accumulated
    /// cost. Equal ranks keep the earliest-inserted open node.
    fn rank(&self) -> (u32, u32, u32) {
        (self.cost + self.estimate, self.estimate, self.cost)
    }
}

/// Finds a shortest 4-connected route from `start` to `goal`.
///
/// Walkability is supplied by the caller so temporary exceptions (such as a
/// piece pathing out of its own cell) never touch grid state. The returned
/// path includes `start`; a query whose start equals its goal succeeds with a
/// single-cell path. Returns `None` when either endpoint is blocked or the
/// open set drains without reaching the goal.
///
/// The open set is a linear best-of scan, which is plenty for the tens of
/// cells a puzzle grid holds.
pub(crate) fn find_path<F>(
    columns: u32,
    rows: u32,
    is_walkable: F,
    start: CellCoord,
    goal: CellCoord,
) -> Option<Vec<CellCoord>>
where
    F: Fn(CellCoord) -> bool,
{
    let traversable =
        |cell: CellCoord| cell.column() < columns && cell.row() < rows && is_walkable(cell);

    if !traversable(start) || !traversable(goal) {
        return None;
    }

    let mut nodes = vec![SearchNode {
        cell: start,
        cost: 0,
        estimate: start.manhattan_distance(goal),
        parent: None,
    }];
    let mut open = vec![0_usize];
    let mut discovered: HashMap<CellCoord, usize> = HashMap::new();
    let mut closed: HashSet<CellCoord> = HashSet::new();
    let _ = discovered.insert(start, 0);

    while !open.is_empty() {
        let current = extract_best(&mut open, &nodes);
        let current_cell = nodes[current].cell;
        let _ = discovered.remove(&current_cell);
        let _ = closed.insert(current_cell);

        if current_cell == goal {
            return Some(reconstruct(&nodes, current));
        }

        for direction in CARDINAL_DIRECTIONS {
            let Some(neighbor) = current_cell.neighbor(direction) else {
                continue;
            };
            if !traversable(neighbor) || closed.contains(&neighbor) {
                continue;
            }

            let tentative = nodes[current].cost + 1;
            match discovered.get(&neighbor) {
                None => {
                    let index = nodes.len();
                    nodes.push(SearchNode {
                        cell: neighbor,
                        cost: tentative,
                        estimate: neighbor.manhattan_distance(goal),
                        parent: Some(current),
                    });
                    open.push(index);
                    let _ = discovered.insert(neighbor, index);
                }
                Some(&index) => {
                    if tentative < nodes[index].cost {
                        nodes[index].cost = tentative;
                        nodes[index].parent = Some(current);
                    }
                }
            }
        }
    }

    None
}

fn extract_best(open: &mut Vec<usize>, nodes: &[SearchNode]) -> usize {
    let mut best = 0;
    for position in 1..open.len() {
        if nodes[open[position]].rank() < nodes[open[best]].rank() {
            best = position;
        }
    }
    open.remove(best)
}

fn reconstruct(nodes: &[SearchNode], goal_index: usize) -> Vec<CellCoord> {
    let mut path = Vec::new();
    let mut cursor = Some(goal_index);
    while let Some(index) = cursor {
        path.push(nodes[index].cell);
        cursor = nodes[index].parent;
    }
    path.reverse();
    path
}
