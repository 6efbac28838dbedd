//! Move trees: exporting repertoire lines and saving game trees into a repertoire

use shakmaty::{Chess, Color, Move, Position};

use crate::codec;
use crate::error::{Error, Result};
use crate::key::PositionKey;
use crate::repertoire::{Repertoire, Section};
use crate::visitor::TreeVisitor;

pub type NodeId = usize;

#[derive(Debug, Clone)]
pub struct Node {
    /// Position after `mv`
    pub position: Chess,
    /// Move leading here; `None` at the root
    pub mv: Option<Move>,
    pub parent: Option<NodeId>,
    /// First child is the main variation
    pub children: Vec<NodeId>,
}

/// Arena-allocated game tree rooted at an arbitrary position.
#[derive(Debug, Clone)]
pub struct MoveTree {
    nodes: Vec<Node>,
}

impl MoveTree {
    pub const ROOT: NodeId = 0;

    pub fn new(root: Chess) -> Self {
        Self {
            nodes: vec![Node {
                position: root,
                mv: None,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Child of `parent` reached by `mv`, added as the last variation if new.
    pub fn add_variation(&mut self, parent: NodeId, mv: Move) -> Result<NodeId> {
        if let Some(&existing) = self.nodes[parent]
            .children
            .iter()
            .find(|&&c| self.nodes[c].mv.as_ref() == Some(&mv))
        {
            return Ok(existing);
        }
        let position = self.nodes[parent]
            .position
            .clone()
            .play(&mv)
            .map_err(|_| Error::IllegalMove {
                mv: codec::to_uci(&mv),
            })?;
        let id = self.nodes.len();
        self.nodes.push(Node {
            position,
            mv: Some(mv),
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        Ok(id)
    }

    pub fn add_line(&mut self, parent: NodeId, moves: &[Move]) -> Result<NodeId> {
        moves
            .iter()
            .try_fold(parent, |at, mv| self.add_variation(at, mv.clone()))
    }

    /// Add a line given in UCI notation.
    pub fn add_uci_line(&mut self, parent: NodeId, moves: &[&str]) -> Result<NodeId> {
        let mut at = parent;
        for uci in moves {
            let mv = codec::parse_uci(&self.nodes[at].position, uci)?;
            at = self.add_variation(at, mv)?;
        }
        Ok(at)
    }

    /// The root and every first variation are main variations.
    pub fn is_main_variation(&self, id: NodeId) -> bool {
        match self.nodes[id].parent {
            None => true,
            Some(parent) => self.nodes[parent].children.first() == Some(&id),
        }
    }

    /// Moves from the root down to `id`.
    pub fn line_to(&self, id: NodeId) -> Vec<Move> {
        let mut line = Vec::new();
        let mut at = id;
        while let Some(parent) = self.nodes[at].parent {
            if let Some(mv) = &self.nodes[at].mv {
                line.push(mv.clone());
            }
            at = parent;
        }
        line.reverse();
        line
    }

    /// Root-to-leaf lines, depth-first with main variations first.
    pub fn lines(&self) -> Vec<Vec<Move>> {
        let mut lines = Vec::new();
        let mut stack = vec![Self::ROOT];
        while let Some(id) = stack.pop() {
            let children = &self.nodes[id].children;
            if children.is_empty() {
                lines.push(self.line_to(id));
            }
            stack.extend(children.iter().rev());
        }
        lines
    }

    /// Nodes whose position has `color` to move; every node when `None`.
    pub fn count_turn(&self, color: Option<Color>) -> usize {
        self.nodes
            .iter()
            .filter(|n| color.map_or(true, |c| n.position.turn() == c))
            .count()
    }

    pub fn keys(&self) -> Vec<PositionKey> {
        self.nodes.iter().map(|n| PositionKey::of(&n.position)).collect()
    }
}

/// Tree of `line` played from `root`, continued by every stored move below its end.
///
/// Positions on `line` count as visited, so the export never loops back into them.
pub fn export_subtree(rep: &Repertoire, section: Section, root: &Chess, line: &[Move]) -> Result<MoveTree> {
    let mut tree = MoveTree::new(root.clone());
    let end = tree.add_line(MoveTree::ROOT, line)?;
    let start = tree.node(end).position.clone();

    let visitor = TreeVisitor::new(rep, section, &start)
        .every_turn()
        .skip(tree.keys());
    let mut path = vec![end];
    for visit in visitor {
        path.truncate(visit.depth + 1);
        let id = tree.add_variation(path[visit.depth], visit.mv)?;
        path.push(id);
    }
    Ok(tree)
}

/// Store the reachable part of `tree` in `player`'s repertoire.
///
/// The root is reachable. A child is reachable when its parent is and it is
/// either the first variation or a move by the opponent, so only the main
/// choice of `player` is stored while every opponent reply is kept.
/// Returns the number of records added.
pub fn save_to_repertoire(rep: &mut Repertoire, player: Color, tree: &MoveTree) -> Result<usize> {
    let section = Section::Repertoire(player);
    let mut added = 0;
    let mut stack = vec![MoveTree::ROOT];
    while let Some(id) = stack.pop() {
        for &child in tree.children(id) {
            let node = tree.node(child);
            let opponent_moved = node.position.turn() == player;
            if !(tree.is_main_variation(child) || opponent_moved) {
                continue;
            }
            if let Some(mv) = &node.mv {
                if rep.append(section, &tree.node(id).position, mv, 1, 0)? {
                    added += 1;
                }
            }
            stack.push(child);
        }
    }
    log::debug!("saved {} new move(s) to the {} repertoire", added, section);
    Ok(added)
}

/// Per-node flag: is the move leading to the node stored in `player`'s repertoire?
///
/// Each node is judged on its own; leaving the repertoire and transposing
/// back into it counts as book again. The root is always book.
pub fn book_marks(rep: &Repertoire, player: Color, tree: &MoveTree) -> Vec<bool> {
    let section = Section::Repertoire(player);
    (0..tree.len())
        .map(|id| {
            let node = tree.node(id);
            match (node.parent, &node.mv) {
                (Some(parent), Some(mv)) => rep.contains(section, &tree.node(parent).position, mv),
                _ => true,
            }
        })
        .collect()
}
