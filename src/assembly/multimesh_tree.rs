//! Binary tree of sub-element labels shared by all meshes along one edge.
//!
//! Every root-to-leaf path selects one segment of the edge on which each mesh sees exactly
//! one active element on either side. Nodes live in an arena and refer to their children by
//! index.
use crate::error::AssemblyError;
use crate::transform::TransformPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Node {
    label: u8,
    left: Option<usize>,
    right: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultimeshTree {
    // Node 0 is the root; its label is unused
    nodes: Vec<Node>,
}

impl Default for MultimeshTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MultimeshTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                label: 0,
                left: None,
                right: None,
            }],
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Inserts a path, creating nodes for labels not yet present.
    pub fn insert(&mut self, path: &[u8]) -> Result<(), AssemblyError> {
        let mut current = 0;
        for (depth, &label) in path.iter().enumerate() {
            current = match self.child_with_label(current, label) {
                Some(child) => child,
                None => self.add_child(current, label, depth)?,
            };
        }
        Ok(())
    }

    /// Index of the node reached by following `path` from the root.
    pub fn find(&self, path: &[u8]) -> Result<usize, AssemblyError> {
        path.iter()
            .try_fold(0, |node, &label| self.child_with_label(node, label))
            .ok_or_else(|| AssemblyError::TreePathNotFound { path: path.to_vec() })
    }

    pub fn is_leaf(&self, node: usize) -> bool {
        let node = &self.nodes[node];
        node.left.is_none() && node.right.is_none()
    }

    /// Paths from `node` to every leaf below it, left before right. A leaf yields one empty
    /// path.
    pub fn leaf_paths_below(&self, node: usize) -> Result<Vec<TransformPath>, AssemblyError> {
        let mut leaves = Vec::new();
        let mut stack = vec![(node, TransformPath::new())];
        while let Some((index, path)) = stack.pop() {
            let Node { left, right, .. } = self.nodes[index];
            match (left, right) {
                (None, None) => leaves.push(path),
                (Some(left), right) => {
                    // Right is pushed first so that the left subtree is emitted first
                    if let Some(right) = right {
                        stack.push((right, path.with(self.nodes[right].label)));
                    }
                    stack.push((left, path.with(self.nodes[left].label)));
                }
                (None, Some(_)) => return Err(AssemblyError::MalformedTreeNode { node: index }),
            }
        }
        Ok(leaves)
    }

    /// All root-to-leaf paths in depth-first order.
    pub fn leaf_paths(&self) -> Result<Vec<TransformPath>, AssemblyError> {
        self.leaf_paths_below(0)
    }

    fn child_with_label(&self, node: usize, label: u8) -> Option<usize> {
        let node = &self.nodes[node];
        [node.left, node.right]
            .into_iter()
            .flatten()
            .find(|&child| self.nodes[child].label == label)
    }

    fn add_child(&mut self, parent: usize, label: u8, depth: usize) -> Result<usize, AssemblyError> {
        let index = self.nodes.len();
        let node = Node {
            label,
            left: None,
            right: None,
        };
        let parent = &mut self.nodes[parent];
        if parent.left.is_none() {
            parent.left = Some(index);
        } else if parent.right.is_none() {
            parent.right = Some(index);
        } else {
            return Err(AssemblyError::TreeLabelCollision { depth, label });
        }
        self.nodes.push(node);
        Ok(index)
    }
}
