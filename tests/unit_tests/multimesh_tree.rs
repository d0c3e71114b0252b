use discretize::assembly::multimesh_tree::MultimeshTree;
use discretize::error::AssemblyError;
use discretize::transform::TransformPath;

fn paths(labels: &[&[u8]]) -> Vec<TransformPath> {
    labels.iter().map(|l| TransformPath::from_labels(*l)).collect()
}

#[test]
fn empty_tree_has_single_empty_leaf() {
    let tree = MultimeshTree::new();
    assert_eq!(tree.num_nodes(), 1);
    assert!(tree.is_leaf(0));
    assert_eq!(tree.leaf_paths().unwrap(), paths(&[&[]]));
}

#[test]
fn leaves_are_emitted_left_to_right() {
    let mut tree = MultimeshTree::new();
    tree.insert(&[0, 1]).unwrap();
    tree.insert(&[3]).unwrap();
    tree.insert(&[0, 2]).unwrap();
    assert_eq!(tree.num_nodes(), 5);
    assert_eq!(tree.leaf_paths().unwrap(), paths(&[&[0, 1], &[0, 2], &[3]]));
}

#[test]
fn inserting_existing_prefix_adds_nothing() {
    let mut tree = MultimeshTree::new();
    tree.insert(&[2]).unwrap();
    tree.insert(&[1]).unwrap();
    tree.insert(&[]).unwrap();
    tree.insert(&[2]).unwrap();
    assert_eq!(tree.num_nodes(), 3);
    assert_eq!(tree.leaf_paths().unwrap(), paths(&[&[2], &[1]]));
}

#[test]
fn find_locates_inner_nodes_and_leaves() {
    let mut tree = MultimeshTree::new();
    tree.insert(&[0, 1]).unwrap();
    tree.insert(&[0, 2]).unwrap();
    tree.insert(&[3]).unwrap();

    let inner = tree.find(&[0]).unwrap();
    assert!(!tree.is_leaf(inner));
    assert_eq!(tree.leaf_paths_below(inner).unwrap(), paths(&[&[1], &[2]]));

    let leaf = tree.find(&[0, 2]).unwrap();
    assert!(tree.is_leaf(leaf));
    assert_eq!(tree.leaf_paths_below(leaf).unwrap(), paths(&[&[]]));

    assert_eq!(tree.find(&[]).unwrap(), 0);
}

#[test]
fn missing_path_is_reported() {
    let mut tree = MultimeshTree::new();
    tree.insert(&[0, 1]).unwrap();
    assert_eq!(tree.find(&[0, 2]), Err(AssemblyError::TreePathNotFound { path: vec![0, 2] }));
    assert_eq!(tree.find(&[3]), Err(AssemblyError::TreePathNotFound { path: vec![3] }));
}

#[test]
fn third_label_below_a_node_collides() {
    let mut tree = MultimeshTree::new();
    tree.insert(&[1, 0]).unwrap();
    tree.insert(&[1, 3]).unwrap();
    assert_eq!(
        tree.insert(&[1, 2]),
        Err(AssemblyError::TreeLabelCollision { depth: 1, label: 2 })
    );
}
