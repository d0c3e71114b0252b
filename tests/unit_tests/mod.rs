mod mesh;
mod multimesh_tree;
mod space;
mod sparse;
mod transform;
