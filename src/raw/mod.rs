mod node;
mod pool;
mod rank_tree;

pub(crate) use rank_tree::RankTree;
