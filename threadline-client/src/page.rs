use crate::{
    api::{CommentId, CommentNode},
    Forest,
};

/// One page of root comments, each carrying its whole reply subtree
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
pub struct Page {
    pub comments: Vec<CommentNode>,

    /// 1-based
    pub page: usize,
    pub total_pages: usize,

    /// Roots and replies of the whole discussion, not only this page
    pub total_comment_count: usize,
}

pub fn total_pages(roots: usize, page_size: usize) -> usize {
    match page_size {
        0 => 0,
        _ => (roots + page_size - 1) / page_size,
    }
}

/// Slices the roots of `forest` into pages of `page_size`
///
/// Out-of-range page numbers are not clamped: they yield an empty page with
/// correct totals, and the caller decides what to show.
pub fn paginate(forest: &Forest, page: usize, page_size: usize) -> Page {
    Page {
        comments: page_roots(forest.roots(), page, page_size)
            .iter()
            .filter_map(|r| forest.subtree(r))
            .collect(),
        page,
        total_pages: total_pages(forest.roots().len(), page_size),
        total_comment_count: forest.total_comment_count(),
    }
}

pub(crate) fn page_roots(roots: &[CommentId], page: usize, page_size: usize) -> &[CommentId] {
    if page == 0 || page_size == 0 {
        return &[];
    }
    let start = (page - 1).saturating_mul(page_size);
    if start >= roots.len() {
        return &[];
    }
    let end = start.saturating_add(page_size).min(roots.len());
    &roots[start..end]
}

/// 1-based page holding root `root`
pub(crate) fn page_of_root(roots: &[CommentId], root: &CommentId, page_size: usize) -> Option<usize> {
    if page_size == 0 {
        return None;
    }
    roots
        .iter()
        .position(|r| r == root)
        .map(|idx| idx / page_size + 1)
}
