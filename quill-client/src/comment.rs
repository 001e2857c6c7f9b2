//! Threading of the flat comment list the server returns

use std::collections::{HashMap, HashSet, VecDeque};

use crate::api::{Comment, CommentId};

/// Links a flat list of comments into a forest
///
/// Roots are the comments without a parent, plus the ones whose parent is
/// not in the list. Replies keep the relative order they had in the input.
/// When ids are duplicated, replies hang off the first comment with that id.
///
/// Comments only reachable through a parent cycle (a comment being its own
/// parent included) get the cycle broken at its member appearing first in
/// the input, which becomes a root. This way every input comment appears
/// exactly once in the output.
pub fn nest(comments: &[Comment]) -> Vec<Comment> {
    let mut first_index = HashMap::with_capacity(comments.len());
    for (i, c) in comments.iter().enumerate() {
        first_index.entry(c.id).or_insert(i);
    }
    let parent_of: Vec<Option<usize>> = comments
        .iter()
        .map(|c| c.parent_id.and_then(|p| first_index.get(&p).copied()))
        .collect();

    let mut children = vec![Vec::new(); comments.len()];
    let mut roots = Vec::new();
    for (i, parent) in parent_of.iter().enumerate() {
        match parent {
            Some(p) => children[*p].push(i),
            None => roots.push(i),
        }
    }

    let mut placed = vec![false; comments.len()];
    for &r in &roots {
        mark_subtree(r, &children, &mut placed);
    }
    let mut cycle_roots = Vec::new();
    for i in 0..comments.len() {
        if !placed[i] {
            let r = cycle_entry(i, &parent_of);
            tracing::debug!(id = %comments[r].id, "breaking comment parent cycle");
            mark_subtree(r, &children, &mut placed);
            cycle_roots.push(r);
        }
    }
    if !cycle_roots.is_empty() {
        roots.extend(cycle_roots);
        roots.sort_unstable();
    }

    let mut built = vec![false; comments.len()];
    roots
        .into_iter()
        .map(|r| {
            built[r] = true;
            build(r, comments, &children, &mut built)
        })
        .collect()
}

/// Total number of comments in a forest
pub fn count_nested(roots: &[Comment]) -> usize {
    roots.iter().map(|c| 1 + count_nested(&c.replies)).sum()
}

/// `id` and the ids of all its transitive replies, as found in a flat list
pub fn descendants(comments: &[Comment], id: CommentId) -> HashSet<CommentId> {
    let mut replies_to: HashMap<CommentId, Vec<CommentId>> = HashMap::new();
    for c in comments {
        if let Some(parent) = c.parent_id {
            replies_to.entry(parent).or_default().push(c.id);
        }
    }

    let mut res = HashSet::new();
    res.insert(id);
    let mut queue = VecDeque::from([id]);
    while let Some(id) = queue.pop_front() {
        for reply in replies_to.get(&id).into_iter().flatten() {
            if res.insert(*reply) {
                queue.push_back(*reply);
            }
        }
    }
    res
}

fn mark_subtree(root: usize, children: &[Vec<usize>], placed: &mut [bool]) {
    let mut stack = vec![root];
    while let Some(i) = stack.pop() {
        if !placed[i] {
            placed[i] = true;
            stack.extend(children[i].iter().copied());
        }
    }
}

/// Member of the cycle above `start` that comes first in the input
fn cycle_entry(start: usize, parent_of: &[Option<usize>]) -> usize {
    let mut seen = HashMap::new();
    let mut path = Vec::new();
    let mut cur = start;
    loop {
        if let Some(&pos) = seen.get(&cur) {
            return path[pos..].iter().copied().min().unwrap_or(cur);
        }
        seen.insert(cur, path.len());
        path.push(cur);
        match parent_of[cur] {
            Some(p) => cur = p,
            // only called on comments no root leads to
            None => return cur,
        }
    }
}

fn build(i: usize, comments: &[Comment], children: &[Vec<usize>], built: &mut [bool]) -> Comment {
    let mut c = comments[i].clone();
    c.replies = Vec::with_capacity(children[i].len());
    for &child in &children[i] {
        if !built[child] {
            built[child] = true;
            c.replies.push(build(child, comments, children, built));
        }
    }
    c
}
