//! Stack ordering (§4.4): when the input order is not trusted, recover a
//! linear order that approximately maximizes the sum of similarities
//! between consecutive slides.

use ndarray::Array2;

/// Greedy chain extension: seed with the highest-similarity pair, then
/// repeatedly extend whichever end of the chain is more similar to any
/// unvisited slide; ties broken by lower index.
pub fn greedy_chain_order(similarity: &Array2<f64>) -> Vec<usize> {
    let n = similarity.dim().0;
    if n <= 1 {
        return (0..n).collect();
    }
    let mut best_pair = (0, 1);
    let mut best_score = f64::MIN;
    for i in 0..n {
        for j in (i + 1)..n {
            if similarity[[i, j]] > best_score {
                best_score = similarity[[i, j]];
                best_pair = (i, j);
            }
        }
    }
    let mut chain = std::collections::VecDeque::from([best_pair.0, best_pair.1]);
    let mut visited = vec![false; n];
    visited[best_pair.0] = true;
    visited[best_pair.1] = true;

    while visited.iter().any(|&v| !v) {
        let front = *chain.front().unwrap();
        let back = *chain.back().unwrap();
        let mut best: Option<(bool, usize, f64)> = None;
        for cand in 0..n {
            if visited[cand] {
                continue;
            }
            for (is_front, anchor) in [(true, front), (false, back)] {
                let score = similarity[[anchor, cand]];
                let better = match &best {
                    None => true,
                    Some((_, best_cand, best_score)) => score > *best_score || (score == *best_score && cand < *best_cand),
                };
                if better {
                    best = Some((is_front, cand, score));
                }
            }
        }
        let (is_front, cand, _) = best.expect("at least one unvisited slide remains");
        if is_front {
            chain.push_front(cand);
        } else {
            chain.push_back(cand);
        }
        visited[cand] = true;
    }
    chain.into_iter().collect()
}

/// `stack_idx` for each slide (inverse permutation of `order`, which lists
/// slide indices in chain position order).
pub fn stack_indices(order: &[usize]) -> Vec<usize> {
    let mut idx = vec![0usize; order.len()];
    for (position, &slide) in order.iter().enumerate() {
        idx[slide] = position;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_slide_order_is_trivial() {
        let s = Array2::<f64>::zeros((1, 1));
        assert_eq!(greedy_chain_order(&s), vec![0]);
    }

    #[test]
    fn recovers_line_topology() {
        // slides 0-1-2-3 in a line; similarity highest between neighbors.
        let mut s = Array2::<f64>::zeros((4, 4));
        for (a, b, score) in [(0, 1, 10.0), (1, 2, 9.0), (2, 3, 8.0)] {
            s[[a, b]] = score;
            s[[b, a]] = score;
        }
        let order = greedy_chain_order(&s);
        assert!(order == vec![0, 1, 2, 3] || order == vec![3, 2, 1, 0]);
    }

    #[test]
    fn stack_indices_is_a_permutation() {
        let order = vec![2, 0, 1];
        let idx = stack_indices(&order);
        let mut sorted = idx.clone();
        sorted.sort();
        assert_eq!(sorted, vec![0, 1, 2]);
    }
}
