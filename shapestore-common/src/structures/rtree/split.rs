use crate::structures::BoundingBox;

/// Guttman's quadratic split.
///
/// Seeds are the pair whose covering box wastes the most area. The remaining
/// items are then assigned one at a time, always taking next the item with the
/// strongest preference for one group, to the group needing the smaller
/// enlargement (ties go to the group with fewer items, then the smaller group
/// box). A group takes all remaining items once it needs them to reach
/// `min_entries`, so both halves satisfy the minimum fan-out.
pub(super) fn quadratic_split<T>(
    mut items: Vec<(BoundingBox, T)>,
    min_entries: usize,
) -> (Vec<(BoundingBox, T)>, Vec<(BoundingBox, T)>) {
    let (s1, s2) = pick_seeds(&items);
    // s1 < s2, so removing s2 first leaves s1 in place
    let seed2 = items.swap_remove(s2);
    let seed1 = items.swap_remove(s1);

    let mut bb1 = seed1.0;
    let mut bb2 = seed2.0;
    let mut group1 = vec![seed1];
    let mut group2 = vec![seed2];

    while !items.is_empty() {
        if group1.len() + items.len() <= min_entries {
            group1.append(&mut items);
            break;
        }
        if group2.len() + items.len() <= min_entries {
            group2.append(&mut items);
            break;
        }

        let mut next = 0usize;
        let mut max_diff = f64::NEG_INFINITY;
        for (i, (bb, _)) in items.iter().enumerate() {
            let diff = (bb1.enlargement(*bb) - bb2.enlargement(*bb)).abs();
            if diff > max_diff {
                max_diff = diff;
                next = i;
            }
        }

        let item = items.swap_remove(next);
        let d1 = bb1.enlargement(item.0);
        let d2 = bb2.enlargement(item.0);
        let to_first = if d1 != d2 {
            d1 < d2
        } else if group1.len() != group2.len() {
            group1.len() < group2.len()
        } else {
            bb1.area() <= bb2.area()
        };
        if to_first {
            bb1.expand_to(item.0);
            group1.push(item);
        } else {
            bb2.expand_to(item.0);
            group2.push(item);
        }
    }

    (group1, group2)
}

fn pick_seeds<T>(items: &[(BoundingBox, T)]) -> (usize, usize) {
    let mut seeds = (0usize, 1usize);
    let mut max_waste = f64::NEG_INFINITY;
    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            let a = items[i].0;
            let b = items[j].0;
            let waste = a.union(b).area() - a.area() - b.area();
            if waste > max_waste {
                max_waste = waste;
                seeds = (i, j);
            }
        }
    }
    seeds
}
