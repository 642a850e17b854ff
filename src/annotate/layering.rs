/// Minimum gap between two labels sharing a lane, in seconds.
pub const LANE_GAP_SECONDS: f64 = 0.1;

/// Greedy lane assignment for `(start, end)` spans.
///
/// Spans are visited in start order (ties keep input order); each goes into
/// the first lane whose last end plus the gap is not after its start, or a
/// new lane. Returns the lane of each span in input order.
pub fn assign_lanes(spans: &[(f64, f64)]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..spans.len()).collect();
    order.sort_by(|&a, &b| spans[a].0.total_cmp(&spans[b].0));

    let mut lane_ends: Vec<f64> = Vec::new();
    let mut lanes = vec![0usize; spans.len()];

    for idx in order {
        let (start, end) = spans[idx];
        let lane = match lane_ends
            .iter()
            .position(|&lane_end| lane_end + LANE_GAP_SECONDS <= start)
        {
            Some(lane) => lane,
            None => {
                lane_ends.push(f64::NEG_INFINITY);
                lane_ends.len() - 1
            }
        };
        lane_ends[lane] = end;
        lanes[idx] = lane;
    }

    lanes
}

pub fn lane_count(lanes: &[usize]) -> usize {
    lanes.iter().max().map_or(0, |&m| m + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_label_gets_second_lane() {
        assert_eq!(assign_lanes(&[(0.0, 5.0), (3.0, 8.0), (6.0, 10.0)]), vec![0, 1, 0]);
    }

    #[test]
    fn gap_is_required() {
        // 5.0 + 0.1 > 5.05, so the second label cannot share lane 0
        assert_eq!(assign_lanes(&[(0.0, 5.0), (5.05, 6.0)]), vec![0, 1]);
        assert_eq!(assign_lanes(&[(0.0, 5.0), (5.2, 6.0)]), vec![0, 0]);
    }

    #[test]
    fn result_is_in_input_order() {
        let lanes = assign_lanes(&[(6.0, 10.0), (0.0, 5.0), (3.0, 8.0)]);
        assert_eq!(lanes, vec![0, 0, 1]);
        assert_eq!(lane_count(&lanes), 2);
    }

    #[test]
    fn empty_input() {
        assert!(assign_lanes(&[]).is_empty());
        assert_eq!(lane_count(&[]), 0);
    }

    #[test]
    fn nested_spans_stack() {
        let lanes = assign_lanes(&[(0.0, 10.0), (1.0, 9.0), (2.0, 8.0)]);
        assert_eq!(lanes, vec![0, 1, 2]);
    }
}
