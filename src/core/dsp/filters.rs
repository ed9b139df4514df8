//! Signal filtering utilities

/// Apply pre-emphasis filter (boosts high frequencies)
pub fn pre_emphasis(samples: &[f32], coefficient: f32) -> Vec<f32> {
    if samples.is_empty() {
        return vec![];
    }

    let mut output = Vec::with_capacity(samples.len());
    output.push(samples[0]);

    for i in 1..samples.len() {
        output.push(samples[i] - coefficient * samples[i - 1]);
    }

    output
}

/// Map an out-of-range index back into `0..len` by half-sample reflection
/// (`d c b a | a b c d | d c b a`)
fn reflect_index(mut i: isize, len: usize) -> usize {
    let n = len as isize;
    loop {
        if i < 0 {
            i = -i - 1;
        } else if i >= n {
            i = 2 * n - i - 1;
        } else {
            return i as usize;
        }
    }
}

/// Sliding median with an odd `kernel` and reflected edges
pub fn median_filter(data: &[f32], kernel: usize) -> Vec<f32> {
    if data.is_empty() || kernel <= 1 {
        return data.to_vec();
    }

    let half = (kernel / 2) as isize;
    let mut window = Vec::with_capacity(kernel);

    (0..data.len() as isize)
        .map(|center| {
            window.clear();
            window.extend(
                (center - half..=center + half).map(|i| data[reflect_index(i, data.len())]),
            );
            let mid = window.len() / 2;
            let (_, m, _) = window
                .select_nth_unstable_by(mid, |a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            *m
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pre_emphasis() {
        let out = pre_emphasis(&[1.0, 1.0, 1.0], 0.97);
        assert_eq!(out[0], 1.0);
        assert!((out[1] - 0.03).abs() < 1e-6);
        assert!(pre_emphasis(&[], 0.97).is_empty());
    }

    #[test]
    fn test_reflect_index() {
        assert_eq!(reflect_index(-1, 4), 0);
        assert_eq!(reflect_index(-2, 4), 1);
        assert_eq!(reflect_index(4, 4), 3);
        assert_eq!(reflect_index(5, 4), 2);
        assert_eq!(reflect_index(-7, 1), 0);
    }

    #[test]
    fn test_median_filter_removes_spike() {
        let data = vec![1.0, 1.0, 9.0, 1.0, 1.0];
        let filtered = median_filter(&data, 3);
        assert_eq!(filtered, vec![1.0, 1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_median_filter_kernel_longer_than_data() {
        let filtered = median_filter(&[2.0, 4.0], 31);
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|v| *v == 2.0 || *v == 4.0));
    }
}
