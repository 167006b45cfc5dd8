/// Number of elements in each demo vector.
pub const VECTOR_SIZE: usize = 20;

/// Value of the first input vector at `index` for a vector of `len` elements.
pub fn source_a_value(index: usize, len: usize) -> i32 {
    (len - index) as i32
}

/// Value of the second input vector at `index`.
pub fn source_b_value(index: usize) -> i32 {
    (index * index) as i32
}

pub fn fill_source_a(dest: &mut [i32]) {
    let len = dest.len();
    for (index, value) in dest.iter_mut().enumerate() {
        *value = source_a_value(index, len);
    }
}

pub fn fill_source_b(dest: &mut [i32]) {
    for (index, value) in dest.iter_mut().enumerate() {
        *value = source_b_value(index);
    }
}

/// What a correct run must produce at `index`.
pub fn expected_sum(index: usize, len: usize) -> i32 {
    add_values(source_a_value(index, len), source_b_value(index))
}

/// The work done by one work item.
#[inline(always)]
pub fn add_values(a: i32, b: i32) -> i32 {
    a.wrapping_add(b)
}

/// The work done by the single-work-item kernel: one thread walks all `count` elements.
pub fn add_single_work_item(a: &[i32], b: &[i32], dest: &mut [i32], count: usize) {
    for i in 0..count {
        dest[i] = add_values(a[i], b[i]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sources_match_closed_form() {
        let mut a = [0i32; VECTOR_SIZE];
        let mut b = [0i32; VECTOR_SIZE];
        fill_source_a(&mut a);
        fill_source_b(&mut b);

        assert_eq!(a[0], 20);
        assert_eq!(a[19], 1);
        assert_eq!(b[0], 0);
        assert_eq!(b[19], 361);
    }

    #[test]
    fn test_single_work_item_matches_expected_sum() {
        let mut a = [0i32; VECTOR_SIZE];
        let mut b = [0i32; VECTOR_SIZE];
        let mut dest = [0i32; VECTOR_SIZE];
        fill_source_a(&mut a);
        fill_source_b(&mut b);

        add_single_work_item(&a, &b, &mut dest, VECTOR_SIZE);

        for (i, value) in dest.iter().enumerate() {
            assert_eq!(*value, expected_sum(i, VECTOR_SIZE));
            assert_eq!(*value, (VECTOR_SIZE - i) as i32 + (i * i) as i32);
        }
    }

    #[test]
    fn test_single_work_item_respects_count() {
        let a = [1, 2, 3, 4];
        let b = [10, 20, 30, 40];
        let mut dest = [0i32; 4];

        add_single_work_item(&a, &b, &mut dest, 2);

        assert_eq!(dest, [11, 22, 0, 0]);
    }
}
