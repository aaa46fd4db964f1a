/// Rance-Kay / echo-antiecho reshuffling along any axis.
///
/// Consecutive planes `(i, i+1)` along the axis become
///
/// ```text
///   out[i]   = (Re[i] - Re[i+1]) + j(Im[i] - Im[i+1])
///   out[i+1] = -(Im[i] + Im[i+1]) + j(Re[i] + Re[i+1])   (rotate_phase)
///            =  (Re[i] + Re[i+1]) + j(Im[i] + Im[i+1])   (otherwise)
/// ```
///
/// `rotate_phase` folds the 90° zero-order correction into the shuffle.

use super::FidArray;
use num_complex::Complex32;

pub fn combine_pair(a: Complex32, b: Complex32, rotate_phase: bool) -> (Complex32, Complex32) {
    let first = Complex32::new(a.re - b.re, a.im - b.im);
    let second = if rotate_phase {
        Complex32::new(-(a.im + b.im), a.re + b.re)
    } else {
        Complex32::new(a.re + b.re, a.im + b.im)
    };
    (first, second)
}

/// Reshuffle `array` along array axis `axis` in place. A trailing unpaired
/// plane is left untouched.
pub fn rancekay_shuffle(array: &mut FidArray, axis: usize, rotate_phase: bool) {
    if axis >= array.ndim() {
        return;
    }
    let strides = array.strides();
    let stride = strides[axis];
    let len = array.shape[axis];
    let outer: usize = array.shape[..axis].iter().product();
    let block = len * stride;

    for o in 0..outer {
        let base = o * block;
        for i in (0..len.saturating_sub(1)).step_by(2) {
            let p0 = base + i * stride;
            let p1 = p0 + stride;
            for k in 0..stride {
                let (a, b) = (array.data[p0 + k], array.data[p1 + k]);
                let (x, y) = combine_pair(a, b, rotate_phase);
                array.data[p0 + k] = x;
                array.data[p1 + k] = y;
            }
        }
    }
}

/// Array axis holding descriptor dimension `dim` (direct is the last axis).
pub fn axis_for_dim(ndim: usize, dim: usize) -> Option<usize> {
    (dim < ndim).then(|| ndim - 1 - dim)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f32, im: f32) -> Complex32 {
        Complex32::new(re, im)
    }

    #[test]
    fn test_two_plane_closed_form() {
        let mut a = FidArray::new(vec![2], vec![c(1.0, 0.0), c(2.0, 0.0)]).unwrap();
        rancekay_shuffle(&mut a, 0, true);
        assert_eq!(a.data, vec![c(-1.0, 0.0), c(0.0, 3.0)]);

        let mut b = FidArray::new(vec![2], vec![c(1.0, 0.0), c(2.0, 0.0)]).unwrap();
        rancekay_shuffle(&mut b, 0, false);
        assert_eq!(b.data, vec![c(-1.0, 0.0), c(3.0, 0.0)]);
    }

    #[test]
    fn test_outer_axis_of_2d() {
        // 2 rows of 2 points; rows are combined point by point.
        let mut a = FidArray::new(
            vec![2, 2],
            vec![c(1.0, 1.0), c(2.0, 0.0), c(3.0, -1.0), c(4.0, 2.0)],
        )
        .unwrap();
        rancekay_shuffle(&mut a, 0, true);
        assert_eq!(a.data[0], c(-2.0, 2.0));
        assert_eq!(a.data[1], c(-2.0, -2.0));
        assert_eq!(a.data[2], c(0.0, 4.0));
        assert_eq!(a.data[3], c(-2.0, 6.0));
    }

    #[test]
    fn test_middle_axis_of_3d_leaves_other_axes() {
        let data: Vec<Complex32> = (0..8).map(|i| c(i as f32, 0.0)).collect();
        let mut a = FidArray::new(vec![2, 2, 2], data).unwrap();
        rancekay_shuffle(&mut a, 1, false);
        // Plane pairs (0,2),(1,3) in block 0 and (4,6),(5,7) in block 1.
        let re: Vec<f32> = a.data.iter().map(|z| z.re).collect();
        assert_eq!(re, vec![-2.0, -2.0, 2.0, 4.0, -2.0, -2.0, 10.0, 12.0]);
    }

    #[test]
    fn test_axis_for_dim() {
        assert_eq!(axis_for_dim(3, 0), Some(2));
        assert_eq!(axis_for_dim(3, 2), Some(0));
        assert_eq!(axis_for_dim(2, 2), None);
    }
}
