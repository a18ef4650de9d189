//! 一元线性最小二乘.

/// 最小二乘直线 `y = slope * x + intercept` 及 Pearson 相关系数.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r: f64,
}

/// 以总体 (除以 n) 的二阶矩拟合直线.
///
/// `x` 全部相同 (斜率无定义) 时返回 `None`. 调用者保证 `x.len() == y.len() >= 2`.
pub(crate) fn least_squares(x: &[f64], y: &[f64]) -> Option<LinearFit> {
    debug_assert!(x.len() == y.len() && x.len() >= 2);
    let n = x.len() as f64;
    let x_mean = x.iter().sum::<f64>() / n;
    let y_mean = y.iter().sum::<f64>() / n;

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (xi, yi) in x.iter().zip(y) {
        let (dx, dy) = (xi - x_mean, yi - y_mean);
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    let (sxx, syy, sxy) = (sxx / n, syy / n, sxy / n);
    if sxx == 0.0 {
        return None;
    }

    let den = (sxx * syy).sqrt();
    let r = if den == 0.0 {
        0.0
    } else {
        (sxy / den).clamp(-1.0, 1.0)
    };
    let slope = sxy / sxx;
    Some(LinearFit {
        slope,
        intercept: y_mean - slope * x_mean,
        r,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_least_squares() {
        let f = least_squares(&[0.0, 1.0, 2.0, 3.0], &[1.0, 3.0, 2.0, 5.0]).unwrap();
        assert!((f.slope - 1.1).abs() < 1e-12);
        assert!((f.intercept - 1.1).abs() < 1e-12);
        assert!((f.r * f.r - 1.890625 / 2.734375).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate() {
        assert!(least_squares(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]).is_none());
        let flat = least_squares(&[0.0, 1.0, 2.0], &[4.0, 4.0, 4.0]).unwrap();
        assert_eq!(flat.slope, 0.0);
        assert_eq!(flat.r, 0.0);
        assert_eq!(flat.intercept, 4.0);
    }
}
