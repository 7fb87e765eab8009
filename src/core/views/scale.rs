//! Position scales mapping data values to pixels

/// Continuous linear mapping from `domain` to `range`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    pub domain: [f64; 2],
    pub range: [f32; 2],
}

impl LinearScale {
    pub fn new(domain: [f64; 2], range: [f32; 2]) -> Self {
        Self { domain, range }
    }

    fn normalize(&self, value: f64) -> f64 {
        let [d0, d1] = self.domain;
        if d1 == d0 {
            return 0.5;
        }
        (value - d0) / (d1 - d0)
    }

    pub fn map(&self, value: f64) -> f32 {
        let [r0, r1] = self.range;
        (r0 as f64 + self.normalize(value) * (r1 - r0) as f64) as f32
    }

    pub fn invert(&self, px: f32) -> f64 {
        let [r0, r1] = self.range;
        let [d0, d1] = self.domain;
        if r1 == r0 {
            return (d0 + d1) / 2.0;
        }
        d0 + (px - r0) as f64 / (r1 - r0) as f64 * (d1 - d0)
    }
}

/// Logarithmic mapping; the domain must be strictly positive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogScale {
    inner: LinearScale,
    domain: [f64; 2],
}

impl LogScale {
    pub fn new(domain: [f64; 2], range: [f32; 2]) -> Self {
        Self {
            inner: LinearScale::new([domain[0].ln(), domain[1].ln()], range),
            domain,
        }
    }

    pub fn domain(&self) -> [f64; 2] {
        self.domain
    }

    pub fn range(&self) -> [f32; 2] {
        self.inner.range
    }

    pub fn map(&self, value: f64) -> f32 {
        self.inner.map(value.ln())
    }

    pub fn invert(&self, px: f32) -> f64 {
        self.inner.invert(px).exp()
    }
}

/// Rounded band scale over `count` ordinal slots with no padding and the
/// leftover space at the end
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandScale {
    count: usize,
    start: f32,
    step: f32,
}

impl BandScale {
    pub fn new(count: usize, range: [f32; 2]) -> Self {
        let [r0, r1] = range;
        let step = if count == 0 { 0.0 } else { ((r1 - r0) / count as f32).floor().max(0.0) };
        Self { count, start: r0.round(), step }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    pub fn bandwidth(&self) -> f32 {
        self.step
    }

    /// Start of slot `i`
    pub fn position(&self, i: usize) -> f32 {
        self.start + self.step * i as f32
    }

    /// First pixel after the last slot
    pub fn end(&self) -> f32 {
        self.position(self.count)
    }

    /// Slot under `px`, `None` outside the bands
    pub fn slot_at(&self, px: f32) -> Option<usize> {
        if self.step <= 0.0 || px < self.start {
            return None;
        }
        let slot = ((px - self.start) / self.step).floor() as usize;
        (slot < self.count).then_some(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_map_invert() {
        let s = LinearScale::new([0.0, 100.0], [10.0, 210.0]);
        assert_eq!(s.map(50.0), 110.0);
        assert_eq!(s.invert(110.0), 50.0);
        let flat = LinearScale::new([3.0, 3.0], [0.0, 10.0]);
        assert_eq!(flat.map(3.0), 5.0);
    }

    #[test]
    fn test_log_scale() {
        let s = LogScale::new([1.0, 10_000.0], [0.0, 400.0]);
        assert!((s.map(100.0) - 200.0).abs() < 1e-3);
        assert!((s.invert(100.0) - 10.0).abs() < 1e-6);
        assert!((s.invert(s.map(3600.0)) - 3600.0).abs() < 1e-2);
    }

    #[test]
    fn test_band_scale_rounds_step() {
        let b = BandScale::new(11, [100.4, 210.0]);
        assert_eq!(b.step(), 9.0);
        assert_eq!(b.position(0), 100.0);
        assert_eq!(b.position(2), 118.0);
        assert_eq!(b.end(), 199.0);
        assert_eq!(b.slot_at(99.0), None);
        assert_eq!(b.slot_at(100.0), Some(0));
        assert_eq!(b.slot_at(126.9), Some(2));
        assert_eq!(b.slot_at(199.5), None);
    }

    #[test]
    fn test_band_scale_degenerate() {
        let b = BandScale::new(0, [0.0, 10.0]);
        assert_eq!(b.slot_at(5.0), None);
        let b = BandScale::new(20, [0.0, 10.0]);
        assert_eq!(b.bandwidth(), 0.0);
        assert_eq!(b.slot_at(5.0), None);
    }
}
