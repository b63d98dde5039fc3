// 角度以弧度計，從 12 點鐘方向順時針量起
use crate::domain::model::Datum;
use std::f64::consts::{PI, TAU};
use std::time::Duration;

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcAngles {
    pub start: f64,
    pub end: f64,
}

impl ArcAngles {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn span(&self) -> f64 {
        self.end - self.start
    }

    /// Bisecting angle.
    pub fn mid(&self) -> f64 {
        self.start + self.span() / 2.0
    }

    /// Right half of the pie (label text reads left to right).
    pub fn is_right_half(&self) -> bool {
        self.mid() < PI
    }

    pub fn lerp(&self, to: &ArcAngles, t: f64) -> ArcAngles {
        ArcAngles {
            start: self.start + (to.start - self.start) * t,
            end: self.end + (to.end - self.end) * t,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub label: String,
    pub value: f64,
    pub index: usize,
    pub angles: ArcAngles,
}

/// Lays slices out in input order; equal values keep their input order.
/// Negative values count as zero. An all-zero dataset yields empty wedges.
pub fn pie_layout(data: &[Datum]) -> Vec<PieSlice> {
    let total: f64 = data.iter().map(|d| d.value.max(0.0)).sum();
    let k = if total > 0.0 { TAU / total } else { 0.0 };

    let mut angle = 0.0;
    data.iter()
        .enumerate()
        .map(|(index, datum)| {
            let start = angle;
            angle += datum.value.max(0.0) * k;
            PieSlice {
                label: datum.label.clone(),
                value: datum.value,
                index,
                angles: ArcAngles::new(start, angle),
            }
        })
        .collect()
}

/// Annular sector generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcShape {
    pub inner_radius: f64,
    pub outer_radius: f64,
}

impl ArcShape {
    pub fn new(inner_radius: f64, outer_radius: f64) -> Self {
        Self {
            inner_radius,
            outer_radius,
        }
    }

    pub fn point(radius: f64, angle: f64) -> (f64, f64) {
        (radius * angle.sin(), -radius * angle.cos())
    }

    pub fn centroid(&self, angles: &ArcAngles) -> (f64, f64) {
        let r = (self.inner_radius + self.outer_radius) / 2.0;
        Self::point(r, angles.mid())
    }

    /// SVG path data for the sector.
    pub fn path(&self, angles: &ArcAngles) -> String {
        let (r0, r1) = (self.inner_radius, self.outer_radius);
        let (a0, a1) = (angles.start, angles.end);
        let span = (a1 - a0).abs();

        if r1 <= EPSILON {
            return "M0,0Z".to_string();
        }

        if span <= EPSILON {
            let (x, y) = Self::point(r1, a0);
            return format!("M{},{}Z", fmt(x), fmt(y));
        }

        if span >= TAU - EPSILON {
            // 完整圓環需拆成兩段圓弧
            let mut d = format!(
                "M0,{}A{},{},0,1,1,0,{}A{},{},0,1,1,0,{}",
                fmt(-r1),
                fmt(r1),
                fmt(r1),
                fmt(r1),
                fmt(r1),
                fmt(r1),
                fmt(-r1)
            );
            if r0 > EPSILON {
                d.push_str(&format!(
                    "M0,{}A{},{},0,1,0,0,{}A{},{},0,1,0,0,{}",
                    fmt(-r0),
                    fmt(r0),
                    fmt(r0),
                    fmt(r0),
                    fmt(r0),
                    fmt(r0),
                    fmt(-r0)
                ));
            }
            d.push('Z');
            return d;
        }

        let large_arc = if span > PI { 1 } else { 0 };
        let sweep = if a1 >= a0 { 1 } else { 0 };
        let (x0, y0) = Self::point(r1, a0);
        let (x1, y1) = Self::point(r1, a1);

        let mut d = format!(
            "M{},{}A{},{},0,{},{},{},{}",
            fmt(x0),
            fmt(y0),
            fmt(r1),
            fmt(r1),
            large_arc,
            sweep,
            fmt(x1),
            fmt(y1)
        );

        if r0 > EPSILON {
            let (x2, y2) = Self::point(r0, a1);
            let (x3, y3) = Self::point(r0, a0);
            d.push_str(&format!(
                "L{},{}A{},{},0,{},{},{},{}",
                fmt(x2),
                fmt(y2),
                fmt(r0),
                fmt(r0),
                large_arc,
                1 - sweep,
                fmt(x3),
                fmt(y3)
            ));
        } else {
            d.push_str("L0,0");
        }
        d.push('Z');
        d
    }
}

/// Cubic in-out easing.
pub fn ease_cubic_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0) * 2.0;
    if t <= 1.0 {
        t * t * t / 2.0
    } else {
        let t = t - 2.0;
        (t * t * t + 2.0) / 2.0
    }
}

/// Quartic out easing.
pub fn ease_quart_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0) - 1.0;
    1.0 - t * t * t * t
}

/// Interpolates wedge angles from one state to another over a fixed duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcTween {
    from: ArcAngles,
    to: ArcAngles,
    elapsed: Duration,
    duration: Duration,
}

impl ArcTween {
    /// A tween already at rest on `at`.
    pub fn settled(at: ArcAngles, duration: Duration) -> Self {
        Self {
            from: at,
            to: at,
            elapsed: duration,
            duration,
        }
    }

    /// Starts a new transition from wherever the tween currently is.
    pub fn retarget(&mut self, to: ArcAngles) {
        self.from = self.current();
        self.to = to;
        self.elapsed = Duration::ZERO;
    }

    pub fn advance(&mut self, dt: Duration) {
        self.elapsed = self.elapsed.saturating_add(dt).min(self.duration);
    }

    pub fn progress(&self) -> f64 {
        if self.duration.is_zero() {
            1.0
        } else {
            self.elapsed.as_secs_f64() / self.duration.as_secs_f64()
        }
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    pub fn target(&self) -> ArcAngles {
        self.to
    }

    pub fn current(&self) -> ArcAngles {
        if self.is_finished() {
            return self.to;
        }
        self.from.lerp(&self.to, ease_cubic_in_out(self.progress()))
    }
}

/// Formats a coordinate with at most three decimals, trailing zeros trimmed.
pub(crate) fn fmt(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded == 0.0 {
        return "0".to_string();
    }
    let s = format!("{:.3}", rounded);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datum(label: &str, value: f64) -> Datum {
        Datum {
            label: label.to_string(),
            value,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_layout_preserves_input_order() {
        let slices = pie_layout(&[datum("Small", 1.0), datum("Big", 3.0)]);

        assert_eq!(slices[0].label, "Small");
        assert!(close(slices[0].angles.start, 0.0));
        assert!(close(slices[0].angles.end, TAU / 4.0));
        assert_eq!(slices[1].label, "Big");
        assert!(close(slices[1].angles.end, TAU));
    }

    #[test]
    fn test_layout_equal_values_keep_order() {
        let slices = pie_layout(&[datum("A", 2.0), datum("B", 2.0), datum("C", 2.0)]);
        let labels: Vec<&str> = slices.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["A", "B", "C"]);
        assert!(close(slices[1].angles.start, TAU / 3.0));
    }

    #[test]
    fn test_layout_all_zero() {
        let slices = pie_layout(&[datum("A", 0.0), datum("B", 0.0)]);
        assert!(slices.iter().all(|s| close(s.angles.span(), 0.0)));
    }

    #[test]
    fn test_centroid_and_halves() {
        let shape = ArcShape::new(0.0, 100.0);
        let right = ArcAngles::new(0.0, PI / 2.0);
        let (x, y) = shape.centroid(&right);
        assert!(x > 0.0 && y < 0.0);
        assert!(right.is_right_half());

        let left = ArcAngles::new(PI, 2.0 * PI);
        assert!(!left.is_right_half());
    }

    #[test]
    fn test_path_shapes() {
        let donut = ArcShape::new(40.0, 80.0);
        let quarter = donut.path(&ArcAngles::new(0.0, PI / 2.0));
        assert_eq!(quarter, "M0,-80A80,80,0,0,1,80,0L40,0A40,40,0,0,0,0,-40Z");

        let pie = ArcShape::new(0.0, 10.0);
        let half = pie.path(&ArcAngles::new(0.0, PI));
        assert_eq!(half, "M0,-10A10,10,0,0,1,0,10L0,0Z");

        let full = pie.path(&ArcAngles::new(0.0, TAU));
        assert!(full.starts_with("M0,-10A10,10,0,1,1,0,10"));
        assert!(full.ends_with('Z'));
    }

    #[test]
    fn test_tween_interpolates_and_settles() {
        let mut tween = ArcTween::settled(ArcAngles::new(0.0, 1.0), Duration::from_millis(1000));
        assert!(tween.is_finished());

        tween.retarget(ArcAngles::new(1.0, 3.0));
        assert_eq!(tween.current(), ArcAngles::new(0.0, 1.0));

        tween.advance(Duration::from_millis(500));
        let halfway = tween.current();
        assert!(close(halfway.start, 0.5));
        assert!(close(halfway.end, 2.0));

        tween.advance(Duration::from_millis(800));
        assert!(tween.is_finished());
        assert_eq!(tween.current(), ArcAngles::new(1.0, 3.0));
    }

    #[test]
    fn test_retarget_midway_starts_from_current() {
        let mut tween = ArcTween::settled(ArcAngles::new(0.0, 1.0), Duration::from_millis(100));
        tween.retarget(ArcAngles::new(0.0, 3.0));
        tween.advance(Duration::from_millis(50));
        let midway = tween.current();

        tween.retarget(ArcAngles::new(0.0, 0.5));
        assert_eq!(tween.current(), midway);
    }

    #[test]
    fn test_huge_step_finishes_running_tween() {
        let mut tween = ArcTween::settled(ArcAngles::new(0.0, 1.0), Duration::from_millis(1000));
        tween.retarget(ArcAngles::new(0.0, 2.0));
        tween.advance(Duration::from_millis(500));
        tween.advance(Duration::MAX);

        assert!(tween.is_finished());
        assert!(close(tween.progress(), 1.0));
        assert_eq!(tween.current(), ArcAngles::new(0.0, 2.0));
    }

    #[test]
    fn test_easing_endpoints() {
        assert!(close(ease_cubic_in_out(0.0), 0.0));
        assert!(close(ease_cubic_in_out(0.5), 0.5));
        assert!(close(ease_cubic_in_out(1.0), 1.0));
        assert!(close(ease_quart_out(0.0), 0.0));
        assert!(close(ease_quart_out(1.0), 1.0));
    }

    #[test]
    fn test_fmt_trims() {
        assert_eq!(fmt(1.5), "1.5");
        assert_eq!(fmt(2.0), "2");
        assert_eq!(fmt(-0.0001), "0");
        assert_eq!(fmt(3.14159), "3.142");
    }
}
