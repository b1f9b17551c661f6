//! Inline SVG pie charts for marker popups.
//!
//! Each chart is two stroked circles drawn with `pathLength="360"`, so a
//! slice's dash length is its sweep in degrees.

use serde::Serialize;
use tera::{Context, Tera};

const FULL_CIRCLE: f64 = 360.0;
const DEGREES_PER_PERCENT: f64 = FULL_CIRCLE / 100.0;

pub const PIE_TEMPLATE: &str = r#"<div style="text-align: center;">
    <svg width="100" height="100" viewBox="0 0 32 32" style="display: block; margin: 0 auto;">
        <circle r="16" cx="16" cy="16" fill="white"></circle>
        <circle r="8" cx="16" cy="16" fill="none" pathLength="360"
                stroke="{{ a.color }}" stroke-width="16"
                stroke-dasharray="{{ a.arc }} {{ a.rest }}"
                transform="rotate(-90 16 16)"></circle>
        <circle r="8" cx="16" cy="16" fill="none" pathLength="360"
                stroke="{{ b.color }}" stroke-width="16"
                stroke-dasharray="{{ b.arc }} {{ b.rest }}" stroke-dashoffset="-{{ a.arc }}"
                transform="rotate(-90 16 16)"></circle>
    </svg>
    <p style="margin: 5px 0; font-family: Arial; font-size: 12px;">
        <b>{{ a.label }}:</b> {{ a.count }} ({{ a.percent }}%)<br>
        <b>{{ b.label }}:</b> {{ b.count }} ({{ b.percent }}%)
    </p>
</div>"#;

/// Label and color for one slice.
#[derive(Debug, Clone)]
pub struct Slice<'a> {
    pub label: &'a str,
    pub color: &'a str,
}

/// The two-way split of a marker's counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PieChart {
    pub a_count: f64,
    pub b_count: f64,
    pub a_percent: f64,
    pub b_percent: f64,
}

#[derive(Serialize)]
struct SliceView<'a> {
    label: &'a str,
    color: &'a str,
    count: String,
    percent: String,
    arc: String,
    rest: String,
}

impl PieChart {
    /// Negative counts are treated as zero for the split; an empty split is 50/50.
    pub fn new(a_count: f64, b_count: f64) -> Self {
        let a = a_count.max(0.0);
        let b = b_count.max(0.0);
        let total = a + b;
        let (a_percent, b_percent) = if total > 0.0 {
            (a * 100.0 / total, b * 100.0 / total)
        } else {
            (50.0, 50.0)
        };
        Self { a_count, b_count, a_percent, b_percent }
    }

    pub fn a_arc(&self) -> f64 {
        self.a_percent * DEGREES_PER_PERCENT
    }

    pub fn b_arc(&self) -> f64 {
        self.b_percent * DEGREES_PER_PERCENT
    }

    /// Template context for [`PIE_TEMPLATE`].
    pub fn context(&self, a: &Slice<'_>, b: &Slice<'_>) -> Context {
        let mut context = Context::new();
        context.insert("a", &slice_view(a, self.a_count, self.a_percent, self.a_arc()));
        context.insert("b", &slice_view(b, self.b_count, self.b_percent, self.b_arc()));
        context
    }

    pub fn to_html(&self, a: &Slice<'_>, b: &Slice<'_>) -> tera::Result<String> {
        Tera::one_off(PIE_TEMPLATE, &self.context(a, b), true)
    }
}

fn slice_view<'a>(slice: &Slice<'a>, count: f64, percent: f64, arc: f64) -> SliceView<'a> {
    SliceView {
        label: slice.label,
        color: slice.color,
        count: format_count(count),
        percent: format!("{:.1}", percent),
        arc: arc.to_string(),
        rest: (FULL_CIRCLE - arc).to_string(),
    }
}

/// Count with thousands separators: `1234567` -> `1,234,567`, `1234.5` -> `1,234.5`.
pub fn format_count(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let raw = if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    };
    let (sign, unsigned) = match raw.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", raw.as_str()),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}
