//! Bar charts of vote counts, renderable as embeddable SVG.

use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::model::db::Choice;

/// Rendered chart width, in pixels.
pub const CHART_WIDTH: u32 = 700;
/// Rendered chart height, in pixels.
pub const CHART_HEIGHT: u32 = 500;

const X_TITLE: &str = "Choice";
const Y_TITLE: &str = "Votes";

// Space reserved around the plot area for axes and their labels.
const MARGIN_LEFT: f64 = 60.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 20.0;
const MARGIN_BOTTOM: f64 = 60.0;
// Fraction of each slot filled by its bar.
const BAR_FILL: f64 = 0.8;

/// A single bar: one choice and its vote count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    pub label: String,
    pub value: u32,
}

/// A fixed-size bar chart with one bar per choice, in the given order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarChart {
    pub width: u32,
    pub height: u32,
    pub x_title: String,
    pub y_title: String,
    pub bars: Vec<Bar>,
}

impl BarChart {
    /// Project choices straight into bars; counts are passed through untouched.
    pub fn from_choices<I>(choices: I) -> Self
    where
        I: IntoIterator<Item = Choice>,
    {
        let bars = choices
            .into_iter()
            .map(|choice| Bar {
                label: choice.choice.choice_text,
                value: choice.choice.votes,
            })
            .collect();
        Self {
            width: CHART_WIDTH,
            height: CHART_HEIGHT,
            x_title: X_TITLE.to_string(),
            y_title: Y_TITLE.to_string(),
            bars,
        }
    }

    /// Render as an SVG fragment, suitable for inlining into a larger page.
    pub fn to_svg(&self) -> String {
        self.to_string()
    }

    /// The largest bar value, or 1 so that an all-zero chart still has a scale.
    fn scale_max(&self) -> u32 {
        self.bars.iter().map(|b| b.value).max().unwrap_or(0).max(1)
    }
}

impl Display for BarChart {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let width = f64::from(self.width);
        let height = f64::from(self.height);
        let plot_width = (width - MARGIN_LEFT - MARGIN_RIGHT).max(0.0);
        let plot_height = (height - MARGIN_TOP - MARGIN_BOTTOM).max(0.0);
        let baseline = MARGIN_TOP + plot_height;
        let max = self.scale_max();

        write!(
            f,
            r#"<svg xmlns="http://www.w3.org/2000/svg" class="bar-chart" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height,
        )?;

        // Axes.
        write!(
            f,
            r#"<line class="axis" x1="{MARGIN_LEFT}" y1="{MARGIN_TOP}" x2="{MARGIN_LEFT}" y2="{baseline}" stroke="black"/>"#,
        )?;
        write!(
            f,
            r#"<line class="axis" x1="{MARGIN_LEFT}" y1="{baseline}" x2="{right}" y2="{baseline}" stroke="black"/>"#,
            right = MARGIN_LEFT + plot_width,
        )?;
        write!(
            f,
            r#"<text class="tick" x="{x}" y="{baseline}" text-anchor="end">0</text>"#,
            x = MARGIN_LEFT - 6.0,
        )?;
        write!(
            f,
            r#"<text class="tick" x="{x}" y="{MARGIN_TOP}" text-anchor="end">{max}</text>"#,
            x = MARGIN_LEFT - 6.0,
        )?;

        // Bars.
        if !self.bars.is_empty() {
            let slot = plot_width / self.bars.len() as f64;
            let bar_width = slot * BAR_FILL;
            for (i, bar) in self.bars.iter().enumerate() {
                let bar_height = plot_height * f64::from(bar.value) / f64::from(max);
                let x = MARGIN_LEFT + slot * i as f64 + (slot - bar_width) / 2.0;
                let label = escape_xml(&bar.label);
                write!(
                    f,
                    r#"<rect class="bar" x="{x:.1}" y="{y:.1}" width="{bar_width:.1}" height="{bar_height:.1}" fill="steelblue"><title>{label}: {value}</title></rect>"#,
                    y = baseline - bar_height,
                    value = bar.value,
                )?;
                write!(
                    f,
                    r#"<text class="label" x="{cx:.1}" y="{y:.1}" text-anchor="middle">{label}</text>"#,
                    cx = x + bar_width / 2.0,
                    y = baseline + 16.0,
                )?;
            }
        }

        // Axis titles.
        write!(
            f,
            r#"<text class="title" x="{x:.1}" y="{y:.1}" text-anchor="middle">{title}</text>"#,
            x = MARGIN_LEFT + plot_width / 2.0,
            y = height - 12.0,
            title = escape_xml(&self.x_title),
        )?;
        write!(
            f,
            r#"<text class="title" x="16" y="{y:.1}" text-anchor="middle" transform="rotate(-90 16 {y:.1})">{title}</text>"#,
            y = MARGIN_TOP + plot_height / 2.0,
            title = escape_xml(&self.y_title),
        )?;

        write!(f, "</svg>")
    }
}

/// Escape text for inclusion in XML content or attribute values.
fn escape_xml(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }
    let mut escaped = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

#[cfg(test)]
mod tests {
    use crate::model::{
        db::{Choice, ChoiceCore},
        mongodb::Id,
    };

    use super::*;

    fn choice(question_id: Id, text: &str, votes: u32) -> Choice {
        let mut choice = ChoiceCore::new(question_id, text);
        choice.votes = votes;
        Choice {
            id: Id::new(),
            choice,
        }
    }

    #[test]
    fn bars_follow_choice_order_and_counts() {
        let q = Id::new();
        let chart = BarChart::from_choices(vec![choice(q, "A", 2), choice(q, "B", 0)]);

        assert_eq!(chart.width, CHART_WIDTH);
        assert_eq!(chart.height, CHART_HEIGHT);
        assert_eq!(chart.x_title, "Choice");
        assert_eq!(chart.y_title, "Votes");
        assert_eq!(
            chart.bars,
            vec![
                Bar {
                    label: "A".to_string(),
                    value: 2
                },
                Bar {
                    label: "B".to_string(),
                    value: 0
                },
            ]
        );
    }

    #[test]
    fn svg_is_a_sized_fragment() {
        let q = Id::new();
        let svg = BarChart::from_choices(vec![choice(q, "A", 3), choice(q, "B", 1)]).to_svg();

        assert!(svg.starts_with("<svg "));
        assert!(svg.ends_with("</svg>"));
        assert!(!svg.contains("<html"));
        assert!(!svg.contains("<?xml"));
        assert!(svg.contains(r#"width="700" height="500""#));
        assert_eq!(svg.matches(r#"<rect class="bar""#).count(), 2);
        assert!(svg.contains("<title>A: 3</title>"));
        assert!(svg.contains("<title>B: 1</title>"));
    }

    #[test]
    fn tallest_bar_fills_the_plot() {
        let q = Id::new();
        let svg = BarChart::from_choices(vec![choice(q, "A", 4), choice(q, "B", 2)]).to_svg();

        let plot_height = f64::from(CHART_HEIGHT) - MARGIN_TOP - MARGIN_BOTTOM;
        assert!(svg.contains(&format!(r#"height="{:.1}""#, plot_height)));
        assert!(svg.contains(&format!(r#"height="{:.1}""#, plot_height / 2.0)));
    }

    #[test]
    fn empty_chart_has_no_bars() {
        let chart = BarChart::from_choices(Vec::new());
        assert!(chart.bars.is_empty());

        let svg = chart.to_svg();
        assert!(!svg.contains(r#"class="bar""#));
        assert!(svg.contains(">Choice<"));
        assert!(svg.contains(">Votes<"));
    }

    #[test]
    fn all_zero_chart_renders_flat_bars() {
        let q = Id::new();
        let svg = BarChart::from_choices(vec![choice(q, "A", 0)]).to_svg();
        assert!(svg.contains(r#"height="0.0""#));
        assert!(!svg.contains("NaN"));
    }

    #[test]
    fn labels_are_escaped() {
        let q = Id::new();
        let svg = BarChart::from_choices(vec![choice(q, "<b>\"Tom & Jerry\"</b>", 1)]).to_svg();
        assert!(!svg.contains("<b>"));
        assert!(svg.contains("&lt;b&gt;&quot;Tom &amp; Jerry&quot;&lt;/b&gt;"));
    }

    #[test]
    fn escape_leaves_plain_text_borrowed() {
        assert!(matches!(escape_xml("plain"), Cow::Borrowed("plain")));
        assert_eq!(escape_xml("it's"), "it&#39;s");
    }
}
