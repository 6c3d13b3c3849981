use serde::{Deserialize, Serialize};

use crate::model::{
    api::{chart::BarChart, question::QuestionSummary},
    db::{Choice, Question},
};

/// The results page for a single question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionResults {
    pub question: QuestionSummary,
    /// Raw chart data, one bar per choice.
    pub chart: BarChart,
    /// The same chart, pre-rendered as an SVG fragment.
    pub graph: String,
}

impl QuestionResults {
    pub fn new(question: Question, choices: Vec<Choice>) -> Self {
        let chart = BarChart::from_choices(choices);
        let graph = chart.to_svg();
        Self {
            question: question.into(),
            chart,
            graph,
        }
    }
}
