//! Chart-ready description of a keyword analysis.

use serde::{Deserialize, Serialize};

use crate::format::thousands;
use crate::model::{ChartType, CountMethod};

const BACKGROUND_COLORS: [&str; 8] = [
    "rgba(255, 99, 132, 0.8)",
    "rgba(54, 162, 235, 0.8)",
    "rgba(255, 205, 86, 0.8)",
    "rgba(75, 192, 192, 0.8)",
    "rgba(153, 102, 255, 0.8)",
    "rgba(255, 159, 64, 0.8)",
    "rgba(199, 199, 199, 0.8)",
    "rgba(83, 102, 255, 0.8)",
];

const BORDER_COLORS: [&str; 8] = [
    "rgba(255, 99, 132, 1)",
    "rgba(54, 162, 235, 1)",
    "rgba(255, 205, 86, 1)",
    "rgba(75, 192, 192, 1)",
    "rgba(153, 102, 255, 1)",
    "rgba(255, 159, 64, 1)",
    "rgba(199, 199, 199, 1)",
    "rgba(83, 102, 255, 1)",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartDescription {
    pub chart_config: ChartConfig,
    pub raw_data: RawChartData,
    pub metadata: ChartMetadata,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartConfig {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub data: ChartData,
    pub options: ChartOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataset {
    pub label: String,
    pub data: Vec<u64>,
    pub background_color: Vec<String>,
    pub border_color: Vec<String>,
    pub border_width: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartOptions {
    pub responsive: bool,
    pub plugins: ChartPlugins,
    pub scales: Option<ChartScales>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartPlugins {
    pub title: AxisTitle,
    pub legend: Legend,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Legend {
    pub display: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AxisTitle {
    pub display: bool,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartScales {
    pub y: Axis,
    pub x: Axis,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Axis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub begin_at_zero: Option<bool>,
    pub title: AxisTitle,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeywordCount {
    pub keyword: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawChartData {
    pub keywords: Vec<String>,
    pub counts: Vec<u64>,
    pub keyword_results: Vec<KeywordCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartMetadata {
    pub total_files_searched: usize,
    pub search_filter: Option<String>,
    pub keywords_analyzed: usize,
    pub chart_type: ChartType,
    pub count_method: CountMethod,
    pub max_count: u64,
    pub min_count: u64,
    pub average_count: f64,
}

/// Inputs of one chart build; `results` is in keyword order.
pub struct ChartInput<'a> {
    pub results: &'a [(String, u64)],
    pub search_filter: Option<&'a str>,
    pub total_files: usize,
    pub chart_type: ChartType,
    pub count_method: CountMethod,
}

#[derive(Clone, Default)]
pub struct ChartDataBuilder;

impl ChartDataBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, input: &ChartInput<'_>) -> ChartDescription {
        let labels: Vec<String> = input.results.iter().map(|(k, _)| k.clone()).collect();
        let counts: Vec<u64> = input.results.iter().map(|(_, c)| *c).collect();

        let chart_config = ChartConfig {
            chart_type: input.chart_type,
            data: ChartData {
                labels: labels.clone(),
                datasets: vec![ChartDataset {
                    label: "File Count".to_string(),
                    data: counts.clone(),
                    background_color: palette(&BACKGROUND_COLORS, labels.len()),
                    border_color: palette(&BORDER_COLORS, labels.len()),
                    border_width: 1,
                }],
            },
            options: ChartOptions {
                responsive: true,
                plugins: ChartPlugins {
                    title: AxisTitle {
                        display: true,
                        text: chart_title(input.search_filter, input.total_files),
                    },
                    legend: Legend {
                        display: matches!(input.chart_type, ChartType::Pie | ChartType::Doughnut),
                    },
                },
                scales: (input.chart_type == ChartType::Bar).then(bar_scales),
            },
        };

        let metadata = ChartMetadata {
            total_files_searched: input.total_files,
            search_filter: input.search_filter.map(str::to_string),
            keywords_analyzed: labels.len(),
            chart_type: input.chart_type,
            count_method: input.count_method,
            max_count: counts.iter().copied().max().unwrap_or(0),
            min_count: counts.iter().copied().min().unwrap_or(0),
            average_count: average(&counts),
        };

        ChartDescription {
            chart_config,
            raw_data: RawChartData {
                keywords: labels,
                counts,
                keyword_results: input
                    .results
                    .iter()
                    .map(|(keyword, count)| KeywordCount {
                        keyword: keyword.clone(),
                        count: *count,
                    })
                    .collect(),
            },
            metadata,
            summary: narrative(input),
        }
    }
}

fn palette(colors: &[&str], len: usize) -> Vec<String> {
    colors.iter().cycle().take(len).map(|c| c.to_string()).collect()
}

fn bar_scales() -> ChartScales {
    ChartScales {
        y: Axis {
            begin_at_zero: Some(true),
            title: AxisTitle {
                display: true,
                text: "Number of Files".to_string(),
            },
        },
        x: Axis {
            begin_at_zero: None,
            title: AxisTitle {
                display: true,
                text: "Keywords".to_string(),
            },
        },
    }
}

fn chart_title(filter: Option<&str>, total_files: usize) -> String {
    let mut title = String::from("Keyword Analysis");
    if let Some(filter) = filter {
        title.push_str(&format!(" in files matching '{filter}'"));
    }
    title.push_str(&format!(" ({total_files} files searched)"));
    title
}

/// Mean rounded to 2 decimals; 0 for an empty list.
pub fn average(counts: &[u64]) -> f64 {
    if counts.is_empty() {
        return 0.0;
    }
    let mean = counts.iter().sum::<u64>() as f64 / counts.len() as f64;
    (mean * 100.0).round() / 100.0
}

fn percentage(count: u64, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64 * 1000.0).round() / 10.0
}

fn narrative(input: &ChartInput<'_>) -> String {
    let unit = match input.count_method {
        CountMethod::Presence => "files",
        CountMethod::Frequency => "occurrences",
    };
    let mut out = String::from("📊 **Keyword Analysis Results**\n\n");
    if let Some(filter) = input.search_filter {
        out.push_str(&format!("🔍 **Search Filter**: {filter}\n"));
    }
    out.push_str(&format!(
        "📁 **Total Files Searched**: {}\n",
        thousands(input.total_files)
    ));
    out.push_str(&format!(
        "🔤 **Keywords Analyzed**: {}\n\n",
        input.results.len()
    ));
    out.push_str("**Results by Keyword**:\n");

    // stable sort: ties keep keyword order
    let mut ranked: Vec<&(String, u64)> = input.results.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    for (keyword, count) in ranked {
        out.push_str(&format!(
            "• **{keyword}**: {count} {unit} ({}%)\n",
            percentage(*count, input.total_files)
        ));
    }

    let total: u64 = input.results.iter().map(|(_, c)| c).sum();
    out.push_str(&format!("\n📈 **Total Matches**: {total}\n"));
    out.push_str("📊 **Chart Ready**: The data above is formatted for easy visualization.\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results(pairs: &[(&str, u64)]) -> Vec<(String, u64)> {
        pairs.iter().map(|(k, c)| (k.to_string(), *c)).collect()
    }

    fn input<'a>(results: &'a [(String, u64)], total: usize) -> ChartInput<'a> {
        ChartInput {
            results,
            search_filter: Some("coolbeans"),
            total_files: total,
            chart_type: ChartType::Bar,
            count_method: CountMethod::Presence,
        }
    }

    #[test]
    fn average_rounds_to_two_decimals() {
        assert_eq!(average(&[1, 1, 2]), 1.33);
        assert_eq!(average(&[2, 3]), 2.5);
        assert_eq!(average(&[]), 0.0);
    }

    #[test]
    fn all_zero_counts_are_not_an_error() {
        let r = results(&[("a", 0), ("b", 0)]);
        let chart = ChartDataBuilder::new().build(&input(&r, 0));
        assert_eq!(chart.metadata.max_count, 0);
        assert_eq!(chart.metadata.min_count, 0);
        assert_eq!(chart.metadata.average_count, 0.0);
        assert!(chart.summary.contains("• **a**: 0 files (0%)"));
    }

    #[test]
    fn labels_counts_and_stats_are_aligned() {
        let r = results(&[("evil", 3), ("pray", 1)]);
        let chart = ChartDataBuilder::new().build(&input(&r, 4));
        assert_eq!(chart.raw_data.keywords, vec!["evil", "pray"]);
        assert_eq!(chart.raw_data.counts, vec![3, 1]);
        assert_eq!(chart.chart_config.data.labels, chart.raw_data.keywords);
        assert_eq!(chart.metadata.total_files_searched, 4);
        assert_eq!(chart.metadata.average_count, 2.0);
        assert_eq!(
            chart.chart_config.options.plugins.title.text,
            "Keyword Analysis in files matching 'coolbeans' (4 files searched)"
        );
        assert!(chart.chart_config.options.scales.is_some());
        assert!(!chart.chart_config.options.plugins.legend.display);
    }

    #[test]
    fn narrative_ranks_descending_with_stable_ties() {
        let r = results(&[("low", 1), ("tie1", 2), ("tie2", 2)]);
        let chart = ChartDataBuilder::new().build(&input(&r, 3));
        let tie1 = chart.summary.find("**tie1**").unwrap();
        let tie2 = chart.summary.find("**tie2**").unwrap();
        let low = chart.summary.find("**low**").unwrap();
        assert!(tie1 < tie2 && tie2 < low);
        assert!(chart.summary.contains("• **tie1**: 2 files (66.7%)"));
        assert!(chart.summary.contains("📈 **Total Matches**: 5"));
    }

    #[test]
    fn palette_cycles_past_eight_keywords() {
        let r: Vec<(String, u64)> = (0..10).map(|i| (format!("k{i}"), i)).collect();
        let mut inp = input(&r, 10);
        inp.chart_type = ChartType::Pie;
        let chart = ChartDataBuilder::new().build(&inp);
        let colors = &chart.chart_config.data.datasets[0].background_color;
        assert_eq!(colors.len(), 10);
        assert_eq!(colors[8], colors[0]);
        assert!(chart.chart_config.options.scales.is_none());
        assert!(chart.chart_config.options.plugins.legend.display);
    }

    #[test]
    fn serializes_chart_js_field_names() {
        let r = results(&[("a", 1)]);
        let chart = ChartDataBuilder::new().build(&input(&r, 1));
        let json = serde_json::to_value(&chart).unwrap();
        assert_eq!(json["chart_config"]["type"], "bar");
        assert_eq!(json["chart_config"]["data"]["datasets"][0]["borderWidth"], 1);
        assert_eq!(json["chart_config"]["options"]["scales"]["y"]["beginAtZero"], true);
        assert_eq!(json["metadata"]["count_method"], "presence");

        let top: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(top.len(), 4);
        for key in ["chart_config", "raw_data", "metadata", "summary"] {
            assert!(top.contains(&key), "missing {key}");
        }
        assert_eq!(json["raw_data"]["keywords"], serde_json::json!(["a"]));
        assert_eq!(json["raw_data"]["counts"], serde_json::json!([1]));
        assert_eq!(json["raw_data"]["keyword_results"][0]["keyword"], "a");
        assert!(json["summary"].is_string());
    }
}
