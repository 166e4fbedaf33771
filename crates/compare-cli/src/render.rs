use compare_core::{
    ComparisonReport, DerivedStatistics, HistoricalResponse, ModelCatalog, PromptDetail,
    PromptRecord,
};

fn ms(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.0} ms"))
}

fn statistics_line(stats: &DerivedStatistics) -> String {
    format!(
        "{} words, {} sentences, ~{} tokens, {} emoji, avg word {:.1}, read {:.1} min, \
         {:.1} chars/s, {:.1} tokens/s",
        stats.word_count,
        stats.sentence_count,
        stats.token_estimate,
        stats.emoji_count,
        stats.average_word_length,
        stats.reading_time_minutes,
        stats.chars_per_second,
        stats.tokens_per_second,
    )
}

pub fn catalog(catalog: &ModelCatalog) -> String {
    let mut out = String::new();
    for (group, keys) in &catalog.0 {
        out.push_str(&format!("{group}:\n"));
        for key in keys {
            out.push_str(&format!("  {key}\n"));
        }
    }
    out
}

pub fn report(report: &ComparisonReport) -> String {
    let mut out = format!("\n== Comparison for prompt #{} ==\n", report.prompt_id);
    for row in &report.finished {
        let marker = if row.requested { "" } else { " (unrequested)" };
        out.push_str(&format!(
            "{}{marker}\n  first token {}, total {}, {} chars\n  {}\n",
            row.model,
            ms(row.time_to_first_token_ms),
            ms(row.total_time_ms),
            row.response_length,
            statistics_line(&row.statistics),
        ));
    }
    for failed in &report.errored {
        out.push_str(&format!("{}\n  error: {}\n", failed.model, failed.error));
    }
    if let Some(r) = report.fastest_first_token() {
        out.push_str(&format!("fastest first token: {}\n", r.model));
    }
    if let Some(r) = report.fastest_total() {
        out.push_str(&format!("fastest total: {}\n", r.model));
    }
    if let Some(r) = report.highest_throughput() {
        out.push_str(&format!("highest throughput: {}\n", r.model));
    }
    out
}

pub fn history(prompts: &[PromptRecord]) -> String {
    if prompts.is_empty() {
        return "no prompts yet\n".to_string();
    }
    prompts
        .iter()
        .map(|p| {
            format!(
                "#{:<5} {}  {}\n",
                p.id.0,
                p.created_at.format("%Y-%m-%d %H:%M"),
                preview(&p.text, 60)
            )
        })
        .collect()
}

fn response(r: &HistoricalResponse) -> String {
    format!(
        "{}\n  first token {}, total {}\n  {}\n\n{}\n",
        r.model_name,
        ms(Some(r.time_to_first_token * 1000.0)),
        ms(Some(r.total_time * 1000.0)),
        statistics_line(&r.statistics()),
        r.response_text.trim_end(),
    )
}

pub fn detail(detail: &PromptDetail) -> String {
    let mut out = format!(
        "{}\n{}\n\n",
        detail.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        detail.text
    );
    for r in &detail.model_responses {
        out.push_str(&response(r));
        out.push('\n');
    }
    out
}

/// First `max` characters, single-lined.
fn preview(text: &str, max: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let cut: String = flat.chars().take(max).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use compare_core::{ErroredModel, ModelKey, ModelReport, PromptId, calculate_all};

    #[test]
    fn report_lists_rows_errors_and_leaders() {
        let report = ComparisonReport {
            prompt_id: PromptId(5),
            finished: vec![ModelReport {
                model: ModelKey::new("xai.grok-4"),
                requested: true,
                time_to_first_token_ms: Some(350.0),
                total_time_ms: Some(2000.0),
                response_length: 18,
                statistics: calculate_all("Hello world. Nice!", 2.0),
            }],
            errored: vec![ErroredModel {
                model: ModelKey::new("meta.llama"),
                requested: true,
                error: "timeout".into(),
            }],
        };
        let text = super::report(&report);
        assert!(text.contains("prompt #5"));
        assert!(text.contains("first token 350 ms, total 2000 ms, 18 chars"));
        assert!(text.contains("9.0 chars/s, 2.5 tokens/s"));
        assert!(text.contains("meta.llama\n  error: timeout"));
        assert!(text.contains("fastest first token: xai.grok-4"));
    }

    #[test]
    fn preview_flattens_and_truncates() {
        assert_eq!(preview("a\n b", 10), "a b");
        assert_eq!(preview("ééééé", 3), "ééé...");
    }

    #[test]
    fn missing_timing_renders_dash() {
        assert_eq!(ms(None), "-");
    }
}
