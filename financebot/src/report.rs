use crate::pipeline::{CategoryDigest, RunStats};
use crate::schedule::Mode;

/// Static body of the evening edition, filled in by hand by the reader.
pub const LITE_PLACEHOLDER: &str = "📝 **晚间复盘清单：**
-
-
-

> 晚报模式：不抓取正文、不调用 AI，仅推送标题与链接。";

/// Final document pushed to every delivery key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub title: String,
    pub body: String,
}

/// Everything the formatter needs, borrowed from the run.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    pub date: &'a str,
    pub mode: Mode,
    pub stats: &'a RunStats,
    /// AI brief, used in Full mode only
    pub summary: Option<&'a str>,
    pub categories: &'a [CategoryDigest],
}

pub fn format_report(input: &ReportInput<'_>) -> Report {
    let title = format!("📌 {} 财经{}", input.date, input.mode.label());

    let mut body = format!("📅 **{} 财经新闻摘要（{}）**\n\n", input.date, input.mode.label());
    body.push_str(&stats_line(input.mode, input.stats));
    body.push_str("\n\n");

    match input.mode {
        Mode::Full => {
            body.push_str("✍️ **今日分析总结：**\n");
            body.push_str(input.summary.unwrap_or_default());
            body.push_str("\n\n---\n\n");
        }
        Mode::Lite => {
            body.push_str(LITE_PLACEHOLDER);
            body.push_str("\n\n---\n\n");
        }
    }

    let sections: Vec<String> = input
        .categories
        .iter()
        .map(|c| format!("## {}\n{}", c.label, c.content))
        .collect();
    body.push_str(&sections.join("---\n\n"));

    Report { title, body }
}

fn stats_line(mode: Mode, stats: &RunStats) -> String {
    let mut line = format!(
        "📊 源：成功 {} / 失败 {}｜条目：{} / {}",
        stats.sources_ok, stats.sources_fail, stats.items_kept, stats.items_total_seen
    );
    if mode == Mode::Full {
        line.push_str(&format!("｜正文：{}", stats.body_ok));
    }
    line
}
