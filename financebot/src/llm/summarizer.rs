// Summarizer module
use std::sync::Arc;
use tracing::{error, info};

use super::{LlmProvider, LlmRequest};
use crate::scraping::truncate_chars;

/// Returned without calling the model when no article text was scraped.
pub const NO_CONTENT_MESSAGE: &str = "（未抓取到可用于分析的正文内容，本次仅推送标题与链接。）";

/// Returned when the model call fails for any reason.
pub const AI_FAILURE_MESSAGE: &str = "（AI总结失败：可能是余额不足/限流/网络问题。本次仅推送标题与链接。\
你可以检查 API 账户余额或降低抓取数量后重试。）";

/// Fixed instruction for the investment brief.
pub const BRIEF_INSTRUCTION: &str = "你是一名专业的财经新闻分析师。请根据用户提供的新闻正文，撰写一份面向专业投资者的中文投资简报，严格按以下四个部分组织：
1. 热点板块：找出新闻中最受关注的行业或主题（如新闻未提供具体涨幅，请结合描述和市场情绪推测热点），说明催化剂与持续性判断。
2. 宏观与政策：梳理涉及的宏观数据、货币与财政政策及监管动向，以及对市场的影响。
3. 行业轮动：分析资金与情绪在行业间的切换迹象，区分短期炒作与有持续行情潜力的方向。
4. 风险提示与结论：列出主要风险点，并给出简明的整体结论。
要求：逻辑清晰、重点突出，全文不超过1500字，只依据提供的新闻内容，不要编造数据。";

/// Produces the AI brief for a Full-mode report, degrading to a fixed
/// placeholder instead of ever failing.
pub struct Summarizer {
    provider: Arc<dyn LlmProvider>,
    max_chars: usize,
}

impl Summarizer {
    pub fn new(provider: Arc<dyn LlmProvider>, max_chars: usize) -> Self {
        Self { provider, max_chars }
    }

    pub async fn summarize(&self, analysis_text: &str) -> String {
        if analysis_text.trim().is_empty() {
            info!("No article text collected, skipping AI summary");
            return NO_CONTENT_MESSAGE.to_string();
        }

        let request = LlmRequest {
            system: Some(BRIEF_INSTRUCTION.to_string()),
            prompt: analysis_text.to_string(),
            ..LlmRequest::default()
        };

        match self.provider.generate(request).await {
            Ok(response) => {
                let content = response.content.trim();
                if content.is_empty() {
                    error!(model = %response.model, "AI summary failed: empty completion");
                    return AI_FAILURE_MESSAGE.to_string();
                }
                info!(
                    model = %response.model,
                    total_tokens = response.usage.total_tokens,
                    "AI summary generated ({} chars)",
                    content.chars().count()
                );
                truncate_chars(content, self.max_chars)
            }
            Err(e) => {
                error!("AI summary failed: {:#}", e);
                AI_FAILURE_MESSAGE.to_string()
            }
        }
    }
}
