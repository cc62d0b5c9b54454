//! Chat orchestrator
//!
//! Routes every inbound message through the intent classifier and down
//! one of three paths: canned greeting, plain LLM reply, or the
//! tool-calling exchange. Failures step down an explicit fallback chain
//! (tool path → direct-data path → literal error string); the caller
//! always receives a reply string, never an error.

use crate::aggregator::{FinancialAggregator, DEFAULT_WINDOW_DAYS};
use crate::classifier::{Intent, IntentClassifier};
use crate::gemini::LlmGateway;
use crate::models::{ChatOutcome, FinancialSummary, FinancialWindow, TurnRole};
use crate::session::SessionStore;
use crate::tools::{ToolDispatcher, ToolKind};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Fixed reply to short salutations. No model call is spent on these.
const GREETING_REPLY: &str = "Xin chào! Mình là Fin - trợ lý tài chính của bạn 😊\n\n\
    Mình có thể giúp bạn:\n\
    - Chat về bất cứ điều gì\n\
    - Tư vấn tài chính cá nhân\n\
    - Phân tích chi tiêu của bạn\n\
    - Gợi ý cách tiết kiệm thông minh\n\n\
    Hôm nay bạn muốn trò chuyện về gì? 💬";

/// Apology when the plain-completion path fails.
const GENERAL_FALLBACK: &str =
    "Xin lỗi, mình gặp chút vấn đề kỹ thuật. Bạn thử hỏi lại được không? 😅";

/// Apology attached to a terminal failure.
const TERMINAL_APOLOGY: &str =
    "Xin lỗi, tôi gặp lỗi khi xử lý yêu cầu của bạn. Vui lòng thử lại sau.";

/// Persona instruction shared by every generative path.
const PERSONA_PROMPT: &str = r#"Bạn là Fin - một AI Financial Advisor thân thiện, thông minh và biết lắng nghe.

Phong cách:
- Thân thiện như một người bạn, không cứng nhắc
- Trả lời ngắn gọn và tự nhiên (như chat với bạn bè)
- Sử dụng emoji khi phù hợp (😊 💰 📊 👍 ✨)
- KHÔNG dùng ** để in đậm, KHÔNG dùng --- để phân cách
- Đặt câu hỏi ngược lại để duy trì hội thoại
- Động viên và tích cực

Chỉ dùng tools khi người dùng hỏi về số liệu cụ thể của họ
("tôi chi bao nhiêu cho...", "phân tích chi tiêu của tôi", "top danh mục chi tiêu của tôi").
Không dùng tools cho chào hỏi, trò chuyện thường ngày hay câu hỏi khái niệm."#;

/// Composes classifier, session store, dispatcher and gateway into the
/// message-handling state machine.
pub struct ChatOrchestrator {
    gateway: Arc<dyn LlmGateway>,
    aggregator: FinancialAggregator,
    dispatcher: ToolDispatcher,
    sessions: SessionStore,
}

impl ChatOrchestrator {
    pub fn new(
        gateway: Arc<dyn LlmGateway>,
        aggregator: FinancialAggregator,
        sessions: SessionStore,
    ) -> Self {
        let dispatcher = ToolDispatcher::new(aggregator.clone());
        Self {
            gateway,
            aggregator,
            dispatcher,
            sessions,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Handle one inbound message. Never fails: terminal errors come back
    /// as an outcome with `success: false` and an apology string.
    pub async fn chat(&self, user_id: Uuid, message: &str, days: u32) -> ChatOutcome {
        self.sessions.append(user_id, TurnRole::User, message).await;

        let intent = IntentClassifier::classify(message);
        info!(%user_id, ?intent, "Routing chat message");

        let (response, error) = match intent {
            Intent::Greeting => (GREETING_REPLY.to_string(), None),
            Intent::General => (self.general_reply(user_id, message).await, None),
            Intent::DataQuery => match self.tool_path(user_id, message).await {
                Ok(reply) => (reply, None),
                Err(tool_err) => {
                    warn!(%user_id, error = %tool_err, "Tool path failed, trying direct-data fallback");
                    match self.simplified_path(user_id, message).await {
                        Ok(reply) => (reply, None),
                        Err(fallback_err) => {
                            warn!(%user_id, error = %fallback_err, "Direct-data fallback failed");
                            (
                                format!("Xin lỗi, tôi gặp lỗi khi xử lý yêu cầu của bạn: {}", fallback_err),
                                Some(fallback_err.to_string()),
                            )
                        }
                    }
                }
            },
        };

        self.sessions
            .append(user_id, TurnRole::Assistant, response.clone())
            .await;

        // Summary rides along only when the message asked about the
        // user's own data.
        let financial_summary = if IntentClassifier::is_finance_related(message)
            && !IntentClassifier::is_general_question(message)
        {
            match self.aggregator.window(user_id, days).await {
                Ok(window) => Some(FinancialSummary::from(&window)),
                Err(e) => {
                    warn!(%user_id, error = %e, "Failed to compute chat summary");
                    return ChatOutcome {
                        success: false,
                        response: TERMINAL_APOLOGY.to_string(),
                        financial_summary: None,
                        error: Some(format!("Lỗi khi xử lý yêu cầu: {}", e)),
                    };
                }
            }
        } else {
            None
        };

        ChatOutcome {
            success: error.is_none(),
            response,
            financial_summary,
            error,
        }
    }

    /// Plain-completion path for small talk and concept questions.
    /// Failures degrade to a fixed apology; nothing propagates.
    async fn general_reply(&self, user_id: Uuid, message: &str) -> String {
        let history = self.sessions.format_for_prompt(user_id).await;

        let prompt = format!(
            "{}\n{}\n\nTin nhắn hiện tại: {}\n\n\
             Hãy trả lời thân thiện, nhớ ngữ cảnh trò chuyện nếu liên quan, ngắn gọn (2-5 dòng).",
            PERSONA_PROMPT, history, message
        );

        match self.gateway.generate(&prompt).await {
            Ok(answer) => answer.trim().to_string(),
            Err(e) => {
                warn!(%user_id, error = %e, "General reply generation failed");
                GENERAL_FALLBACK.to_string()
            }
        }
    }

    /// Tool-calling exchange: offer the declared tools, execute at most
    /// one requested invocation, and fold its JSON payload into the
    /// follow-up completion.
    async fn tool_path(&self, user_id: Uuid, message: &str) -> crate::Result<String> {
        let prompt = format!(
            "{}\n\nCâu hỏi: {}\n\n\
             Quy tắc:\n\
             - Nếu hỏi về số liệu cụ thể → Sử dụng tools\n\
             - Nếu hỏi chung → Trả lời trực tiếp ngắn gọn (3-5 dòng)\n\
             - Tập trung vào câu hỏi",
            PERSONA_PROMPT, message
        );

        let declarations = ToolKind::declarations();
        let reply = self.gateway.generate_with_tools(&prompt, &declarations).await?;

        if let Some(call) = reply.tool_call {
            info!(%user_id, tool = %call.name, "Model requested a tool");

            let tool_result = self
                .dispatcher
                .dispatch(user_id, &call.name, &call.arguments)
                .await;

            let final_text = self
                .gateway
                .complete_tool_exchange(&prompt, &call, &tool_result)
                .await?;

            return Ok(final_text.trim().to_string());
        }

        reply
            .text
            .map(|t| t.trim().to_string())
            .ok_or_else(|| {
                crate::error::AssistantError::LlmError(
                    "Tool-mode response carried neither text nor a tool call".to_string(),
                )
            })
    }

    /// Degraded path when the tool exchange fails: fetch a fixed 30-day
    /// window directly and answer from a compact data summary.
    async fn simplified_path(&self, user_id: Uuid, message: &str) -> crate::Result<String> {
        let window = self.aggregator.window(user_id, DEFAULT_WINDOW_DAYS).await?;
        let data_summary = compact_summary(&window);

        let prompt = format!(
            "Bạn là chuyên gia tài chính. Dựa trên dữ liệu sau:\n\n{}\n\n\
             Câu hỏi: {}\n\n\
             Hãy đưa ra lời khuyên ngắn gọn và hữu ích.",
            data_summary, message
        );

        let answer = self.gateway.generate(&prompt).await?;
        Ok(answer.trim().to_string())
    }
}

/// Render the window as the short block fed to the degraded prompt.
fn compact_summary(window: &FinancialWindow) -> String {
    let top = window
        .top_expense_categories
        .iter()
        .take(3)
        .map(|c| format!("{}: {:.0}", c.category, c.amount))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Dữ liệu tài chính trong {}:\n\
         - Thu nhập: {:.0} VND\n\
         - Chi tiêu: {:.0} VND\n\
         - Số dư: {:.0} VND\n\n\
         Top chi tiêu: {}",
        window.period, window.total_income, window.total_expense, window.net_balance, top
    )
}
