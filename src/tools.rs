//! Tool declarations and dispatch
//!
//! The assistant exposes a closed set of read-only data queries the model
//! may request. Tool kinds are a tagged enum so dispatch is exhaustive at
//! compile time; the runtime "Unknown tool" payload survives only at the
//! name-parsing boundary where the model supplies free text.
//!
//! A tool failure never aborts the conversation: every error degrades to
//! an `{"error": ...}` payload the model can still fold into a reply.

use crate::aggregator::{FinancialAggregator, DEFAULT_WINDOW_DAYS};
use crate::analyzer;
use crate::models::{ParameterSchema, ParameterSpec, ToolDeclaration};
use crate::Result;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

/// Default ranking length for `top_expenses`
const DEFAULT_TOP_LIMIT: usize = 5;

/// The closed set of data queries the model may invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    FinancialSummary,
    TopExpenses,
    CategoryExpense,
    SpendingAnalysis,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [
        ToolKind::FinancialSummary,
        ToolKind::TopExpenses,
        ToolKind::CategoryExpense,
        ToolKind::SpendingAnalysis,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::FinancialSummary => "financial_summary",
            ToolKind::TopExpenses => "top_expenses",
            ToolKind::CategoryExpense => "category_expense",
            ToolKind::SpendingAnalysis => "spending_analysis",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    fn description(self) -> &'static str {
        match self {
            ToolKind::FinancialSummary => {
                "Lấy tóm tắt tài chính của người dùng bao gồm tổng thu nhập, tổng chi tiêu, \
                 số dư và số lượng giao dịch trong khoảng thời gian nhất định"
            }
            ToolKind::TopExpenses => "Lấy top danh mục chi tiêu nhiều nhất của người dùng",
            ToolKind::CategoryExpense => "Lấy tổng chi tiêu của một danh mục cụ thể",
            ToolKind::SpendingAnalysis => {
                "Phân tích mẫu chi tiêu chi tiết và đưa ra nhận xét về tình hình tài chính"
            }
        }
    }

    /// Build the static schema declaration for this tool.
    pub fn declaration(self) -> ToolDeclaration {
        let days_spec = ParameterSpec {
            kind: "integer".to_string(),
            description: "Số ngày muốn xem (mặc định 30 ngày)".to_string(),
        };

        let (properties, required): (HashMap<String, ParameterSpec>, Vec<String>) = match self {
            ToolKind::FinancialSummary | ToolKind::SpendingAnalysis => {
                (HashMap::from([("days".to_string(), days_spec)]), vec![])
            }
            ToolKind::TopExpenses => (
                HashMap::from([
                    ("days".to_string(), days_spec),
                    (
                        "limit".to_string(),
                        ParameterSpec {
                            kind: "integer".to_string(),
                            description: "Số lượng danh mục muốn xem (mặc định 5)".to_string(),
                        },
                    ),
                ]),
                vec![],
            ),
            ToolKind::CategoryExpense => (
                HashMap::from([
                    (
                        "category_name".to_string(),
                        ParameterSpec {
                            kind: "string".to_string(),
                            description:
                                "Tên danh mục cần xem (ví dụ: 'Ăn uống', 'Di chuyển', 'Mua sắm')"
                                    .to_string(),
                        },
                    ),
                    ("days".to_string(), days_spec),
                ]),
                vec!["category_name".to_string()],
            ),
        };

        ToolDeclaration {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: ParameterSchema {
                kind: "object".to_string(),
                properties,
                required,
            },
        }
    }

    /// Declarations for every tool, in registry order.
    pub fn declarations() -> Vec<ToolDeclaration> {
        Self::ALL.iter().map(|kind| kind.declaration()).collect()
    }
}

/// Executes requested tools against the aggregator for one user context
#[derive(Clone)]
pub struct ToolDispatcher {
    aggregator: FinancialAggregator,
}

impl ToolDispatcher {
    pub fn new(aggregator: FinancialAggregator) -> Self {
        Self { aggregator }
    }

    /// Dispatch a tool request by name. Always returns a JSON payload;
    /// unknown names and execution failures become `{"error": ...}`.
    pub async fn dispatch(&self, user_id: Uuid, name: &str, parameters: &Value) -> Value {
        let Some(kind) = ToolKind::from_name(name) else {
            warn!(tool = name, "Model requested an unregistered tool");
            return json!({ "error": format!("Unknown tool: {}", name) });
        };

        debug!(tool = name, %user_id, "Dispatching tool");

        match self.execute(kind, user_id, parameters).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(tool = name, error = %e, "Tool execution failed");
                json!({ "error": e.to_string() })
            }
        }
    }

    async fn execute(&self, kind: ToolKind, user_id: Uuid, parameters: &Value) -> Result<Value> {
        let days = parameter_days(parameters);

        match kind {
            ToolKind::FinancialSummary => {
                let window = self.aggregator.window(user_id, days).await?;
                Ok(json!({
                    "total_income": window.total_income,
                    "total_expense": window.total_expense,
                    "net_balance": window.net_balance,
                    "transaction_count": window.transaction_count,
                    "period": window.period,
                }))
            }
            ToolKind::TopExpenses => {
                let limit = parameters
                    .get("limit")
                    .and_then(Value::as_u64)
                    .map(|v| v as usize)
                    .unwrap_or(DEFAULT_TOP_LIMIT);

                let window = self.aggregator.window(user_id, days).await?;
                let top: Vec<Value> = window
                    .top_expense_categories
                    .iter()
                    .take(limit)
                    .map(|c| json!({ "category": c.category, "amount": c.amount }))
                    .collect();

                Ok(json!({ "top_expenses": top }))
            }
            ToolKind::CategoryExpense => {
                let category_name = parameters
                    .get("category_name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        crate::error::AssistantError::InvalidToolInput(
                            "Expected 'category_name' for category_expense".to_string(),
                        )
                    })?;

                let window = self.aggregator.window(user_id, days).await?;
                let wanted = category_name.to_lowercase();

                for c in &window.top_expense_categories {
                    let candidate = c.category.to_lowercase();
                    if candidate.contains(&wanted) || wanted.contains(&candidate) {
                        return Ok(json!({
                            "category": c.category,
                            "amount": c.amount,
                            "period": window.period,
                        }));
                    }
                }

                Ok(json!({
                    "category": category_name,
                    "amount": 0,
                    "message": "Không tìm thấy chi tiêu cho danh mục này",
                }))
            }
            ToolKind::SpendingAnalysis => {
                let window = self.aggregator.window(user_id, days).await?;
                Ok(json!({
                    "analysis": analyzer::analyze_spending_patterns(&window),
                    "recommendations": analyzer::budget_recommendations(&window),
                    "financial_data": {
                        "total_income": window.total_income,
                        "total_expense": window.total_expense,
                        "net_balance": window.net_balance,
                    },
                }))
            }
        }
    }
}

fn parameter_days(parameters: &Value) -> u32 {
    parameters
        .get("days")
        .and_then(Value::as_u64)
        .map(|v| v as u32)
        .unwrap_or(DEFAULT_WINDOW_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TransactionKind, TransactionRecord};
    use crate::store::InMemoryTransactionStore;
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    fn expense(user_id: Uuid, category: &str, amount: f64) -> TransactionRecord {
        TransactionRecord {
            id: Uuid::new_v4(),
            user_id,
            amount,
            kind: TransactionKind::Expense,
            date: Utc::now().date_naive() - Duration::days(1),
            category: category.to_string(),
            description: format!("{} purchase", category),
            notes: None,
            is_deleted: false,
        }
    }

    async fn dispatcher_with_rows(rows: Vec<TransactionRecord>) -> ToolDispatcher {
        let store = Arc::new(InMemoryTransactionStore::new());
        for row in rows {
            store.insert(row).await;
        }
        ToolDispatcher::new(FinancialAggregator::new(store))
    }

    #[test]
    fn test_every_tool_name_round_trips() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ToolKind::from_name("backtester"), None);
    }

    #[test]
    fn test_declarations_cover_all_tools() {
        let declarations = ToolKind::declarations();
        assert_eq!(declarations.len(), 4);

        let category = declarations
            .iter()
            .find(|d| d.name == "category_expense")
            .unwrap();
        assert_eq!(category.parameters.required, vec!["category_name"]);
        assert!(category.parameters.properties.contains_key("days"));
    }

    #[tokio::test]
    async fn test_unknown_tool_returns_error_payload() {
        let user_id = Uuid::new_v4();
        let dispatcher = dispatcher_with_rows(vec![]).await;

        let result = dispatcher.dispatch(user_id, "x", &json!({})).await;
        assert_eq!(result, json!({ "error": "Unknown tool: x" }));
    }

    #[tokio::test]
    async fn test_financial_summary_on_empty_window() {
        let user_id = Uuid::new_v4();
        let dispatcher = dispatcher_with_rows(vec![]).await;

        let result = dispatcher
            .dispatch(user_id, "financial_summary", &json!({}))
            .await;

        assert_eq!(result["total_income"], 0.0);
        assert_eq!(result["total_expense"], 0.0);
        assert_eq!(result["net_balance"], 0.0);
        assert_eq!(result["transaction_count"], 0);
        assert_eq!(result["period"], "30 ngày gần nhất");
    }

    #[tokio::test]
    async fn test_top_expenses_honors_limit() {
        let user_id = Uuid::new_v4();
        let dispatcher = dispatcher_with_rows(vec![
            expense(user_id, "Ăn uống", 900.0),
            expense(user_id, "Di chuyển", 500.0),
            expense(user_id, "Mua sắm", 100.0),
        ])
        .await;

        let result = dispatcher
            .dispatch(user_id, "top_expenses", &json!({ "limit": 2 }))
            .await;

        let top = result["top_expenses"].as_array().unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0]["category"], "Ăn uống");
    }

    #[tokio::test]
    async fn test_category_expense_matches_substring_both_ways() {
        let user_id = Uuid::new_v4();
        let dispatcher = dispatcher_with_rows(vec![expense(user_id, "Ăn uống", 750.0)]).await;

        let result = dispatcher
            .dispatch(user_id, "category_expense", &json!({ "category_name": "ăn" }))
            .await;
        assert_eq!(result["amount"], 750.0);

        let result = dispatcher
            .dispatch(
                user_id,
                "category_expense",
                &json!({ "category_name": "chi phí ăn uống hàng ngày" }),
            )
            .await;
        assert_eq!(result["amount"], 750.0);

        let missing = dispatcher
            .dispatch(user_id, "category_expense", &json!({ "category_name": "Du lịch" }))
            .await;
        assert_eq!(missing["amount"], 0);
        assert_eq!(missing["message"], "Không tìm thấy chi tiêu cho danh mục này");
    }

    #[tokio::test]
    async fn test_category_expense_without_name_degrades_to_error_payload() {
        let user_id = Uuid::new_v4();
        let dispatcher = dispatcher_with_rows(vec![]).await;

        let result = dispatcher
            .dispatch(user_id, "category_expense", &json!({}))
            .await;

        assert!(result["error"].as_str().unwrap().contains("category_name"));
    }

    #[tokio::test]
    async fn test_spending_analysis_carries_raw_numbers() {
        let user_id = Uuid::new_v4();
        let dispatcher = dispatcher_with_rows(vec![expense(user_id, "Ăn uống", 300.0)]).await;

        let result = dispatcher
            .dispatch(user_id, "spending_analysis", &json!({}))
            .await;

        assert!(result["analysis"].as_str().unwrap().contains("Ăn uống"));
        assert_eq!(result["financial_data"]["total_expense"], 300.0);
    }
}
