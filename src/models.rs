//! Core data models for the MoneyFlow assistant

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

//
// ================= Transactions =================
//

/// A persisted transaction row, read-only to this crate.
///
/// The CRUD layer owns creation/update/soft-delete and guarantees the
/// amount is positive and the category's type matches `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: f64,
    pub kind: TransactionKind,
    pub date: NaiveDate,
    pub category: String,
    pub description: String,
    pub notes: Option<String>,
    #[serde(default)]
    pub is_deleted: bool,
}

/// Transaction normalized for LLM/tool consumption (ISO date, flat fields).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedTransaction {
    pub date: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub description: String,
    pub category: String,
    pub notes: Option<String>,
}

//
// ================= Financial Window =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryTotal {
    pub category: String,
    pub amount: f64,
}

/// Aggregated view of a user's finances over a trailing N-day window.
///
/// Computed fresh on every request; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialWindow {
    pub period: String,
    pub days: u32,
    pub total_income: f64,
    pub total_expense: f64,
    pub net_balance: f64,
    pub transaction_count: usize,
    /// Expense categories ranked descending by summed amount, top 5.
    pub top_expense_categories: Vec<CategoryTotal>,
    /// Expense totals keyed by full English weekday name.
    pub weekday_expenses: HashMap<String, f64>,
    pub transactions: Vec<NormalizedTransaction>,
}

/// The compact summary attached to finance-related chat replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub total_income: f64,
    pub total_expense: f64,
    pub net_balance: f64,
    pub period: String,
}

impl From<&FinancialWindow> for FinancialSummary {
    fn from(window: &FinancialWindow) -> Self {
        Self {
            total_income: window.total_income,
            total_expense: window.total_expense,
            net_balance: window.net_balance,
            period: window.period.clone(),
        }
    }
}

//
// ================= Conversation =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub message: String,
}

impl ConversationTurn {
    pub fn new(role: TurnRole, message: impl Into<String>) -> Self {
        Self {
            role,
            message: message.into(),
        }
    }
}

//
// ================= Tool I/O =================
//

/// Schema for a single declared tool parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

/// JSON-Schema-shaped parameter object for a tool declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: HashMap<String, ParameterSpec>,
    pub required: Vec<String>,
}

/// A named, schema-described data query the model may request.
///
/// Static, defined once at startup; immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Reply from a tool-calling-enabled generation request.
#[derive(Debug, Clone)]
pub struct ToolAwareReply {
    pub text: Option<String>,
    pub tool_call: Option<ToolCall>,
}

//
// ================= Chat Outcome =================
//

/// Final result of handling one inbound chat message.
///
/// `chat()` never fails: on terminal failure `success` is false, `error`
/// carries the cause, and `response` still holds a user-facing apology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatOutcome {
    pub success: bool,
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financial_summary: Option<FinancialSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TurnRole::User => "User",
            TurnRole::Assistant => "Fin",
        };
        write!(f, "{}", s)
    }
}
