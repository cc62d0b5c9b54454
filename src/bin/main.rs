use chrono::{Duration, Utc};
use moneyflow_assistant::{
    aggregator::FinancialAggregator,
    chat::ChatOrchestrator,
    gemini::GeminiClient,
    models::{TransactionKind, TransactionRecord},
    session::SessionStore,
    store::InMemoryTransactionStore,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Demo run: seed an in-memory store and hold a short conversation.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    dotenv::dotenv().ok();

    info!("MoneyFlow Assistant demo starting");

    let gemini_api_key = std::env::var("GEMINI_API_KEY").unwrap_or_default();

    let store = Arc::new(InMemoryTransactionStore::new());
    let user_id = Uuid::new_v4();
    seed_sample_data(&store, user_id).await;

    let gateway = Arc::new(GeminiClient::new(gemini_api_key));
    let aggregator = FinancialAggregator::new(store);
    let orchestrator = ChatOrchestrator::new(gateway, aggregator, SessionStore::new());

    let messages = [
        "Xin chào",
        "Làm sao tiết kiệm được?",
        "Phân tích chi tiêu của tôi",
    ];

    for message in messages {
        let outcome = orchestrator.chat(user_id, message, 30).await;

        println!("\n=== USER: {} ===", message);
        println!("success: {}", outcome.success);
        println!("{}", outcome.response);
        if let Some(summary) = outcome.financial_summary {
            println!(
                "[summary] thu nhập {:.0} / chi tiêu {:.0} / số dư {:.0} ({})",
                summary.total_income, summary.total_expense, summary.net_balance, summary.period
            );
        }
    }

    Ok(())
}

async fn seed_sample_data(store: &InMemoryTransactionStore, user_id: Uuid) {
    let today = Utc::now().date_naive();

    let rows = [
        (TransactionKind::Income, "Lương", "Lương tháng này", 15_000_000.0, 5),
        (TransactionKind::Expense, "Ăn uống", "Ăn trưa văn phòng", 1_250_000.0, 4),
        (TransactionKind::Expense, "Di chuyển", "Xăng xe", 480_000.0, 3),
        (TransactionKind::Expense, "Mua sắm", "Đồ gia dụng", 2_100_000.0, 2),
        (TransactionKind::Expense, "Ăn uống", "Cà phê cuối tuần", 180_000.0, 1),
    ];

    for (kind, category, description, amount, days_ago) in rows {
        store
            .insert(TransactionRecord {
                id: Uuid::new_v4(),
                user_id,
                amount,
                kind,
                date: today - Duration::days(days_ago),
                category: category.to_string(),
                description: description.to_string(),
                notes: None,
                is_deleted: false,
            })
            .await;
    }
}
