//! Spending pattern analyzer
//!
//! Turns a computed financial window into qualitative observations and
//! budget recommendations. Deterministic; no model call involved.

use crate::models::FinancialWindow;

/// Daily transaction counts above this trigger a consolidation note
const HIGH_FREQUENCY_PER_DAY: f64 = 5.0;
/// Daily transaction counts below this trigger a missing-entries note
const LOW_FREQUENCY_PER_DAY: f64 = 1.0;

/// Expense/income ratio thresholds for budget recommendations
const RATIO_CRITICAL: f64 = 0.9;
const RATIO_CAUTION: f64 = 0.8;
const RATIO_COMMEND: f64 = 0.5;
/// Share of income above which the top category gets a targeted note
const TOP_CATEGORY_SHARE: f64 = 0.3;

/// Produce the qualitative pattern analysis for a window.
pub fn analyze_spending_patterns(window: &FinancialWindow) -> String {
    let mut analysis = Vec::new();

    if window.net_balance > 0.0 {
        analysis.push(format!(
            "[+] Bạn đang có thặng dư {:.0} VND trong {}",
            window.net_balance, window.period
        ));
    } else if window.net_balance < 0.0 {
        analysis.push(format!(
            "[-] Bạn đang chi tiêu vượt thu nhập {:.0} VND trong {}",
            window.net_balance.abs(),
            window.period
        ));
    } else {
        analysis.push(format!("[=] Thu chi của bạn đang cân bằng trong {}", window.period));
    }

    if let Some(top) = window.top_expense_categories.first() {
        analysis.push(format!(
            "[TOP] Danh mục chi tiêu nhiều nhất: {} ({:.0} VND)",
            top.category, top.amount
        ));
    }

    // Frequency over the actual window length, not a fixed 30 days.
    let span_days = f64::from(window.days.max(1));
    let avg_daily_transactions = window.transaction_count as f64 / span_days;
    if avg_daily_transactions > HIGH_FREQUENCY_PER_DAY {
        analysis.push(
            "[INFO] Bạn có tần suất giao dịch khá cao, hãy cân nhắc gộp các giao dịch nhỏ"
                .to_string(),
        );
    } else if avg_daily_transactions < LOW_FREQUENCY_PER_DAY {
        analysis.push(
            "[INFO] Tần suất giao dịch thấp, có thể bạn đang bỏ sót một số chi tiêu".to_string(),
        );
    }

    analysis.join("\n")
}

/// Produce budget recommendations from the expense/income ratio.
pub fn budget_recommendations(window: &FinancialWindow) -> String {
    if window.total_income == 0.0 {
        return "Không có dữ liệu thu nhập để đưa ra khuyến nghị ngân sách.".to_string();
    }

    let expense_ratio = window.total_expense / window.total_income;
    let mut recommendations = Vec::new();

    if expense_ratio > RATIO_CRITICAL {
        recommendations.push(
            "[WARNING] CẢNH BÁO: Bạn đang chi tiêu hơn 90% thu nhập. Hãy cắt giảm chi tiêu ngay!"
                .to_string(),
        );
    } else if expense_ratio > RATIO_CAUTION {
        recommendations.push(
            "[WARNING] Cảnh báo: Bạn đang chi tiêu hơn 80% thu nhập. Nên tiết kiệm nhiều hơn."
                .to_string(),
        );
    } else if expense_ratio < RATIO_COMMEND {
        recommendations.push(
            "[GOOD] Tuyệt vời! Bạn đang tiết kiệm hơn 50% thu nhập. Hãy duy trì!".to_string(),
        );
    } else {
        recommendations.push("[OK] Tỷ lệ chi tiêu của bạn đang ở mức hợp lý.".to_string());
    }

    if let Some(top) = window.top_expense_categories.first() {
        let category_ratio = top.amount / window.total_income;
        if category_ratio > TOP_CATEGORY_SHARE {
            recommendations.push(format!(
                "[TIP] Gợi ý: Danh mục '{}' chiếm {:.1}% thu nhập. Hãy cân nhắc giảm chi tiêu ở đây.",
                top.category,
                category_ratio * 100.0
            ));
        }
    }

    recommendations.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CategoryTotal;
    use std::collections::HashMap;

    fn window(income: f64, expense: f64, count: usize, days: u32) -> FinancialWindow {
        FinancialWindow {
            period: format!("{} ngày gần nhất", days),
            days,
            total_income: income,
            total_expense: expense,
            net_balance: income - expense,
            transaction_count: count,
            top_expense_categories: vec![],
            weekday_expenses: HashMap::new(),
            transactions: vec![],
        }
    }

    #[test]
    fn test_surplus_deficit_and_break_even_statements() {
        let surplus = analyze_spending_patterns(&window(100.0, 40.0, 10, 30));
        assert!(surplus.contains("thặng dư"));

        let deficit = analyze_spending_patterns(&window(40.0, 100.0, 10, 30));
        assert!(deficit.contains("vượt thu nhập"));
        assert!(deficit.contains("60"));

        let even = analyze_spending_patterns(&window(100.0, 100.0, 10, 30));
        assert!(even.contains("cân bằng"));
    }

    #[test]
    fn test_frequency_uses_actual_window_length() {
        // 14 transactions in 7 days is 2/day: no note either way.
        let balanced = analyze_spending_patterns(&window(100.0, 40.0, 14, 7));
        assert!(!balanced.contains("[INFO]"));

        // The same count over 30 days is below 1/day.
        let sparse = analyze_spending_patterns(&window(100.0, 40.0, 14, 30));
        assert!(sparse.contains("bỏ sót"));

        // 50 transactions in 7 days is above 5/day.
        let busy = analyze_spending_patterns(&window(100.0, 40.0, 50, 7));
        assert!(busy.contains("gộp các giao dịch nhỏ"));
    }

    #[test]
    fn test_budget_ratio_tiers() {
        let critical = budget_recommendations(&window(100.0, 95.0, 5, 30));
        assert!(critical.contains("90%"));

        let caution = budget_recommendations(&window(100.0, 85.0, 5, 30));
        assert!(caution.contains("80%"));

        let commend = budget_recommendations(&window(100.0, 30.0, 5, 30));
        assert!(commend.contains("[GOOD]"));

        let neutral = budget_recommendations(&window(100.0, 60.0, 5, 30));
        assert!(neutral.contains("[OK]"));
    }

    #[test]
    fn test_zero_income_yields_fixed_message() {
        let msg = budget_recommendations(&window(0.0, 500.0, 5, 30));
        assert_eq!(msg, "Không có dữ liệu thu nhập để đưa ra khuyến nghị ngân sách.");
    }

    #[test]
    fn test_dominant_category_gets_targeted_note() {
        let mut w = window(100.0, 60.0, 5, 30);
        w.top_expense_categories = vec![CategoryTotal {
            category: "Ăn uống".to_string(),
            amount: 45.0,
        }];

        let recs = budget_recommendations(&w);
        assert!(recs.contains("Ăn uống"));
        assert!(recs.contains("45.0%"));
    }
}
