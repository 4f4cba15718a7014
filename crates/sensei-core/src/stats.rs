//! Spending summaries, trends and rule-based insights over a user's transactions
//!
//! Only debits count as spending. Income shows up in the totals but never
//! in category, merchant, trend or insight figures.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::categorize::UNKNOWN_MERCHANT;
use crate::fields::round_cents;
use crate::models::{Category, Transaction, TransactionType};

/// Merchants listed in a summary
pub const TOP_MERCHANTS: usize = 10;

/// Transactions listed under each category in a breakdown
pub const BREAKDOWN_TRANSACTIONS: usize = 10;

/// Insight thresholds
pub const HIGH_SPENDING_TOTAL: f64 = 50_000.0;
pub const LARGE_TRANSACTION_AMOUNT: f64 = 5_000.0;
pub const LARGE_TRANSACTION_COUNT: usize = 5;
pub const FOOD_SHARE_PERCENT: f64 = 40.0;
pub const DELIVERY_ORDER_COUNT: usize = 20;
pub const FREQUENT_MERCHANT_VISITS: usize = 15;

const DELIVERY_MERCHANTS: &[&str] = &["swiggy", "zomato", "uber eats", "instamart"];

/// Debit totals for one category
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub category: Category,
    pub amount: f64,
    pub count: usize,
    /// Share of total spent, rounded to 2 places
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantSummary {
    pub merchant: String,
    pub amount: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Spending summary report
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendingSummary {
    pub total_spent: f64,
    pub total_income: f64,
    pub net_balance: f64,
    pub transaction_count: usize,
    pub categories: Vec<CategorySummary>,
    pub top_merchants: Vec<MerchantSummary>,
    /// None when there are no transactions
    pub date_range: Option<DateRange>,
}

pub fn summarize(transactions: &[Transaction]) -> SpendingSummary {
    let debits: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| t.tx_type == TransactionType::Debit)
        .collect();

    let total_spent: f64 = debits.iter().map(|t| t.amount).sum();
    let total_income: f64 = transactions
        .iter()
        .filter(|t| t.tx_type == TransactionType::Credit)
        .map(|t| t.amount)
        .sum();

    let mut by_category: BTreeMap<Category, (f64, usize)> = BTreeMap::new();
    let mut by_merchant: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for t in &debits {
        let entry = by_category.entry(t.category).or_default();
        entry.0 += t.amount;
        entry.1 += 1;

        if !t.merchant.is_empty() && t.merchant != UNKNOWN_MERCHANT {
            let entry = by_merchant.entry(t.merchant.as_str()).or_default();
            entry.0 += t.amount;
            entry.1 += 1;
        }
    }

    let mut categories: Vec<CategorySummary> = by_category
        .into_iter()
        .map(|(category, (amount, count))| CategorySummary {
            category,
            amount: round_cents(amount),
            count,
            percentage: if total_spent > 0.0 {
                round_cents(amount / total_spent * 100.0)
            } else {
                0.0
            },
        })
        .collect();
    categories.sort_by(|a, b| b.amount.total_cmp(&a.amount));

    let mut top_merchants: Vec<MerchantSummary> = by_merchant
        .into_iter()
        .map(|(merchant, (amount, count))| MerchantSummary {
            merchant: merchant.to_string(),
            amount: round_cents(amount),
            count,
        })
        .collect();
    top_merchants.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    top_merchants.truncate(TOP_MERCHANTS);

    let date_range = transactions
        .iter()
        .map(|t| t.date)
        .min()
        .zip(transactions.iter().map(|t| t.date).max())
        .map(|(start, end)| DateRange { start, end });

    SpendingSummary {
        total_spent: round_cents(total_spent),
        total_income: round_cents(total_income),
        net_balance: round_cents(total_income - total_spent),
        transaction_count: transactions.len(),
        categories,
        top_merchants,
        date_range,
    }
}

/// Trend bucket size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendPeriod {
    Daily,
    Weekly,
    #[default]
    Monthly,
}

impl TrendPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Bucket key: `YYYY-MM-DD`, ISO week `YYYY-Www`, or `YYYY-MM`
    pub fn key(&self, date: NaiveDate) -> String {
        match self {
            Self::Daily => date.format("%Y-%m-%d").to_string(),
            Self::Weekly => {
                let week = date.iso_week();
                format!("{:04}-W{:02}", week.year(), week.week())
            }
            Self::Monthly => date.format("%Y-%m").to_string(),
        }
    }
}

impl std::str::FromStr for TrendPeriod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            _ => Err(format!(
                "Unknown period: {} (valid: daily, weekly, monthly)",
                s
            )),
        }
    }
}

/// A single data point in a trends report
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub period: String,
    pub amount: f64,
    pub count: usize,
}

/// Spending over time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendsReport {
    pub period: TrendPeriod,
    pub data: Vec<TrendPoint>,
}

/// Debit totals grouped by period, sorted by key
pub fn trends(transactions: &[Transaction], period: TrendPeriod) -> TrendsReport {
    let mut buckets: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for t in transactions
        .iter()
        .filter(|t| t.tx_type == TransactionType::Debit)
    {
        let entry = buckets.entry(period.key(t.date)).or_default();
        entry.0 += t.amount;
        entry.1 += 1;
    }

    TrendsReport {
        period,
        data: buckets
            .into_iter()
            .map(|(key, (amount, count))| TrendPoint {
                period: key,
                amount: round_cents(amount),
                count,
            })
            .collect(),
    }
}

/// One transaction as listed in a category breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownTransaction {
    pub id: String,
    pub date: NaiveDate,
    pub merchant: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBreakdown {
    pub category: Category,
    pub amount: f64,
    pub count: usize,
    pub percentage: f64,
    /// First few debits in this category, in input order
    pub transactions: Vec<BreakdownTransaction>,
}

/// Per-category debit detail
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBreakdownReport {
    pub categories: Vec<CategoryBreakdown>,
    pub total: f64,
}

pub fn category_breakdown(transactions: &[Transaction]) -> CategoryBreakdownReport {
    let mut by_category: BTreeMap<Category, (f64, Vec<&Transaction>)> = BTreeMap::new();
    for t in transactions
        .iter()
        .filter(|t| t.tx_type == TransactionType::Debit)
    {
        let entry = by_category.entry(t.category).or_default();
        entry.0 += t.amount;
        entry.1.push(t);
    }
    let total: f64 = by_category.values().map(|(amount, _)| amount).sum();

    let mut categories: Vec<CategoryBreakdown> = by_category
        .into_iter()
        .map(|(category, (amount, txs))| CategoryBreakdown {
            category,
            amount: round_cents(amount),
            count: txs.len(),
            percentage: if total > 0.0 {
                round_cents(amount / total * 100.0)
            } else {
                0.0
            },
            transactions: txs
                .iter()
                .take(BREAKDOWN_TRANSACTIONS)
                .map(|t| BreakdownTransaction {
                    id: t.id.clone(),
                    date: t.date,
                    merchant: t.merchant.clone(),
                    amount: t.amount,
                })
                .collect(),
        })
        .collect();
    categories.sort_by(|a, b| b.amount.total_cmp(&a.amount));

    CategoryBreakdownReport {
        categories,
        total: round_cents(total),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Alert,
    Recommendation,
    Trend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// A rule-based observation about spending habits
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub title: String,
    pub message: String,
    pub severity: Severity,
}

impl Insight {
    fn new(kind: InsightKind, severity: Severity, title: &str, message: String) -> Self {
        Self {
            kind,
            title: title.to_string(),
            message,
            severity,
        }
    }
}

/// Whole rupees with comma thousands separators (`52,500`)
fn group_thousands(amount: f64) -> String {
    let digits = (amount.max(0.0).round() as u64).to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Threshold alerts over debits
///
/// Rules are checked in a fixed order: overall spending, large
/// transactions, food share, delivery orders, then the most visited
/// merchant. No debits means no insights.
pub fn insights(transactions: &[Transaction]) -> Vec<Insight> {
    let debits: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| t.tx_type == TransactionType::Debit)
        .collect();
    let mut found = Vec::new();
    if debits.is_empty() {
        return found;
    }

    let total_spent: f64 = debits.iter().map(|t| t.amount).sum();
    if total_spent > HIGH_SPENDING_TOTAL {
        found.push(Insight::new(
            InsightKind::Alert,
            Severity::Medium,
            "High Monthly Spending",
            format!(
                "You've spent ₹{} this month. Consider reviewing your expenses.",
                group_thousands(total_spent)
            ),
        ));
    }

    let large = debits
        .iter()
        .filter(|t| t.amount > LARGE_TRANSACTION_AMOUNT)
        .count();
    if large > LARGE_TRANSACTION_COUNT {
        found.push(Insight::new(
            InsightKind::Alert,
            Severity::Low,
            "Multiple Large Transactions",
            format!("You have {} transactions over ₹5,000 this month.", large),
        ));
    }

    let food_spent: f64 = debits
        .iter()
        .filter(|t| t.category == Category::FoodDining)
        .map(|t| t.amount)
        .sum();
    if food_spent > 0.0 && total_spent > 0.0 {
        let share = food_spent * 100.0 / total_spent;
        if share > FOOD_SHARE_PERCENT {
            found.push(Insight::new(
                InsightKind::Recommendation,
                Severity::Medium,
                "High Food Spending",
                format!(
                    "Food & Dining accounts for {:.0}% of your spending. Consider meal planning to save money.",
                    share
                ),
            ));
        }
    }

    let deliveries = debits
        .iter()
        .filter(|t| {
            let merchant = t.merchant.to_lowercase();
            DELIVERY_MERCHANTS.iter().any(|kw| merchant.contains(kw))
        })
        .count();
    if deliveries > DELIVERY_ORDER_COUNT {
        found.push(Insight::new(
            InsightKind::Alert,
            Severity::High,
            "Delivery Dominance Detected",
            format!(
                "You've ordered food {} times this month. Consider cooking more to save money.",
                deliveries
            ),
        ));
    }

    let mut visits: BTreeMap<&str, usize> = BTreeMap::new();
    for t in &debits {
        if !t.merchant.is_empty() && t.merchant != UNKNOWN_MERCHANT {
            *visits.entry(t.merchant.as_str()).or_default() += 1;
        }
    }
    // Ties go to the alphabetically first merchant
    let top = visits
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)));
    if let Some((merchant, count)) = top {
        if count > FREQUENT_MERCHANT_VISITS {
            found.push(Insight::new(
                InsightKind::Trend,
                Severity::Low,
                "Frequent Merchant",
                format!(
                    "You've shopped at {} {} times. Consider a subscription or bulk purchase to save.",
                    merchant, count
                ),
            ));
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DEMO_USER;

    fn tx(date: (i32, u32, u32), amount: f64, category: Category, merchant: &str, tx_type: TransactionType) -> Transaction {
        Transaction {
            id: format!("t_{}_{}", date.1, date.2),
            user_id: DEMO_USER.to_string(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            description: merchant.to_string(),
            amount,
            category,
            tx_type,
            merchant: merchant.to_string(),
            bank: "Bank".to_string(),
            is_demo: false,
        }
    }

    fn sample() -> Vec<Transaction> {
        vec![
            tx((2024, 1, 1), 300.0, Category::FoodDining, "Swiggy", TransactionType::Debit),
            tx((2024, 1, 2), 100.0, Category::FoodDining, "Zomato", TransactionType::Debit),
            tx((2024, 1, 8), 600.0, Category::Shopping, "Amazon", TransactionType::Debit),
            tx((2024, 2, 1), 5000.0, Category::Income, "Unknown", TransactionType::Credit),
            tx((2024, 2, 3), 50.0, Category::Other, "Unknown", TransactionType::Debit),
        ]
    }

    #[test]
    fn test_summary_totals() {
        let summary = summarize(&sample());
        assert_eq!(summary.total_spent, 1050.0);
        assert_eq!(summary.total_income, 5000.0);
        assert_eq!(summary.net_balance, 3950.0);
        assert_eq!(summary.transaction_count, 5);
        assert_eq!(
            summary.date_range,
            Some(DateRange {
                start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2024, 2, 3).unwrap(),
            })
        );
    }

    #[test]
    fn test_summary_categories_sorted_by_amount() {
        let summary = summarize(&sample());
        let names: Vec<Category> = summary.categories.iter().map(|c| c.category).collect();
        assert_eq!(names, vec![Category::Shopping, Category::FoodDining, Category::Other]);
        assert_eq!(summary.categories[0].percentage, 57.14);
        assert_eq!(summary.categories[1].count, 2);
        assert!(summary.categories.iter().all(|c| c.category != Category::Income));
    }

    #[test]
    fn test_summary_merchants_skip_unknown() {
        let summary = summarize(&sample());
        let merchants: Vec<&str> = summary.top_merchants.iter().map(|m| m.merchant.as_str()).collect();
        assert_eq!(merchants, vec!["Amazon", "Swiggy", "Zomato"]);
    }

    #[test]
    fn test_empty_summary() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_spent, 0.0);
        assert!(summary.categories.is_empty());
        assert!(summary.date_range.is_none());
    }

    #[test]
    fn test_trend_keys() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(TrendPeriod::Daily.key(date), "2024-01-01");
        assert_eq!(TrendPeriod::Weekly.key(date), "2024-W01");
        assert_eq!(TrendPeriod::Monthly.key(date), "2024-01");
        // ISO week year differs from calendar year here
        let date = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        assert_eq!(TrendPeriod::Weekly.key(date), "2020-W53");
    }

    #[test]
    fn test_monthly_trends() {
        let report = trends(&sample(), TrendPeriod::Monthly);
        assert_eq!(report.data.len(), 2);
        assert_eq!(report.data[0].period, "2024-01");
        assert_eq!(report.data[0].amount, 1000.0);
        assert_eq!(report.data[0].count, 3);
        assert_eq!(report.data[1].amount, 50.0);
    }

    #[test]
    fn test_weekly_trends() {
        let report = trends(&sample(), TrendPeriod::Weekly);
        let keys: Vec<&str> = report.data.iter().map(|p| p.period.as_str()).collect();
        assert_eq!(keys, vec!["2024-W01", "2024-W02", "2024-W05"]);
    }

    #[test]
    fn test_period_from_str() {
        assert_eq!("Weekly".parse::<TrendPeriod>().unwrap(), TrendPeriod::Weekly);
        assert!("yearly".parse::<TrendPeriod>().is_err());
    }

    fn debits(n: usize, amount: f64, category: Category, merchant: &str) -> Vec<Transaction> {
        (0..n)
            .map(|i| {
                let mut t = tx((2024, 3, 1 + (i % 28) as u32), amount, category, merchant, TransactionType::Debit);
                t.id = format!("{}_{}", merchant, i);
                t
            })
            .collect()
    }

    fn titles(found: &[Insight]) -> Vec<&str> {
        found.iter().map(|i| i.title.as_str()).collect()
    }

    #[test]
    fn test_category_breakdown() {
        let mut transactions = sample();
        transactions.extend(debits(12, 10.0, Category::FoodDining, "Zomato"));
        let report = category_breakdown(&transactions);

        assert_eq!(report.total, 1170.0);
        assert_eq!(report.categories[0].category, Category::Shopping);
        let food = &report.categories[1];
        assert_eq!(food.category, Category::FoodDining);
        assert_eq!(food.count, 14);
        assert_eq!(food.amount, 520.0);
        assert_eq!(food.transactions.len(), BREAKDOWN_TRANSACTIONS);
        assert_eq!(food.transactions[0].merchant, "Swiggy");
        assert!(report.categories.iter().all(|c| c.category != Category::Income));
    }

    #[test]
    fn test_no_insights_without_debits() {
        let income = vec![tx((2024, 1, 1), 90000.0, Category::Income, "Employer", TransactionType::Credit)];
        assert!(insights(&income).is_empty());
        assert!(insights(&[]).is_empty());
    }

    #[test]
    fn test_high_spending_threshold() {
        // Exactly 50,000 does not trigger
        let mut transactions = debits(10, 5000.0, Category::Shopping, "Amazon");
        assert!(!titles(&insights(&transactions)).contains(&"High Monthly Spending"));

        transactions.push(tx((2024, 3, 2), 2500.0, Category::Shopping, "Myntra", TransactionType::Debit));
        let found = insights(&transactions);
        let alert = found.iter().find(|i| i.title == "High Monthly Spending").unwrap();
        assert_eq!(alert.kind, InsightKind::Alert);
        assert_eq!(alert.severity, Severity::Medium);
        assert!(alert.message.contains("₹52,500"));
    }

    #[test]
    fn test_large_transactions_threshold() {
        // Five large debits is not enough, and 5,000 itself is not large
        let mut transactions = debits(5, 6000.0, Category::Shopping, "Amazon");
        transactions.extend(debits(3, 5000.0, Category::Shopping, "Myntra"));
        assert!(!titles(&insights(&transactions)).contains(&"Multiple Large Transactions"));

        transactions.extend(debits(1, 5000.01, Category::Shopping, "Flipkart"));
        let found = insights(&transactions);
        let alert = found.iter().find(|i| i.title == "Multiple Large Transactions").unwrap();
        assert_eq!(alert.severity, Severity::Low);
        assert!(alert.message.starts_with("You have 6 transactions"));
    }

    #[test]
    fn test_food_share_threshold() {
        // 40% exactly stays quiet
        let mut transactions = debits(2, 200.0, Category::FoodDining, "Cafe");
        transactions.extend(debits(3, 200.0, Category::Shopping, "Amazon"));
        assert!(!titles(&insights(&transactions)).contains(&"High Food Spending"));

        transactions.extend(debits(1, 100.0, Category::FoodDining, "Dhaba"));
        let found = insights(&transactions);
        let tip = found.iter().find(|i| i.title == "High Food Spending").unwrap();
        assert_eq!(tip.kind, InsightKind::Recommendation);
        assert!(tip.message.starts_with("Food & Dining accounts for 45%"));
    }

    #[test]
    fn test_delivery_threshold() {
        let mut transactions = debits(10, 100.0, Category::FoodDining, "Swiggy");
        transactions.extend(debits(10, 100.0, Category::FoodDining, "Zomato"));
        transactions.extend(debits(40, 100.0, Category::Shopping, "Amazon"));
        assert!(!titles(&insights(&transactions)).contains(&"Delivery Dominance Detected"));

        transactions.extend(debits(1, 100.0, Category::Groceries, "Instamart"));
        let found = insights(&transactions);
        let alert = found.iter().find(|i| i.title == "Delivery Dominance Detected").unwrap();
        assert_eq!(alert.severity, Severity::High);
        assert!(alert.message.contains("21 times"));
    }

    #[test]
    fn test_frequent_merchant_threshold() {
        let mut transactions = debits(15, 50.0, Category::Transportation, "Uber");
        transactions.extend(debits(20, 10.0, Category::Other, UNKNOWN_MERCHANT));
        assert!(!titles(&insights(&transactions)).contains(&"Frequent Merchant"));

        transactions.extend(debits(1, 50.0, Category::Transportation, "Uber"));
        let found = insights(&transactions);
        let trend = found.iter().find(|i| i.title == "Frequent Merchant").unwrap();
        assert_eq!(trend.kind, InsightKind::Trend);
        assert!(trend.message.contains("Uber 16 times"));
    }

    #[test]
    fn test_insight_json_shape() {
        let found = insights(&debits(16, 100.0, Category::Shopping, "Amazon"));
        let json = serde_json::to_value(&found[0]).unwrap();
        assert_eq!(json["type"], "trend");
        assert_eq!(json["severity"], "low");
        assert_eq!(json["title"], "Frequent Merchant");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0.0), "0");
        assert_eq!(group_thousands(999.6), "1,000");
        assert_eq!(group_thousands(1234567.0), "1,234,567");
    }
}
