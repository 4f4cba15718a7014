//! Chat orchestration: transaction context + user message -> LLM reply
//!
//! Builds one self-contained prompt per request (no conversation memory).
//! Upstream failures turn into a fixed apology, except quota exhaustion,
//! which is returned so the API can answer 429.

use tracing::{debug, error, warn};

use crate::error::Result;
use crate::llm::{ChatBackend, LlmClient};
use crate::models::{Transaction, TransactionType};

/// Most recent transactions included in a prompt
pub const MAX_CONTEXT_TRANSACTIONS: usize = 50;

pub const CHAT_APOLOGY: &str = "I apologize, but I'm having trouble processing your request right now. Please try again in a moment.";

pub const ANALYSIS_APOLOGY: &str = "I've processed your transactions but encountered an issue with detailed analysis. I can still answer specific questions about your spending data.";

pub const SYSTEM_PROMPT: &str = "You are UPISensei, a friendly AI financial agent for the UPISensei platform.

ABOUT YOU:
- You are UPISensei AI Agent, created by the UPISensei team
- You help users understand their spending patterns and manage finances
- You analyze transaction data to provide personalized insights
- You are NOT Gemini, you are UPISensei's proprietary AI

PLATFORM KNOWLEDGE:
- UPISensei is a financial tracking and analysis platform
- Users can upload bank statements and transaction files
- The platform categorizes transactions automatically
- We support UPI, credit cards, debit cards, and bank transactions

RESPONSE GUIDELINES:
- Be conversational but professional
- Provide specific insights based on transaction data
- Suggest actionable financial advice
- If you don't know something, admit it and guide them to relevant features
- Always represent yourself as UPISensei AI
- Never claim to be Gemini or any other AI

DATA ANALYSIS:
When analyzing transactions, look for:
- Spending patterns by category
- Monthly trends
- High-value transactions
- Recurring subscriptions
- Potential savings opportunities
- Budget optimization suggestions";

/// Context line describing files the user referenced in a chat request
pub fn uploaded_files_context(file_count: usize) -> String {
    format!(
        "User uploaded {} file(s) containing transaction data that has been processed and added to their transaction history.",
        file_count
    )
}

/// Summary plus the most recent transactions, newest first
pub fn format_transaction_context(transactions: &[Transaction]) -> String {
    if transactions.is_empty() {
        return "No transaction data available.".to_string();
    }

    let mut recent: Vec<&Transaction> = transactions.iter().collect();
    // Stable sort keeps input order among same-day records
    recent.sort_by(|a, b| b.date.cmp(&a.date));
    let lines: Vec<String> = recent
        .iter()
        .take(MAX_CONTEXT_TRANSACTIONS)
        .map(|t| {
            format!(
                "- {} | {} | {} | {} | {}",
                t.date.format("%Y-%m-%d"),
                t.description,
                t.amount,
                t.category,
                t.tx_type
            )
        })
        .collect();

    let total_spent: f64 = transactions
        .iter()
        .filter(|t| t.tx_type == TransactionType::Debit)
        .map(|t| t.amount)
        .sum();
    let total_income: f64 = transactions
        .iter()
        .filter(|t| t.tx_type == TransactionType::Credit)
        .map(|t| t.amount)
        .sum();

    // Category totals in order of first appearance
    let mut categories: Vec<(&str, f64)> = Vec::new();
    for t in transactions {
        match categories.iter_mut().find(|(name, _)| *name == t.category.as_str()) {
            Some((_, total)) => *total += t.amount,
            None => categories.push((t.category.as_str(), t.amount)),
        }
    }
    let categories = categories
        .iter()
        .map(|(name, total)| format!("{} ({:.2})", name, total))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "TRANSACTION SUMMARY:\nTotal Transactions: {}\nTotal Spent: {:.2}\nTotal Income: {:.2}\nCategories: {}\n\nRECENT TRANSACTIONS:\n{}",
        transactions.len(),
        total_spent,
        total_income,
        categories,
        lines.join("\n")
    )
}

pub fn build_chat_prompt(
    message: &str,
    transactions: &[Transaction],
    file_context: Option<&str>,
) -> String {
    let file_block = match file_context {
        Some(ctx) if !ctx.is_empty() => format!("\n\nUPLOADED FILE CONTEXT:\n{}", ctx),
        _ => String::new(),
    };
    format!(
        "\n{}\n\nCURRENT USER TRANSACTION DATA:\n{}\n{}\n\nUSER MESSAGE: {}\n\nPlease respond as UPISensei AI Agent:",
        SYSTEM_PROMPT,
        format_transaction_context(transactions),
        file_block,
        message
    )
}

pub fn build_analysis_prompt(transactions: &[Transaction]) -> String {
    format!(
        "\n{}\n\nANALYZE THESE TRANSACTIONS:\n{}\n\n\
         Please provide a comprehensive analysis of these transactions including:\n\
         1. Spending patterns by category\n\
         2. Notable trends or observations\n\
         3. Potential areas for savings\n\
         4. Budget recommendations\n\n\
         Respond as UPISensei AI Agent:",
        SYSTEM_PROMPT,
        format_transaction_context(transactions)
    )
}

/// Answers questions about a user's transactions through an LLM backend
#[derive(Clone)]
pub struct ChatOrchestrator {
    client: LlmClient,
}

impl ChatOrchestrator {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &LlmClient {
        &self.client
    }

    /// Reply to one user message
    ///
    /// Only quota exhaustion is returned as an error; every other failure
    /// becomes [`CHAT_APOLOGY`].
    pub async fn reply(
        &self,
        message: &str,
        transactions: &[Transaction],
        file_context: Option<&str>,
    ) -> Result<String> {
        let prompt = build_chat_prompt(message, transactions, file_context);
        debug!(
            backend = self.client.backend_name(),
            transactions = transactions.len(),
            prompt_chars = prompt.len(),
            "Sending chat prompt"
        );

        match self.client.generate(SYSTEM_PROMPT, &prompt).await {
            Ok(text) => Ok(text),
            Err(e) if e.is_quota() => {
                warn!(error = %e, "LLM quota exhausted");
                Err(e)
            }
            Err(e) => {
                error!(error = %e, "LLM chat request failed");
                Ok(CHAT_APOLOGY.to_string())
            }
        }
    }

    /// Whole-history analysis; never fails
    pub async fn analyze(&self, transactions: &[Transaction]) -> String {
        let prompt = build_analysis_prompt(transactions);
        match self.client.generate(SYSTEM_PROMPT, &prompt).await {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "LLM analysis request failed");
                ANALYSIS_APOLOGY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockBackend, MockFailure};
    use crate::models::{Category, DEMO_USER};
    use chrono::NaiveDate;

    fn tx(day: u32, description: &str, amount: f64, category: Category, tx_type: TransactionType) -> Transaction {
        Transaction {
            id: format!("t{}", day),
            user_id: DEMO_USER.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            description: description.to_string(),
            amount,
            category,
            tx_type,
            merchant: "Unknown".to_string(),
            bank: "Bank".to_string(),
            is_demo: false,
        }
    }

    fn sample() -> Vec<Transaction> {
        vec![
            tx(3, "SWIGGY ORDER", 450.0, Category::FoodDining, TransactionType::Debit),
            tx(10, "SALARY CREDIT", 50000.0, Category::Income, TransactionType::Credit),
            tx(5, "ZOMATO ORDER", 300.5, Category::FoodDining, TransactionType::Debit),
        ]
    }

    #[test]
    fn test_empty_context() {
        assert_eq!(format_transaction_context(&[]), "No transaction data available.");
    }

    #[test]
    fn test_context_summary_and_order() {
        let ctx = format_transaction_context(&sample());
        assert!(ctx.starts_with("TRANSACTION SUMMARY:\nTotal Transactions: 3\n"));
        assert!(ctx.contains("Total Spent: 750.50"));
        assert!(ctx.contains("Total Income: 50000.00"));
        assert!(ctx.contains("Categories: Food & Dining (750.50), Income (50000.00)"));

        let recent: Vec<&str> = ctx
            .split("RECENT TRANSACTIONS:\n")
            .nth(1)
            .unwrap()
            .lines()
            .collect();
        assert_eq!(recent[0], "- 2024-01-10 | SALARY CREDIT | 50000 | Income | credit");
        assert_eq!(recent[2], "- 2024-01-03 | SWIGGY ORDER | 450 | Food & Dining | debit");
    }

    #[test]
    fn test_context_caps_recent_lines() {
        let many: Vec<Transaction> = (1..=28)
            .flat_map(|d| {
                vec![
                    tx(d, "COFFEE SHOP", 10.0, Category::Other, TransactionType::Debit),
                    tx(d, "BOOK STORE", 20.0, Category::Shopping, TransactionType::Debit),
                ]
            })
            .collect();
        let ctx = format_transaction_context(&many);
        assert!(ctx.contains("Total Transactions: 56"));
        assert_eq!(ctx.lines().filter(|l| l.starts_with("- ")).count(), MAX_CONTEXT_TRANSACTIONS);
    }

    #[test]
    fn test_chat_prompt_layout() {
        let prompt = build_chat_prompt("Where does my money go?", &[], Some("User uploaded 1 file(s)"));
        assert!(prompt.starts_with("\nYou are UPISensei"));
        assert!(prompt.contains("CURRENT USER TRANSACTION DATA:\nNo transaction data available.\n\n\nUPLOADED FILE CONTEXT:\nUser uploaded 1 file(s)"));
        assert!(prompt.ends_with("USER MESSAGE: Where does my money go?\n\nPlease respond as UPISensei AI Agent:"));

        let prompt = build_chat_prompt("hi", &[], None);
        assert!(!prompt.contains("UPLOADED FILE CONTEXT"));
    }

    #[test]
    fn test_analysis_prompt() {
        let prompt = build_analysis_prompt(&sample());
        assert!(prompt.contains("ANALYZE THESE TRANSACTIONS:\nTRANSACTION SUMMARY:"));
        assert!(prompt.contains("4. Budget recommendations"));
        assert!(prompt.ends_with("Respond as UPISensei AI Agent:"));
    }

    #[test]
    fn test_uploaded_files_context() {
        assert_eq!(
            uploaded_files_context(2),
            "User uploaded 2 file(s) containing transaction data that has been processed and added to their transaction history."
        );
    }

    #[tokio::test]
    async fn test_reply_passes_through() {
        let chat = ChatOrchestrator::new(LlmClient::mock());
        let reply = chat.reply("How much on food?", &sample(), None).await.unwrap();
        assert_eq!(reply, "UPISensei (mock) received: How much on food?");
    }

    #[tokio::test]
    async fn test_reply_apologizes_on_failure() {
        let chat = ChatOrchestrator::new(LlmClient::Mock(MockBackend::failing(MockFailure::Upstream)));
        assert_eq!(chat.reply("hi", &[], None).await.unwrap(), CHAT_APOLOGY);

        let chat = ChatOrchestrator::new(LlmClient::Mock(MockBackend::failing(MockFailure::Auth)));
        assert_eq!(chat.reply("hi", &[], None).await.unwrap(), CHAT_APOLOGY);
    }

    #[tokio::test]
    async fn test_reply_propagates_quota() {
        let chat = ChatOrchestrator::new(LlmClient::Mock(MockBackend::failing(MockFailure::Quota)));
        let err = chat.reply("hi", &[], None).await.unwrap_err();
        assert!(err.is_quota());
    }

    #[tokio::test]
    async fn test_analyze() {
        let chat = ChatOrchestrator::new(LlmClient::Mock(MockBackend::with_reply("Looks fine")));
        assert_eq!(chat.analyze(&sample()).await, "Looks fine");

        let chat = ChatOrchestrator::new(LlmClient::Mock(MockBackend::failing(MockFailure::Quota)));
        assert_eq!(chat.analyze(&sample()).await, ANALYSIS_APOLOGY);
    }
}
