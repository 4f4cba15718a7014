//! Keyword categorization for transaction descriptions
//!
//! Case-insensitive substring containment against fixed, ordered tables.
//! The first matching entry wins, so table order matters: "SWIGGY INSTAMART"
//! is Food & Dining even though Instamart sells groceries.

use crate::models::Category;

/// Category keyword table, checked top to bottom
const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (Category::FoodDining, &["swiggy", "zomato", "food", "restaurant"]),
    (Category::Shopping, &["amazon", "flipkart", "myntra", "shopping"]),
    (Category::Transportation, &["uber", "ola", "taxi", "fuel"]),
    (Category::Groceries, &["bigbasket", "grocery"]),
    (Category::Entertainment, &["netflix", "prime", "movie"]),
    (Category::Utilities, &["electricity", "water", "bill"]),
    (Category::Income, &["salary", "credit", "income"]),
    (Category::Healthcare, &["medical", "hospital"]),
];

/// Known merchants: (keyword, display name)
const MERCHANTS: &[(&str, &str)] = &[
    ("swiggy", "Swiggy"),
    ("zomato", "Zomato"),
    ("amazon", "Amazon"),
    ("flipkart", "Flipkart"),
    ("myntra", "Myntra"),
    ("uber", "Uber"),
    ("ola", "Ola"),
    ("netflix", "Netflix"),
    ("bigbasket", "BigBasket"),
];

/// Banks recognized from the uploaded filename
const BANKS: &[(&str, &str)] = &[
    ("hdfc", "HDFC Bank"),
    ("icici", "ICICI Bank"),
    ("sbi", "SBI"),
    ("axis", "Axis Bank"),
];

pub const UNKNOWN_MERCHANT: &str = "Unknown";
pub const GENERIC_BANK: &str = "Bank";

/// Map a description to its spending category
pub fn categorize(description: &str) -> Category {
    let desc = description.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| desc.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Other)
}

/// Best-effort merchant name, `Unknown` when nothing matches
pub fn extract_merchant(description: &str) -> String {
    let desc = description.to_lowercase();
    MERCHANTS
        .iter()
        .find(|(keyword, _)| desc.contains(keyword))
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| UNKNOWN_MERCHANT.to_string())
}

/// Best-effort bank name from the statement filename
pub fn bank_from_filename(filename: &str) -> String {
    let name = filename.to_lowercase();
    BANKS
        .iter()
        .find(|(keyword, _)| name.contains(keyword))
        .map(|(_, bank)| bank.to_string())
        .unwrap_or_else(|| GENERIC_BANK.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_known_descriptions() {
        assert_eq!(categorize("SWIGGY INSTAMART"), Category::FoodDining);
        assert_eq!(categorize("AMAZON IN"), Category::Shopping);
        assert_eq!(categorize("UBER TRIP"), Category::Transportation);
        assert_eq!(categorize("BIGBASKET GROCERIES"), Category::Groceries);
        assert_eq!(categorize("NETFLIX SUBSCRIPTION"), Category::Entertainment);
        assert_eq!(categorize("ELECTRICITY BILL BESCOM"), Category::Utilities);
        assert_eq!(categorize("SALARY CREDIT"), Category::Income);
        assert_eq!(categorize("APOLLO HOSPITAL"), Category::Healthcare);
        assert_eq!(categorize("random text"), Category::Other);
    }

    #[test]
    fn test_categorize_first_match_wins() {
        // "credit card bill" hits Utilities ("bill") before Income ("credit")
        assert_eq!(categorize("credit card bill"), Category::Utilities);
        // Zomato is food even when paid through UPI
        assert_eq!(categorize("UPI/ZOMATO/ORDER"), Category::FoodDining);
    }

    #[test]
    fn test_extract_merchant() {
        assert_eq!(extract_merchant("SWIGGY INSTAMART"), "Swiggy");
        assert_eq!(extract_merchant("bigbasket groceries"), "BigBasket");
        assert_eq!(extract_merchant("NEFT TO LANDLORD"), UNKNOWN_MERCHANT);
    }

    #[test]
    fn test_bank_from_filename() {
        assert_eq!(bank_from_filename("HDFC_statement_jan.pdf"), "HDFC Bank");
        assert_eq!(bank_from_filename("icici-export.csv"), "ICICI Bank");
        assert_eq!(bank_from_filename("SBI.csv"), "SBI");
        assert_eq!(bank_from_filename("axis.pdf"), "Axis Bank");
        assert_eq!(bank_from_filename("statement.pdf"), GENERIC_BANK);
    }
}
