//! Category lookup command

use sensei_core::{categorize, extract_merchant};

pub fn cmd_categorize(description: &str) {
    println!("Description: {}", description);
    println!("Category:    {}", categorize(description));
    println!("Merchant:    {}", extract_merchant(description));
}
