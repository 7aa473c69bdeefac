//! The `ritquiz init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create ritquiz.toml
    if std::path::Path::new("ritquiz.toml").exists() {
        println!("ritquiz.toml already exists, skipping.");
    } else {
        std::fs::write("ritquiz.toml", SAMPLE_CONFIG)?;
        println!("Created ritquiz.toml");
    }

    // Create example item bank
    std::fs::create_dir_all("item-banks")?;
    let example_path = std::path::Path::new("item-banks/example.toml");
    if example_path.exists() {
        println!("item-banks/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_BANK)?;
        println!("Created item-banks/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit ritquiz.toml to set grades, strands and the results file");
    println!("  2. Run: ritquiz validate --bank item-banks/example.toml");
    println!("  3. Run: ritquiz take --bank item-banks/example.toml");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# ritquiz configuration

item_bank = "item-banks/example.toml"
max_items_per_session = 6
available_strands = ["Algebra", "Numbers"]

# Seconds to wait for each answer; remove to wait indefinitely.
answer_timeout_secs = 120
# What happens when the wait runs out: "no_answer" or "abandon".
timeout_policy = "no_answer"

[starting_ability_by_grade]
"Grade 6" = 200
"Grade 7" = 205
"Grade 8" = 210

[sink]
type = "jsonl"
path = "ritquiz-results/sessions.jsonl"
"#;

const EXAMPLE_BANK: &str = r#"[item_bank]
id = "example"
name = "Example Item Bank"
description = "A small bank to get started"

[[questions]]
id = "ALG-1"
question = "Solve for x: x + 7 = 12"
strand = "Algebra"
rit_band = "180-195"

[[questions]]
id = "ALG-2"
question = "Solve for x: 3x - 4 = 11"
strand = "Algebra"
rit_band = "195-210"

[[questions]]
id = "ALG-3"
question = "Solve for x: 2(x + 3) = 5x - 9"
strand = "Algebra"
rit_band = "210-225"

[[questions]]
id = "NUM-1"
question = "What is 3/4 of 20?"
strand = "Numbers"
rit_band = "180-195"

[[questions]]
id = "NUM-2"
question = "What is 15% of 80?"
strand = "Numbers"
rit_band = "195-210"

[[questions]]
id = "NUM-3"
question = "What is 2 to the power of 10?"
strand = "Numbers"
rit_band = "210-225"

[choices]
ALG-1 = ["4", "5", "6", "19"]
ALG-2 = ["3", "5", "7", "15"]
ALG-3 = ["3", "4", "5", "6"]
NUM-1 = ["12", "15", "16", "5"]
NUM-2 = ["8", "12", "15", "16"]
NUM-3 = ["20", "100", "512", "1024"]

[keys]
ALG-1 = "5"
ALG-2 = "5"
ALG-3 = "5"
NUM-1 = "15"
NUM-2 = "12"
NUM-3 = "1024"
"#;
