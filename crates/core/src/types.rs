use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Name prefix that marks a verification script
pub const TEST_SCRIPT_PREFIX: &str = "test-";

/// Category of a script, derived from its file name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Utility,
    Test,
}

impl Category {
    pub fn from_file_name(name: &str) -> Self {
        if name.starts_with(TEST_SCRIPT_PREFIX) {
            Category::Test
        } else {
            Category::Utility
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Utility => "utility",
            Category::Test => "test",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category filter accepted by script listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryFilter {
    Utility,
    Test,
    #[default]
    All,
}

impl CategoryFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryFilter::Utility => "utility",
            CategoryFilter::Test => "test",
            CategoryFilter::All => "all",
        }
    }

    pub fn matches(&self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Utility => category == Category::Utility,
            CategoryFilter::Test => category == Category::Test,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "utility" => Ok(CategoryFilter::Utility),
            "test" => Ok(CategoryFilter::Test),
            "all" => Ok(CategoryFilter::All),
            other => Err(format!(
                "unknown category '{}' (expected utility, test or all)",
                other
            )),
        }
    }
}

/// One option documented in a header's Options block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionEntry {
    pub flags: String,
    pub description: String,
}

/// Short listing entry for a script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptSummary {
    pub name: String,
    pub category: Category,
    pub summary: String,
}

/// Full metadata for a script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptInfo {
    pub name: String,
    pub category: Category,
    pub summary: String,
    pub usage: Option<String>,
    pub options: Vec<OptionEntry>,
    pub environment: Vec<String>,
    /// Only runnable with host privileges the server does not have
    pub host_only: bool,
}

/// Short listing entry for a helper program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramSummary {
    pub name: String,
    pub summary: String,
}

/// Full metadata for a helper program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramInfo {
    pub name: String,
    pub summary: String,
    pub usage: Option<String>,
    pub options: Vec<OptionEntry>,
    pub environment: Vec<String>,
}
