//! Deterministic planner
//!
//! Used when the LLM planner returns nothing usable. Queries are matched
//! against an ordered rule table; the first rule whose predicate holds
//! generates the steps. Every step carries at most one symbol.

use crate::memory::active_entities_from_context;
use crate::models::{Plan, PlanStep};
use crate::planner::Planner;
use crate::tools::catalog::{
    ALERTS, CALCULATORS, COMPANY_RISK, DCF_VALUATION, EDUCATION, FINANCIAL_RATIOS,
    FINANCIAL_STATEMENTS, MARKET_OVERVIEW, MONEY_FLOW, NEWS_AGGREGATOR, SENTIMENT_ANALYSIS,
    SOCIAL, STOCK_SCREENER, TECHNICAL_INDICATORS, TRADING_SIGNALS, VNSTOCK_CONNECTOR,
};
use crate::Result;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

lazy_static! {
    static ref SYMBOL_PATTERN: Regex = Regex::new(r"\b([A-Z]{3})\b").unwrap();
}

/// Three-letter uppercase words that are not tickers.
pub const SYMBOL_STOPLIST: &[&str] = &[
    "VND", "USD", "GDP", "ETF", "CEO", "CFO", "CPI", "IPO", "EPS", "ROE", "ROA", "RSI", "DCF",
    "DCA", "SMA", "EMA", "OBV", "MFI", "ATR", "HNX",
];

/// Ticker-like codes in order of appearance, de-duplicated.
pub fn extract_symbols(query: &str) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::new();

    for capture in SYMBOL_PATTERN.captures_iter(query) {
        let code = &capture[1];
        if SYMBOL_STOPLIST.contains(&code) || symbols.iter().any(|s| s == code) {
            continue;
        }
        symbols.push(code.to_string());
    }

    symbols
}

const COMPARISON_KEYWORDS: &[&str] = &["so sánh", "compare", "versus", " vs", "với", "hay"];
const TECHNICAL_KEYWORDS: &[&str] = &[
    "kỹ thuật", "technical", "rsi", "macd", "bollinger", "chỉ báo", "tín hiệu", "signal",
    "xu hướng", "trend", "hỗ trợ", "kháng cự",
];
const NEWS_KEYWORDS: &[&str] = &["tin tức", "tin mới", "bản tin", "news", "tâm lý", "sentiment"];
const SENTIMENT_KEYWORDS: &[&str] = &["tâm lý", "sentiment"];
const RISK_KEYWORDS: &[&str] = &["rủi ro", "risk", "altman", "biến động", "volatility", "beta"];
const MONEY_FLOW_KEYWORDS: &[&str] = &[
    "khối ngoại", "nước ngoài", "foreign", "dòng tiền", "money flow", "tự doanh", "nội bộ",
];
const SELL_KEYWORDS: &[&str] = &["bán", "sell"];
const SCREENING_KEYWORDS: &[&str] = &[
    "lọc", "screen", "tìm cổ phiếu", "quá bán", "quá mua", "oversold", "overbought",
];
const CALCULATOR_KEYWORDS: &[&str] = &[
    "lãi kép", "compound", "thuế", "phí giao dịch", "tax", "hòa vốn", "breakeven", "ký quỹ",
    "margin", "position size", "khối lượng mua", "dca", "trung bình giá",
];
const EDUCATION_KEYWORDS: &[&str] = &[
    "là gì", "what is", "giải thích", "explain", "khái niệm", "hướng dẫn", "tutorial",
];
const ALERT_KEYWORDS: &[&str] = &["cảnh báo", "alert", "báo khi", "nhắc"];
const SOCIAL_KEYWORDS: &[&str] = &[
    "danh mục", "portfolio", "watchlist", "theo dõi", "xếp hạng", "leaderboard",
];
const FUNDAMENTAL_KEYWORDS: &[&str] = &[
    "phân tích", "đánh giá", "chỉ số", "định giá", "tài chính", "báo cáo", "doanh thu",
    "lợi nhuận", "analy", "valuation", "fundamental", "p/e",
];
const VALUATION_KEYWORDS: &[&str] = &["định giá", "valuation", "dcf", "giá trị nội tại"];
const STATEMENT_KEYWORDS: &[&str] = &["báo cáo", "doanh thu", "lợi nhuận", "bctc"];
const MARKET_KEYWORDS: &[&str] = &[
    "thị trường", "market", "vnindex", "vn-index", "vn30", "hnx", "upcom", "ngành", "sector",
    "vĩ mô", "macro", "lãi suất", "tỷ giá",
];
const MACRO_KEYWORDS: &[&str] = &["vĩ mô", "macro", "lãi suất", "tỷ giá", "lạm phát"];
const SECTOR_KEYWORDS: &[&str] = &["ngành", "sector"];
/// Words that point back at a stock named earlier.
const FOLLOW_UP_KEYWORDS: &[&str] = &["nó", "đó", "này", "giá", "price"];

/// What the rules look at.
#[derive(Debug, Clone)]
pub struct QueryFeatures {
    pub query: String,
    pub lowered: String,
    pub symbols: Vec<String>,
    /// Symbols were taken from the context, not the query.
    pub inherited: bool,
}

impl QueryFeatures {
    /// Symbols come from the query; when it names none, from the
    /// active-entity hint in the conversation context.
    pub fn new(query: &str, context: &str) -> Self {
        let mut symbols = extract_symbols(query);
        let inherited = symbols.is_empty();
        if inherited {
            symbols = active_entities_from_context(context);
        }

        Self {
            query: query.trim().to_string(),
            lowered: query.to_lowercase(),
            inherited: inherited && !symbols.is_empty(),
            symbols,
        }
    }

    pub fn mentions(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|k| self.lowered.contains(k))
    }

    pub fn primary_symbol(&self) -> Option<&str> {
        self.symbols.first().map(String::as_str)
    }

    fn has_symbol(&self) -> bool {
        !self.symbols.is_empty()
    }
}

/// One entry of the rule table.
pub struct IntentRule {
    pub intent: &'static str,
    pub applies: fn(&QueryFeatures) -> bool,
    pub generate: fn(&QueryFeatures) -> Vec<PlanStep>,
}

/// Evaluated top to bottom, first match wins.
pub const RULES: &[IntentRule] = &[
    IntentRule {
        intent: "comparison",
        applies: |f| f.symbols.len() >= 2 && f.mentions(COMPARISON_KEYWORDS),
        generate: comparison_steps,
    },
    IntentRule {
        intent: "technical analysis",
        applies: |f| f.has_symbol() && f.mentions(TECHNICAL_KEYWORDS),
        generate: technical_steps,
    },
    IntentRule {
        intent: "news",
        applies: |f| f.mentions(NEWS_KEYWORDS),
        generate: news_steps,
    },
    IntentRule {
        intent: "risk assessment",
        applies: |f| f.has_symbol() && f.mentions(RISK_KEYWORDS),
        generate: risk_steps,
    },
    IntentRule {
        intent: "money flow",
        applies: |f| f.mentions(MONEY_FLOW_KEYWORDS),
        generate: money_flow_steps,
    },
    IntentRule {
        intent: "stock screening",
        applies: |f| f.mentions(SCREENING_KEYWORDS),
        generate: screening_steps,
    },
    IntentRule {
        intent: "calculator",
        applies: |f| f.mentions(CALCULATOR_KEYWORDS),
        generate: calculator_steps,
    },
    IntentRule {
        intent: "education",
        applies: |f| f.mentions(EDUCATION_KEYWORDS),
        generate: education_steps,
    },
    IntentRule {
        intent: "alerts",
        applies: |f| f.mentions(ALERT_KEYWORDS),
        generate: alert_steps,
    },
    IntentRule {
        intent: "portfolio",
        applies: |f| f.mentions(SOCIAL_KEYWORDS),
        generate: social_steps,
    },
    IntentRule {
        intent: "fundamental analysis",
        applies: |f| f.has_symbol() && f.mentions(FUNDAMENTAL_KEYWORDS),
        generate: fundamental_steps,
    },
    IntentRule {
        intent: "market overview",
        applies: |f| f.mentions(MARKET_KEYWORDS),
        generate: market_steps,
    },
    IntentRule {
        intent: "stock lookup",
        applies: |f| f.has_symbol() && (!f.inherited || f.mentions(FOLLOW_UP_KEYWORDS)),
        generate: lookup_steps,
    },
];

/// Plan built from the first matching rule, or a market overview.
pub fn fallback_plan(query: &str, context: &str) -> Plan {
    let features = QueryFeatures::new(query, context);

    let (intent, mut steps) = match RULES.iter().find(|rule| (rule.applies)(&features)) {
        Some(rule) => (rule.intent, (rule.generate)(&features)),
        None => ("market overview", overview_step()),
    };
    if steps.is_empty() {
        steps = overview_step();
    }

    for (index, step) in steps.iter_mut().enumerate() {
        step.sequence = index as u32 + 1;
    }

    debug!(intent, steps = steps.len(), symbols = ?features.symbols, "Fallback plan built");

    Plan::new(format!("Fallback plan: {}", intent), features.symbols, steps)
}

fn step(tool: &str, action: &str) -> PlanStep {
    PlanStep::new(0, tool, action)
}

fn symbol_step(tool: &str, action: &str, symbol: &str, reason: &str) -> PlanStep {
    step(tool, action)
        .with_param("symbol", symbol)
        .with_reason(format!("{} {}", reason, symbol))
}

fn overview_step() -> Vec<PlanStep> {
    vec![step(MARKET_OVERVIEW, "summary").with_reason("Tổng quan thị trường")]
}

fn comparison_steps(f: &QueryFeatures) -> Vec<PlanStep> {
    let technical = f.mentions(TECHNICAL_KEYWORDS);
    let mut steps = Vec::new();

    for symbol in &f.symbols {
        steps.push(symbol_step(VNSTOCK_CONNECTOR, "stock_overview", symbol, "Thông tin công ty"));
        steps.push(symbol_step(FINANCIAL_RATIOS, "all", symbol, "Chỉ số tài chính"));
        if technical {
            steps.push(symbol_step(TECHNICAL_INDICATORS, "summary", symbol, "Chỉ báo kỹ thuật"));
        }
    }

    steps
}

fn technical_steps(f: &QueryFeatures) -> Vec<PlanStep> {
    let Some(symbol) = f.primary_symbol() else {
        return overview_step();
    };

    vec![
        symbol_step(TECHNICAL_INDICATORS, "summary", symbol, "Chỉ báo kỹ thuật"),
        symbol_step(TRADING_SIGNALS, "all", symbol, "Tín hiệu giao dịch"),
    ]
}

fn news_steps(f: &QueryFeatures) -> Vec<PlanStep> {
    match f.primary_symbol() {
        Some(symbol) => vec![
            symbol_step(NEWS_AGGREGATOR, "stock_news", symbol, "Tin tức"),
            symbol_step(SENTIMENT_ANALYSIS, "analyze", symbol, "Tâm lý tin tức"),
        ],
        None => {
            let mut steps = vec![step(NEWS_AGGREGATOR, "market").with_reason("Tin tức thị trường")];
            if f.mentions(SENTIMENT_KEYWORDS) {
                steps.push(
                    step(SENTIMENT_ANALYSIS, "market_sentiment").with_reason("Tâm lý thị trường"),
                );
            }
            steps
        }
    }
}

fn risk_steps(f: &QueryFeatures) -> Vec<PlanStep> {
    let Some(symbol) = f.primary_symbol() else {
        return overview_step();
    };
    vec![symbol_step(COMPANY_RISK, "assessment", symbol, "Đánh giá rủi ro")]
}

fn money_flow_steps(f: &QueryFeatures) -> Vec<PlanStep> {
    match f.primary_symbol() {
        Some(symbol) => vec![
            symbol_step(MONEY_FLOW, "flow_analysis", symbol, "Dòng tiền"),
            symbol_step(MONEY_FLOW, "foreign", symbol, "Giao dịch khối ngoại"),
        ],
        None if f.mentions(SELL_KEYWORDS) && !f.lowered.contains("mua") => {
            vec![step(MONEY_FLOW, "top_foreign_sell").with_reason("Khối ngoại bán")]
        }
        None => vec![step(MONEY_FLOW, "top_foreign_buy").with_reason("Khối ngoại mua")],
    }
}

fn screening_steps(f: &QueryFeatures) -> Vec<PlanStep> {
    let action = if f.mentions(&["quá bán", "oversold"]) {
        "oversold"
    } else if f.mentions(&["quá mua", "overbought"]) {
        "overbought"
    } else if f.mentions(&["cổ tức", "dividend"]) {
        "dividend"
    } else if f.mentions(&["tăng trưởng", "growth"]) {
        "growth"
    } else {
        "value"
    };

    vec![step(STOCK_SCREENER, action).with_reason("Lọc cổ phiếu")]
}

fn calculator_steps(f: &QueryFeatures) -> Vec<PlanStep> {
    let action = if f.mentions(&["lãi kép", "compound"]) {
        "compound_interest"
    } else if f.mentions(&["hòa vốn", "breakeven"]) {
        "breakeven"
    } else if f.mentions(&["ký quỹ", "margin"]) {
        "margin"
    } else if f.mentions(&["position size", "khối lượng mua"]) {
        "position_sizing"
    } else if f.mentions(&["dca", "trung bình giá"]) {
        "dca"
    } else {
        "tax"
    };

    vec![step(CALCULATORS, action).with_reason("Tính toán tài chính")]
}

fn education_steps(f: &QueryFeatures) -> Vec<PlanStep> {
    if f.mentions(&["hướng dẫn", "tutorial"]) {
        return vec![step(EDUCATION, "tutorial")
            .with_param("topic", f.query.as_str())
            .with_reason("Hướng dẫn")];
    }

    vec![step(EDUCATION, "define")
        .with_param("term", education_term(&f.query))
        .with_reason("Giải thích thuật ngữ")]
}

/// The subject of "X là gì" / "what is X", or the whole query.
fn education_term(query: &str) -> String {
    let lowered = query.to_lowercase();
    let trim = |s: &str| s.trim_matches(|c: char| c.is_whitespace() || c == '?').to_string();

    if let Some(at) = lowered.find("là gì") {
        if let Some(subject) = query.get(..at) {
            return trim(subject);
        }
    }
    if let Some(at) = lowered.find("what is") {
        if let Some(subject) = query.get(at + "what is".len()..) {
            return trim(subject);
        }
    }

    trim(query)
}

fn alert_steps(f: &QueryFeatures) -> Vec<PlanStep> {
    let action = if f.mentions(&["kiểm tra", "check"]) {
        "check"
    } else {
        "list"
    };
    vec![step(ALERTS, action).with_reason("Cảnh báo")]
}

fn social_steps(f: &QueryFeatures) -> Vec<PlanStep> {
    let action = if f.mentions(&["watchlist", "theo dõi"]) {
        "watchlist"
    } else if f.mentions(&["xếp hạng", "leaderboard"]) {
        "leaderboard"
    } else {
        "top_portfolios"
    };
    vec![step(SOCIAL, action).with_reason("Danh mục cộng đồng")]
}

fn fundamental_steps(f: &QueryFeatures) -> Vec<PlanStep> {
    let Some(symbol) = f.primary_symbol() else {
        return overview_step();
    };

    let mut steps = vec![
        symbol_step(VNSTOCK_CONNECTOR, "stock_overview", symbol, "Thông tin công ty"),
        symbol_step(FINANCIAL_RATIOS, "all", symbol, "Chỉ số tài chính"),
        symbol_step(TECHNICAL_INDICATORS, "summary", symbol, "Chỉ báo kỹ thuật"),
    ];
    if f.mentions(STATEMENT_KEYWORDS) {
        steps.push(symbol_step(FINANCIAL_STATEMENTS, "summary", symbol, "Báo cáo tài chính"));
    }
    if f.mentions(VALUATION_KEYWORDS) {
        steps.push(symbol_step(DCF_VALUATION, "valuation", symbol, "Định giá DCF"));
    }
    steps
}

fn market_steps(f: &QueryFeatures) -> Vec<PlanStep> {
    if f.mentions(MACRO_KEYWORDS) {
        return vec![step(MARKET_OVERVIEW, "macro").with_reason("Kinh tế vĩ mô")];
    }
    if f.mentions(SECTOR_KEYWORDS) {
        return vec![step(MARKET_OVERVIEW, "sector").with_reason("Hiệu suất ngành")];
    }
    overview_step()
}

fn lookup_steps(f: &QueryFeatures) -> Vec<PlanStep> {
    let Some(symbol) = f.primary_symbol() else {
        return overview_step();
    };

    vec![
        symbol_step(VNSTOCK_CONNECTOR, "stock_overview", symbol, "Thông tin công ty"),
        symbol_step(VNSTOCK_CONNECTOR, "stock_price", symbol, "Lịch sử giá"),
    ]
}

/// Planner that never fails and never calls a model.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackPlanner;

impl FallbackPlanner {
    pub fn new() -> Self {
        Self
    }

    pub fn plan(&self, query: &str, context: &str) -> Plan {
        fallback_plan(query, context)
    }
}

#[async_trait]
impl Planner for FallbackPlanner {
    async fn create_plan(&self, query: &str, context: &str) -> Result<Plan> {
        Ok(fallback_plan(query, context))
    }
}
