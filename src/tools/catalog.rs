//! Vietnamese market tool catalog
//!
//! Names, descriptions and actions of the tools served by the tool service.

use crate::tools::ToolAction;

pub const VNSTOCK_CONNECTOR: &str = "vnstock_connector";
pub const FINANCIAL_STATEMENTS: &str = "financial_statements";
pub const FINANCIAL_RATIOS: &str = "financial_ratios";
pub const DCF_VALUATION: &str = "dcf_valuation";
pub const TECHNICAL_INDICATORS: &str = "technical_indicators";
pub const TRADING_SIGNALS: &str = "trading_signals";
pub const MONEY_FLOW: &str = "money_flow";
pub const NEWS_AGGREGATOR: &str = "news_aggregator";
pub const SENTIMENT_ANALYSIS: &str = "sentiment_analysis";
pub const COMPANY_RISK: &str = "company_risk";
pub const STOCK_SCREENER: &str = "stock_screener";
pub const MARKET_OVERVIEW: &str = "market_overview";
pub const CALCULATORS: &str = "calculators";
pub const EDUCATION: &str = "education";
pub const ALERTS: &str = "alerts";
pub const SOCIAL: &str = "social";

#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub actions: &'static [ToolAction],
}

impl ToolSpec {
    pub fn find(name: &str) -> Option<&'static ToolSpec> {
        CATALOG.iter().find(|spec| spec.name == name)
    }
}

pub const CATALOG: &[ToolSpec] = &[
    ToolSpec {
        name: VNSTOCK_CONNECTOR,
        description: "Vietnamese stock data: company profile, OHLCV history, raw financial reports, market indices.",
        actions: &[
            ToolAction::new("stock_overview", "Company overview (name, industry, market cap)"),
            ToolAction::new("stock_price", "OHLCV price history by day/week/month"),
            ToolAction::new("financial_report", "Financial report (BalanceSheet / IncomeStatement / CashFlow)"),
            ToolAction::new("financial_ratio", "Raw financial ratios (P/E, ROE, ROA, EPS...)"),
            ToolAction::new("foreign_trading", "Foreign investor trading for one symbol"),
            ToolAction::new("market_index", "Index data (VNINDEX, VN30, HNX, UPCOM)"),
        ],
    },
    ToolSpec {
        name: FINANCIAL_STATEMENTS,
        description: "Balance sheet, income statement and cash flow analysis with YoY growth.",
        actions: &[
            ToolAction::new("summary", "Financial overview"),
            ToolAction::new("balance_sheet", "Balance sheet"),
            ToolAction::new("income_statement", "Income statement"),
            ToolAction::new("cash_flow", "Cash flow statement"),
            ToolAction::new("growth", "Revenue and profit growth"),
        ],
    },
    ToolSpec {
        name: FINANCIAL_RATIOS,
        description: "Financial ratios: P/E, P/B, ROE, ROA, Debt/Equity, Current Ratio, EPS, BVPS, margins.",
        actions: &[
            ToolAction::new("all", "Every ratio group"),
            ToolAction::new("valuation", "P/E, P/B, EV/EBITDA"),
            ToolAction::new("profitability", "ROE, ROA, margins"),
            ToolAction::new("liquidity", "Current and quick ratios"),
            ToolAction::new("leverage", "Debt/Equity, interest coverage"),
            ToolAction::new("per_share", "EPS, BVPS, dividends per share"),
            ToolAction::new("compare", "Compare ratios against the industry"),
        ],
    },
    ToolSpec {
        name: DCF_VALUATION,
        description: "Discounted cash flow valuation: WACC, projected FCF, terminal value, intrinsic value.",
        actions: &[
            ToolAction::new("valuation", "Full DCF valuation"),
            ToolAction::new("sensitivity", "Sensitivity of value to WACC and growth"),
        ],
    },
    ToolSpec {
        name: TECHNICAL_INDICATORS,
        description: "Technical indicators: RSI, MACD, Bollinger, SMA/EMA, stochastic, ATR.",
        actions: &[
            ToolAction::new("summary", "Technical overview across indicators"),
            ToolAction::new("all", "Every indicator"),
            ToolAction::new("rsi", "Relative strength index"),
            ToolAction::new("macd", "MACD line, signal and histogram"),
            ToolAction::new("bollinger", "Bollinger bands"),
            ToolAction::new("sma", "Simple moving averages"),
            ToolAction::new("ema", "Exponential moving averages"),
            ToolAction::new("stochastic", "Stochastic oscillator"),
            ToolAction::new("atr", "Average true range"),
        ],
    },
    ToolSpec {
        name: TRADING_SIGNALS,
        description: "Trading signals: RSI overbought/oversold, MACD crossover, golden/death cross, support/resistance, trend.",
        actions: &[
            ToolAction::new("all", "Every signal"),
            ToolAction::new("rsi_signals", "RSI signals"),
            ToolAction::new("macd_signals", "MACD crossovers"),
            ToolAction::new("ma_cross", "Golden/death cross"),
            ToolAction::new("support_resistance", "Support and resistance levels"),
            ToolAction::new("trend", "Trend direction"),
            ToolAction::new("recommendation", "Aggregated buy/sell recommendation"),
        ],
    },
    ToolSpec {
        name: MONEY_FLOW,
        description: "Money flow: foreign net buying/selling, proprietary and insider trading, top traded symbols.",
        actions: &[
            ToolAction::new("flow_analysis", "Combined flow analysis (OBV, A/D, MFI) for one symbol"),
            ToolAction::new("foreign", "Foreign trading for one symbol"),
            ToolAction::new("foreign_history", "Volume history as a foreign flow proxy"),
            ToolAction::new("top_foreign_buy", "Symbols with the largest foreign net buying"),
            ToolAction::new("top_foreign_sell", "Symbols with the largest foreign net selling"),
            ToolAction::new("proprietary", "Proprietary desk trading for one symbol"),
            ToolAction::new("insider", "Insider and major shareholder trades"),
        ],
    },
    ToolSpec {
        name: NEWS_AGGREGATOR,
        description: "Vietnamese market news from RSS feeds (CafeF, VnExpress), by symbol or keyword.",
        actions: &[
            ToolAction::new("latest", "Latest news from every feed"),
            ToolAction::new("stock_news", "News for one symbol"),
            ToolAction::new("market", "Stock market news"),
            ToolAction::new("search", "Keyword search (keyword in params)"),
        ],
    },
    ToolSpec {
        name: SENTIMENT_ANALYSIS,
        description: "News sentiment: positive/negative/neutral with a 0-1 score and reasons.",
        actions: &[
            ToolAction::new("analyze", "Sentiment for one symbol's latest news"),
            ToolAction::new("stock_sentiment", "Aggregated sentiment across a symbol's news"),
            ToolAction::new("market_sentiment", "Overall market sentiment"),
            ToolAction::new("analyze_text", "Sentiment of one article URL"),
        ],
    },
    ToolSpec {
        name: COMPANY_RISK,
        description: "Risk assessment: Altman Z-Score, liquidity risk, price volatility, beta, portfolio risk.",
        actions: &[
            ToolAction::new("assessment", "Overall risk assessment"),
            ToolAction::new("altman_z", "Altman Z-Score"),
            ToolAction::new("liquidity", "Liquidity risk"),
            ToolAction::new("volatility", "Volatility and beta"),
            ToolAction::new("portfolio", "Portfolio risk"),
        ],
    },
    ToolSpec {
        name: STOCK_SCREENER,
        description: "Stock screening: value, growth, oversold/overbought, industry, dividend, custom criteria.",
        actions: &[
            ToolAction::new("value", "Low P/E, high ROE, low P/B"),
            ToolAction::new("growth", "Strong EPS and revenue growth"),
            ToolAction::new("oversold", "RSI below 30"),
            ToolAction::new("overbought", "RSI above 70"),
            ToolAction::new("industry", "Filter by industry (industry in params)"),
            ToolAction::new("dividend", "High and stable dividends"),
            ToolAction::new("custom", "Custom filter (criteria in params)"),
        ],
    },
    ToolSpec {
        name: MARKET_OVERVIEW,
        description: "Market overview: VNINDEX/HNX/UPCOM, top gainers/losers, sector performance, macro, breadth.",
        actions: &[
            ToolAction::new("summary", "Full overview: index, breadth, sector ranking"),
            ToolAction::new("status", "Index status, top gainers/losers"),
            ToolAction::new("index", "Detail for one index: trend, SMA, volatility"),
            ToolAction::new("sector", "Sector performance"),
            ToolAction::new("breadth", "Advancers/decliners and volume distribution"),
            ToolAction::new("macro", "Interest rates, USD/VND, SJC gold, GDP/CPI"),
        ],
    },
    ToolSpec {
        name: CALCULATORS,
        description: "Financial calculators: compound interest, position sizing, Vietnamese trading tax and fees, breakeven, margin, DCA.",
        actions: &[
            ToolAction::new("compound_interest", "Final amount from principal, rate and years"),
            ToolAction::new("position_sizing", "Order size from risk % and stop-loss"),
            ToolAction::new("tax", "Trading tax and fees (0.1% sell tax)"),
            ToolAction::new("breakeven", "Breakeven price after fees"),
            ToolAction::new("margin", "Margin call level and leverage"),
            ToolAction::new("dca", "Average cost under dollar cost averaging"),
        ],
    },
    ToolSpec {
        name: EDUCATION,
        description: "Investing knowledge: term definitions (P/E, RSI, MACD...), tutorials, case studies, quizzes.",
        actions: &[
            ToolAction::new("define", "Explain a term (term in params)"),
            ToolAction::new("tutorial", "Beginner tutorial on a topic"),
            ToolAction::new("case_study", "Historical case study"),
            ToolAction::new("list_terms", "List known terms"),
            ToolAction::new("quiz", "Knowledge quiz"),
        ],
    },
    ToolSpec {
        name: ALERTS,
        description: "Alerts: price thresholds, technical indicator and news alerts; check and manage alerts.",
        actions: &[
            ToolAction::new("create_price", "Price alert (symbol, condition, price)"),
            ToolAction::new("create_technical", "Indicator alert (symbol, indicator, threshold)"),
            ToolAction::new("create_news", "News alert for a symbol"),
            ToolAction::new("check", "Evaluate alerts now"),
            ToolAction::new("list", "List alerts"),
            ToolAction::new("delete", "Delete one alert"),
            ToolAction::new("history", "Triggered alert history"),
            ToolAction::new("clear", "Remove every alert"),
        ],
    },
    ToolSpec {
        name: SOCIAL,
        description: "Community portfolios: leaderboard, personal portfolios, holdings, watchlist.",
        actions: &[
            ToolAction::new("top_portfolios", "Best community portfolios"),
            ToolAction::new("leaderboard", "Investor leaderboard"),
            ToolAction::new("create_portfolio", "Create a portfolio"),
            ToolAction::new("add_holding", "Add a holding to a portfolio"),
            ToolAction::new("remove_holding", "Remove a holding"),
            ToolAction::new("my_portfolios", "List own portfolios"),
            ToolAction::new("portfolio_detail", "Portfolio detail"),
            ToolAction::new("delete_portfolio", "Delete a portfolio"),
            ToolAction::new("watchlist", "Show watchlist"),
            ToolAction::new("add_watchlist", "Add a symbol to the watchlist"),
            ToolAction::new("remove_watchlist", "Remove a symbol from the watchlist"),
        ],
    },
];
