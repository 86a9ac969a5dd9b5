//! Interaction Classifier
//!
//! Classifies user inputs as either:
//! - Greeting: answered with a fixed message, no planning (e.g., "xin chào", "hi")
//! - Analysis: goes through plan, execute and synthesize

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionType {
    Greeting,
    Analysis,
}

/// Matched against the start of the lowercased query
const GREETING_PHRASES: &[&str] = &["xin chào", "hello", "hi", "chào", "hey", "help"];

pub const GREETING_RESPONSE: &str = "Xin chào! Tôi là trợ lý AI phân tích chứng khoán Việt Nam 🇻🇳\n\n\
Tôi có thể giúp bạn:\n\
- 📊 Phân tích cổ phiếu (VD: *Phân tích FPT*)\n\
- ⚖️ So sánh cổ phiếu (VD: *So sánh FPT và VNM*)\n\
- 💰 Khối ngoại mua/bán gì (VD: *Khối ngoại mua gì?*)\n\
- 📰 Tin tức thị trường (VD: *Tin tức VNM*)\n\
- 🔍 Lọc cổ phiếu (VD: *Lọc cổ phiếu giá trị*)\n\
- 📈 Tổng quan thị trường (VD: *Thị trường hôm nay?*)\n\n\
Hãy hỏi tôi bất cứ điều gì!";

/// Interaction classifier
pub struct InteractionClassifier;

impl InteractionClassifier {
    pub fn classify(query: &str) -> InteractionType {
        if is_greeting(query) {
            InteractionType::Greeting
        } else {
            InteractionType::Analysis
        }
    }
}

/// Case-insensitive equality with, or prefix match on, a greeting phrase.
///
/// Plain prefix: "history of VNM" counts as a greeting.
pub fn is_greeting(query: &str) -> bool {
    let lowered = query.trim().to_lowercase();
    GREETING_PHRASES
        .iter()
        .any(|phrase| lowered == *phrase || lowered.starts_with(phrase))
}
