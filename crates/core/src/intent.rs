use crate::models::{ExtractedData, Intent, IntentResult, MaintenanceCategory};

pub const EMERGENCY_KEYWORDS: &[&str] = &[
    "emergency",
    "urgent",
    "flood",
    "fire",
    "gas leak",
    "no power",
    "no water",
    "broken",
    "dangerous",
    "help",
    "immediately",
];

pub const STATUS_KEYWORDS: &[&str] = &["status", "update", "progress", "when", "check", "where is"];

pub const LIST_KEYWORDS: &[&str] = &["show", "list", "all", "my requests", "what do i have"];

pub const MAINTENANCE_KEYWORDS: &[&str] = &[
    "fix",
    "repair",
    "broken",
    "not working",
    "leak",
    "problem",
    "issue",
    "need",
    "help with",
];

/// Category groups in match priority order; the first group with a hit wins.
const CATEGORY_KEYWORDS: &[(MaintenanceCategory, &[&str])] = &[
    (
        MaintenanceCategory::Plumbing,
        &["sink", "pipe", "toilet", "faucet", "drain", "water"],
    ),
    (
        MaintenanceCategory::Electrical,
        &["light", "outlet", "electric", "power", "switch"],
    ),
    (
        MaintenanceCategory::Hvac,
        &["ac", "heat", "hvac", "air", "temperature"],
    ),
    (
        MaintenanceCategory::Appliance,
        &["fridge", "stove", "oven", "dishwasher", "washer"],
    ),
];

const TITLE_MAX_CHARS: usize = 50;

const STATUS_REPLY: &str = "Let me check the status of your request.";
const LIST_REPLY: &str = "Let me get all your maintenance requests.";
const GENERAL_REPLY: &str = "I can help you report maintenance issues, check status, or list your requests. What would you like to do?";

/// Outcome of the keyword classifier: the structured result plus the reply
/// spoken back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleClassification {
    pub result: IntentResult,
    pub reply: String,
}

/// Keyword classifier used as the terminal fallback. Total: every input,
/// including the empty string, produces a result.
///
/// Matching is case-insensitive substring containment, so "lighthouse"
/// matches "light". Status wording always wins and clears the emergency flag.
pub fn classify_intent_rules(query: &str) -> RuleClassification {
    let lower = query.to_lowercase();
    let is_emergency = contains_any(&lower, EMERGENCY_KEYWORDS);

    if contains_any(&lower, STATUS_KEYWORDS) {
        return RuleClassification {
            result: IntentResult::new(Intent::QueryStatus, 0.7),
            reply: STATUS_REPLY.to_string(),
        };
    }

    if contains_any(&lower, LIST_KEYWORDS) {
        return RuleClassification {
            result: IntentResult::new(Intent::ListMyRequests, 0.7),
            reply: LIST_REPLY.to_string(),
        };
    }

    if contains_any(&lower, MAINTENANCE_KEYWORDS) {
        let mut result = IntentResult::new(Intent::CreateMaintenanceRequest, 0.8);
        result.is_emergency = is_emergency;
        result.extracted_data = Some(ExtractedData {
            title: query.chars().take(TITLE_MAX_CHARS).collect(),
            description: query.to_string(),
            category: detect_category(&lower),
        });

        let priority = if is_emergency { "CRITICAL" } else { "HIGH" };
        return RuleClassification {
            result,
            reply: format!(
                "I'll create a maintenance request for you with {} priority.",
                priority
            ),
        };
    }

    let mut result = IntentResult::new(Intent::GeneralInquiry, 0.5);
    result.is_emergency = is_emergency;
    RuleClassification {
        result,
        reply: GENERAL_REPLY.to_string(),
    }
}

/// Expects already lower-cased text.
pub fn detect_category(lower: &str) -> MaintenanceCategory {
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, needles)| contains_any(lower, needles))
        .map(|(category, _)| *category)
        .unwrap_or(MaintenanceCategory::Other)
}

fn contains_any(input: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| input.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(query: &str) -> IntentResult {
        classify_intent_rules(query).result
    }

    #[test]
    fn sink_leak_is_plumbing_request() {
        let result = classify("My sink is leaking");
        assert_eq!(result.intent, Intent::CreateMaintenanceRequest);
        assert_eq!(result.confidence, 0.8);
        assert!(!result.is_emergency);
        let data = result.extracted_data.expect("maintenance requests carry data");
        assert_eq!(data.category, MaintenanceCategory::Plumbing);
        assert_eq!(data.description, "My sink is leaking");
    }

    #[test]
    fn status_wording_overrides_emergency() {
        let result = classify("What's the status of the fire emergency?");
        assert_eq!(result.intent, Intent::QueryStatus);
        assert_eq!(result.confidence, 0.7);
        assert!(!result.is_emergency);
    }

    #[test]
    fn list_wording_is_list_intent() {
        let result = classify("Show me all my requests");
        assert_eq!(result.intent, Intent::ListMyRequests);
        assert!(!result.is_emergency);
    }

    #[test]
    fn categories_follow_priority_order() {
        let cases = [
            ("The light switch is not working", MaintenanceCategory::Electrical),
            ("My AC is broken", MaintenanceCategory::Hvac),
            ("My dishwasher is not working", MaintenanceCategory::Appliance),
            ("Need to fix the door", MaintenanceCategory::Other),
            // water (plumbing) beats power (electrical)
            ("Problem: water near the power outlet", MaintenanceCategory::Plumbing),
            // substring match: "lighthouse" hits "light"
            ("Repair my lighthouse lamp", MaintenanceCategory::Electrical),
        ];

        for (query, expected) in cases {
            let result = classify(query);
            assert_eq!(result.intent, Intent::CreateMaintenanceRequest, "{query}");
            assert_eq!(
                result.extracted_data.map(|data| data.category),
                Some(expected),
                "{query}"
            );
        }
    }

    #[test]
    fn emergency_maintenance_gets_critical_reply() {
        let outcome = classify_intent_rules("Pipe burst, flood everywhere, fix it immediately");
        assert!(outcome.result.is_emergency);
        assert!(outcome.reply.contains("CRITICAL"));
    }

    #[test]
    fn emergency_without_maintenance_wording_is_general_inquiry() {
        let result = classify("There's a fire! Emergency!");
        assert_eq!(result.intent, Intent::GeneralInquiry);
        assert_eq!(result.confidence, 0.5);
        assert!(result.is_emergency);
        assert!(result.extracted_data.is_none());
    }

    #[test]
    fn plain_greeting_is_general_inquiry() {
        let result = classify("Hello, how are you?");
        assert_eq!(result.intent, Intent::GeneralInquiry);
        assert!(!result.is_emergency);
    }

    #[test]
    fn emergency_keywords_flag_queries() {
        for query in [
            "This is an emergency!",
            "Urgent help needed",
            "There's a flood",
            "Gas leak detected",
            "No power in the building",
            "No water available",
            "Broken window",
            "Dangerous situation",
            "Help immediately",
        ] {
            assert!(classify(query).is_emergency, "{query}");
        }
    }

    #[test]
    fn title_is_truncated_to_fifty_chars() {
        let query = "The kitchen faucet has a slow leak that keeps dripping through the night";
        let data = classify(query).extracted_data.unwrap();
        assert_eq!(data.title.chars().count(), 50);
        assert_eq!(data.description, query);
    }

    #[test]
    fn empty_input_still_classifies() {
        let result = classify("");
        assert_eq!(result.intent, Intent::GeneralInquiry);
        assert!((0.0..=1.0).contains(&result.confidence));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn status_query() -> impl Strategy<Value = String> {
            (
                ".{0,40}",
                prop::sample::select(STATUS_KEYWORDS),
                any::<bool>(),
                ".{0,40}",
            )
                .prop_map(|(prefix, keyword, shout, suffix)| {
                    let keyword = if shout {
                        keyword.to_uppercase()
                    } else {
                        keyword.to_string()
                    };
                    format!("{}{}{}", prefix, keyword, suffix)
                })
        }

        proptest! {
            #[test]
            fn every_input_classifies_with_bounded_confidence(query in any::<String>()) {
                let classification = classify_intent_rules(&query);
                prop_assert!((0.0..=1.0).contains(&classification.result.confidence));
                prop_assert!(!classification.reply.is_empty());
            }

            #[test]
            fn status_keyword_always_wins(query in status_query()) {
                let result = classify(&query);
                prop_assert_eq!(result.intent, Intent::QueryStatus);
                prop_assert!(!result.is_emergency);
                prop_assert_eq!(result.confidence, 0.7);
            }
        }
    }
}
