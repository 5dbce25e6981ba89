//! The consolidated insights report: usage counts, feedback rates,
//! themes, per-conversation quality, and an optional LLM-written
//! narrative summary. Every aggregation is guarded against empty data;
//! only the summary step talks to the generator, and its failures are
//! swallowed locally.

use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::db::{repository, DatabaseError};
use crate::llm::{LlmError, ReplyGenerator};
use crate::models::enums::MessageRole;

use super::quality;
use super::themes::{extract_themes, Theme};

/// How many themes the report surfaces.
const THEME_TOP_N: usize = 10;

/// The per-conversation list is capped; distribution and average still
/// cover every conversation.
const CONVERSATION_LIST_CAP: usize = 20;

#[derive(Debug, Serialize)]
pub struct UsageStats {
    pub total_conversations: i64,
    pub total_messages: i64,
    pub total_user_messages: i64,
    pub total_ai_messages: i64,
}

#[derive(Debug, Serialize)]
pub struct FeedbackStats {
    pub total_feedback: i64,
    pub positive_feedback: i64,
    pub negative_feedback: i64,
    /// positive / total feedback, as a 2-decimal percentage (0 when empty)
    pub satisfaction_rate: f64,
    /// total feedback / total AI messages, as a 2-decimal percentage (0 when empty)
    pub feedback_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct ScoreDistribution {
    pub excellent: usize,
    pub good: usize,
    pub fair: usize,
    pub poor: usize,
}

#[derive(Debug, Serialize)]
pub struct ConversationQuality {
    pub id: Uuid,
    pub title: Option<String>,
    pub quality_score: Option<f64>,
    pub total_messages: i64,
    pub feedback_count: i64,
}

#[derive(Debug, Serialize)]
pub struct QualityScores {
    pub average: Option<f64>,
    pub distribution: ScoreDistribution,
    pub conversations: Vec<ConversationQuality>,
}

#[derive(Debug, Serialize)]
pub struct InsightsReport {
    pub usage: UsageStats,
    pub feedback: FeedbackStats,
    pub themes: Vec<Theme>,
    pub quality_scores: QualityScores,
    pub summary: Option<String>,
}

/// Build the full insights report from a fresh snapshot of the store.
/// The generator is only consulted when `include_summary` is true, and
/// its failure never fails the report.
pub fn build_insights(
    conn: &Connection,
    generator: &dyn ReplyGenerator,
    include_summary: bool,
) -> Result<InsightsReport, DatabaseError> {
    let usage = UsageStats {
        total_conversations: repository::count_conversations(conn)?,
        total_messages: repository::count_messages(conn)?,
        total_user_messages: repository::count_messages_by_role(conn, MessageRole::User)?,
        total_ai_messages: repository::count_messages_by_role(conn, MessageRole::Ai)?,
    };

    let total_feedback = repository::count_feedback(conn, None)?;
    let positive_feedback = repository::count_feedback(conn, Some(true))?;
    let negative_feedback = repository::count_feedback(conn, Some(false))?;

    let satisfaction_rate = if total_feedback > 0 {
        quality::round2(positive_feedback as f64 / total_feedback as f64 * 100.0)
    } else {
        0.0
    };
    let feedback_rate = if usage.total_ai_messages > 0 {
        quality::round2(total_feedback as f64 / usage.total_ai_messages as f64 * 100.0)
    } else {
        0.0
    };

    let feedback = FeedbackStats {
        total_feedback,
        positive_feedback,
        negative_feedback,
        satisfaction_rate,
        feedback_rate,
    };

    let notes = repository::non_empty_feedback_notes(conn)?;
    let themes = extract_themes(&notes, THEME_TOP_N);

    let mut conversations = Vec::new();
    for conv in repository::list_all_conversations(conn)? {
        let quality_score = quality::conversation_score(conn, &conv.id)?;
        conversations.push(ConversationQuality {
            quality_score,
            total_messages: repository::count_conversation_messages(conn, &conv.id)?,
            feedback_count: repository::count_conversation_feedback(conn, &conv.id, None)?,
            id: conv.id,
            title: conv.title,
        });
    }

    let defined: Vec<f64> = conversations
        .iter()
        .filter_map(|c| c.quality_score)
        .collect();
    let distribution = ScoreDistribution {
        excellent: defined.iter().filter(|&&s| s >= 80.0).count(),
        good: defined.iter().filter(|&&s| (60.0..80.0).contains(&s)).count(),
        fair: defined.iter().filter(|&&s| (40.0..60.0).contains(&s)).count(),
        poor: defined.iter().filter(|&&s| s < 40.0).count(),
    };
    let average = if defined.is_empty() {
        None
    } else {
        Some(quality::round2(
            defined.iter().sum::<f64>() / defined.len() as f64,
        ))
    };

    conversations.truncate(CONVERSATION_LIST_CAP);

    let quality_scores = QualityScores {
        average,
        distribution,
        conversations,
    };

    let summary = if include_summary {
        let prompt = summary_prompt(&usage, &feedback, &quality_scores, &themes);
        match generator.generate(&[], &prompt) {
            Ok(text) => Some(text),
            Err(e) => {
                log_summary_failure(&e);
                None
            }
        }
    } else {
        None
    };

    Ok(InsightsReport {
        usage,
        feedback,
        themes,
        quality_scores,
        summary,
    })
}

fn log_summary_failure(err: &LlmError) {
    tracing::warn!("Insights summary generation failed: {err}");
}

/// Fixed prompt template embedding the computed statistics.
fn summary_prompt(
    usage: &UsageStats,
    feedback: &FeedbackStats,
    quality_scores: &QualityScores,
    themes: &[Theme],
) -> String {
    let average = match quality_scores.average {
        Some(avg) => avg.to_string(),
        None => "N/A".to_string(),
    };
    let top_themes = if themes.is_empty() {
        "None yet".to_string()
    } else {
        themes
            .iter()
            .take(5)
            .map(|t| t.word.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "Provide a brief 1-2 sentence summary of these chat analytics insights. \
         Be concise and highlight key trends.\n\n\
         Usage Statistics:\n\
         - Total Conversations: {}\n\
         - Total Messages: {} (User: {}, AI: {})\n\n\
         Feedback Statistics:\n\
         - Total Feedback: {}\n\
         - Satisfaction Rate: {:.1}%\n\
         - Feedback Rate: {:.1}%\n\
         - Positive: {}, Negative: {}\n\n\
         Quality Scores:\n\
         - Average Quality Score: {}\n\
         - Distribution: Excellent ({}), Good ({}), Fair ({}), Poor ({})\n\n\
         Top Feedback Themes: {}\n\n\
         Provide a brief, actionable summary in 1-2 sentences.",
        usage.total_conversations,
        usage.total_messages,
        usage.total_user_messages,
        usage.total_ai_messages,
        feedback.total_feedback,
        feedback.satisfaction_rate,
        feedback.feedback_rate,
        feedback.positive_feedback,
        feedback.negative_feedback,
        average,
        quality_scores.distribution.excellent,
        quality_scores.distribution.good,
        quality_scores.distribution.fair,
        quality_scores.distribution.poor,
        top_themes,
    )
}
