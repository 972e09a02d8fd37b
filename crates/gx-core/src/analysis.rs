//! Keyword statistics over passively viewed entities.
//!
//! None of this is NLP: topics are token counts and sentiment is lexicon
//! hits. Rankings are stable, so ties keep first-encountered order.

use chrono::{DateTime, Local, Timelike, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::models::ViewedEntity;

pub const STOP_WORDS: &[&str] = &[
    "的", "了", "在", "是", "我", "你", "他", "她", "它", "们", "这", "那", "和", "与", "或", "但",
    "因为", "所以", "如果", "虽然", "但是", "然后", "现在", "今天", "昨天", "明天", "年", "月", "日",
    "时", "分", "秒", "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of",
    "with", "by", "is", "are", "was", "were", "be", "been", "have", "has", "had", "do", "does",
    "did", "will", "would", "could", "should", "may", "might", "can", "must",
];

pub const POSITIVE_WORDS: &[&str] = &[
    "好", "棒", "赞", "喜欢", "爱", "开心", "高兴", "兴奋", "amazing", "great", "awesome", "love",
    "like", "happy", "excited",
];

pub const NEGATIVE_WORDS: &[&str] = &[
    "坏", "差", "讨厌", "恨", "难过", "伤心", "愤怒", "失望", "bad", "terrible", "hate", "sad",
    "angry", "disappointed",
];

pub const TOP_TOPICS: usize = 10;

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// Lower-cases, splits on anything that is not ASCII word or CJK, and drops
/// stop words and single characters.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    lowered
        .split(|c: char| !is_token_char(c))
        .filter(|word| word.chars().count() > 1 && !STOP_WORDS.contains(word))
        .map(str::to_string)
        .collect()
}

/// Counts keys and returns the `limit` most frequent, ties in first-seen order.
fn rank<I, S>(keys: I, limit: usize) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();
    for key in keys {
        let key = key.into();
        match index.get(&key) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(key.clone(), counts.len());
                counts.push((key, 1));
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(limit);
    counts
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicCount {
    pub topic: String,
    pub count: usize,
}

pub fn topics<'a>(views: impl IntoIterator<Item = &'a ViewedEntity>) -> Vec<TopicCount> {
    let words = views.into_iter().flat_map(|v| tokenize(&v.text));
    rank(words, TOP_TOPICS)
        .into_iter()
        .map(|(topic, count)| TopicCount { topic, count })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

/// Number of distinct lexicon words contained anywhere in `text`.
fn lexicon_hits(text: &str, lexicon: &[&str]) -> usize {
    lexicon.iter().filter(|word| text.contains(*word)).count()
}

pub fn classify(text: &str) -> Sentiment {
    let text = text.to_lowercase();
    let positive = lexicon_hits(&text, POSITIVE_WORDS);
    let negative = lexicon_hits(&text, NEGATIVE_WORDS);
    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Sentiment::Positive,
        std::cmp::Ordering::Less => Sentiment::Negative,
        std::cmp::Ordering::Equal => Sentiment::Neutral,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SentimentCounts {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

pub fn sentiments<'a>(views: impl IntoIterator<Item = &'a ViewedEntity>) -> SentimentCounts {
    let mut counts = SentimentCounts::default();
    for view in views {
        match classify(&view.text) {
            Sentiment::Positive => counts.positive += 1,
            Sentiment::Negative => counts.negative += 1,
            Sentiment::Neutral => counts.neutral += 1,
        }
    }
    counts
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorCount {
    pub author: String,
    pub count: usize,
}

pub fn top_authors<'a>(views: impl IntoIterator<Item = &'a ViewedEntity>, limit: usize) -> Vec<AuthorCount> {
    let keys = views
        .into_iter()
        .filter_map(|v| v.author.as_ref()?.ranking_key().map(str::to_string));
    rank(keys, limit)
        .into_iter()
        .map(|(author, count)| AuthorCount { author, count })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Engagement {
    pub total_likes: u64,
    pub total_retweets: u64,
    pub total_replies: u64,
    pub avg_engagement: f64,
}

pub fn engagement(views: &[ViewedEntity]) -> Engagement {
    let total_likes: u64 = views.iter().map(|v| v.likes).sum();
    let total_retweets: u64 = views.iter().map(|v| v.retweets).sum();
    let total_replies: u64 = views.iter().map(|v| v.replies).sum();
    let avg_engagement = if views.is_empty() {
        0.0
    } else {
        (total_likes + total_retweets + total_replies) as f64 / views.len() as f64
    };
    Engagement {
        total_likes,
        total_retweets,
        total_replies,
        avg_engagement,
    }
}

/// Short observations about the viewing window.
pub fn insights(views: &[ViewedEntity]) -> Vec<String> {
    let mut insights = Vec::new();
    if views.is_empty() {
        return insights;
    }

    let mut hourly = [0usize; 24];
    for view in views {
        hourly[view.timestamp.with_timezone(&Local).hour() as usize] += 1;
    }
    // earliest hour wins a tie
    let (hour, count) = hourly
        .iter()
        .enumerate()
        .fold((0, 0), |best, (h, &c)| if c > best.1 { (h, c) } else { best });
    insights.push(format!("Most active around {hour}:00, {count} posts viewed"));

    let total = views.len() as f64;
    let with_images = views.iter().filter(|v| v.has_images).count() as f64;
    let with_links = views.iter().filter(|v| v.has_links).count() as f64;
    if with_images > total * 0.3 {
        insights.push("Posts with images make up a large share of your feed".to_string());
    }
    if with_links > total * 0.4 {
        insights.push("Posts with links make up a large share of your feed".to_string());
    }

    let avg = views.iter().map(|v| v.likes + v.retweets).sum::<u64>() as f64 / total;
    if avg > 100.0 {
        insights.push("The posts you viewed are highly engaged overall".to_string());
    }
    insights
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

pub fn time_range(views: &[ViewedEntity]) -> Option<TimeRange> {
    let start = views.iter().map(|v| v.timestamp).min()?;
    let end = views.iter().map(|v| v.timestamp).max()?;
    Some(TimeRange { start, end })
}
