//! Bundled cards shown when the content source is unusable.

use chrono::{DateTime, Utc};

use crate::content::{image_for_category, search_link};
use crate::feed::types::FeedItem;

struct BundledByte {
    title: &'static str,
    publisher: &'static str,
    body: &'static str,
    category: &'static str,
    label: &'static str,
    read_time: &'static str,
    likes: u32,
}

const BUNDLED: &[BundledByte] = &[
    BundledByte {
        title: "How central banks decide when to cut rates",
        publisher: "Bytes Markets",
        body: "Policy committees weigh core inflation, wage growth and labour-market slack before moving. Most now signal cuts weeks ahead through speeches and minutes, so the decision itself rarely surprises bond traders.",
        category: "Finance",
        label: "EXPLAINER",
        read_time: "2 min read",
        likes: 640,
    },
    BundledByte {
        title: "Silicon photonics moves from lab to data centre",
        publisher: "Bytes Tech",
        body: "Optical interconnects carry data between chips as light instead of current. Vendors claim several times the bandwidth density of copper at lower power, which matters as AI clusters hit the limits of electrical links.",
        category: "AI & Tech",
        label: "EXPLAINER",
        read_time: "2 min read",
        likes: 850,
    },
    BundledByte {
        title: "Why reusable rockets changed launch economics",
        publisher: "Bytes Science",
        body: "Recovering first stages turned the most expensive part of a rocket into reusable hardware. Launch cadence rose, prices per kilogram fell, and satellite constellations that once looked uneconomic became routine.",
        category: "Science",
        label: "EXPLAINER",
        read_time: "3 min read",
        likes: 1300,
    },
    BundledByte {
        title: "What a sovereign wealth fund actually owns",
        publisher: "Bytes Business",
        body: "State investment funds have shifted from passive index holdings toward direct stakes in minerals, chips and infrastructure. The goal is strategic access as much as return, which changes how they price risk.",
        category: "Business",
        label: "EXPLAINER",
        read_time: "2 min read",
        likes: 420,
    },
    BundledByte {
        title: "Reading an election poll without being misled",
        publisher: "Bytes Politics",
        body: "Check the sample size, the field dates and whether the poll weights by past vote. A single survey moving two points is usually noise; a trend across several pollsters is the signal worth watching.",
        category: "Politics",
        label: "GUIDE",
        read_time: "2 min read",
        likes: 510,
    },
    BundledByte {
        title: "Heat waves and the limits of the human body",
        publisher: "Bytes Health",
        body: "Above a wet-bulb temperature of roughly 31C the body struggles to shed heat through sweat. Public-health agencies now track humidity alongside temperature when issuing warnings.",
        category: "Health",
        label: "EXPLAINER",
        read_time: "1 min read",
        likes: 380,
    },
];

/// Static cards used when no fetched content is available.
///
/// Ids are `byte-001`, `byte-002`, ... and links are news searches, so a
/// stale bundled card never points at a dead article.
pub fn bundled_items(now: DateTime<Utc>) -> Vec<FeedItem> {
    BUNDLED
        .iter()
        .enumerate()
        .map(|(i, byte)| FeedItem {
            id: format!("byte-{:03}", i + 1),
            title: byte.title.to_string(),
            body: byte.body.to_string(),
            publisher_name: byte.publisher.to_string(),
            category: byte.category.to_string(),
            published_label: byte.label.to_string(),
            read_time: byte.read_time.to_string(),
            image_ref: image_for_category(byte.category),
            source_link: Some(search_link(byte.title, byte.publisher)),
            like_count: byte.likes,
            liked: false,
            saved: false,
            fetched_at: now,
        })
        .collect()
}
