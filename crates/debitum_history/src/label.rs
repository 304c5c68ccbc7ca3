//! Human-readable action labels for events ("Created Contact", "Undo Transaction Delete").

use crate::index::UndoneEventIndex;
use crate::models::{Event, EventKind};

/// Label for one event. UNDO events are labelled after the event they compensate; an UNDO
/// whose target is not indexed is just "Undo".
///
/// Plain creations read "Created ..." while updates and deletes read "Update ..." and
/// "Delete ...". Existing clients match on these exact strings, so the tense mismatch stays.
pub fn resolve_label(event: &Event, undone: &UndoneEventIndex) -> String {
    let aggregate = capitalize(event.aggregate_type.as_str());
    match &event.kind {
        EventKind::Undo => match undone.target_of(event) {
            Some(target) => format!("Undo {} {}", aggregate, undone_action(target)),
            None => "Undo".to_string(),
        },
        EventKind::Delete => format!("Delete {}", aggregate),
        EventKind::Create => format!("Created {}", aggregate),
        EventKind::Update => format!("Update {}", aggregate),
        EventKind::Other(raw) => humanize(raw),
    }
}

fn undone_action(target: &Event) -> String {
    match target.kind {
        EventKind::Delete => "Delete".to_string(),
        EventKind::Update => "Update".to_string(),
        EventKind::Create => "Create".to_string(),
        _ => humanize(&target.raw_event_type),
    }
}

fn humanize(raw: &str) -> String {
    capitalize(&raw.replace('_', " "))
}

/// Uppercase the first character of each space-separated word, lowercase the rest.
pub fn capitalize(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
