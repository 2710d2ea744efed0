//! Human-readable listing of a recorded macro.
//!
//! Long runs of mouse moves and repeated identical actions are folded into
//! a single row with the individual events as children, which keeps the
//! listing short enough to read.

use crate::event::{EventKind, Key, MacroEvent};

/// One line of the listing, possibly summarising several events.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRow {
    pub time: f64,
    pub action: String,
    pub details: String,
    pub children: Vec<ActionRow>,
}

impl ActionRow {
    fn single(event: &MacroEvent) -> Self {
        let (action, details) = describe(&event.kind);
        Self {
            time: event.time,
            action,
            details,
            children: Vec::new(),
        }
    }
}

fn key_label(key: &Key) -> String {
    match key {
        Key::Named(named) => {
            let name = named.name().replace('_', " ");
            let mut chars = name.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => name,
            }
        }
        Key::Char(c) => format!("'{}'", c),
        Key::Code(code) => format!("<{}>", code),
    }
}

/// Action and details columns for one event.
pub fn describe(kind: &EventKind) -> (String, String) {
    match kind {
        EventKind::KeyTap { key } => ("Tap key".to_string(), format!("Key: {}", key_label(key))),
        EventKind::KeyPress { key } => {
            ("Press key".to_string(), format!("Key: {}", key_label(key)))
        }
        EventKind::KeyRelease { key } => {
            ("Release key".to_string(), format!("Key: {}", key_label(key)))
        }
        EventKind::Move { pos } => ("Moved".to_string(), format!("To: {}", pos)),
        EventKind::Click {
            pos,
            button,
            pressed,
        } => {
            let action = if *pressed { "Press" } else { "Release" };
            (
                format!("{} mouse", action),
                format!("Button: {} at {}", button.short_name(), pos),
            )
        }
        EventKind::Scroll {
            pos,
            scroll: (_, dy),
        } => {
            let direction = if *dy > 0 { "Up" } else { "Down" };
            ("Scroll".to_string(), format!("Direction: {} at {}", direction, pos))
        }
    }
}

/// Folds an event list into display rows.
pub fn group_actions(events: &[MacroEvent]) -> Vec<ActionRow> {
    let mut rows = Vec::new();
    let mut i = 0;

    while i < events.len() {
        let event = &events[i];

        if matches!(event.kind, EventKind::Move { .. }) {
            let run = events[i..]
                .iter()
                .take_while(|e| matches!(e.kind, EventKind::Move { .. }))
                .count();
            let group = &events[i..i + run];
            let duration = group[run - 1].time - event.time;

            rows.push(ActionRow {
                time: event.time,
                action: "Move mouse".to_string(),
                details: format!("{} moves in {:.2}s", run, duration),
                children: group.iter().map(ActionRow::single).collect(),
            });
            i += run;
            continue;
        }

        let first = describe(&event.kind);
        let run = events[i..]
            .iter()
            .take_while(|e| {
                !matches!(e.kind, EventKind::Move { .. }) && describe(&e.kind) == first
            })
            .count();

        if run > 1 {
            let (action, details) = first;
            rows.push(ActionRow {
                time: event.time,
                action: format!("{} [x{}]", action, run),
                details,
                children: events[i..i + run].iter().map(ActionRow::single).collect(),
            });
        } else {
            rows.push(ActionRow::single(event));
        }
        i += run;
    }

    rows
}

/// Renders rows as indented text lines, children below their parent.
pub fn render_lines(rows: &[ActionRow]) -> Vec<String> {
    let mut lines = Vec::new();
    for row in rows {
        lines.push(format!(
            "{:>8.2}s  {:<20} {}",
            row.time, row.action, row.details
        ));
        for child in &row.children {
            lines.push(format!(
                "    [{:.2}s]  {:<16} {}",
                child.time, child.action, child.details
            ));
        }
    }
    lines
}
