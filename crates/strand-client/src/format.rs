//! Terminal display of verification results and tree snapshots.

use strand_bridge_tree::TreeSnapshot;
use strand_hash::Hash256;
use strand_state_proof::ProofKind;

/// Visible width of the box content
const WIDTH: usize = 80;

/// Format the outcome of a successful proof verification
pub fn format_verification(
    root: Hash256,
    key_hash: Hash256,
    value_hash: Option<Hash256>,
    kind: ProofKind,
) -> String {
    let status = match kind {
        ProofKind::Membership => "\x1b[32m✓ key is present\x1b[0m",
        ProofKind::NonMembership => "\x1b[32m✓ key is absent\x1b[0m",
    };
    let value = value_hash
        .map(|hash| hash.to_hex())
        .unwrap_or_else(|| "-".to_string());

    format_box(
        "State Proof",
        &[
            ("Root", root.to_hex()),
            ("Key hash", key_hash.to_hex()),
            ("Value hash", value),
            ("Proof", kind.to_string()),
            ("Status", status.to_string()),
        ],
    )
}

/// Format the count and root of a bridge tree snapshot
pub fn format_snapshot(snapshot: &TreeSnapshot) -> String {
    format_box(
        "Bridge Tree",
        &[
            ("Leaves", snapshot.count.to_string()),
            ("Root", snapshot.root.to_hex()),
        ],
    )
}

fn format_box(title: &str, rows: &[(&str, String)]) -> String {
    let mut output = String::new();

    let title = format!("─ {title} ");
    output.push_str(&format!(
        "┌{}{}┐\n",
        title,
        "─".repeat(WIDTH + 2 - title.chars().count())
    ));
    for (label, value) in rows {
        let line = format!("\x1b[33m{:<12}\x1b[0m {}", format!("{label}:"), value);
        output.push_str(&format!("│ {} │\n", format_column_content(&line, WIDTH)));
    }
    output.push_str(&format!("└{}┘", "─".repeat(WIDTH + 2)));

    output
}

fn format_column_content(content: &str, width: usize) -> String {
    // Remove ANSI color codes for length calculation
    let visible_len = strip_ansi_codes(content).chars().count();
    if visible_len <= width {
        format!("{}{}", content, " ".repeat(width - visible_len))
    } else {
        content.to_string()
    }
}

fn strip_ansi_codes(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c == '\x1b' {
            // Skip the escape sequence up to its terminator
            for next_c in chars.by_ref() {
                if next_c == 'm' {
                    break;
                }
            }
        } else {
            result.push(c);
        }
    }

    result
}
