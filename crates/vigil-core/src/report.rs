//! HTML compliance report rendered from history.
//!
//! The report is a plain self-contained page: one row per submitted day,
//! most recent first. Deterministic given its inputs, so hosts can diff
//! or re-export it freely.

use chrono::NaiveDate;
use indoc::indoc;

use crate::day::HistoryItem;

const PAGE: &str = indoc! {r#"
    <!DOCTYPE html>
    <html>
    <head>
    <meta charset="UTF-8">
    <title>Vigil Compliance Report</title>
    <style>
        body { background: #111; color: #ccc; font-family: 'Courier New', monospace; padding: 20px; }
        h1 { color: #dc2626; text-align: center; border-bottom: 2px solid #7f1d1d; padding-bottom: 10px; }
        table { width: 100%; border-collapse: collapse; margin-top: 20px; }
        th { text-align: left; padding: 10px; color: #7f1d1d; border-bottom: 2px solid #7f1d1d; }
        td { padding: 10px; border-bottom: 1px solid #333; }
        .pass { color: #16a34a; font-weight: bold; }
        .fail { color: #dc2626; font-weight: bold; }
    </style>
    </head>
    <body>
        <h1>Compliance Report &mdash; {date}</h1>
        <p>Current streak: {streak} days</p>
        <p>Last punishment: {punishment}</p>
        <table>
            <thead>
                <tr><th>Date</th><th>Score</th><th>Verdict</th><th>Missed checks</th><th>Proofs</th></tr>
            </thead>
            <tbody>
    {rows}
            </tbody>
        </table>
    </body>
    </html>
"#};

/// Render the full report page for `history` as of `generated_on`.
pub fn render_report(history: &[HistoryItem], streak: u32, generated_on: NaiveDate) -> String {
    let rows: String = history
        .iter()
        .map(|item| {
            let class = if item.score >= 70 { "pass" } else { "fail" };
            format!(
                "            <tr><td>{date}</td><td class=\"{class}\">{score}</td>\
                 <td>{feedback}</td><td>{missed}</td><td>{proofs}</td></tr>\n",
                date = item.date,
                class = class,
                score = item.score,
                feedback = item.feedback.as_str(),
                missed = item.missed_checks,
                proofs = item.proof_ids.len(),
            )
        })
        .collect();

    let last_punishment = history
        .iter()
        .find_map(|item| item.punishment.as_deref())
        .unwrap_or("none");

    PAGE.replace("{date}", &generated_on.to_string())
        .replace("{streak}", &streak.to_string())
        .replace("{punishment}", last_punishment)
        .replace("{rows}", rows.trim_end_matches('\n'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::day::FeedbackTier;

    fn item(day: u32, score: u32) -> HistoryItem {
        HistoryItem {
            date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
            score,
            feedback: FeedbackTier::from_score(score),
            punishment: None,
            proof_ids: vec!["p1".into()],
            missed_checks: 0,
            multiplier: 1.0,
        }
    }

    #[test]
    fn one_row_per_history_item() {
        let history = vec![item(5, 90), item(4, 40), item(3, 75)];
        let html = render_report(&history, 3, NaiveDate::from_ymd_opt(2025, 3, 6).unwrap());
        assert_eq!(html.matches("<tr><td>2025-03-").count(), 3);
        assert!(html.contains("class=\"fail\">40"));
        assert!(html.contains("Current streak: 3 days"));
    }

    #[test]
    fn empty_history_still_renders() {
        let html = render_report(&[], 0, NaiveDate::from_ymd_opt(2025, 3, 6).unwrap());
        assert!(html.contains("Compliance Report"));
        assert!(html.contains("Last punishment: none"));
    }

    #[test]
    fn latest_punishment_is_shown() {
        let mut history = vec![item(5, 90), item(4, 40)];
        history[1].punishment = Some("Write the daily vow five hundred times by hand.".into());
        let html = render_report(&history, 0, NaiveDate::from_ymd_opt(2025, 3, 6).unwrap());
        assert!(html.contains("daily vow"));
    }
}
