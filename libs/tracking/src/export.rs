//! Spreadsheet-compatible CSV export
//!
//! Files are UTF-8 with a byte order mark and `;` separators so that common
//! spreadsheet applications open them with the right encoding and columns.

use crate::{evaluation::ProjectEvaluation, models::CompletedSession};

const BOM: &str = "\u{feff}";
const SEPARATOR: char = ';';

pub const SESSIONS_HEADER: [&str; 6] = [
    "Dátum",
    "Čas",
    "Zamestnanec",
    "Projekt",
    "Trvanie",
    "Trvanie (minúty)",
];

pub const EVALUATION_HEADER: [&str; 9] = [
    "Projekt",
    "Celkový čas (minúty)",
    "Počet záznamov",
    "Počet zamestnancov",
    "Priemerný záznam (minúty)",
    "Odpracované hodiny",
    "Cena za hodinu",
    "Odchýlka (hodiny)",
    "Progres (%)",
];

fn escape(value: &str) -> String {
    if value.contains([SEPARATOR, '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn push_row<S: AsRef<str>>(out: &mut String, fields: &[S]) {
    let row: Vec<String> = fields.iter().map(|f| escape(f.as_ref())).collect();
    out.push_str(&row.join(&SEPARATOR.to_string()));
    out.push_str("\r\n");
}

fn decimal(value: f64) -> String {
    format!("{:.2}", value)
}

fn optional_decimal(value: Option<f64>) -> String {
    value.map(decimal).unwrap_or_default()
}

/// One row per completed session, in the order given
pub fn completed_sessions_csv(sessions: &[CompletedSession]) -> String {
    let mut out = String::from(BOM);
    push_row(&mut out, &SESSIONS_HEADER);

    for session in sessions {
        push_row(
            &mut out,
            &[
                session.timestamp.format("%d.%m.%Y").to_string(),
                session.timestamp.format("%H:%M").to_string(),
                session.employee_name.clone(),
                session.project_name.clone(),
                session.duration_formatted.clone(),
                session.duration_minutes.to_string(),
            ],
        );
    }

    out
}

/// One row per evaluated project
pub fn evaluation_csv(evaluations: &[ProjectEvaluation]) -> String {
    let mut out = String::from(BOM);
    push_row(&mut out, &EVALUATION_HEADER);

    for evaluation in evaluations {
        push_row(
            &mut out,
            &[
                evaluation.project_name.clone(),
                evaluation.total_time.to_string(),
                evaluation.session_count.to_string(),
                evaluation.unique_users.to_string(),
                decimal(evaluation.average_session_minutes),
                decimal(evaluation.total_lifetime_hours),
                decimal(evaluation.cost_per_hour),
                optional_decimal(evaluation.time_variance),
                optional_decimal(evaluation.work_progress_percentage),
            ],
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::evaluate_project;
    use crate::models::Project;
    use chrono::{NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    fn completed(employee_name: &str) -> CompletedSession {
        CompletedSession {
            id: 1,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 7, 5, 0).unwrap(),
            employee_id: Uuid::new_v4(),
            employee_name: employee_name.to_string(),
            project_id: Uuid::new_v4(),
            project_name: "Hala".to_string(),
            duration_minutes: 75,
            duration_formatted: "1h 15m".to_string(),
        }
    }

    #[test]
    fn test_sessions_csv_layout() {
        let csv = completed_sessions_csv(&[completed("Ján Kováč")]);
        let mut lines = csv.split("\r\n");

        assert_eq!(
            lines.next().unwrap(),
            "\u{feff}Dátum;Čas;Zamestnanec;Projekt;Trvanie;Trvanie (minúty)"
        );
        assert_eq!(lines.next().unwrap(), "15.01.2024;07:05;Ján Kováč;Hala;1h 15m;75");
        assert_eq!(lines.next().unwrap(), "");
    }

    #[test]
    fn test_values_with_separator_are_quoted() {
        let csv = completed_sessions_csv(&[completed("Novák; \"Jr\"")]);
        assert!(csv.contains(";\"Novák; \"\"Jr\"\"\";"));
    }

    #[test]
    fn test_evaluation_csv_leaves_missing_estimates_blank() {
        let project = Project {
            id: Uuid::new_v4(),
            name: "Sklad".to_string(),
            budget: 300.0,
            deadline: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            closed: false,
            estimated_hours: None,
            cost_center_id: None,
        };
        let mut session = completed("Eva");
        session.project_id = project.id;
        session.duration_minutes = 90;

        let evaluation = evaluate_project(&project, &[session], None);
        let csv = evaluation_csv(&[evaluation]);
        let row = csv.split("\r\n").nth(1).unwrap();

        assert_eq!(row, "Sklad;90;1;1;90.00;1.50;200.00;;");
    }
}
